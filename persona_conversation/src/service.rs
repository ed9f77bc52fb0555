//! The conversation entry point.
//!
//! `send_message` makes the user's message durable and returns; the reply is
//! produced later by the worker pool and lands in the same session's log.

use chrono::{DateTime, Utc};
use persona_core::util::{DEFAULT_CONTEXT_LIMIT, MAX_MESSAGE_CHARS, char_len};
use persona_core::{
    AgentDirectory, Error, Event, LLMClient, NewEvent, Participant, Result, Session,
};
use persona_ledger::EventLedger;
use persona_session::SessionDirectory;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::history::History;
use crate::queue::{ReplyJob, ReplyQueue, ReplyWorker};

/// Configuration for conversation handling.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Recent events sent to the model when the caller does not say
    pub context_limit: usize,
    /// Reply workers
    pub workers: usize,
    /// Per-call LLM timeout; the client default applies when `None`
    pub reply_timeout: Option<Duration>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_limit: DEFAULT_CONTEXT_LIMIT,
            workers: 4,
            reply_timeout: None,
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub const fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }
}

/// One inbound user message.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub user_id: String,
    pub agent_id: String,
    pub text: String,
    /// Overrides the configured context window size.
    pub context_limit: Option<usize>,
}

impl SendMessage {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            text: text.into(),
            context_limit: None,
        }
    }

    #[must_use]
    pub const fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Logged; the reply has not been recorded yet.
    Pending,
}

/// Acknowledgement returned as soon as the user message is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub user_event_id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
}

pub struct ConversationService {
    sessions: SessionDirectory,
    ledger: Arc<EventLedger>,
    agents: Arc<dyn AgentDirectory>,
    queue: ReplyQueue,
    config: ConversationConfig,
}

impl ConversationService {
    /// Must be called inside a tokio runtime; starts the reply workers.
    pub fn new(
        sessions: SessionDirectory,
        ledger: Arc<EventLedger>,
        agents: Arc<dyn AgentDirectory>,
        llm: Arc<dyn LLMClient>,
        config: ConversationConfig,
    ) -> Self {
        let worker = Arc::new(ReplyWorker::new(llm, ledger.clone(), config.reply_timeout));
        let queue = ReplyQueue::start(config.workers, worker);
        info!(
            "ConversationService ready (context_limit={}, workers={})",
            config.context_limit, config.workers
        );
        Self {
            sessions,
            ledger,
            agents,
            queue,
            config,
        }
    }

    /// Log a user message and schedule the agent's reply.
    ///
    /// Returns once the message is durable. Validation and missing
    /// agent/session errors surface here; generation failures show up later
    /// as an assistant event in the same session.
    pub async fn send_message(&self, message: SendMessage) -> Result<SendReceipt> {
        let context_limit = message.context_limit.unwrap_or(self.config.context_limit);
        validate(&message, context_limit)?;

        let session = self
            .sessions
            .get_or_create(&[
                Participant::user(&message.user_id),
                Participant::agent(&message.agent_id),
            ])
            .await?;

        let user_event = self
            .ledger
            .append(NewEvent::from_user(
                session.id,
                &message.user_id,
                &message.agent_id,
                &message.text,
            ))
            .await?;

        let agent = self
            .agents
            .get_agent_by_id(&message.agent_id)
            .await?
            .ok_or_else(|| Error::AgentNotFound(message.agent_id.clone()))?;

        let window = self
            .ledger
            .recent_by_session(&session.id, context_limit)
            .await?;
        debug!(
            "Context window for {}: {} events",
            user_event.id,
            window.len()
        );

        self.queue.enqueue(ReplyJob {
            session_id: session.id,
            user_id: message.user_id,
            agent,
            user_event_id: user_event.id,
            window,
        })?;
        self.sessions.touch_activity(session.id);

        info!(
            "Accepted message {} in session {}",
            user_event.id, session.id
        );
        Ok(SendReceipt {
            user_event_id: user_event.id,
            session_id: session.id,
            timestamp: user_event.timestamp,
            status: MessageStatus::Pending,
        })
    }

    pub async fn get_or_create_session(&self, participants: &[Participant]) -> Result<Session> {
        self.sessions.get_or_create(participants).await
    }

    pub async fn find_session_by_participants(
        &self,
        participants: &[Participant],
    ) -> Result<Option<Session>> {
        self.sessions.find_by_participants(participants).await
    }

    pub async fn sessions_by_user(&self, user_id: &str) -> Result<Vec<Session>> {
        self.sessions.find_by_user(user_id).await
    }

    pub async fn sessions_by_agent(&self, agent_id: &str) -> Result<Vec<Session>> {
        self.sessions.find_by_agent(agent_id).await
    }

    /// Append an event directly, bypassing reply generation.
    pub async fn create_event(&self, event: NewEvent) -> Result<Event> {
        self.ledger.append(event).await
    }

    pub async fn events_by_session(&self, session_id: &Uuid) -> Result<Vec<Event>> {
        self.ledger.all_by_session(session_id).await
    }

    pub async fn recent_events(&self, session_id: &Uuid, limit: usize) -> Result<Vec<Event>> {
        self.ledger.recent_by_session(session_id, limit).await
    }

    pub async fn get_event(&self, event_id: &Uuid) -> Result<Event> {
        self.ledger.get(event_id).await
    }

    /// Full log of the user/agent conversation, if they ever spoke.
    pub async fn history_by_user_and_agent(
        &self,
        user_id: &str,
        agent_id: &str,
    ) -> Result<Option<History>> {
        let Some(session) = self
            .sessions
            .find_by_participants(&[Participant::user(user_id), Participant::agent(agent_id)])
            .await?
        else {
            return Ok(None);
        };
        let events = self.ledger.all_by_session(&session.id).await?;
        Ok(Some(History { session, events }))
    }

    /// Replies queued or being generated.
    #[must_use]
    pub fn pending_replies(&self) -> usize {
        self.queue.pending()
    }

    /// Wait until every queued reply has been recorded.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    /// Finish queued replies and stop the workers.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}

fn validate(message: &SendMessage, context_limit: usize) -> Result<()> {
    if message.user_id.trim().is_empty() {
        return Err(Error::validation("user id is required"));
    }
    if message.agent_id.trim().is_empty() {
        return Err(Error::validation("agent id is required"));
    }
    if message.text.trim().is_empty() {
        return Err(Error::validation("message text must not be empty"));
    }
    let length = char_len(&message.text);
    if length > MAX_MESSAGE_CHARS {
        return Err(Error::validation(format!(
            "message is {length} characters, limit is {MAX_MESSAGE_CHARS}"
        )));
    }
    if context_limit == 0 {
        return Err(Error::validation("context limit must be at least 1"));
    }
    Ok(())
}
