//! Background reply generation.
//!
//! Jobs are sharded by session across a fixed set of workers. Each worker
//! drains its own FIFO channel one job at a time, so replies within a session
//! are produced in the order their messages were sent.

use persona_core::util::{DEFAULT_SYSTEM_PROMPT, MAX_EVENT_CONTENT_CHARS, char_len};
use persona_core::{
    AgentProfile, ContextInput, Error, ErrorCode, Event, LLMClient, NewEvent, ReplyRequest, Result,
};
use persona_ledger::EventLedger;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::failure::failure_reply;

/// Everything a worker needs to answer one user message.
#[derive(Debug, Clone)]
pub struct ReplyJob {
    pub session_id: Uuid,
    pub user_id: String,
    pub agent: AgentProfile,
    /// The user message being answered.
    pub user_event_id: Uuid,
    /// Recent events, oldest first, ending with the user message.
    pub window: Vec<Event>,
}

/// Generates a reply and records it, or records why it could not.
pub struct ReplyWorker {
    llm: Arc<dyn LLMClient>,
    ledger: Arc<EventLedger>,
    timeout: Option<Duration>,
}

impl ReplyWorker {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        ledger: Arc<EventLedger>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            llm,
            ledger,
            timeout,
        }
    }

    /// Never fails: errors become an assistant event or a log line.
    pub async fn handle(&self, job: ReplyJob) {
        let system_prompt = if job.agent.system_prompt.trim().is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            job.agent.system_prompt.clone()
        };
        let request = ReplyRequest {
            model: job.agent.model.clone(),
            provider: job.agent.provider.clone(),
            system_prompt,
            context: ContextInput::Events(job.window),
            timeout: self.timeout,
        };

        let content = match self.llm.generate_reply(&request).await {
            Ok(reply) if !reply.trim().is_empty() => clip(reply),
            Ok(_) => {
                warn!(
                    "Agent {} produced an empty reply to {}",
                    job.agent.id, job.user_event_id
                );
                failure_reply(ErrorCode::LlmApiError).to_string()
            }
            Err(e) => {
                error!(
                    "Reply to {} in session {} failed [{}]: {}",
                    job.user_event_id,
                    job.session_id,
                    e.code(),
                    e
                );
                failure_reply(e.code()).to_string()
            }
        };

        let reply = NewEvent::from_agent(job.session_id, job.user_id, job.agent.id, content);
        match self.ledger.append(reply).await {
            Ok(event) => debug!("Recorded reply {} to {}", event.id, job.user_event_id),
            Err(e) => error!(
                "Failed to record reply to {} in session {}: {}",
                job.user_event_id, job.session_id, e
            ),
        }
    }
}

fn clip(reply: String) -> String {
    if char_len(&reply) <= MAX_EVENT_CONTENT_CHARS {
        return reply;
    }
    warn!(
        "Reply exceeds {} characters; truncating",
        MAX_EVENT_CONTENT_CHARS
    );
    reply.chars().take(MAX_EVENT_CONTENT_CHARS).collect()
}

/// Fixed pool of reply workers.
pub struct ReplyQueue {
    shards: Vec<mpsc::UnboundedSender<ReplyJob>>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    handles: Vec<JoinHandle<()>>,
}

impl ReplyQueue {
    /// Spawn `workers` workers (at least one) on the current runtime.
    pub fn start(workers: usize, worker: Arc<ReplyWorker>) -> Self {
        let workers = workers.max(1);
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let mut shards = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let (tx, rx) = mpsc::unbounded_channel();
            shards.push(tx);
            handles.push(tokio::spawn(run_worker(
                index,
                rx,
                worker.clone(),
                pending.clone(),
                idle.clone(),
            )));
        }

        info!("Started {} reply workers", workers);
        Self {
            shards,
            pending,
            idle,
            handles,
        }
    }

    pub fn enqueue(&self, job: ReplyJob) -> Result<()> {
        let shard = self.shard_for(&job.session_id);
        let session_id = job.session_id;
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.shards[shard].send(job).is_err() {
            self.finish_one();
            return Err(Error::System(anyhow::anyhow!(
                "reply queue is shut down; session {session_id} gets no reply"
            )));
        }
        debug!("Queued reply for session {} on worker {}", session_id, shard);
        Ok(())
    }

    /// Jobs queued or in progress.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolves once no job is queued or in progress.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting jobs, finish the queued ones and stop the workers.
    pub async fn shutdown(self) {
        drop(self.shards);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Reply worker ended abnormally: {}", e);
            }
        }
        info!("Reply workers stopped");
    }

    fn shard_for(&self, session_id: &Uuid) -> usize {
        let shards = u128::try_from(self.shards.len()).unwrap_or(1).max(1);
        usize::try_from(session_id.as_u128() % shards).unwrap_or_default()
    }

    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

async fn run_worker(
    index: usize,
    mut jobs: mpsc::UnboundedReceiver<ReplyJob>,
    worker: Arc<ReplyWorker>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
) {
    while let Some(job) = jobs.recv().await {
        let user_event_id = job.user_event_id;
        let worker = worker.clone();
        // A panicking job surfaces as a JoinError instead of killing the worker.
        if let Err(e) = tokio::spawn(async move { worker.handle(job).await }).await {
            error!(
                "Reply job for {} crashed on worker {}: {}",
                user_event_id, index, e
            );
        }
        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            idle.notify_waiters();
        }
    }
    debug!("Reply worker {} drained", index);
}
