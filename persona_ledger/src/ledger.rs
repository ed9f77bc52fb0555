use persona_core::util::{MAX_EVENT_CONTENT_CHARS, char_len};
use persona_core::{
    Error, Event, EventClock, EventRepo, NewEvent, ParticipantType, Result, SessionRepo,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct EventLedger {
    events: Arc<dyn EventRepo>,
    sessions: Arc<dyn SessionRepo>,
}

impl EventLedger {
    /// `sessions` is only read, to check that the parties of an event belong
    /// to the session it is filed under.
    pub fn new(events: Arc<dyn EventRepo>, sessions: Arc<dyn SessionRepo>) -> Self {
        Self {
            events,
            sessions,
        }
    }

    /// Validate, stamp and persist one event.
    pub async fn append(&self, new: NewEvent) -> Result<Event> {
        validate(&new)?;

        let session = self
            .sessions
            .find_by_id(&new.session_id)
            .await?
            .ok_or(Error::SessionNotFound(new.session_id))?;
        if session.user_id() != Some(new.user_id.as_str())
            || session.agent_id() != Some(new.agent_id.as_str())
        {
            return Err(Error::validation(format!(
                "user {} and agent {} are not the parties of session {}",
                new.user_id, new.agent_id, new.session_id
            )));
        }

        let (from_id, to_id) = match new.from_type {
            ParticipantType::User => (new.user_id, new.agent_id),
            _ => (new.agent_id, new.user_id),
        };
        let event = Event {
            id: Uuid::now_v7(),
            session_id: new.session_id,
            from_type: new.from_type,
            from_id,
            to_type: new.to_type,
            to_id,
            content: new.content,
            timestamp: EventClock::shared().now(),
        };

        self.events.insert(&event).await?;
        info!(
            "Appended event {} to session {} ({} -> {}, {} chars)",
            event.id,
            event.session_id,
            event.from_type,
            event.to_type,
            char_len(&event.content)
        );
        Ok(event)
    }

    /// Every event of the session, oldest first.
    pub async fn all_by_session(&self, session_id: &Uuid) -> Result<Vec<Event>> {
        Ok(self.events.list_by_session(session_id).await?)
    }

    /// The last `limit` events of the session, oldest first.
    pub async fn recent_by_session(&self, session_id: &Uuid, limit: usize) -> Result<Vec<Event>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let events = self.events.recent_by_session(session_id, limit).await?;
        debug!(
            "Loaded {} recent events for session {}",
            events.len(),
            session_id
        );
        Ok(events)
    }

    pub async fn by_id(&self, event_id: &Uuid) -> Result<Option<Event>> {
        Ok(self.events.find_by_id(event_id).await?)
    }

    pub async fn get(&self, event_id: &Uuid) -> Result<Event> {
        self.by_id(event_id)
            .await?
            .ok_or(Error::EventNotFound(*event_id))
    }
}

fn validate(new: &NewEvent) -> Result<()> {
    if new.session_id.is_nil() {
        return Err(Error::validation("session id is required"));
    }
    if new.user_id.trim().is_empty() {
        return Err(Error::validation("user id is required"));
    }
    if new.agent_id.trim().is_empty() {
        return Err(Error::validation("agent id is required"));
    }
    if new.content.trim().is_empty() {
        return Err(Error::validation("content must not be empty"));
    }
    let length = char_len(&new.content);
    if length > MAX_EVENT_CONTENT_CHARS {
        return Err(Error::validation(format!(
            "content is {length} characters, limit is {MAX_EVENT_CONTENT_CHARS}"
        )));
    }

    let allowed = |t: ParticipantType| matches!(t, ParticipantType::User | ParticipantType::Agent);
    if !allowed(new.from_type) || !allowed(new.to_type) {
        return Err(Error::validation(format!(
            "unsupported direction {} -> {}",
            new.from_type, new.to_type
        )));
    }
    if new.from_type == new.to_type {
        return Err(Error::validation(format!(
            "sender and recipient are both {}",
            new.from_type
        )));
    }
    Ok(())
}
