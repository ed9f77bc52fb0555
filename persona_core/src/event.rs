//! Ledger events and the clock that stamps them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use crate::Role;
use crate::participant::ParticipantType;

/// One immutable message between the two parties of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub session_id: Uuid,
    pub from_type: ParticipantType,
    pub from_id: String,
    pub to_type: ParticipantType,
    pub to_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Chat role of the sender: users speak as `user`, agents as `assistant`.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.from_type {
            ParticipantType::User => Role::User,
            _ => Role::Assistant,
        }
    }
}

/// Fields a caller supplies to append an event. Ids and timestamps are
/// assigned by the ledger.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub session_id: Uuid,
    pub user_id: String,
    pub agent_id: String,
    pub from_type: ParticipantType,
    pub to_type: ParticipantType,
    pub content: String,
}

impl NewEvent {
    /// A message from the user to the agent.
    #[must_use]
    pub fn from_user(
        session_id: Uuid,
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            from_type: ParticipantType::User,
            to_type: ParticipantType::Agent,
            content: content.into(),
        }
    }

    /// A reply from the agent to the user.
    #[must_use]
    pub fn from_agent(
        session_id: Uuid,
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            from_type: ParticipantType::Agent,
            to_type: ParticipantType::User,
            content: content.into(),
        }
    }
}

static PROCESS_CLOCK: EventClock = EventClock::new();

/// Clock whose readings strictly increase at microsecond resolution.
///
/// Two events appended within the same microsecond still get distinct,
/// ordered timestamps. Stamp events through [`EventClock::shared`] so every
/// ledger in the process reads the same clock; nothing orders readings
/// across processes.
#[derive(Debug, Default)]
pub struct EventClock {
    last_micros: AtomicI64,
}

impl EventClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_micros: AtomicI64::new(0),
        }
    }

    /// The process-wide clock.
    #[must_use]
    pub fn shared() -> &'static Self {
        &PROCESS_CLOCK
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut last = self.last_micros.load(Ordering::Acquire);
        loop {
            let next = wall.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
                Err(current) => last = current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn clock_is_strictly_increasing() {
        let clock = EventClock::new();
        let mut previous = clock.now();
        for _ in 0..10_000 {
            let next = clock.now();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn shared_clock_is_one_instance() {
        assert!(std::ptr::eq(EventClock::shared(), EventClock::shared()));
        let first = EventClock::shared().now();
        assert!(EventClock::shared().now() > first);
    }

    #[tokio::test]
    async fn clock_readings_are_unique_across_tasks() {
        let clock = Arc::new(EventClock::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let clock = clock.clone();
            handles.push(tokio::spawn(async move {
                (0..500).map(|_| clock.now()).collect::<Vec<_>>()
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap_or_default());
        }
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn event_role_follows_sender() {
        let mut event = Event {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            from_type: ParticipantType::User,
            from_id: "u".to_string(),
            to_type: ParticipantType::Agent,
            to_id: "a".to_string(),
            content: "hi".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.role(), Role::User);

        event.from_type = ParticipantType::Agent;
        assert_eq!(event.role(), Role::Assistant);
    }
}
