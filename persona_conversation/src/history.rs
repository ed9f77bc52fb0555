//! Stored conversation history and summary statistics.

use persona_core::util::char_len;
use persona_core::{Event, ParticipantType, Session};
use serde::Serialize;

/// A session together with every event logged in it, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub session: Session,
    pub events: Vec<Event>,
}

impl History {
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        HistoryStats::from_events(&self.events)
    }
}

/// Statistics about a conversation history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub total_characters: usize,
    pub estimated_tokens: usize,
}

impl HistoryStats {
    #[must_use]
    pub fn from_events(events: &[Event]) -> Self {
        let user_messages = events
            .iter()
            .filter(|e| e.from_type == ParticipantType::User)
            .count();
        let total_characters = events.iter().map(|e| char_len(&e.content)).sum::<usize>();

        Self {
            total_messages: events.len(),
            user_messages,
            assistant_messages: events.len() - user_messages,
            total_characters,
            estimated_tokens: total_characters / 4, // Rough estimate: 4 chars per token
        }
    }
}
