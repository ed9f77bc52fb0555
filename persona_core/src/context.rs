//! Context windows and their mapping to chat turns.

use std::time::Duration;

use crate::event::Event;
use crate::{ChatMessage, Role};

/// Conversation context handed to the model.
///
/// The variant says what the caller holds, so formatting never depends on
/// inspecting the shape of the list.
#[derive(Debug, Clone)]
pub enum ContextInput {
    /// Ledger events, oldest first.
    Events(Vec<Event>),
    /// Already role-tagged turns, oldest first.
    Turns(Vec<ChatMessage>),
}

impl ContextInput {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Events(events) => events.len(),
            Self::Turns(turns) => turns.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Role-tagged turns with `system_prompt` first. Order is preserved.
    #[must_use]
    pub fn to_turns(&self, system_prompt: &str) -> Vec<ChatMessage> {
        let mut turns = Vec::with_capacity(self.len() + 1);
        turns.push(ChatMessage::new(Role::System, system_prompt));
        match self {
            Self::Events(events) => turns.extend(
                events
                    .iter()
                    .map(|e| ChatMessage::new(e.role(), e.content.clone())),
            ),
            Self::Turns(messages) => turns.extend(messages.iter().cloned()),
        }
        turns
    }
}

/// One reply-generation call.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub model: String,
    pub provider: Option<String>,
    pub system_prompt: String,
    pub context: ContextInput,
    /// Per-HTTP-call bound; the client default applies when `None`.
    pub timeout: Option<Duration>,
}
