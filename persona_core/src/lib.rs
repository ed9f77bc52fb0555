#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Domain types and collaborator traits shared by every persona crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod agent;
pub mod context;
pub mod error;
pub mod event;
pub mod participant;
pub mod repository;
pub mod session;
pub mod util;

pub use agent::{AgentDirectory, AgentProfile};
pub use context::{ContextInput, ReplyRequest};
pub use error::{Error, ErrorCode, LlmError, Result};
pub use event::{Event, EventClock, NewEvent};
pub use participant::{Participant, ParticipantType, normalize, participant_key};
pub use repository::{EventRepo, SessionRepo};
pub use session::Session;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Generates one assistant reply for a conversation context.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn generate_reply(&self, request: &ReplyRequest) -> Result<String>;
}

/// Ordered API keys per provider. List order is attempt order.
pub trait CredentialSource: Send + Sync {
    fn api_keys(&self, provider: &str) -> Vec<String>;
}
