//! Error taxonomy with stable, machine-readable codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    AgentNotFound,
    SessionNotFound,
    EventNotFound,
    ApiKeyMissing,
    InvalidProvider,
    ProviderRequired,
    LlmApiTimeout,
    LlmApiError,
    SystemError,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AgentNotFound => "AGENT_NOT_FOUND",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::ApiKeyMissing => "API_KEY_MISSING",
            Self::InvalidProvider => "INVALID_PROVIDER",
            Self::ProviderRequired => "PROVIDER_REQUIRED",
            Self::LlmApiTimeout => "LLM_API_TIMEOUT",
            Self::LlmApiError => "LLM_API_ERROR",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure talking to an upstream language model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct LlmError {
    pub code: ErrorCode,
    pub message: String,
    pub provider: Option<String>,
    /// HTTP status of the failing response, if one was received.
    pub status: Option<u16>,
    /// Position of the credential in the provider's key list.
    pub key_index: Option<usize>,
}

impl LlmError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            status: None,
            key_index: None,
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn with_key_index(mut self, index: usize) -> Self {
        self.key_index = Some(index);
        self
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("System error: {0}")]
    System(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::AgentNotFound(_) => ErrorCode::AgentNotFound,
            Self::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Self::EventNotFound(_) => ErrorCode::EventNotFound,
            Self::Llm(e) => e.code,
            Self::System(_) => ErrorCode::SystemError,
        }
    }
}
