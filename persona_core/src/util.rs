//! Shared limits and defaults.

/// Upper bound on the content of a single ledger event, in characters.
pub const MAX_EVENT_CONTENT_CHARS: usize = 50_000;

/// Upper bound on an inbound user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5_000;

/// Number of recent events supplied to the model by default.
pub const DEFAULT_CONTEXT_LIMIT: usize = 20;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Character count, not byte length.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split a comma-separated credential list, keeping order and dropping blanks.
#[must_use]
pub fn split_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ToString::to_string)
        .collect()
}
