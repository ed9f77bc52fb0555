use persona_core::ErrorCode;

/// User-visible text recorded in place of a reply that could not be generated.
#[must_use]
pub const fn failure_reply(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::LlmApiTimeout => {
            "Sorry, I took too long to think about that. Please try again in a moment."
        }
        ErrorCode::LlmApiError => {
            "Sorry, my language model service returned an error. Please try again later."
        }
        ErrorCode::ApiKeyMissing => {
            "I can't reply right now: no API key is configured for my language model provider."
        }
        ErrorCode::InvalidProvider | ErrorCode::ProviderRequired => {
            "I can't reply right now: my language model provider is not configured correctly."
        }
        ErrorCode::ValidationError => "Sorry, I couldn't process that message.",
        ErrorCode::AgentNotFound
        | ErrorCode::SessionNotFound
        | ErrorCode::EventNotFound
        | ErrorCode::SystemError => "Sorry, something went wrong while I was preparing a reply.",
    }
}
