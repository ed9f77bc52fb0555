use async_trait::async_trait;
use persona_core::util::char_len;
use persona_core::{
    ChatMessage, CredentialSource, Error, ErrorCode, LLMClient, LlmError, ReplyRequest, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::openai_compat::{AttemptError, ChatCompletions};
use crate::registry::{ProviderKind, ProviderRegistry};
use crate::retry::retry_with_backoff;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

/// [`LLMClient`] that fails over across every API key of the resolved provider.
pub struct FailoverClient {
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialSource>,
    transport: ChatCompletions,
    timeout: Duration,
    retry_delays: Vec<Duration>,
}

impl FailoverClient {
    pub fn new(registry: ProviderRegistry, credentials: Arc<dyn CredentialSource>) -> Self {
        info!("Creating FailoverClient");
        Self {
            registry,
            credentials,
            transport: ChatCompletions::default(),
            timeout: DEFAULT_TIMEOUT,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }

    /// Per-attempt timeout used when the request does not carry one.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pauses between whole-sequence retries. Empty disables retrying.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// One pass over the provider's keys, in order.
    async fn try_credentials(
        &self,
        provider: ProviderKind,
        model: &str,
        messages: &[ChatMessage],
        timeout: Duration,
    ) -> std::result::Result<String, LlmError> {
        let keys = self.credentials.api_keys(provider.as_str());
        if keys.is_empty() {
            return Err(LlmError::new(
                ErrorCode::ApiKeyMissing,
                format!("no API keys configured for {provider}"),
            )
            .with_provider(provider.as_str()));
        }

        let base_url = self.registry.base_url(provider);
        let mut last_failure = None;
        for (index, key) in keys.iter().enumerate() {
            match self
                .transport
                .send(base_url, key, model, messages, timeout)
                .await
            {
                Ok(reply) => {
                    if index > 0 {
                        info!("{provider} answered with key #{index} after failover");
                    }
                    return Ok(reply);
                }
                Err(AttemptError::Abort(e)) => {
                    error!("{provider} rejected request with key #{index}: {e}");
                    return Err(e.with_provider(provider.as_str()).with_key_index(index));
                }
                Err(AttemptError::NextKey(e)) => {
                    warn!("{provider} key #{index} of {} failed: {e}", keys.len());
                    last_failure = Some(e.with_provider(provider.as_str()).with_key_index(index));
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            LlmError::new(ErrorCode::LlmApiError, "no key produced a reply")
                .with_provider(provider.as_str())
        }))
    }
}

/// Timeouts and configuration problems are not retried as a whole.
const fn retry_whole_sequence(error: &LlmError) -> bool {
    matches!(error.code, ErrorCode::LlmApiError)
}

fn validate(request: &ReplyRequest) -> Result<()> {
    if request.model.trim().is_empty() {
        return Err(Error::validation("model is required"));
    }
    if request.system_prompt.trim().is_empty() {
        return Err(Error::validation("system prompt is required"));
    }
    Ok(())
}

#[async_trait]
impl LLMClient for FailoverClient {
    async fn generate_reply(&self, request: &ReplyRequest) -> Result<String> {
        validate(request)?;
        let provider = self
            .registry
            .resolve(request.provider.as_deref(), &request.model)?;
        let messages = request.context.to_turns(&request.system_prompt);
        let timeout = request.timeout.unwrap_or(self.timeout);

        info!(
            "Generating reply: provider={}, model={}, turns={}",
            provider,
            request.model,
            messages.len()
        );

        let reply = retry_with_backoff(
            || self.try_credentials(provider, &request.model, &messages, timeout),
            &self.retry_delays,
            retry_whole_sequence,
        )
        .await?;

        info!("Received reply from {provider} ({} chars)", char_len(&reply));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCredentials;
    use persona_core::{ContextInput, Role};

    fn request(model: &str, provider: Option<&str>) -> ReplyRequest {
        ReplyRequest {
            model: model.to_string(),
            provider: provider.map(ToString::to_string),
            system_prompt: "Be brief.".to_string(),
            context: ContextInput::Turns(vec![ChatMessage::new(Role::User, "hi")]),
            timeout: None,
        }
    }

    fn client() -> FailoverClient {
        FailoverClient::new(ProviderRegistry::new(), Arc::new(StaticCredentials::new()))
            .with_retry_delays(Vec::new())
    }

    async fn code_of(request: &ReplyRequest) -> Option<ErrorCode> {
        client().generate_reply(request).await.err().map(|e| e.code())
    }

    #[tokio::test]
    async fn blank_model_or_prompt_is_a_validation_error() {
        assert_eq!(
            code_of(&request("  ", None)).await,
            Some(ErrorCode::ValidationError)
        );

        let mut no_prompt = request("gpt-4o", None);
        no_prompt.system_prompt = String::new();
        assert_eq!(code_of(&no_prompt).await, Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn provider_resolution_errors_surface() {
        assert_eq!(
            code_of(&request("gpt-4o", Some("acme"))).await,
            Some(ErrorCode::InvalidProvider)
        );
        assert_eq!(
            code_of(&request("house-model", None)).await,
            Some(ErrorCode::ProviderRequired)
        );
    }

    #[tokio::test]
    async fn missing_keys_fail_before_any_request() {
        assert_eq!(
            code_of(&request("deepseek-chat", None)).await,
            Some(ErrorCode::ApiKeyMissing)
        );
    }

    #[test]
    fn only_api_errors_retry_the_sequence() {
        let api = LlmError::new(ErrorCode::LlmApiError, "boom");
        let timeout = LlmError::new(ErrorCode::LlmApiTimeout, "slow");
        let missing = LlmError::new(ErrorCode::ApiKeyMissing, "none");
        assert!(retry_whole_sequence(&api));
        assert!(!retry_whole_sequence(&timeout));
        assert!(!retry_whole_sequence(&missing));
    }
}
