//! Known providers and model -> provider resolution.

use persona_core::{ErrorCode, LlmError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// OpenAI-compatible chat-completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    OpenRouter,
    Groq,
    Mistral,
    Zhipu,
}

impl ProviderKind {
    pub const ALL: [Self; 6] = [
        Self::OpenAi,
        Self::DeepSeek,
        Self::OpenRouter,
        Self::Groq,
        Self::Mistral,
        Self::Zhipu,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::OpenRouter => "openrouter",
            Self::Groq => "groq",
            Self::Mistral => "mistral",
            Self::Zhipu => "zhipu",
        }
    }

    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
        }
    }

    /// Provider implied by a model name, if any.
    #[must_use]
    pub fn infer(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        if model.contains('/') {
            return Some(Self::OpenRouter);
        }
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| model.starts_with(p));
        if starts(&["gpt-", "o1", "o3", "o4", "chatgpt-"]) {
            Some(Self::OpenAi)
        } else if starts(&["deepseek-"]) {
            Some(Self::DeepSeek)
        } else if starts(&["glm-"]) {
            Some(Self::Zhipu)
        } else if starts(&["mistral-", "codestral", "open-mistral", "ministral"]) {
            Some(Self::Mistral)
        } else if starts(&["llama", "mixtral", "gemma"]) {
            Some(Self::Groq)
        } else {
            None
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                LlmError::new(ErrorCode::InvalidProvider, format!("unknown provider '{s}'"))
                    .with_provider(s)
            })
    }
}

/// Model overrides and base URLs for every provider.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    model_overrides: HashMap<String, String>,
    base_urls: HashMap<ProviderKind, String>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            model_overrides: HashMap::new(),
            base_urls: ProviderKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.default_base_url().to_string()))
                .collect(),
        }
    }

    /// Route `model` to `provider` regardless of its name.
    #[must_use]
    pub fn with_model_override(
        mut self,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        self.model_overrides.insert(model.into(), provider.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, kind: ProviderKind, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(kind, base_url.into());
        self
    }

    #[must_use]
    pub fn base_url(&self, kind: ProviderKind) -> &str {
        self.base_urls
            .get(&kind)
            .map_or_else(|| kind.default_base_url(), String::as_str)
    }

    /// Resolve the provider for a call.
    ///
    /// An explicit provider wins and must be known. Otherwise the model's
    /// override, then its name prefix, decide.
    pub fn resolve(&self, explicit: Option<&str>, model: &str) -> Result<ProviderKind, LlmError> {
        if let Some(name) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
            return name.parse();
        }
        if let Some(name) = self.model_overrides.get(model) {
            return name.parse();
        }
        ProviderKind::infer(model).ok_or_else(|| {
            LlmError::new(
                ErrorCode::ProviderRequired,
                format!("no provider given and none known for model '{model}'"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_provider_from_model_prefix() {
        assert_eq!(ProviderKind::infer("gpt-4o-mini"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::infer("o3-mini"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::infer("deepseek-chat"), Some(ProviderKind::DeepSeek));
        assert_eq!(ProviderKind::infer("glm-4-flash"), Some(ProviderKind::Zhipu));
        assert_eq!(ProviderKind::infer("mistral-large-latest"), Some(ProviderKind::Mistral));
        assert_eq!(ProviderKind::infer("llama-3.1-8b-instant"), Some(ProviderKind::Groq));
        assert_eq!(
            ProviderKind::infer("anthropic/claude-3.5-sonnet"),
            Some(ProviderKind::OpenRouter)
        );
        assert_eq!(ProviderKind::infer("mystery-model"), None);
    }

    #[test]
    fn explicit_provider_wins() {
        let registry = ProviderRegistry::new();
        assert_eq!(
            registry.resolve(Some("groq"), "gpt-4o"),
            Ok(ProviderKind::Groq)
        );
    }

    #[test]
    fn unknown_explicit_provider_is_invalid() {
        let registry = ProviderRegistry::new();
        let err = registry.resolve(Some("acme"), "gpt-4o").err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::InvalidProvider));
    }

    #[test]
    fn unresolvable_model_requires_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.resolve(None, "mystery-model").err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::ProviderRequired));

        let err = registry.resolve(Some("  "), "mystery-model").err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::ProviderRequired));
    }

    #[test]
    fn model_override_beats_prefix() {
        let registry = ProviderRegistry::new().with_model_override("gpt-4o", "openrouter");
        assert_eq!(registry.resolve(None, "gpt-4o"), Ok(ProviderKind::OpenRouter));

        let broken = ProviderRegistry::new().with_model_override("house-model", "nowhere");
        let err = broken.resolve(None, "house-model").err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::InvalidProvider));
    }

    #[test]
    fn base_url_can_be_overridden() {
        let registry =
            ProviderRegistry::new().with_base_url(ProviderKind::DeepSeek, "http://localhost:9999");
        assert_eq!(registry.base_url(ProviderKind::DeepSeek), "http://localhost:9999");
        assert_eq!(
            registry.base_url(ProviderKind::OpenAi),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!(" zhipu ".parse::<ProviderKind>(), Ok(ProviderKind::Zhipu));
    }
}
