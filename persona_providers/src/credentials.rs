use persona_core::CredentialSource;
use std::collections::HashMap;

/// Fixed key lists, keyed by provider name.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, Vec<String>>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_keys<I, S>(mut self, provider: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.insert(
            provider.to_ascii_lowercase(),
            keys.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn api_keys(&self, provider: &str) -> Vec<String> {
        self.keys
            .get(&provider.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}
