use persona_core::CredentialSource;
use persona_core::util::{DEFAULT_CONTEXT_LIMIT, split_key_list};
use persona_core::AgentProfile;
use persona_providers::{ProviderKind, ProviderRegistry};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Credentials and endpoints, keyed by lowercase provider name.
    #[serde(default, deserialize_with = "lowercase_provider_names")]
    pub providers: BTreeMap<String, ProviderConfig>,
    /// Explicit model -> provider routing.
    #[serde(default)]
    pub models: BTreeMap<String, String>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
}

fn lowercase_provider_names<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, ProviderConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, ProviderConfig>::deserialize(deserializer)?;
    let mut providers = BTreeMap::new();
    for (name, provider) in raw {
        let key = name.trim().to_ascii_lowercase();
        if providers.contains_key(&key) {
            warn!("Provider '{}' is configured more than once; using the '{}' entry", key, name);
        }
        providers.insert(key, provider);
    }
    Ok(providers)
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProviderConfig {
    /// Comma-separated; list order is attempt order.
    #[serde(default)]
    pub api_keys: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "LlmConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "LlmConfig::default_retry_delays_secs")]
    pub retry_delays_secs: Vec<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            retry_delays_secs: Self::default_retry_delays_secs(),
        }
    }
}

impl LlmConfig {
    const fn default_timeout_secs() -> u64 {
        30
    }

    fn default_retry_delays_secs() -> Vec<u64> {
        vec![1, 2]
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .map(|secs| Duration::from_secs(*secs))
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

impl DatabaseConfig {
    fn default_url() -> String {
        dirs::home_dir().map_or_else(
            || "sqlite://persona.db?mode=rwc".to_string(),
            |home| {
                format!(
                    "sqlite://{}?mode=rwc",
                    home.join("persona").join("persona.db").display()
                )
            },
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationSettings {
    #[serde(default = "ConversationSettings::default_context_limit")]
    pub context_limit: usize,
    /// Reply workers; replies of one session always share a worker.
    #[serde(default = "ConversationSettings::default_workers")]
    pub workers: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            context_limit: Self::default_context_limit(),
            workers: Self::default_workers(),
        }
    }
}

impl ConversationSettings {
    const fn default_context_limit() -> usize {
        DEFAULT_CONTEXT_LIMIT
    }

    const fn default_workers() -> usize {
        4
    }
}

pub const CONFIG_TEMPLATE: &str = r#"{
  "providers": {
    "openai": {
      "api_keys": "sk-first-key,sk-second-key"
    },
    "deepseek": {
      "api_keys": "your-deepseek-api-key-here"
    }
  },
  "models": {},
  "llm": {
    "timeout_secs": 30,
    "retry_delays_secs": [1, 2]
  },
  "conversation": {
    "context_limit": 20,
    "workers": 4
  },
  "agents": [
    {
      "id": "sage",
      "name": "Sage",
      "model": "gpt-4o-mini",
      "system_prompt": "You are Sage, a calm and thoughtful companion. Keep answers short and kind."
    }
  ]
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("persona"))
    }

    /// Load `~/persona/config.json`, then apply `PERSONA_<PROVIDER>_API_KEYS`.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'persona init' to create config.",
                config_path.display()
            );
        }

        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace provider key lists with `PERSONA_<PROVIDER>_API_KEYS` when set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for kind in ProviderKind::ALL {
            let var = format!("PERSONA_{}_API_KEYS", kind.as_str().to_ascii_uppercase());
            if let Some(keys) = lookup(&var).filter(|v| !v.trim().is_empty()) {
                info!("Using {} keys from {}", kind, var);
                self.providers
                    .entry(kind.as_str().to_string())
                    .or_default()
                    .api_keys = keys;
            }
        }
    }

    /// Provider registry with this config's model routes and base URLs.
    #[must_use]
    pub fn provider_registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for (name, provider) in &self.providers {
            let Some(base_url) = provider.base_url.as_deref() else {
                continue;
            };
            match name.parse::<ProviderKind>() {
                Ok(kind) => registry = registry.with_base_url(kind, base_url),
                Err(_) => warn!("Ignoring base_url for unknown provider '{}'", name),
            }
        }
        for (model, provider) in &self.models {
            registry = registry.with_model_override(model, provider);
        }
        registry
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your provider API keys");
        println!("   2. Define the agents you want to talk to");
        println!("   3. Run 'persona chat --user <you> --agent sage' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - providers.<name>.api_keys: comma-separated keys, tried in order");
        println!("   - models: route a model name to a specific provider");
        println!("   - database.url: defaults to a SQLite file under ~/persona");
        println!("   - conversation.context_limit: recent messages sent to the model");
        println!();
        Ok(())
    }
}

impl CredentialSource for Config {
    fn api_keys(&self, provider: &str) -> Vec<String> {
        self.providers
            .get(&provider.to_ascii_lowercase())
            .map(|p| split_key_list(&p.api_keys))
            .unwrap_or_default()
    }
}
