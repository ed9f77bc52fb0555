use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generation settings of an AI persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    /// Explicit provider; resolved from the model when absent.
    #[serde(default)]
    pub provider: Option<String>,
    pub system_prompt: String,
}

/// Read-only agent lookup.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn get_agent_by_id(&self, id: &str) -> anyhow::Result<Option<AgentProfile>>;
}
