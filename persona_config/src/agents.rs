use async_trait::async_trait;
use persona_core::{AgentDirectory, AgentProfile};
use std::collections::HashMap;
use tracing::warn;

/// Agents declared in the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredAgents {
    agents: HashMap<String, AgentProfile>,
}

impl ConfiguredAgents {
    /// Later entries with a duplicate id replace earlier ones.
    #[must_use]
    pub fn new(profiles: impl IntoIterator<Item = AgentProfile>) -> Self {
        let mut agents = HashMap::new();
        for profile in profiles {
            if let Some(previous) = agents.insert(profile.id.clone(), profile) {
                warn!("Agent '{}' is defined more than once", previous.id);
            }
        }
        Self { agents }
    }

    /// Profiles sorted by id.
    #[must_use]
    pub fn list(&self) -> Vec<&AgentProfile> {
        let mut profiles: Vec<&AgentProfile> = self.agents.values().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }
}

#[async_trait]
impl AgentDirectory for ConfiguredAgents {
    async fn get_agent_by_id(&self, id: &str) -> anyhow::Result<Option<AgentProfile>> {
        Ok(self.agents.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, model: &str) -> AgentProfile {
        AgentProfile {
            id: id.to_string(),
            name: None,
            model: model.to_string(),
            provider: None,
            system_prompt: format!("You are {id}."),
        }
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn looks_up_agents_by_id() {
        let agents = ConfiguredAgents::new([profile("sage", "gpt-4o"), profile("muse", "glm-4")]);

        let sage = agents
            .get_agent_by_id("sage")
            .await
            .expect("lookup")
            .expect("sage exists");
        assert_eq!(sage.model, "gpt-4o");
        assert!(agents.get_agent_by_id("ghost").await.expect("lookup").is_none());

        let ids: Vec<&str> = agents.list().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["muse", "sage"]);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn duplicate_ids_keep_the_last_definition() {
        let agents = ConfiguredAgents::new([profile("sage", "gpt-4o"), profile("sage", "glm-4")]);
        let sage = agents
            .get_agent_by_id("sage")
            .await
            .expect("lookup")
            .expect("sage exists");
        assert_eq!(sage.model, "glm-4");
        assert_eq!(agents.list().len(), 1);
    }
}
