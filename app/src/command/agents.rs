use persona_config::{Config, ConfiguredAgents};
use persona_core::CredentialSource;

/// Strategy for listing configured agents and where their replies come from.
#[derive(Debug, Clone, Copy)]
pub struct AgentsStrategy;

impl super::CommandStrategy for AgentsStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let registry = config.provider_registry();
        let agents = ConfiguredAgents::new(config.agents.clone());

        if agents.list().is_empty() {
            println!("No agents configured. Add some under \"agents\" in the config file.");
            return Ok(());
        }

        for agent in agents.list() {
            let route = match registry.resolve(agent.provider.as_deref(), &agent.model) {
                Ok(kind) => {
                    let keys = config.api_keys(kind.as_str()).len();
                    format!("{kind}, {keys} key(s)")
                }
                Err(e) => e.code.to_string(),
            };
            println!(
                "{:<16} {:<24} {:<28} {}",
                agent.id,
                agent.name.as_deref().unwrap_or("-"),
                agent.model,
                route
            );
        }
        Ok(())
    }
}
