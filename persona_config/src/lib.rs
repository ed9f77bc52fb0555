//! JSON configuration for the persona binary.

mod agents;
mod schema;

pub use agents::ConfiguredAgents;
pub use schema::{
    CONFIG_TEMPLATE, Config, ConversationSettings, DatabaseConfig, LlmConfig, ProviderConfig,
};
