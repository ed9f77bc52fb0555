//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use chrono::Local;
use persona_config::{Config, ConfiguredAgents};
use persona_conversation::{ConversationConfig, ConversationService, SendReceipt};
use persona_core::{Event, ParticipantType};
use persona_ledger::EventLedger;
use persona_providers::FailoverClient;
use persona_session::SessionDirectory;
use persona_store::DatabaseStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

mod agents;
mod chat;
mod history;
mod init;
mod send;
mod sessions;
mod version;

pub use agents::AgentsStrategy;
pub use chat::{ChatInput, ChatStrategy};
pub use history::{HistoryInput, HistoryStrategy};
pub use init::InitStrategy;
pub use send::{SendInput, SendStrategy};
pub use sessions::{SessionsInput, SessionsStrategy};
pub use version::VersionStrategy;

/// Longest time a command waits for a reply to show up in the log.
const REPLY_WAIT: Duration = Duration::from_secs(180);
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Events re-read on each poll; the reply is among the newest.
const POLL_WINDOW: usize = 4;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Components shared by the commands that talk to the conversation service.
pub struct Runtime {
    pub config: Config,
    pub service: ConversationService,
}

pub async fn init_runtime() -> anyhow::Result<Runtime> {
    let config = Config::load()?;
    Config::ensure_config_dir()?;

    let store = Arc::new(DatabaseStore::connect(&config.database.url).await?);
    info!("Database ready at {}", config.database.url);

    let client = FailoverClient::new(config.provider_registry(), Arc::new(config.clone()))
        .with_timeout(config.llm.timeout())
        .with_retry_delays(config.llm.retry_delays());

    let service = ConversationService::new(
        SessionDirectory::new(store.clone()),
        Arc::new(EventLedger::new(store.clone(), store)),
        Arc::new(ConfiguredAgents::new(config.agents.clone())),
        Arc::new(client),
        ConversationConfig::default()
            .with_context_limit(config.conversation.context_limit)
            .with_workers(config.conversation.workers),
    );

    Ok(Runtime { config, service })
}

/// Poll the session log until the agent's answer to `receipt` appears.
pub async fn await_reply(
    service: &ConversationService,
    receipt: &SendReceipt,
) -> anyhow::Result<Option<Event>> {
    let deadline = Instant::now() + REPLY_WAIT;
    loop {
        let recent = service
            .recent_events(&receipt.session_id, POLL_WINDOW)
            .await?;
        if let Some(reply) = recent
            .into_iter()
            .find(|e| e.from_type == ParticipantType::Agent && e.timestamp > receipt.timestamp)
        {
            return Ok(Some(reply));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

pub fn print_event(event: &Event) {
    println!(
        "[{}] {}: {}",
        event
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S"),
        event.from_id,
        event.content
    );
}
