#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{ArgGroup, Parser, Subcommand};
use command::{
    AgentsStrategy, ChatInput, ChatStrategy, CommandStrategy, HistoryInput, HistoryStrategy,
    InitStrategy, SendInput, SendStrategy, SessionsInput, SessionsStrategy, VersionStrategy,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "persona")]
#[command(about = "Persistent conversations with AI personas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Send one message and print the reply
    Send {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        agent: String,

        #[arg(short, long)]
        message: String,

        /// Recent messages given to the model
        #[arg(short = 'c', long)]
        context_limit: Option<usize>,
    },
    /// Talk to an agent interactively
    Chat {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        agent: String,
    },
    /// Show the conversation between a user and an agent
    History {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        agent: String,

        /// Only show the last N messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// List sessions of a user or an agent
    #[command(group(ArgGroup::new("owner").required(true).args(["user", "agent"])))]
    Sessions {
        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long)]
        agent: Option<String>,
    },
    /// List configured agents
    Agents,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Send {
            user,
            agent,
            message,
            context_limit,
        } => {
            SendStrategy
                .execute(SendInput {
                    user,
                    agent,
                    message,
                    context_limit,
                })
                .await
        }
        Commands::Chat { user, agent } => ChatStrategy.execute(ChatInput { user, agent }).await,
        Commands::History { user, agent, limit } => {
            HistoryStrategy
                .execute(HistoryInput { user, agent, limit })
                .await
        }
        Commands::Sessions { user, agent } => {
            let input = match (user, agent) {
                (Some(user), _) => SessionsInput::User(user),
                (None, Some(agent)) => SessionsInput::Agent(agent),
                (None, None) => anyhow::bail!("either --user or --agent is required"),
            };
            SessionsStrategy.execute(input).await
        }
        Commands::Agents => AgentsStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
