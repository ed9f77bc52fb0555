use chrono::Local;

use super::init_runtime;

#[derive(Debug, Clone)]
pub enum SessionsInput {
    User(String),
    Agent(String),
}

/// Strategy for listing sessions, most recently active first.
#[derive(Debug, Clone, Copy)]
pub struct SessionsStrategy;

impl super::CommandStrategy for SessionsStrategy {
    type Input = SessionsInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime().await?;

        let sessions = match &input {
            SessionsInput::User(id) => runtime.service.sessions_by_user(id).await?,
            SessionsInput::Agent(id) => runtime.service.sessions_by_agent(id).await?,
        };

        if sessions.is_empty() {
            println!("No sessions found.");
        }
        for session in &sessions {
            let participants = session
                .participants
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{}  [{}]  last active {}",
                session.id,
                participants,
                session
                    .last_active_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
            );
        }

        runtime.service.shutdown().await;
        Ok(())
    }
}
