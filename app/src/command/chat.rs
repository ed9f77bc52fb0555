//! Interactive conversation with one agent.
//!
//! Each line is sent through the conversation service; the reply is picked up
//! by polling the session log, the same way any other client would.

use persona_conversation::SendMessage;
use std::io::Write;
use tracing::debug;

use super::{await_reply, init_runtime};

#[derive(Debug, Clone)]
pub struct ChatInput {
    pub user: String,
    pub agent: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime().await?;
        let agent_name = runtime
            .config
            .agents
            .iter()
            .find(|a| a.id == input.agent)
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| input.agent.clone());

        println!("=== Chatting with {agent_name} as {} ===", input.user);
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

        let mut turns = 0_usize;
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();

            if matches!(line, "exit" | "quit" | "q") {
                break;
            }
            if line.is_empty() {
                continue;
            }

            let receipt = match runtime
                .service
                .send_message(SendMessage::new(&input.user, &input.agent, line))
                .await
            {
                Ok(receipt) => receipt,
                Err(e) => {
                    eprintln!("Error [{}]: {e}", e.code());
                    continue;
                }
            };
            debug!("Sent {}", receipt.user_event_id);

            match await_reply(&runtime.service, &receipt).await? {
                Some(reply) => println!("\n{agent_name}: {}\n", reply.content),
                None => println!("\n({agent_name} has not answered yet)\n"),
            }
            turns += 1;
        }

        println!("\nSession ended. Messages sent: {turns}");
        runtime.service.shutdown().await;
        Ok(())
    }
}
