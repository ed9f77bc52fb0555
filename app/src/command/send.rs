//! One-shot message: send, wait for the reply, print it.

use persona_conversation::SendMessage;
use tracing::info;

use super::{await_reply, init_runtime};

#[derive(Debug, Clone)]
pub struct SendInput {
    pub user: String,
    pub agent: String,
    pub message: String,
    pub context_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct SendStrategy;

impl super::CommandStrategy for SendStrategy {
    type Input = SendInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime().await?;

        let mut message = SendMessage::new(input.user, input.agent, input.message);
        if let Some(limit) = input.context_limit {
            message = message.with_context_limit(limit);
        }

        let receipt = runtime.service.send_message(message).await?;
        info!(
            "Message {} logged in session {}",
            receipt.user_event_id, receipt.session_id
        );

        match await_reply(&runtime.service, &receipt).await? {
            Some(reply) => println!("{}", reply.content),
            None => eprintln!("No reply yet; check `persona history` later."),
        }

        runtime.service.shutdown().await;
        Ok(())
    }
}
