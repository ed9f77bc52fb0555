use super::{init_runtime, print_event};

#[derive(Debug, Clone)]
pub struct HistoryInput {
    pub user: String,
    pub agent: String,
    pub limit: Option<usize>,
}

/// Strategy for printing the log of one user/agent conversation.
#[derive(Debug, Clone, Copy)]
pub struct HistoryStrategy;

impl super::CommandStrategy for HistoryStrategy {
    type Input = HistoryInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = init_runtime().await?;

        let Some(history) = runtime
            .service
            .history_by_user_and_agent(&input.user, &input.agent)
            .await?
        else {
            println!(
                "No conversation between {} and {} yet.",
                input.user, input.agent
            );
            return Ok(());
        };

        println!("=== Session {} ===", history.session.id);
        let skip = input
            .limit
            .map_or(0, |limit| history.events.len().saturating_sub(limit));
        for event in history.events.iter().skip(skip) {
            print_event(event);
        }

        let stats = history.stats();
        println!();
        println!(
            "{} messages ({} from {}, {} from {}), ~{} tokens",
            stats.total_messages,
            stats.user_messages,
            input.user,
            stats.assistant_messages,
            input.agent,
            stats.estimated_tokens
        );

        runtime.service.shutdown().await;
        Ok(())
    }
}
