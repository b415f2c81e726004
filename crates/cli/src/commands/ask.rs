//! Ask command handler.

use super::{answer_json, print_answer};
use clap::Args;
use safedrop_core::{AppConfig, AppResult};

/// Answer one question from the policy index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The customer's question
    pub question: String,

    /// Number of policy fragments to retrieve (default: rag.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let pipeline = safedrop_knowledge::open_pipeline(config)?;
        let answer = pipeline.ask(&self.question, self.top_k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer_json(&answer))?);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }
}
