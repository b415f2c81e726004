//! Chat command handler: a line-oriented question loop.

use super::print_answer;
use clap::Args;
use safedrop_core::{AppConfig, AppError, AppResult};
use safedrop_knowledge::Session;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Answer questions read line by line from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of policy fragments to retrieve per question (default: rag.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = safedrop_knowledge::open_pipeline(config)?;
        let mut session = Session::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        eprintln!("Ask a question about SafeDrop policies (empty line or \"exit\" to quit).");
        loop {
            eprint!("> ");
            std::io::stderr().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() || question == "exit" || question == "quit" {
                break;
            }

            match pipeline.ask_in_session(&mut session, question, self.top_k).await {
                Ok(answer) => print_answer(&answer),
                // The index is unusable; later questions would fail the same way.
                Err(e @ (AppError::EmptyIndex(_) | AppError::ConfigMismatch { .. })) => {
                    return Err(e)
                }
                Err(e) => {
                    tracing::warn!("Question failed: {}", e);
                    eprintln!("error: {}", e);
                    if let Some(fix) = e.remediation() {
                        eprintln!("hint: {}", fix);
                    }
                }
            }
            println!();
        }

        println!(
            "Questions answered: {}, escalated: {}",
            session.answered_count(),
            session.escalated_count()
        );

        Ok(())
    }
}
