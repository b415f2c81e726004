//! Question answering: retrieve, assemble, generate, classify.

use super::escalation::is_escalation;
use super::generator::AnswerGenerator;
use super::types::Answer;
use crate::retriever::Retriever;
use crate::session::Session;
use safedrop_core::{AppError, AppResult};
use safedrop_prompt::{ContextBlock, PromptAssembler};
use tracing::{info, instrument};

/// The query-time pipeline. Holds no per-question state, so one instance
/// can serve any number of questions and sessions.
pub struct RagPipeline {
    retriever: Retriever,
    assembler: PromptAssembler,
    generator: AnswerGenerator,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, assembler: PromptAssembler, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            assembler,
            generator,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one question. `k` falls back to the retriever's default.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank question or `k == 0`
    /// - `EmptyIndex` when nothing has been ingested
    /// - `GenerationBackendUnavailable` / `GenerationTimeout` from the model
    #[instrument(skip(self), fields(provider = self.generator.provider_name(), model = self.generator.model()))]
    pub async fn ask(&self, question: &str, k: Option<usize>) -> AppResult<Answer> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput("question is empty".to_string()));
        }

        let retrieval = self.retriever.retrieve(question, k).await?;

        let blocks: Vec<ContextBlock> = retrieval
            .iter()
            .map(|hit| ContextBlock::new(&hit.fragment.source, hit.fragment.page, &hit.fragment.text))
            .collect();
        let prompt = self.assembler.assemble(&blocks, question)?;

        let text = self.generator.generate(&prompt).await?;
        let is_escalated = is_escalation(&text);

        info!(
            fragments = retrieval.len(),
            escalated = is_escalated,
            "Answered question"
        );

        Ok(Answer {
            question: question.to_string(),
            text,
            retrieval,
            is_escalated,
        })
    }

    /// Answer and record the turn. A failed question leaves the session untouched.
    pub async fn ask_in_session(
        &self,
        session: &mut Session,
        question: &str,
        k: Option<usize>,
    ) -> AppResult<Answer> {
        let answer = self.ask(question, k).await?;
        session.record(answer.clone());
        Ok(answer)
    }
}
