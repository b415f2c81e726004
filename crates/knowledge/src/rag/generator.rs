//! Answer generation through the configured language model.

use safedrop_core::{AppError, AppResult};
use safedrop_llm::{LlmClient, LlmRequest};
use safedrop_prompt::AssembledPrompt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default upper bound on one generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Sends assembled prompts to a language model backend.
///
/// Makes exactly one backend call per question. Failures are returned to the
/// caller unchanged; retrying is the caller's decision.
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Generate an answer. The text is returned as produced, minus
    /// surrounding whitespace; an empty answer is valid.
    ///
    /// # Errors
    /// - `GenerationBackendUnavailable` if the backend cannot be reached
    /// - `GenerationTimeout` if no answer arrives within the timeout
    pub async fn generate(&self, prompt: &AssembledPrompt) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt.text.clone(), self.model.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let started = Instant::now();
        let response = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| AppError::GenerationTimeout(self.timeout))??;

        tracing::info!(
            provider = self.client.provider_name(),
            model = %response.model,
            completion_tokens = response.usage.completion_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated answer"
        );

        Ok(response.content.trim().to_string())
    }
}
