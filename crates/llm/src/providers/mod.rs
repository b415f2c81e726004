//! Backend implementations of [`LlmClient`](crate::client::LlmClient).

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use safedrop_core::AppError;

/// Map a transport failure to the error taxonomy.
///
/// Refused or failed connections mean the runtime is not there at all.
pub(crate) fn send_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_connect() || err.is_timeout() {
        AppError::GenerationBackendUnavailable(format!("{} is not reachable: {}", provider, err))
    } else {
        AppError::Llm(format!("Failed to send request to {}: {}", provider, err))
    }
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    match status.as_u16() {
        502..=504 => AppError::GenerationBackendUnavailable(format!(
            "{} returned {}: {}",
            provider, status, body
        )),
        _ => AppError::Llm(format!("{} API error ({}): {}", provider, status, body)),
    }
}
