//! LLM provider factory.
//!
//! Resolves the configured backend once, at startup, into a trait object.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use safedrop_core::{AppError, AppResult, LlmSettings};
use std::sync::Arc;

/// Create an LLM client from the `llm:` configuration section.
///
/// # Arguments
/// * `settings` - Provider, model and optional endpoint
/// * `api_key` - API key for remote backends, already resolved from the environment
///
/// # Errors
/// `AppError::Config` if the provider is unknown or a required key is missing.
pub fn create_client(
    settings: &LlmSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown provider: {}. Supported: ollama, openai",
            settings.provider
        ))
    })?;

    let endpoint = settings
        .endpoint
        .as_deref()
        .unwrap_or(provider.default_endpoint());

    tracing::debug!(provider = %provider, endpoint, model = %settings.model, "Creating LLM client");

    match provider {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_base_url(endpoint))),
        ProviderType::OpenAI => {
            let key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI provider requires an API key (set {})",
                    settings.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
                ))
            })?;
            Ok(Arc::new(OpenAiClient::new(endpoint, key)))
        }
    }
}
