//! LLM integration crate for SafeDrop.
//!
//! Provider-agnostic access to the language model that writes answers.
//! Backends are selected once through [`create_client`] and used through the
//! [`LlmClient`] trait, so tests and alternative runtimes can be swapped in.
//!
//! # Providers
//! - **Ollama**: local runtime (default)
//! - **OpenAI**: any OpenAI-compatible chat completions endpoint
//!
//! # Example
//! ```no_run
//! use safedrop_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Where is my parcel?", "llama3:8b");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
