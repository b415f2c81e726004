//! SafeDrop Core Library
//!
//! Foundational utilities shared by every SafeDrop crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingSettings, LlmSettings, MergePolicy, RagSettings};
pub use error::{AppError, AppResult};
