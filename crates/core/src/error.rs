//! Error types for SafeDrop.
//!
//! One enum covers the whole workspace. Variants mirror the failure classes a
//! caller has to react to differently: configuration problems are fatal and
//! carry remediation text, index problems mean "run ingestion first", and the
//! two generation variants are the only ones worth retrying.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Unified error type for SafeDrop.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (template, chunk parameters, provider).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The index was built with a different embedding model than the one in use.
    #[error(
        "Embedding model mismatch: index was built with '{index_model}', but '{requested_model}' is configured"
    )]
    ConfigMismatch {
        index_model: String,
        requested_model: String,
    },

    /// No persisted index at the given location.
    #[error("No index found at {0:?}")]
    IndexNotFound(PathBuf),

    /// The index exists but holds zero entries.
    #[error("Index at {0:?} contains no entries")]
    EmptyIndex(PathBuf),

    /// Ingestion discovered no loadable documents.
    #[error("No supported documents found under {0:?}")]
    NoDocuments(PathBuf),

    /// A caller-supplied argument is out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The language model runtime could not be reached.
    #[error("Generation backend unavailable: {0}")]
    GenerationBackendUnavailable(String),

    /// The language model did not answer within the configured budget.
    #[error("Generation timed out after {}s", .0.as_secs_f64())]
    GenerationTimeout(Duration),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors other than availability
    #[error("LLM error: {0}")]
    Llm(String),

    /// Indexing, embedding and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt assembly errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// User-facing remediation for errors the user can fix themselves.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            AppError::Config(_) => Some(
                "Check .safedrop/config.yaml and make sure the instruction template exists \
                 (default: prompts/policy_aware.txt).",
            ),
            AppError::ConfigMismatch { .. } => Some(
                "Rebuild the index with the current embedding model: safedrop ingest --merge replace",
            ),
            AppError::IndexNotFound(_) | AppError::EmptyIndex(_) => {
                Some("Run ingestion first: safedrop ingest --source <dir>")
            }
            AppError::NoDocuments(_) => {
                Some("Add .txt, .md or .pdf policy documents to the source directory.")
            }
            AppError::GenerationBackendUnavailable(_) => Some(
                "Make sure the model runtime is running (e.g. `ollama serve` and `ollama pull llama3`), then retry.",
            ),
            AppError::GenerationTimeout(_) => Some(
                "The model is slow to respond; retry the question or raise rag.generationTimeoutSecs.",
            ),
            _ => None,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::GenerationBackendUnavailable(_) | AppError::GenerationTimeout(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
