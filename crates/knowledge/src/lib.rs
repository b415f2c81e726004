//! Policy knowledge base and retrieval-augmented answering.
//!
//! Build time: [`ingest`] loads documents, the [`chunker`] splits them, an
//! [`embeddings`] provider vectorises the fragments and [`index`] persists
//! them. Query time: the [`Retriever`] finds relevant fragments and the
//! [`RagPipeline`] turns them into an [`Answer`].

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod session;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chunker::{Chunker, ChunkerConfig};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::{read_manifest, IndexManifest, SourceSummary, SqliteVectorIndex};
pub use ingest::ingest;
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use rag::{is_escalation, Answer, AnswerGenerator, Citation, RagPipeline};
pub use retriever::Retriever;
pub use session::Session;
pub use types::{
    Document, Fragment, IndexEntry, IngestOptions, IngestStats, RetrievalHit, RetrievalResult,
};
pub use vector_index::VectorIndex;

use safedrop_core::{AppConfig, AppResult};
use safedrop_llm::create_client;
use safedrop_prompt::{load_template, PromptAssembler};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Ingestion options for a workspace, reading from `source` when given and
/// the configured data directory otherwise.
pub fn ingest_options(config: &AppConfig, source: Option<PathBuf>) -> IngestOptions {
    let source_dir = source
        .map(|s| config.resolve_path(&s))
        .unwrap_or_else(|| config.data_dir());

    let mut options = IngestOptions::new(source_dir, config.index_dir());
    options.chunk_size = config.rag.chunk_size;
    options.chunk_overlap = config.rag.chunk_overlap;
    options.merge_policy = config.rag.merge_policy;
    options
}

/// Build the embedding provider named in the configuration.
pub fn embedding_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&EmbeddingConfig::from(&config.rag.embedding))
}

/// Assemble the query pipeline for a workspace: open the index, load the
/// instruction template and connect the generation backend.
///
/// # Errors
/// - `IndexNotFound` before the first ingestion
/// - `ConfigMismatch` if the index was built with another embedding model
/// - `Config` for a missing template or unusable backend settings
pub fn open_pipeline(config: &AppConfig) -> AppResult<RagPipeline> {
    let provider = embedding_provider(config)?;
    let index = SqliteVectorIndex::open(&config.index_dir(), &provider.identifier())?;
    let retriever = Retriever::new(Arc::new(index), provider)?.with_default_k(config.rag.top_k)?;

    let template = load_template(&config.template_path())?;
    let assembler = PromptAssembler::new(template)?;

    let api_key = config.resolve_api_key();
    let client = create_client(&config.llm, api_key.as_deref())?;
    let generator = AnswerGenerator::new(client, config.llm.model.clone())
        .with_timeout(Duration::from_secs(config.rag.generation_timeout_secs))
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens);

    Ok(RagPipeline::new(retriever, assembler, generator))
}
