//! Embedding models.
//!
//! A provider turns text into a fixed-dimension vector. The same provider
//! (by [`EmbeddingProvider::identifier`]) must be used to build an index and
//! to query it.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crate::types::Fragment;
use futures::stream::{self, StreamExt};
use safedrop_core::{AppError, AppResult};
use std::sync::Arc;

/// Embed fragments in batches, several batches in flight at once.
///
/// Batches may finish in any order; the returned vectors are in fragment
/// order regardless.
pub async fn embed_fragments(
    provider: Arc<dyn EmbeddingProvider>,
    fragments: &[Fragment],
    batch_size: usize,
    concurrency: usize,
    on_batch: impl Fn(usize),
) -> AppResult<Vec<Vec<f32>>> {
    if fragments.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.max(1);
    let batches: Vec<(usize, Vec<String>)> = fragments
        .chunks(batch_size)
        .map(|batch| batch.iter().map(|f| f.text.clone()).collect::<Vec<String>>())
        .enumerate()
        .collect();

    tracing::info!(
        "Embedding {} fragments in {} batches using {}",
        fragments.len(),
        batches.len(),
        provider.identifier()
    );

    let mut completed: Vec<(usize, Vec<Vec<f32>>)> = Vec::with_capacity(batches.len());
    let mut results = stream::iter(batches)
        .map(|(idx, texts)| {
            let provider = Arc::clone(&provider);
            async move { provider.embed_batch(&texts).await.map(|vectors| (idx, vectors)) }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some(result) = results.next().await {
        let (idx, vectors) = result?;
        completed.push((idx, vectors));
        on_batch(completed.len());
    }

    completed.sort_by_key(|(idx, _)| *idx);
    let embeddings: Vec<Vec<f32>> = completed.into_iter().flat_map(|(_, v)| v).collect();

    if embeddings.len() != fragments.len() {
        return Err(AppError::Knowledge(format!(
            "Embedding count mismatch: {} fragments, {} vectors",
            fragments.len(),
            embeddings.len()
        )));
    }

    let dims = provider.dimensions();
    if let Some(bad) = embeddings.iter().find(|v| v.len() != dims) {
        return Err(AppError::Knowledge(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            dims,
            bad.len()
        )));
    }

    Ok(embeddings)
}
