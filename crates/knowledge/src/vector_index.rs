//! Vector index abstraction.
//!
//! Query-time view of an index: read-only, shareable across threads.

use crate::types::RetrievalHit;
use safedrop_core::AppResult;
use std::path::Path;

/// Trait for vector index backends.
pub trait VectorIndex: Send + Sync {
    /// Directory the index was opened from.
    fn location(&self) -> &Path;

    /// Identifier of the embedding model the index was built with.
    fn embedding_model(&self) -> &str;

    /// Dimension of every stored vector.
    fn dimensions(&self) -> usize;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-k entries by cosine similarity, best first.
    ///
    /// `k` must be at least 1. Equal scores keep insertion order, so the
    /// result is deterministic. Returns every entry when `k` exceeds the size.
    fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<RetrievalHit>>;
}
