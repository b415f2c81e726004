//! Query-time retrieval: embed the question, search the index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use safedrop_core::{AppError, AppResult};
use std::sync::Arc;

/// Number of fragments retrieved when the caller does not say.
pub const DEFAULT_TOP_K: usize = 3;

/// Finds the fragments most similar to a question.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    default_k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index", &self.index.location())
            .field("provider", &self.provider.identifier())
            .field("default_k", &self.default_k)
            .finish()
    }
}

impl Retriever {
    /// Pair an index with the embedding provider used to query it.
    ///
    /// # Errors
    /// `ConfigMismatch` if the provider is not the one the index was built with.
    pub fn new(index: Arc<dyn VectorIndex>, provider: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let requested = provider.identifier();
        if requested != index.embedding_model()
            || (!index.is_empty() && provider.dimensions() != index.dimensions())
        {
            return Err(AppError::ConfigMismatch {
                index_model: format!("{} ({}d)", index.embedding_model(), index.dimensions()),
                requested_model: format!("{} ({}d)", requested, provider.dimensions()),
            });
        }

        Ok(Self {
            index,
            provider,
            default_k: DEFAULT_TOP_K,
        })
    }

    /// Set the k used when [`retrieve`](Self::retrieve) gets `None`.
    pub fn with_default_k(mut self, k: usize) -> AppResult<Self> {
        if k == 0 {
            return Err(AppError::InvalidInput("k must be at least 1".to_string()));
        }
        self.default_k = k;
        Ok(self)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Retrieve up to `k` fragments (default k when `None`), best first.
    ///
    /// # Errors
    /// - `EmptyIndex` if the index holds no entries
    /// - `InvalidInput` if `k` is 0
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> AppResult<RetrievalResult> {
        let k = k.unwrap_or(self.default_k);
        if k == 0 {
            return Err(AppError::InvalidInput("k must be at least 1".to_string()));
        }

        if self.index.is_empty() {
            return Err(AppError::EmptyIndex(self.index.location().to_path_buf()));
        }

        let query_embedding = self.provider.embed(query).await?;
        let hits = self.index.search(&query_embedding, k)?;

        tracing::debug!(
            k,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "Retrieved context"
        );

        Ok(RetrievalResult { hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::SqliteVectorIndex;
    use crate::types::{Document, IndexEntry};
    use crate::chunker::Chunker;
    use safedrop_core::MergePolicy;
    use tempfile::TempDir;

    async fn build_index(dir: &std::path::Path, docs: &[Document]) -> Arc<dyn VectorIndex> {
        let provider = TrigramProvider::new(384);
        let (fragments, _) = Chunker::default().chunk_all(docs);
        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = provider.embed_batch(&texts).await.unwrap();
        let entries = fragments
            .into_iter()
            .zip(vectors)
            .map(|(fragment, embedding)| IndexEntry { embedding, fragment })
            .collect();
        SqliteVectorIndex::build(dir, entries, &provider.identifier(), MergePolicy::Replace).unwrap();
        Arc::new(SqliteVectorIndex::open(dir, &provider.identifier()).unwrap())
    }

    #[tokio::test]
    async fn test_retrieves_matching_fragment_first() {
        let temp = TempDir::new().unwrap();
        let index = build_index(
            temp.path(),
            &[
                Document::new("Couriers leave the parcel at the front door when nobody answers.", "safe_drop.md"),
                Document::new("Refunds are issued to the original payment method.", "refunds.md"),
                Document::new("Orders ship from the central warehouse.", "shipping.md"),
            ],
        )
        .await;

        let retriever = Retriever::new(index, Arc::new(TrigramProvider::new(384))).unwrap();
        let result = retriever.retrieve("Will the courier leave my parcel at the door?", None).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.hits[0].fragment.source, "safe_drop.md");

        let one = retriever.retrieve("parcel door", Some(1)).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index() {
        let temp = TempDir::new().unwrap();
        let index = build_index(temp.path(), &[]).await;

        let retriever = Retriever::new(index, Arc::new(TrigramProvider::new(384))).unwrap();
        let err = retriever.retrieve("anything", None).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyIndex(_)));
    }

    #[tokio::test]
    async fn test_zero_k_is_rejected() {
        let temp = TempDir::new().unwrap();
        let index = build_index(temp.path(), &[Document::new("text", "a.md")]).await;
        let retriever = Retriever::new(index, Arc::new(TrigramProvider::new(384))).unwrap();

        assert!(matches!(
            retriever.retrieve("text", Some(0)).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(retriever.with_default_k(0).is_err());
    }

    #[tokio::test]
    async fn test_dimension_change_is_mismatch() {
        let temp = TempDir::new().unwrap();
        let index = build_index(temp.path(), &[Document::new("text", "a.md")]).await;

        let err = Retriever::new(index, Arc::new(TrigramProvider::new(128))).unwrap_err();
        assert!(matches!(err, AppError::ConfigMismatch { .. }));
    }
}
