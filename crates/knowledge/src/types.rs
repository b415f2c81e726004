//! Knowledge system type definitions.

use safedrop_core::MergePolicy;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// A unit of source text with provenance. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Full text content
    pub text: String,

    /// Source identifier (path relative to the ingestion root)
    pub source: String,

    /// 1-based page number for paged formats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// A contiguous slice of a document, sized for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Fragment text, never trimmed
    pub text: String,

    /// Source identifier of the parent document
    pub source: String,

    /// Page of the parent document, if paged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Ordinal position within the parent document
    pub position: usize,

    /// Start offset in the parent document, in chars
    pub char_start: usize,

    /// End offset (exclusive) in the parent document, in chars
    pub char_end: usize,

    /// SHA-256 of `text`, hex encoded
    pub content_hash: String,
}

impl Fragment {
    pub fn char_range(&self) -> Range<usize> {
        self.char_start..self.char_end
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }

    /// Identity used to deduplicate appended index entries.
    pub fn identity(&self) -> (&str, Option<u32>, usize, &str) {
        (&self.source, self.page, self.position, &self.content_hash)
    }
}

/// An embedded fragment, as stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub fragment: Fragment,
}

/// One ranked fragment returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub fragment: Fragment,

    /// Cosine similarity to the query
    pub score: f32,
}

/// Ranked fragments for one query, best first. Never longer than the requested k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetrievalHit> {
        self.hits.iter()
    }
}

/// Options for building an index from a directory of documents.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory scanned recursively for documents
    pub source_dir: PathBuf,

    /// Index directory to write
    pub index_dir: PathBuf,

    /// Maximum fragment length in chars
    pub chunk_size: usize,

    /// Minimum overlap between adjacent fragments in chars
    pub chunk_overlap: usize,

    /// What to do with an existing index
    pub merge_policy: MergePolicy,

    /// Fragments per embedding call
    pub embed_batch_size: usize,

    /// Embedding calls in flight at once
    pub embed_concurrency: usize,
}

impl IngestOptions {
    pub fn new(source_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            index_dir: index_dir.into(),
            chunk_size: 800,
            chunk_overlap: 100,
            merge_policy: MergePolicy::Replace,
            embed_batch_size: 32,
            embed_concurrency: 4,
        }
    }
}

/// Counters reported by a completed ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Files that yielded at least one document
    pub files_loaded: usize,

    /// Files that could not be read or parsed
    pub files_failed: usize,

    /// Documents (pages for PDFs) chunked
    pub documents: usize,

    /// Documents skipped because they held no text
    pub documents_skipped: usize,

    /// Fragments produced and embedded in this run
    pub fragments: usize,

    /// Entries in the index after the build
    pub index_entries: usize,

    /// Bytes of document text processed
    pub bytes_processed: u64,

    pub duration_ms: u64,
}
