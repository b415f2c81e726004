//! SQLite-backed vector index.
//!
//! An index is a self-contained directory:
//! - `manifest.json`: format version, embedding model, dimensions, counts, sources
//! - `index.sqlite`: one row per entry, vectors stored as little-endian f32 blobs
//!
//! Both files are written to a temporary name and renamed into place, so a
//! crashed build leaves the previous index intact.

use crate::types::{Fragment, IndexEntry, RetrievalHit};
use crate::vector_index::VectorIndex;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use safedrop_core::{AppError, AppResult, MergePolicy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const INDEX_FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DATABASE_FILE: &str = "index.sqlite";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    ordinal INTEGER PRIMARY KEY,
    source TEXT NOT NULL,
    page INTEGER,
    position INTEGER NOT NULL,
    char_start INTEGER NOT NULL,
    char_end INTEGER NOT NULL,
    text TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    embedding BLOB NOT NULL
);
"#;

/// Metadata describing a built index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub format_version: u32,

    /// `provider/model` of the embedding model used at build time
    pub embedding_model: String,

    pub dimensions: usize,
    pub entry_count: usize,
    pub built_at: DateTime<Utc>,

    /// Ingested sources, sorted by name
    pub sources: Vec<SourceSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub fragments: usize,
}

/// Read the manifest of the index at `location`.
pub fn read_manifest(location: &Path) -> AppResult<IndexManifest> {
    let path = location.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(AppError::IndexNotFound(location.to_path_buf()));
    }

    let contents = fs::read_to_string(&path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;
    let manifest: IndexManifest = serde_json::from_str(&contents)
        .map_err(|e| AppError::Knowledge(format!("Corrupt index manifest {:?}: {}", path, e)))?;

    if manifest.format_version != INDEX_FORMAT_VERSION {
        return Err(AppError::Knowledge(format!(
            "Index at {:?} has format version {}, expected {}; rebuild it",
            location, manifest.format_version, INDEX_FORMAT_VERSION
        )));
    }

    Ok(manifest)
}

/// In-memory vector index loaded from an index directory.
#[derive(Debug)]
pub struct SqliteVectorIndex {
    location: PathBuf,
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl SqliteVectorIndex {
    /// Write `entries` to the index at `location`.
    ///
    /// With [`MergePolicy::Append`], entries of an existing index are kept and
    /// new entries already present (same source, page, position and content
    /// hash) are skipped; the existing index must use the same embedding model.
    /// With [`MergePolicy::Replace`], any existing index is discarded.
    pub fn build(
        location: &Path,
        entries: Vec<IndexEntry>,
        embedding_model: &str,
        merge_policy: MergePolicy,
    ) -> AppResult<IndexManifest> {
        fs::create_dir_all(location).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory {:?}: {}", location, e))
        })?;

        let existing_index = location.join(MANIFEST_FILE).is_file();
        let mut all = match merge_policy {
            MergePolicy::Append if existing_index => {
                let existing = Self::open(location, embedding_model)?;
                let expected = existing.manifest.dimensions;
                if let Some(bad) = entries
                    .iter()
                    .find(|e| !existing.entries.is_empty() && e.embedding.len() != expected)
                {
                    return Err(AppError::ConfigMismatch {
                        index_model: format!("{} ({}d)", existing.manifest.embedding_model, expected),
                        requested_model: format!("{} ({}d)", embedding_model, bad.embedding.len()),
                    });
                }
                existing.entries
            }
            _ => Vec::new(),
        };

        let kept = all.len();
        let mut seen: HashSet<(String, Option<u32>, usize, String)> =
            all.iter().map(|e| owned_identity(&e.fragment)).collect();
        let offered = entries.len();
        all.extend(
            entries
                .into_iter()
                .filter(|e| seen.insert(owned_identity(&e.fragment))),
        );
        let duplicates = offered - (all.len() - kept);

        let dimensions = all.first().map(|e| e.embedding.len()).unwrap_or(0);
        if let Some(bad) = all.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch in index build: expected {}, got {} ({})",
                dimensions,
                bad.embedding.len(),
                bad.fragment.source
            )));
        }

        let db_path = location.join(DATABASE_FILE);
        let tmp_db = location.join(format!("{}.tmp", DATABASE_FILE));
        write_database(&tmp_db, &all)?;
        fs::rename(&tmp_db, &db_path)?;

        let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &all {
            *per_source.entry(entry.fragment.source.as_str()).or_insert(0) += 1;
        }

        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.to_string(),
            dimensions,
            entry_count: all.len(),
            built_at: Utc::now(),
            sources: per_source
                .into_iter()
                .map(|(source, fragments)| SourceSummary {
                    source: source.to_string(),
                    fragments,
                })
                .collect(),
        };

        let tmp_manifest = location.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&tmp_manifest, serde_json::to_string_pretty(&manifest)?)?;
        fs::rename(&tmp_manifest, location.join(MANIFEST_FILE))?;

        tracing::info!(
            entries = manifest.entry_count,
            kept,
            duplicates,
            policy = merge_policy.as_str(),
            "Wrote index to {:?}",
            location
        );

        Ok(manifest)
    }

    /// Open the index at `location` for querying with `embedding_model`.
    ///
    /// # Errors
    /// - `IndexNotFound` if there is no index at `location`
    /// - `ConfigMismatch` if the index was built with another embedding model
    pub fn open(location: &Path, embedding_model: &str) -> AppResult<Self> {
        let manifest = read_manifest(location)?;

        if manifest.embedding_model != embedding_model {
            return Err(AppError::ConfigMismatch {
                index_model: manifest.embedding_model,
                requested_model: embedding_model.to_string(),
            });
        }

        let db_path = location.join(DATABASE_FILE);
        if !db_path.is_file() {
            return Err(AppError::IndexNotFound(location.to_path_buf()));
        }

        let entries = read_database(&db_path)?;
        if entries.len() != manifest.entry_count {
            return Err(AppError::Knowledge(format!(
                "Index at {:?} is inconsistent: manifest lists {} entries, database holds {}",
                location,
                manifest.entry_count,
                entries.len()
            )));
        }

        tracing::debug!(
            entries = entries.len(),
            model = %manifest.embedding_model,
            "Opened index at {:?}",
            location
        );

        Ok(Self {
            location: location.to_path_buf(),
            manifest,
            entries,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn location(&self) -> &Path {
        &self.location
    }

    fn embedding_model(&self) -> &str {
        &self.manifest.embedding_model
    }

    fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<RetrievalHit>> {
        if k == 0 {
            return Err(AppError::InvalidInput(
                "k must be at least 1".to_string(),
            ));
        }

        if !self.entries.is_empty() && query_embedding.len() != self.manifest.dimensions {
            return Err(AppError::InvalidInput(format!(
                "Query vector has {} dimensions, index has {}",
                query_embedding.len(),
                self.manifest.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query_embedding, &entry.embedding)))
            .collect();

        // Stable sort: equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits: Vec<RetrievalHit> = scored
            .into_iter()
            .map(|(i, score)| RetrievalHit {
                fragment: self.entries[i].fragment.clone(),
                score,
            })
            .collect();

        tracing::debug!("Retrieved {} entries (requested top-{})", hits.len(), k);

        Ok(hits)
    }
}

fn owned_identity(fragment: &Fragment) -> (String, Option<u32>, usize, String) {
    let (source, page, position, hash) = fragment.identity();
    (source.to_string(), page, position, hash.to_string())
}

fn write_database(path: &Path, entries: &[IndexEntry]) -> AppResult<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut conn = Connection::open(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to create SQLite index: {}", e)))?;

    conn.execute_batch(SCHEMA)
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    let tx = conn
        .transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO entries (ordinal, source, page, position, char_start, char_end, text, content_hash, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare insert: {}", e)))?;

        for (ordinal, entry) in entries.iter().enumerate() {
            let f = &entry.fragment;
            stmt.execute(params![
                ordinal as i64,
                f.source,
                f.page,
                f.position as i64,
                f.char_start as i64,
                f.char_end as i64,
                f.text,
                f.content_hash,
                embedding_to_bytes(&entry.embedding),
            ])
            .map_err(|e| AppError::Knowledge(format!("Failed to insert entry: {}", e)))?;
        }
    }
    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;

    Ok(())
}

fn read_database(path: &Path) -> AppResult<Vec<IndexEntry>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    let mut stmt = conn
        .prepare(
            "SELECT source, page, position, char_start, char_end, text, content_hash, embedding
             FROM entries ORDER BY ordinal",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let blob: Vec<u8> = row.get(7)?;
            Ok((
                Fragment {
                    source: row.get(0)?,
                    page: row.get(1)?,
                    position: row.get::<_, i64>(2)? as usize,
                    char_start: row.get::<_, i64>(3)? as usize,
                    char_end: row.get::<_, i64>(4)? as usize,
                    text: row.get(5)?,
                    content_hash: row.get(6)?,
                },
                blob,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query entries: {}", e)))?;

    let mut entries = Vec::new();
    for row in rows {
        let (fragment, blob) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read entry: {}", e)))?;
        entries.push(IndexEntry {
            embedding: bytes_to_embedding(&blob)?,
            fragment,
        });
    }

    Ok(entries)
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::content_hash;
    use std::sync::Arc;
    use tempfile::TempDir;

    const MODEL: &str = "test/unit-v1";

    fn entry(source: &str, position: usize, text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            embedding,
            fragment: Fragment {
                text: text.to_string(),
                source: source.to_string(),
                page: None,
                position,
                char_start: 0,
                char_end: text.chars().count(),
                content_hash: content_hash(text),
            },
        }
    }

    fn sample_entries() -> Vec<IndexEntry> {
        vec![
            entry("a.md", 0, "alpha", vec![1.0, 0.0, 0.0]),
            entry("a.md", 1, "beta", vec![0.0, 1.0, 0.0]),
            entry("b.md", 0, "gamma", vec![0.7, 0.7, 0.0]),
            entry("b.md", 1, "delta", vec![0.0, 0.0, 1.0]),
        ]
    }

    #[test]
    fn test_build_and_open() {
        let temp = TempDir::new().unwrap();
        let manifest =
            SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace)
                .unwrap();

        assert_eq!(manifest.entry_count, 4);
        assert_eq!(manifest.dimensions, 3);
        assert_eq!(
            manifest.sources,
            vec![
                SourceSummary { source: "a.md".into(), fragments: 2 },
                SourceSummary { source: "b.md".into(), fragments: 2 },
            ]
        );
        assert!(temp.path().join(MANIFEST_FILE).is_file());
        assert!(temp.path().join(DATABASE_FILE).is_file());
        assert!(!temp.path().join("index.sqlite.tmp").exists());

        let index = SqliteVectorIndex::open(temp.path(), MODEL).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.embedding_model(), MODEL);
        assert_eq!(index.entries, sample_entries());
    }

    #[test]
    fn test_open_missing_index() {
        let temp = TempDir::new().unwrap();
        let err = SqliteVectorIndex::open(&temp.path().join("nothing"), MODEL).unwrap_err();
        assert!(matches!(err, AppError::IndexNotFound(_)));
    }

    #[test]
    fn test_open_with_other_model_is_mismatch() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();

        match SqliteVectorIndex::open(temp.path(), "ollama/nomic-embed-text") {
            Err(AppError::ConfigMismatch {
                index_model,
                requested_model,
            }) => {
                assert_eq!(index_model, MODEL);
                assert_eq!(requested_model, "ollama/nomic-embed-text");
            }
            other => panic!("expected ConfigMismatch, got {:?}", other.map(|i| i.len())),
        }
    }

    #[test]
    fn test_search_ranks_by_cosine() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();
        let index = SqliteVectorIndex::open(temp.path(), MODEL).unwrap();

        let hits = index.search(&[1.0, 0.1, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].fragment.text, "alpha");
        assert_eq!(hits[1].fragment.text, "gamma");
        assert!(hits[0].score >= hits[1].score);

        let all = index.search(&[1.0, 0.1, 0.0], 50).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let temp = TempDir::new().unwrap();
        let entries = vec![
            entry("x.md", 0, "first", vec![0.0, 1.0]),
            entry("x.md", 1, "second", vec![0.0, 1.0]),
            entry("x.md", 2, "third", vec![0.0, 1.0]),
        ];
        SqliteVectorIndex::build(temp.path(), entries, MODEL, MergePolicy::Replace).unwrap();
        let index = SqliteVectorIndex::open(temp.path(), MODEL).unwrap();

        let texts: Vec<String> = index
            .search(&[0.0, 1.0], 3)
            .unwrap()
            .into_iter()
            .map(|h| h.fragment.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_search_rejects_zero_k() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();
        let index = SqliteVectorIndex::open(temp.path(), MODEL).unwrap();

        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 0),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_append_skips_duplicates() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();

        let mut more = sample_entries();
        more.push(entry("c.md", 0, "epsilon", vec![0.5, 0.5, 0.5]));
        let manifest =
            SqliteVectorIndex::build(temp.path(), more, MODEL, MergePolicy::Append).unwrap();

        assert_eq!(manifest.entry_count, 5);
        let index = SqliteVectorIndex::open(temp.path(), MODEL).unwrap();
        assert_eq!(index.entries.last().unwrap().fragment.text, "epsilon");
    }

    #[test]
    fn test_append_with_other_model_is_mismatch() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();

        let err = SqliteVectorIndex::build(temp.path(), sample_entries(), "other/model", MergePolicy::Append)
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigMismatch { .. }));
    }

    #[test]
    fn test_append_with_other_dimensions_is_mismatch() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();

        let wider = vec![entry("c.md", 0, "epsilon", vec![0.5, 0.5, 0.5, 0.5])];
        let err = SqliteVectorIndex::build(temp.path(), wider, MODEL, MergePolicy::Append).unwrap_err();
        assert!(matches!(err, AppError::ConfigMismatch { .. }));

        // The existing index is left as it was.
        let index = SqliteVectorIndex::open(temp.path(), MODEL).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dimensions(), 3);
    }

    #[test]
    fn test_replace_discards_previous_entries() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();

        let manifest = SqliteVectorIndex::build(
            temp.path(),
            vec![entry("new.md", 0, "only", vec![1.0, 1.0])],
            "other/model",
            MergePolicy::Replace,
        )
        .unwrap();
        assert_eq!(manifest.entry_count, 1);
        assert_eq!(manifest.dimensions, 2);
        assert_eq!(read_manifest(temp.path()).unwrap().embedding_model, "other/model");
    }

    #[test]
    fn test_concurrent_search() {
        let temp = TempDir::new().unwrap();
        SqliteVectorIndex::build(temp.path(), sample_entries(), MODEL, MergePolicy::Replace).unwrap();
        let index = Arc::new(SqliteVectorIndex::open(temp.path(), MODEL).unwrap());
        let expected = index.search(&[0.0, 0.0, 1.0], 1).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let index = Arc::clone(&index);
                let expected = expected.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        assert_eq!(index.search(&[0.0, 0.0, 1.0], 1).unwrap(), expected);
                    }
                });
            }
        });
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
