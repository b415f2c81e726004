//! Index building: load a directory of documents, chunk, embed, persist.

use crate::chunker::Chunker;
use crate::embeddings::{embed_fragments, EmbeddingProvider};
use crate::index::SqliteVectorIndex;
use crate::loader::{load_file, source_id, SourceFormat};
use crate::progress::ProgressReporter;
use crate::types::{Document, IndexEntry, IngestOptions, IngestStats};
use safedrop_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Build (or extend) the index at `options.index_dir` from every supported
/// file under `options.source_dir`.
///
/// Files that cannot be read are logged and skipped. Running twice over the
/// same inputs with [`MergePolicy::Replace`](safedrop_core::MergePolicy)
/// produces an identical index.
///
/// # Errors
/// - `NoDocuments` if no file yields any text
/// - `ConfigMismatch` when appending with a different embedding model
/// - embedding or storage failures
pub async fn ingest(
    options: &IngestOptions,
    provider: Arc<dyn EmbeddingProvider>,
    reporter: &ProgressReporter,
) -> AppResult<IngestStats> {
    let start = Instant::now();
    let root = options.source_dir.as_path();

    if !root.is_dir() {
        return Err(AppError::NoDocuments(root.to_path_buf()));
    }

    info!(
        "Ingesting {:?} into {:?} ({})",
        root,
        options.index_dir,
        options.merge_policy.as_str()
    );

    let chunker = Chunker::with_sizes(options.chunk_size, options.chunk_overlap)?;

    let files = discover(root);
    reporter.discover(files.len() as u64, &root.display().to_string());

    let mut stats = IngestStats::default();
    let mut documents: Vec<Document> = Vec::new();

    for (i, path) in files.iter().enumerate() {
        let source = source_id(root, path);
        reporter.load(i as u64 + 1, files.len() as u64, &source);

        match load_file(path, &source).await {
            Ok(docs) => {
                stats.files_loaded += 1;
                stats.bytes_processed += docs.iter().map(|d| d.text.len() as u64).sum::<u64>();
                documents.extend(docs);
            }
            Err(e) => {
                warn!("Skipping {}: {}", source, e);
                stats.files_failed += 1;
            }
        }
    }

    let (fragments, skipped) = chunker.chunk_all(&documents);
    stats.documents = documents.len() - skipped;
    stats.documents_skipped = skipped;
    stats.fragments = fragments.len();
    reporter.chunk(stats.documents as u64, fragments.len() as u64);

    if fragments.is_empty() {
        return Err(AppError::NoDocuments(root.to_path_buf()));
    }

    let batch_size = options.embed_batch_size.max(1);
    let total_batches = fragments.len().div_ceil(batch_size) as u64;
    let model = provider.identifier();
    let embeddings = embed_fragments(
        Arc::clone(&provider),
        &fragments,
        batch_size,
        options.embed_concurrency,
        |done| reporter.embed(done as u64, total_batches, &model),
    )
    .await?;

    let entries: Vec<IndexEntry> = fragments
        .into_iter()
        .zip(embeddings)
        .map(|(fragment, embedding)| IndexEntry { embedding, fragment })
        .collect();

    let index_dir = options.index_dir.clone();
    let merge_policy = options.merge_policy;
    let model_id = model.clone();
    let manifest = tokio::task::spawn_blocking(move || {
        SqliteVectorIndex::build(&index_dir, entries, &model_id, merge_policy)
    })
    .await
    .map_err(|e| AppError::Other(format!("Index build task failed: {}", e)))??;

    stats.index_entries = manifest.entry_count;
    reporter.index(manifest.entry_count as u64, &options.index_dir.display().to_string());

    stats.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        files = stats.files_loaded,
        failed = stats.files_failed,
        documents = stats.documents,
        skipped = stats.documents_skipped,
        fragments = stats.fragments,
        entries = stats.index_entries,
        bytes = stats.bytes_processed,
        "Ingestion completed in {:.2}s",
        start.elapsed().as_secs_f64()
    );

    Ok(stats)
}

/// Supported files under `root`, sorted so builds are reproducible.
fn discover(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let supported = SourceFormat::from_path(path).is_some();
            if !supported {
                tracing::debug!("Ignoring unsupported file {:?}", path);
            }
            supported
        })
        .collect();

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::read_manifest;
    use safedrop_core::MergePolicy;
    use tempfile::TempDir;

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let data = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        write(data.path(), "safe_drop.md", "Couriers may leave the parcel in a safe place.");
        write(data.path(), "policies/returns.txt", "Returns are accepted within 30 days.");
        write(data.path(), "blank.md", "   \n\n ");
        write(data.path(), "logo.png", "not text");

        let options = IngestOptions::new(data.path(), index.path());
        let stats = ingest(&options, Arc::new(TrigramProvider::new(384)), &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(stats.files_loaded, 3);
        assert_eq!(stats.files_failed, 0);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.documents_skipped, 1);
        assert_eq!(stats.fragments, 2);
        assert_eq!(stats.index_entries, 2);

        let manifest = read_manifest(index.path()).unwrap();
        let sources: Vec<&str> = manifest.sources.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["policies/returns.txt", "safe_drop.md"]);
        assert_eq!(manifest.embedding_model, "trigram/trigram-v1");
    }

    #[tokio::test]
    async fn test_no_documents() {
        let data = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        write(data.path(), "empty.txt", "");

        let options = IngestOptions::new(data.path(), index.path());
        let err = ingest(&options, Arc::new(TrigramProvider::new(384)), &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoDocuments(_)));

        let missing = IngestOptions::new(data.path().join("nope"), index.path());
        let err = ingest(&missing, Arc::new(TrigramProvider::new(384)), &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoDocuments(_)));
    }

    #[tokio::test]
    async fn test_append_skips_known_fragments() {
        let data = TempDir::new().unwrap();
        let index = TempDir::new().unwrap();
        write(data.path(), "safe_drop.md", "Couriers may leave the parcel in a safe place.");

        let provider = Arc::new(TrigramProvider::new(384));
        let mut options = IngestOptions::new(data.path(), index.path());
        ingest(&options, provider.clone(), &ProgressReporter::noop()).await.unwrap();

        write(data.path(), "returns.md", "Returns are accepted within 30 days.");
        options.merge_policy = MergePolicy::Append;
        let stats = ingest(&options, provider, &ProgressReporter::noop()).await.unwrap();

        assert_eq!(stats.fragments, 2);
        assert_eq!(stats.index_entries, 2);
    }
}
