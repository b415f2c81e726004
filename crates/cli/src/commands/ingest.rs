//! Ingest command handler.

use clap::Args;
use safedrop_core::{AppConfig, AppResult, MergePolicy};
use safedrop_knowledge::{ingest, ingest_options, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Build the policy index from a directory of documents
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory of .txt, .md and .pdf documents (default: rag.dataDir)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Index directory to write (default: rag.indexDir)
    #[arg(short, long)]
    pub index: Option<PathBuf>,

    /// Existing index handling: replace or append (default: rag.mergePolicy)
    #[arg(long, value_parser = parse_merge_policy)]
    pub merge: Option<MergePolicy>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_merge_policy(s: &str) -> Result<MergePolicy, String> {
    MergePolicy::parse(s).ok_or_else(|| format!("unknown merge policy '{}' (use replace or append)", s))
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let mut options = ingest_options(config, self.source.clone());
        if let Some(index) = &self.index {
            options.index_dir = config.resolve_path(index);
        }
        if let Some(merge) = self.merge {
            options.merge_policy = merge;
        }

        let reporter = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let provider = safedrop_knowledge::embedding_provider(config)?;
        let stats = ingest(&options, provider, &reporter).await?;

        if self.json {
            let output = serde_json::json!({
                "source": options.source_dir,
                "index": options.index_dir,
                "mergePolicy": options.merge_policy.as_str(),
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Loaded {} files ({} failed): {} documents, {} fragments, {} bytes",
                stats.files_loaded,
                stats.files_failed,
                stats.documents,
                stats.fragments,
                stats.bytes_processed
            );
            if stats.documents_skipped > 0 {
                println!("Skipped {} documents with no text", stats.documents_skipped);
            }
            println!(
                "Index at {} holds {} entries ({:.2}s)",
                options.index_dir.display(),
                stats.index_entries,
                stats.duration_ms as f64 / 1000.0
            );
        }

        Ok(())
    }
}
