//! Stats command handler.

use clap::Args;
use safedrop_core::{AppConfig, AppResult};
use safedrop_knowledge::read_manifest;

/// Show what the index contains
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let location = config.index_dir();
        let manifest = read_manifest(&location)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            return Ok(());
        }

        println!("Index: {}", location.display());
        println!("  Embedding model: {} ({} dimensions)", manifest.embedding_model, manifest.dimensions);
        println!("  Entries: {}", manifest.entry_count);
        println!("  Built: {}", manifest.built_at.to_rfc3339());
        println!("  Sources: {}", manifest.sources.len());
        for source in &manifest.sources {
            println!("    {} ({} fragments)", source.source, source.fragments);
        }

        Ok(())
    }
}
