//! Document loading: turn files on disk into [`Document`]s.

use crate::types::Document;
use safedrop_core::{AppError, AppResult};
use std::path::Path;
use tokio::process::Command;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Text,
    Markdown,
    Pdf,
}

impl SourceFormat {
    /// Detect the format from the file extension. `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
        }
    }
}

/// Source identifier for a file: its path relative to the ingestion root,
/// with `/` separators on every platform.
pub fn source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Load one file. Text formats give one document; PDFs give one per page.
pub async fn load_file(path: &Path, source: &str) -> AppResult<Vec<Document>> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        AppError::Knowledge(format!("Unsupported file type: {}", path.display()))
    })?;

    match format {
        SourceFormat::Text | SourceFormat::Markdown => {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                AppError::Knowledge(format!("Failed to read {}: {}", path.display(), e))
            })?;
            Ok(vec![Document::new(text, source)])
        }
        SourceFormat::Pdf => {
            let text = extract_pdf_text(path).await?;
            Ok(split_pages(&text, source))
        }
    }
}

/// Run `pdftotext` (poppler-utils) and capture its output.
async fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .await
        .map_err(|e| {
            AppError::Knowledge(format!(
                "Cannot run pdftotext for {} ({}). Install poppler-utils to ingest PDFs",
                path.display(),
                e
            ))
        })?;

    if !output.status.success() {
        return Err(AppError::Knowledge(format!(
            "pdftotext failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Split extracted PDF text on form feeds, one document per page.
/// Pages are numbered from 1; the empty tail after the final form feed is dropped.
fn split_pages(text: &str, source: &str) -> Vec<Document> {
    let mut pages: Vec<&str> = text.split('\x0c').collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }

    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| Document::new(page, source).with_page(i as u32 + 1))
        .collect()
}
