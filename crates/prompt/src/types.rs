//! Prompt types for SafeDrop.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Marker the model is instructed to start its answer with when the policy
/// context does not cover the question. Compared case-insensitively.
pub const ESCALATION_MARKER: &str = "escalate:";

/// The policy-aware instruction text, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    text: String,
    source: Option<PathBuf>,
}

impl InstructionTemplate {
    pub(crate) fn new(text: String, source: Option<PathBuf>) -> Self {
        Self { text, source }
    }

    /// Template text, exactly as read.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// File the template was read from, if any.
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Whether the template tells the model about the escalation marker.
    pub fn mentions_escalation_marker(&self) -> bool {
        self.text.to_lowercase().contains(ESCALATION_MARKER)
    }
}

/// One retrieved fragment as it appears in the context section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextBlock {
    /// Source document identifier
    pub source: String,

    /// Page number for paged documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Fragment text
    pub text: String,
}

impl ContextBlock {
    pub fn new(source: impl Into<String>, page: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page,
            text: text.into(),
        }
    }

    /// Human-readable origin, e.g. `safe_drop.md` or `handbook.pdf (page 3)`.
    pub fn label(&self) -> String {
        match self.page {
            Some(page) => format!("{} (page {})", self.source, page),
            None => self.source.clone(),
        }
    }
}

/// A fully assembled prompt ready for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledPrompt {
    /// Complete prompt text
    pub text: String,

    /// Number of context blocks included
    pub context_blocks: usize,
}
