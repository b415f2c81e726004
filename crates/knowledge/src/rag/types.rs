//! Answer and citation types.

use crate::types::RetrievalResult;
use serde::{Deserialize, Serialize};

/// Longest snippet shown per citation, in chars.
pub const SNIPPET_CHARS: usize = 350;

/// The outcome of one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question: String,

    /// Generated text, trimmed
    pub text: String,

    /// Context the answer was generated from
    pub retrieval: RetrievalResult,

    /// Whether the model declined and asked for a human
    pub is_escalated: bool,
}

impl Answer {
    /// One citation per retrieved fragment, in retrieval order.
    pub fn citations(&self) -> Vec<Citation> {
        self.retrieval
            .iter()
            .enumerate()
            .map(|(i, hit)| Citation {
                rank: i + 1,
                source: hit.fragment.source.clone(),
                page: hit.fragment.page,
                score: hit.score,
                snippet: snippet(&hit.fragment.text),
            })
            .collect()
    }
}

/// User-facing reference to a fragment an answer was built on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based
    pub rank: usize,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub score: f32,
    pub snippet: String,
}

impl Citation {
    /// "source", or "source (page N)" for paged documents.
    pub fn location(&self) -> String {
        match self.page {
            Some(page) => format!("{} (page {})", self.source, page),
            None => self.source.clone(),
        }
    }
}

fn snippet(text: &str) -> String {
    let head: String = text.chars().take(SNIPPET_CHARS).collect();
    head.trim().replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fragment, RetrievalHit};

    fn hit(source: &str, page: Option<u32>, text: &str, score: f32) -> RetrievalHit {
        RetrievalHit {
            fragment: Fragment {
                text: text.to_string(),
                source: source.to_string(),
                page,
                position: 0,
                char_start: 0,
                char_end: text.chars().count(),
                content_hash: crate::chunker::content_hash(text),
            },
            score,
        }
    }

    #[test]
    fn test_citations_follow_retrieval_order() {
        let answer = Answer {
            question: "q".to_string(),
            text: "a".to_string(),
            retrieval: RetrievalResult {
                hits: vec![
                    hit("safe_drop.md", None, "\n  Couriers may leave\nthe parcel.\n", 0.8),
                    hit("handbook.pdf", Some(4), "Returns within 30 days.", 0.4),
                ],
            },
            is_escalated: false,
        };

        let citations = answer.citations();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].rank, 1);
        assert_eq!(citations[0].snippet, "Couriers may leave the parcel.");
        assert_eq!(citations[0].location(), "safe_drop.md");
        assert_eq!(citations[1].rank, 2);
        assert_eq!(citations[1].location(), "handbook.pdf (page 4)");
    }

    #[test]
    fn test_snippet_is_bounded() {
        let long = "é".repeat(1000);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_CHARS);
    }
}
