//! Splitting documents into overlapping fragments.
//!
//! Each fragment ends at the best boundary available inside its size budget,
//! preferring paragraph breaks, then sentence ends, then word boundaries, and
//! only cutting mid-word when a single word is longer than the budget. The
//! next fragment starts `overlap` chars before the previous end (earlier, if
//! that lands inside a word), so adjacent fragments always share at least
//! `overlap` chars and their union is the whole document.
//!
//! All offsets and lengths are counted in chars.

use crate::types::{Document, Fragment};
use safedrop_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Fragment size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum fragment length
    pub max_chars: usize,

    /// Minimum overlap between adjacent fragments
    pub overlap_chars: usize,
}

impl ChunkerConfig {
    /// Validated limits: `max_chars > 0` and `overlap_chars < max_chars`.
    pub fn new(max_chars: usize, overlap_chars: usize) -> AppResult<Self> {
        if max_chars == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap_chars >= max_chars {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                overlap_chars, max_chars
            )));
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap_chars: 100,
        }
    }
}

/// Candidate break points of one document, as sorted char offsets.
struct Boundaries {
    paragraph: Vec<usize>,
    sentence: Vec<usize>,
    word: Vec<usize>,
}

impl Boundaries {
    fn scan(text: &str, chars: &[char], char_starts: &[usize]) -> Self {
        let to_char = |byte: usize| char_starts.binary_search(&byte).unwrap_or_else(|i| i);

        let paragraph = (2..chars.len())
            .filter(|&p| {
                chars[p - 1] == '\n'
                    && (chars[p - 2] == '\n'
                        || (p >= 3 && chars[p - 2] == '\r' && chars[p - 3] == '\n'))
            })
            .collect();

        let sentence = text
            .split_sentence_bound_indices()
            .map(|(byte, _)| to_char(byte))
            .filter(|&c| c > 0)
            .collect();

        let word = text
            .split_word_bound_indices()
            .map(|(byte, _)| to_char(byte))
            .filter(|&c| c > 0)
            .collect();

        Self {
            paragraph,
            sentence,
            word,
        }
    }

    /// Best break in `(lo, hi]`, by preference.
    fn best_break(&self, lo: usize, hi: usize) -> Option<usize> {
        last_in(&self.paragraph, lo, hi)
            .or_else(|| last_in(&self.sentence, lo, hi))
            .or_else(|| last_in(&self.word, lo, hi))
    }
}

/// Largest boundary `b` with `lo < b <= hi`.
fn last_in(bounds: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let idx = bounds.partition_point(|&b| b <= hi);
    if idx == 0 {
        return None;
    }
    let b = bounds[idx - 1];
    (b > lo).then_some(b)
}

/// Splits documents into fragments.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Shorthand for `Chunker::new(ChunkerConfig::new(..)?)`.
    pub fn with_sizes(max_chars: usize, overlap_chars: usize) -> AppResult<Self> {
        Ok(Self::new(ChunkerConfig::new(max_chars, overlap_chars)?))
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Split one document. Empty or whitespace-only documents yield no fragments.
    pub fn chunk(&self, doc: &Document) -> Vec<Fragment> {
        let text = doc.text.as_str();
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_starts.push(text.len());

        let n = chars.len();
        let max = self.config.max_chars;
        let overlap = self.config.overlap_chars;
        let bounds = Boundaries::scan(text, &chars, &char_starts);

        let mut fragments = Vec::new();
        let mut start = 0;
        let mut prev_end = 0;

        loop {
            let end = if n - start <= max {
                n
            } else {
                // Past start + overlap keeps the next start moving forward;
                // past prev_end keeps every fragment adding new text.
                bounds
                    .best_break((start + overlap).max(prev_end), start + max)
                    .unwrap_or(start + max)
            };

            fragments.push(make_fragment(
                doc,
                &text[char_starts[start]..char_starts[end]],
                fragments.len(),
                start,
                end,
            ));

            if end == n {
                break;
            }

            prev_end = end;
            let overlap_start = end - overlap;
            start = last_in(&bounds.word, start, overlap_start).unwrap_or(overlap_start);
        }

        tracing::trace!(
            source = %doc.source,
            page = ?doc.page,
            chars = n,
            fragments = fragments.len(),
            "Chunked document"
        );

        fragments
    }

    /// Split a batch of documents, in order. Returns the fragments and the
    /// number of documents skipped for having no text.
    pub fn chunk_all(&self, docs: &[Document]) -> (Vec<Fragment>, usize) {
        let mut fragments = Vec::new();
        let mut skipped = 0;

        for doc in docs {
            let doc_fragments = self.chunk(doc);
            if doc_fragments.is_empty() {
                tracing::warn!(source = %doc.source, page = ?doc.page, "Skipping document with no text");
                skipped += 1;
                continue;
            }
            fragments.extend(doc_fragments);
        }

        tracing::debug!(
            "Chunked {} documents into {} fragments (size: {}, overlap: {})",
            docs.len() - skipped,
            fragments.len(),
            self.config.max_chars,
            self.config.overlap_chars
        );

        (fragments, skipped)
    }
}

fn make_fragment(doc: &Document, text: &str, position: usize, start: usize, end: usize) -> Fragment {
    Fragment {
        text: text.to_string(),
        source: doc.source.clone(),
        page: doc.page,
        position,
        char_start: start,
        char_end: end,
        content_hash: content_hash(text),
    }
}

/// SHA-256 of the text, hex encoded.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
