//! Progress reporting for ingestion.
//!
//! Ingestion can run for minutes against a remote embedding model; the
//! reporter lets a caller render each phase as it advances.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Ingestion phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discover,
    Load,
    Chunk,
    Embed,
    Index,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Load => "load",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Index => "index",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Units done so far (files, documents, fragments)
    pub current: u64,

    /// Units expected, when known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    pub fn new(phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: 0.0,
        }
    }

    /// 0-100, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                100.0
            }
        })
    }

    /// `[phase] current/total (pct%) - message`
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events to an optional callback. Cheap to clone.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            started: Instant::now(),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            started: Instant::now(),
        }
    }

    pub fn emit(&self, mut event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        event.elapsed_secs = self.started.elapsed().as_secs_f64();
        tracing::trace!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            "Progress"
        );
        callback(event);
    }

    pub fn discover(&self, found: u64, root: &str) {
        self.emit(ProgressEvent::new(
            Phase::Discover,
            found,
            None,
            format!("scanning {}", root),
        ));
    }

    pub fn load(&self, current: u64, total: u64, source: &str) {
        self.emit(ProgressEvent::new(
            Phase::Load,
            current,
            Some(total),
            format!("reading {}", source),
        ));
    }

    pub fn chunk(&self, documents: u64, fragments: u64) {
        self.emit(ProgressEvent::new(
            Phase::Chunk,
            documents,
            Some(documents),
            format!("{} fragments", fragments),
        ));
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            Phase::Embed,
            current,
            Some(total),
            format!("model={}", model),
        ));
    }

    pub fn index(&self, entries: u64, location: &str) {
        self.emit(ProgressEvent::new(
            Phase::Index,
            entries,
            Some(entries),
            format!("writing {}", location),
        ));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_format_simple() {
        let event = ProgressEvent::new(Phase::Embed, 5, Some(10), "model=trigram/trigram-v1");
        assert_eq!(event.format_simple(), "[embed] 5/10 (50%) - model=trigram/trigram-v1");

        let event = ProgressEvent::new(Phase::Discover, 3, None, "scanning data");
        assert_eq!(event.format_simple(), "[discover] 3 - scanning data");
    }

    #[test]
    fn test_reporter_forwards_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.load(1, 2, "safe_drop.md");
        reporter.index(12, ".safedrop/index");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].phase, Phase::Load);
        assert_eq!(captured[1].phase, Phase::Index);
        assert_eq!(captured[1].percentage(), Some(100.0));
    }

    #[test]
    fn test_noop_reporter() {
        ProgressReporter::noop().discover(1, "data");
    }
}
