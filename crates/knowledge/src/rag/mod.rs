//! Retrieval-augmented answering over the policy index.

pub mod escalation;
pub mod generator;
pub mod pipeline;
pub mod types;

pub use escalation::is_escalation;
pub use generator::{AnswerGenerator, DEFAULT_GENERATION_TIMEOUT};
pub use pipeline::RagPipeline;
pub use types::{Answer, Citation, SNIPPET_CHARS};
