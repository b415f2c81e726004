//! Prompt system for SafeDrop.
//!
//! Loads the policy-aware instruction template once and assembles the final
//! prompt: template, then the retrieved context, then the question.

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::PromptAssembler;
pub use loader::{load_template, template_from_text};
pub use types::{AssembledPrompt, ContextBlock, InstructionTemplate, ESCALATION_MARKER};
