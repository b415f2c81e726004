//! Escalation detection.
//!
//! The instruction template tells the model to open its reply with the
//! escalation marker when the policy context does not cover the question.
//! Detection only looks at that prefix, so it is as reliable as the model's
//! obedience to the template.

use safedrop_prompt::ESCALATION_MARKER;

/// Whether a generated answer is an escalation.
///
/// True iff the text, trimmed and lowercased, starts with `escalate:`.
pub fn is_escalation(text: &str) -> bool {
    text.trim().to_lowercase().starts_with(ESCALATION_MARKER)
}
