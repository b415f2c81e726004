//! Prompt assembly.
//!
//! The frame is rendered with Handlebars. The instruction template, fragment
//! texts and question are inserted as values, never parsed as templates, so
//! braces in policy documents or user questions come through untouched.

use crate::types::{AssembledPrompt, ContextBlock, InstructionTemplate};
use handlebars::Handlebars;
use safedrop_core::{AppError, AppResult};
use serde::Serialize;

const FRAME_NAME: &str = "policy_frame";

/// Template, delimited context section, question. In that order.
/// Block separators and headers are passed in as values so no block tag ever
/// sits alone on a line (standalone tags would swallow the newline).
const FRAME: &str = "{{template}}\n\nContext:\n---\n{{#each blocks}}{{this.separator}}{{this.header}}{{this.text}}{{/each}}\n---\n\nQuestion: {{question}}";

#[derive(Serialize)]
struct FrameData<'a> {
    template: &'a str,
    blocks: Vec<FrameBlock<'a>>,
    question: &'a str,
}

#[derive(Serialize)]
struct FrameBlock<'a> {
    separator: &'static str,
    header: String,
    text: &'a str,
}

/// Combines the instruction template, retrieved context and question.
///
/// Built once per process and reused for every query.
pub struct PromptAssembler {
    template: InstructionTemplate,
    annotate_sources: bool,
    handlebars: Handlebars<'static>,
}

impl PromptAssembler {
    /// Create an assembler that labels each context block with its source.
    pub fn new(template: InstructionTemplate) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(FRAME_NAME, FRAME)
            .map_err(|e| AppError::Prompt(format!("Failed to register prompt frame: {}", e)))?;

        Ok(Self {
            template,
            annotate_sources: true,
            handlebars,
        })
    }

    /// Toggle the `[Source: …]` line above each context block.
    pub fn with_source_annotations(mut self, annotate: bool) -> Self {
        self.annotate_sources = annotate;
        self
    }

    pub fn template(&self) -> &InstructionTemplate {
        &self.template
    }

    /// Assemble the final prompt. Blocks appear in the order given.
    pub fn assemble(&self, blocks: &[ContextBlock], question: &str) -> AppResult<AssembledPrompt> {
        let data = FrameData {
            template: self.template.text(),
            blocks: blocks
                .iter()
                .enumerate()
                .map(|(i, block)| FrameBlock {
                    separator: if i == 0 { "" } else { "\n\n" },
                    header: if self.annotate_sources {
                        format!("[Source: {}]\n", block.label())
                    } else {
                        String::new()
                    },
                    text: &block.text,
                })
                .collect(),
            question,
        };

        let text = self
            .handlebars
            .render(FRAME_NAME, &data)
            .map_err(|e| AppError::Prompt(format!("Failed to render prompt: {}", e)))?;

        tracing::debug!(
            context_blocks = blocks.len(),
            prompt_chars = text.chars().count(),
            "Assembled prompt"
        );

        Ok(AssembledPrompt {
            text,
            context_blocks: blocks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::template_from_text;

    const TEMPLATE: &str = "You answer delivery questions using only the policy context.\n\
        If the context does not cover the question, reply \"escalate: <reason>\".";

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(template_from_text(TEMPLATE).unwrap()).unwrap()
    }

    #[test]
    fn test_sections_appear_in_order() {
        let blocks = vec![
            ContextBlock::new("safe_drop.md", None, "Parcels may be left in a safe place."),
            ContextBlock::new("returns.md", None, "Returns are accepted within 30 days."),
        ];
        let question = "Can my parcel be left at the door?";

        let prompt = assembler().assemble(&blocks, question).unwrap();
        let text = &prompt.text;

        assert!(text.starts_with(TEMPLATE));
        assert!(text.ends_with(&format!("Question: {}", question)));

        let ctx = text.find("Context:").unwrap();
        let first = text.find("Parcels may be left").unwrap();
        let second = text.find("Returns are accepted").unwrap();
        let q = text.rfind("Question:").unwrap();
        assert!(TEMPLATE.len() <= ctx && ctx < first && first < second && second < q);
        assert_eq!(prompt.context_blocks, 2);
    }

    #[test]
    fn test_exact_layout() {
        let blocks = vec![
            ContextBlock::new("a.md", None, "one"),
            ContextBlock::new("b.pdf", Some(2), "two"),
        ];
        let prompt = PromptAssembler::new(template_from_text("T escalate:").unwrap())
            .unwrap()
            .assemble(&blocks, "q?")
            .unwrap();

        assert_eq!(
            prompt.text,
            "T escalate:\n\nContext:\n---\n[Source: a.md]\none\n\n[Source: b.pdf (page 2)]\ntwo\n---\n\nQuestion: q?"
        );
    }

    #[test]
    fn test_without_annotations() {
        let blocks = vec![ContextBlock::new("a.md", None, "one")];
        let prompt = assembler()
            .with_source_annotations(false)
            .assemble(&blocks, "q")
            .unwrap();

        assert!(!prompt.text.contains("[Source:"));
        assert!(prompt.text.contains("---\none\n---"));
    }

    #[test]
    fn test_braces_and_markup_pass_through_verbatim() {
        let template = template_from_text("Use {{policy}} & <rules>. escalate: if unsure").unwrap();
        let blocks = vec![ContextBlock::new("x.md", None, "Code {{#each}} <b>bold</b>")];
        let prompt = PromptAssembler::new(template)
            .unwrap()
            .assemble(&blocks, "What about {{this}} & \"that\"?")
            .unwrap();

        assert!(prompt.text.starts_with("Use {{policy}} & <rules>."));
        assert!(prompt.text.contains("Code {{#each}} <b>bold</b>"));
        assert!(prompt.text.ends_with("Question: What about {{this}} & \"that\"?"));
    }
}
