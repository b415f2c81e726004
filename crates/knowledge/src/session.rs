//! Conversation transcript owned by one caller.

use crate::rag::Answer;
use serde::{Deserialize, Serialize};

/// Append-only list of answered questions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    turns: Vec<Answer>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, answer: Answer) {
        self.turns.push(answer);
    }

    pub fn turns(&self) -> &[Answer] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns the model answered from policy.
    pub fn answered_count(&self) -> usize {
        self.turns.iter().filter(|a| !a.is_escalated).count()
    }

    /// Turns handed off to a human.
    pub fn escalated_count(&self) -> usize {
        self.turns.iter().filter(|a| a.is_escalated).count()
    }
}
