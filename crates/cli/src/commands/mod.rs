//! Command handlers for the SafeDrop CLI.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use safedrop_knowledge::Answer;

/// Print an answer and its sources for a human reader.
pub(crate) fn print_answer(answer: &Answer) {
    if answer.is_escalated {
        println!("Escalated to a human agent:");
    } else {
        println!("Answer:");
    }
    println!("{}", answer.text);
    println!();

    let citations = answer.citations();
    if citations.is_empty() {
        println!("Sources: (none)");
        return;
    }

    println!("Sources:");
    for citation in &citations {
        println!("{}. {} (score {:.3})", citation.rank, citation.location(), citation.score);
        println!("   {}", citation.snippet);
    }
}

/// JSON shape printed by `ask --json`.
pub(crate) fn answer_json(answer: &Answer) -> serde_json::Value {
    serde_json::json!({
        "question": answer.question,
        "answer": answer.text,
        "isEscalated": answer.is_escalated,
        "sources": answer.citations(),
    })
}
