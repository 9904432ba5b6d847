//! Terminal rendering for answers, sources and errors

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::errors::RagError;
use crate::types::{Confidence, ConversationTurn, GeneratedAnswer, SourceRef};

const LOW_CONFIDENCE_NOTE: &str = "Note: none of the retrieved research was cited; treat this answer with caution.";
const NO_CONTEXT_NOTE: &str = "Note: no supporting research was available, so this answer is not grounded in the knowledge base.";
const MEDICAL_DISCLAIMER: &str = "This is general information, not medical advice.";

/// Display manager for terminal output
pub struct DisplayManager {
    show_progress: bool,
    show_details: bool,
}

impl DisplayManager {
    pub fn new(show_progress: bool, show_details: bool) -> Self {
        DisplayManager {
            show_progress,
            show_details,
        }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, model: &str, session_id: &str, resumed_turns: usize) {
        let width = 64;
        let title = format!("  Longevity RAG {} - Research-Grounded Answers", version);
        let info = format!("  Model: {} | Session: {}", model, session_id);

        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", "=".repeat(width).cyan());
        if resumed_turns > 0 {
            println!("{}", format!("Resumed session with {} turns.", resumed_turns).dimmed());
        }
        println!(
            "Ask a question (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while a request is in flight
    pub fn start_spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn show_answer(&self, answer: &GeneratedAnswer) {
        println!("\n{}\n", format_answer(answer, self.show_details));
    }

    pub fn show_sources(&self, sources: &[SourceRef]) {
        println!("{}", format_sources(sources));
    }

    /// Apologetic message plus the machine-readable kind
    pub fn show_error(&self, error: &RagError) {
        eprintln!(
            "{} {}",
            error.user_message().red(),
            format!("[{}]", error.root_cause().kind()).dimmed()
        );
    }

    pub fn show_info(&self, message: &str) {
        println!("{}", message.cyan());
    }

    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }
}

fn confidence_label(confidence: Confidence) -> ColoredString {
    match confidence {
        Confidence::High => "high".green().bold(),
        Confidence::Low => "low".yellow().bold(),
        Confidence::None => "none".red().bold(),
    }
}

/// Answer text, sources, confidence and any caveat
pub fn format_answer(answer: &GeneratedAnswer, show_details: bool) -> String {
    let mut out = answer.text.clone();

    if !answer.sources.is_empty() {
        out.push_str("\n\n");
        out.push_str(&format_sources(&answer.sources));
    }

    out.push_str(&format!("\n\nConfidence: {}", confidence_label(answer.confidence)));
    if show_details {
        out.push_str(&format!(" {}", format!("({}ms)", answer.latency_ms).dimmed()));
    }

    let note = match answer.confidence {
        Confidence::High => None,
        Confidence::Low => Some(LOW_CONFIDENCE_NOTE),
        Confidence::None => Some(NO_CONTEXT_NOTE),
    };
    if let Some(note) = note {
        out.push_str(&format!("\n{}", note.yellow()));
    }
    out.push_str(&format!("\n{}", MEDICAL_DISCLAIMER.dimmed()));

    out
}

pub fn format_sources(sources: &[SourceRef]) -> String {
    if sources.is_empty() {
        return "No sources cited.".to_string();
    }

    let mut lines = vec!["Sources:".bold().to_string()];
    for source in sources {
        lines.push(format!(
            "  [{}] {} {}",
            source.marker,
            source.source_reference,
            format!("(relevance {:.2})", source.score).dimmed()
        ));
    }
    lines.join("\n")
}

/// Last `limit` turns, oldest first
pub fn format_history(turns: &[ConversationTurn], limit: usize) -> String {
    if turns.is_empty() {
        return "No conversation yet.".to_string();
    }

    let skip = turns.len().saturating_sub(limit);
    turns
        .iter()
        .skip(skip)
        .map(|turn| {
            format!(
                "{} {}: {}",
                turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
                turn.role.label().bold(),
                turn.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn answer(confidence: Confidence, sources: Vec<SourceRef>) -> GeneratedAnswer {
        GeneratedAnswer {
            text: "Caloric restriction extends lifespan in several species [1].".to_string(),
            cited_passage_ids: sources.iter().map(|s| s.passage_id.clone()).collect::<BTreeSet<_>>(),
            confidence,
            latency_ms: 42,
            sources,
            degraded: false,
        }
    }

    #[test]
    fn test_format_grounded_answer() {
        let sources = vec![SourceRef {
            marker: 1,
            passage_id: "cr-1".to_string(),
            source_reference: "https://example.org/cr".to_string(),
            score: 0.91,
        }];
        let out = format_answer(&answer(Confidence::High, sources), true);

        assert!(out.contains("[1] https://example.org/cr"));
        assert!(out.contains("high"));
        assert!(out.contains("42ms"));
        assert!(!out.contains(NO_CONTEXT_NOTE));
    }

    #[test]
    fn test_format_ungrounded_answer_has_note() {
        let out = format_answer(&answer(Confidence::None, Vec::new()), false);
        assert!(out.contains(NO_CONTEXT_NOTE));
        assert!(!out.contains("42ms"));
        assert!(out.contains(MEDICAL_DISCLAIMER));
    }

    #[test]
    fn test_format_history_limit() {
        let turns = vec![
            ConversationTurn::user("first question"),
            ConversationTurn::assistant("first answer"),
            ConversationTurn::user("second question"),
        ];
        let out = format_history(&turns, 2);
        assert!(!out.contains("first question"));
        assert!(out.contains("first answer"));
        assert!(out.contains("second question"));
        assert_eq!(format_history(&[], 5), "No conversation yet.");
    }
}
