//! Citation extraction and confidence scoring
//!
//! Answers cite passages with bracketed markers such as `[2]` or
//! `[1, 3]`. Markers that do not map to a passage included in the prompt
//! are dropped without failing the request.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::rag::prompt::ComposedPrompt;
use crate::types::{Confidence, RetrievedContext, SourceRef};

static MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+(?:\s*,\s*\d+)*)\]").expect("citation marker pattern is valid")
});

/// Validated citations found in a generated answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationReport {
    pub cited_passage_ids: BTreeSet<String>,
    /// One entry per valid marker, ascending
    pub sources: Vec<SourceRef>,
    pub invalid_markers: Vec<usize>,
}

impl CitationReport {
    pub fn has_citations(&self) -> bool {
        !self.cited_passage_ids.is_empty()
    }
}

/// All marker numbers in `text`, ascending and without repeats
pub fn extract_markers(text: &str) -> Vec<usize> {
    let markers: BTreeSet<usize> = MARKER_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|group| {
            group
                .as_str()
                .split(',')
                .filter_map(|n| n.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .collect();
    markers.into_iter().collect()
}

/// Map markers in `text` to passages that were both shown in the prompt
/// and present in the retrieved context
pub fn resolve(text: &str, prompt: &ComposedPrompt, context: &RetrievedContext) -> CitationReport {
    let mut report = CitationReport::default();

    for marker in extract_markers(text) {
        let entry = prompt
            .passage_for_marker(marker)
            .and_then(|id| context.get(id));

        match entry {
            Some(scored) => {
                report.cited_passage_ids.insert(scored.passage.id.clone());
                report.sources.push(SourceRef {
                    marker,
                    passage_id: scored.passage.id.clone(),
                    source_reference: scored.passage.source_reference.clone(),
                    score: scored.score,
                });
            }
            None => report.invalid_markers.push(marker),
        }
    }

    if !report.invalid_markers.is_empty() {
        debug!(invalid = ?report.invalid_markers, "dropped citations with no matching passage");
    }

    report
}

/// `none` without context, `high` with at least one valid citation,
/// `low` otherwise
pub fn confidence(context: &RetrievedContext, report: &CitationReport) -> Confidence {
    if context.is_empty() {
        Confidence::None
    } else if report.has_citations() {
        Confidence::High
    } else {
        Confidence::Low
    }
}
