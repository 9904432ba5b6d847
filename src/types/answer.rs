//! Generated answer with provenance

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How well an answer is grounded in retrieved passages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Context was retrieved and the answer cites it
    High,
    /// Context was retrieved but the answer cites none of it
    Low,
    /// No context was available (degraded mode or no relevant passage)
    None,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Low => "low",
            Confidence::None => "none",
        }
    }
}

/// A cited passage as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub marker: usize,
    pub passage_id: String,
    pub source_reference: String,
    pub score: f32,
}

/// Result of one orchestrator invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    /// Always a subset of the ids in the context used for this answer
    pub cited_passage_ids: BTreeSet<String>,
    pub confidence: Confidence,
    pub latency_ms: u64,
    /// Cited passages in marker order
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// Retrieval failed and the answer was generated without context
    #[serde(default)]
    pub degraded: bool,
}

impl GeneratedAnswer {
    pub fn is_grounded(&self) -> bool {
        self.confidence == Confidence::High
    }
}
