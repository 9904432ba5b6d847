//! Passages, queries and ranked retrieval results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar metadata value attached to a passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// An ingested unit of knowledge. Immutable once stored in an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    /// Citation-facing origin: source URL, title or file reference
    pub source_reference: String,
    /// May be empty when returned by a remote index that omits vectors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Scalar>,
}

impl Passage {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_reference: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_reference: source_reference.into(),
            embedding: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A question prepared for vector search
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub raw_text: String,
    pub normalized_text: String,
    pub embedding: Vec<f32>,
}

/// Passage paired with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Ranked passages supporting one answer.
///
/// Score-descending, unique by passage id, at most `top_k` entries, every
/// score at or above the configured minimum. Only the retrieval stage
/// builds non-empty contexts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    entries: Vec<ScoredPassage>,
}

impl RetrievedContext {
    /// Context with no supporting passages (degraded mode or no match)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Caller guarantees ordering, uniqueness and threshold
    pub(crate) fn from_ranked(entries: Vec<ScoredPassage>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScoredPassage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scores(&self) -> Vec<f32> {
        self.entries.iter().map(|e| e.score).collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.passage.id.as_str()).collect()
    }

    pub fn contains(&self, passage_id: &str) -> bool {
        self.entries.iter().any(|e| e.passage.id == passage_id)
    }

    pub fn get(&self, passage_id: &str) -> Option<&ScoredPassage> {
        self.entries.iter().find(|e| e.passage.id == passage_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_builder() {
        let passage = Passage::new("p1", "Caloric restriction extends lifespan in mice.", "pubmed:123")
            .with_embedding(vec![0.1, 0.2])
            .with_metadata("year", 2019i64)
            .with_metadata("source", "research_paper");

        assert_eq!(passage.id, "p1");
        assert_eq!(passage.embedding.len(), 2);
        assert_eq!(passage.metadata.get("year"), Some(&Scalar::Int(2019)));
        assert_eq!(passage.metadata["source"].to_string(), "research_paper");
    }

    #[test]
    fn test_scalar_untagged_serde() {
        let json = r#"{"a": true, "b": 3, "c": 0.5, "d": "text"}"#;
        let parsed: BTreeMap<String, Scalar> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed["a"], Scalar::Bool(true));
        assert_eq!(parsed["b"], Scalar::Int(3));
        assert_eq!(parsed["c"], Scalar::Float(0.5));
        assert_eq!(parsed["d"], Scalar::Text("text".to_string()));
    }

    #[test]
    fn test_context_lookup() {
        let context = RetrievedContext::from_ranked(vec![
            ScoredPassage {
                passage: Passage::new("a", "first", "src"),
                score: 0.9,
            },
            ScoredPassage {
                passage: Passage::new("b", "second", "src"),
                score: 0.8,
            },
        ]);

        assert_eq!(context.len(), 2);
        assert_eq!(context.ids(), vec!["a", "b"]);
        assert_eq!(context.scores(), vec![0.9, 0.8]);
        assert!(context.contains("b"));
        assert!(!context.contains("c"));
        assert_eq!(context.get("a").map(|e| e.score), Some(0.9));
        assert!(RetrievedContext::empty().is_empty());
    }
}
