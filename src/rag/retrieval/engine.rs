// Retrieval engine: question text in, ranked RetrievedContext out
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::dedup::deduplicate;
use crate::clients::{EmbeddingClient, VectorIndex};
use crate::errors::{RagError, Result};
use crate::types::{Query, RetrievedContext};

/// Retrieval parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of passages returned
    pub top_k: usize,
    /// Minimum similarity (0.0 to 1.0)
    pub min_score: f32,
    /// Candidates requested from the index per returned passage
    pub overfetch_factor: usize,
    /// Lowercase the query before embedding
    pub lowercase_query: bool,
    /// Word-set similarity at which same-source passages count as duplicates
    pub dedup_text_similarity: f64,
    /// Expected embedding length; unchecked when `None`
    pub embedding_dimensions: Option<usize>,
    pub embed_timeout_ms: u64,
    pub search_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.7,
            overfetch_factor: 2,
            lowercase_query: true,
            dedup_text_similarity: 0.9,
            embedding_dimensions: None,
            embed_timeout_ms: 30_000,
            search_timeout_ms: 30_000,
        }
    }
}

/// Wraps the embedding client and vector index
#[derive(Clone)]
pub struct RetrievalStage {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

/// Run a future under a deadline, mapping expiry to `RagError::Timeout`
pub(crate) async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RagError::Timeout {
            operation,
            duration_ms: limit.as_millis() as u64,
        }),
    }
}

impl RetrievalStage {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, index: Arc<dyn VectorIndex>, config: RetrievalConfig) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Trim, collapse whitespace and optionally lowercase
    pub fn normalize(&self, raw: &str) -> String {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.config.lowercase_query {
            collapsed.to_lowercase()
        } else {
            collapsed
        }
    }

    /// Normalize and embed a question
    pub async fn prepare_query(&self, raw: &str) -> Result<Query> {
        let normalized_text = self.normalize(raw);
        let embedding = with_timeout(
            "embedding",
            Duration::from_millis(self.config.embed_timeout_ms),
            self.embedder.embed(&normalized_text),
        )
        .await?;

        if embedding.is_empty() {
            return Err(RagError::Embedding("Embedding client returned an empty vector".to_string()));
        }
        if let Some(expected) = self.config.embedding_dimensions {
            if embedding.len() != expected {
                return Err(RagError::EmbeddingDimension {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        Ok(Query {
            raw_text: raw.to_string(),
            normalized_text,
            embedding,
        })
    }

    /// Retrieve with the configured `top_k` and `min_score`
    pub async fn retrieve_default(&self, query_text: &str) -> Result<RetrievedContext> {
        self.retrieve(query_text, self.config.top_k, self.config.min_score).await
    }

    /// Ranked, deduplicated passages scoring at least `min_score`.
    ///
    /// An empty context is a valid outcome when nothing clears the
    /// threshold.
    pub async fn retrieve(&self, query_text: &str, top_k: usize, min_score: f32) -> Result<RetrievedContext> {
        if top_k == 0 {
            return Ok(RetrievedContext::empty());
        }

        let query = self.prepare_query(query_text).await?;
        let limit = top_k.saturating_mul(self.config.overfetch_factor.max(1));

        let mut candidates = with_timeout(
            "vector search",
            Duration::from_millis(self.config.search_timeout_ms),
            self.index.search(&query.embedding, limit),
        )
        .await?;
        let fetched = candidates.len();

        candidates.retain(|c| c.score.is_finite() && c.score >= min_score);
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let mut ranked = deduplicate(candidates, self.config.dedup_text_similarity);
        ranked.truncate(top_k);

        debug!(
            query = %query.normalized_text,
            fetched,
            returned = ranked.len(),
            top_k,
            min_score,
            "retrieval complete"
        );

        Ok(RetrievedContext::from_ranked(ranked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryIndex;
    use crate::types::Passage;
    use async_trait::async_trait;
    use quickcheck_macros::quickcheck;

    /// Embeds every text to the same unit vector
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::Embedding("model not loaded".to_string()))
        }
    }

    /// Passage whose cosine similarity to [1, 0] is exactly `score`
    fn passage_with_score(id: &str, source: &str, text: &str, score: f32) -> Passage {
        let other = (1.0 - score * score).max(0.0).sqrt();
        Passage::new(id, text, source).with_embedding(vec![score, other])
    }

    fn stage(passages: Vec<Passage>, config: RetrievalConfig) -> RetrievalStage {
        RetrievalStage::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(InMemoryIndex::with_passages(passages)),
            config,
        )
    }

    #[test]
    fn test_normalize() {
        let s = stage(vec![], RetrievalConfig::default());
        assert_eq!(s.normalize("  Does   Fasting\nWork? "), "does fasting work?");

        let keep_case = stage(
            vec![],
            RetrievalConfig {
                lowercase_query: false,
                ..Default::default()
            },
        );
        assert_eq!(keep_case.normalize(" NAD+  precursors "), "NAD+ precursors");
    }

    #[tokio::test]
    async fn test_filters_by_min_score_and_truncates() {
        let s = stage(
            vec![
                passage_with_score("a", "s1", "alpha text", 0.95),
                passage_with_score("b", "s2", "beta text", 0.85),
                passage_with_score("c", "s3", "gamma text", 0.75),
                passage_with_score("d", "s4", "delta text", 0.5),
            ],
            RetrievalConfig::default(),
        );

        let context = s.retrieve("question", 2, 0.7).await.unwrap();
        assert_eq!(context.ids(), vec!["a", "b"]);

        let context = s.retrieve("question", 10, 0.7).await.unwrap();
        assert_eq!(context.ids(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_nothing_above_threshold_is_empty_not_error() {
        let s = stage(vec![passage_with_score("a", "s1", "text", 0.3)], RetrievalConfig::default());
        let context = s.retrieve("question", 5, 0.7).await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_overfetch_allows_dedup_to_refill() {
        // Duplicate of "a" would occupy a slot without overfetch
        let s = stage(
            vec![
                passage_with_score("a", "s1", "caloric restriction extends lifespan", 0.95),
                passage_with_score("a-dup", "s1", "Caloric restriction extends lifespan.", 0.94),
                passage_with_score("b", "s2", "rapamycin extends lifespan", 0.90),
            ],
            RetrievalConfig::default(),
        );

        let context = s.retrieve("question", 2, 0.7).await.unwrap();
        assert_eq!(context.ids(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_embedding_error() {
        let s = stage(
            vec![],
            RetrievalConfig {
                embedding_dimensions: Some(768),
                ..Default::default()
            },
        );
        let err = s.retrieve("question", 5, 0.7).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingDimension { expected: 768, actual: 2 }));
        assert_eq!(err.kind(), "embedding_error");
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let s = RetrievalStage::new(
            Arc::new(FailingEmbedder),
            Arc::new(InMemoryIndex::new()),
            RetrievalConfig::default(),
        );
        assert!(matches!(
            s.retrieve("question", 5, 0.7).await,
            Err(RagError::Embedding(_))
        ));
    }

    #[quickcheck]
    fn prop_scores_ordered_and_above_threshold(raw_scores: Vec<u8>, top_k: u8, threshold: u8) -> bool {
        let min_score = (threshold % 101) as f32 / 100.0;
        let top_k = (top_k % 10) as usize + 1;
        let passages: Vec<Passage> = raw_scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                passage_with_score(
                    &format!("p{}", i),
                    &format!("source-{}", i),
                    &format!("passage number {}", i),
                    (*s % 101) as f32 / 100.0,
                )
            })
            .collect();

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let context = runtime
            .block_on(stage(passages, RetrievalConfig::default()).retrieve("q", top_k, min_score))
            .unwrap();

        let scores = context.scores();
        context.len() <= top_k
            && scores.iter().all(|s| *s >= min_score)
            && scores.windows(2).all(|w| w[0] >= w[1])
    }
}
