//! In-memory vector index with brute-force cosine similarity
//!
//! Suitable for corpora of a few thousand passages and for tests.

use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::RwLock;

use super::VectorIndex;
use crate::errors::{RagError, Result};
use crate::types::{Passage, ScoredPassage};

/// Read-mostly passage store searched by cosine similarity
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    passages: RwLock<Vec<Passage>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages: RwLock::new(passages),
        }
    }

    pub async fn len(&self) -> usize {
        self.passages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.passages.read().await.is_empty()
    }
}

/// Cosine similarity; zero for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPassage>> {
        let passages = self.passages.read().await;

        let mut scored: Vec<ScoredPassage> = passages
            .iter()
            .filter(|p| p.embedding.len() == vector.len())
            .map(|p| ScoredPassage {
                score: cosine_similarity(vector, &p.embedding),
                passage: p.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn upsert(&self, passages: Vec<Passage>) -> Result<()> {
        let mut stored = self.passages.write().await;
        for passage in passages {
            if passage.embedding.is_empty() {
                return Err(RagError::IndexUnavailable(format!(
                    "Passage {} has no embedding",
                    passage.id
                )));
            }
            match stored.iter_mut().find(|p| p.id == passage.id) {
                Some(existing) => *existing = passage,
                None => stored.push(passage),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, embedding: Vec<f32>) -> Passage {
        Passage::new(id, format!("text {}", id), "test").with_embedding(embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = InMemoryIndex::with_passages(vec![
            passage("far", vec![0.0, 1.0]),
            passage("near", vec![1.0, 0.1]),
            passage("mid", vec![1.0, 1.0]),
        ]);

        let results = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage.id, "near");
        assert_eq!(results[1].passage.id, "mid");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = InMemoryIndex::new();
        index.upsert(vec![passage("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![passage("a", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(index.len().await, 1);
        let results = index.search(&[0.0, 1.0], 1).await.unwrap();
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = InMemoryIndex::new();
        assert!(index.is_empty().await);
        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_requires_embedding() {
        let index = InMemoryIndex::new();
        let result = index.upsert(vec![Passage::new("x", "no vector", "test")]).await;
        assert!(result.is_err());
    }
}
