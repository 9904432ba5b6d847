//! Capability interfaces for the external collaborators
//!
//! The pipeline only ever talks to these traits. Concrete adapters
//! (Ollama, OpenAI, Qdrant, in-memory) are injected at construction so
//! tests can substitute deterministic fakes.

pub mod http;
pub mod memory;
pub mod ollama;
pub mod openai;
pub mod qdrant;

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{Passage, ScoredPassage};

pub use memory::InMemoryIndex;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use qdrant::QdrantIndex;

/// Converts text to a fixed-length vector
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Fails with `RagError::Embedding`
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Lightweight liveness probe
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Stores passages and answers nearest-neighbour queries
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `limit` passages, ordered by descending similarity.
    /// Fails with `RagError::IndexUnavailable`.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPassage>>;

    /// Insert or replace passages by id
    async fn upsert(&self, passages: Vec<Passage>) -> Result<()>;

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Produces completions for composed prompts
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Fails with `RagError::Generation { retryable }`
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String>;

    /// Model identifier for logs and reports
    fn model_name(&self) -> &str;

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
