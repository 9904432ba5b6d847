//! Error types for the longevity RAG assistant
//!
//! One taxonomy covers every stage of the pipeline. Each variant knows
//! whether it is worth retrying, which machine-readable kind it reports
//! and what a user should be told when it surfaces.

use serde_json::json;
use thiserror::Error;

use crate::rag::state::PipelineState;

/// Main error type for the RAG pipeline and its collaborators
#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding client failed to produce a vector
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Embedding client returned a vector of the wrong size
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },

    /// Vector index could not be reached or rejected the search
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// System instructions and question alone exceed the token budget
    #[error("Prompt composition failed: {required} tokens required exceeds budget of {budget} tokens")]
    Composition { required: usize, budget: usize },

    /// Language model failed to generate a completion
    #[error("Generation failed: {message}")]
    Generation { message: String, retryable: bool },

    /// External call exceeded its deadline
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout {
        operation: &'static str,
        duration_ms: u64,
    },

    /// Question rejected before any stage ran
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Pipeline reached the failed state
    #[error("Orchestrator failed during {stage:?}: {cause}")]
    OrchestratorFailed {
        stage: PipelineState,
        #[source]
        cause: Box<RagError>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus loading or chunking errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    /// Whether a bounded retry loop should try the operation again
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Embedding(_) => true,
            RagError::EmbeddingDimension { .. } => true,
            RagError::IndexUnavailable(_) => true,
            RagError::Timeout { .. } => true,
            RagError::Generation { retryable, .. } => *retryable,

            RagError::Composition { .. } => false,
            RagError::InvalidQuery(_) => false,
            RagError::OrchestratorFailed { .. } => false,
            RagError::Config(_) => false,
            RagError::Corpus(_) => false,
            RagError::Io(_) => false,
            RagError::Serialization(_) => false,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Embedding(_) | RagError::EmbeddingDimension { .. } => "embedding_error",
            RagError::IndexUnavailable(_) => "index_unavailable",
            RagError::Composition { .. } => "composition_error",
            RagError::Generation { .. } => "generation_error",
            RagError::Timeout { .. } => "timeout",
            RagError::InvalidQuery(_) => "invalid_query",
            RagError::OrchestratorFailed { .. } => "orchestrator_failed",
            RagError::Config(_) => "configuration_error",
            RagError::Corpus(_) => "corpus_error",
            RagError::Io(_) => "io_error",
            RagError::Serialization(_) => "serialization_error",
        }
    }

    /// Innermost error, unwrapping orchestrator failures
    pub fn root_cause(&self) -> &RagError {
        match self {
            RagError::OrchestratorFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Pipeline stage the request failed in, if any
    pub fn failed_stage(&self) -> Option<PipelineState> {
        match self {
            RagError::OrchestratorFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Apologetic, non-technical message for end users
    pub fn user_message(&self) -> &'static str {
        match self.root_cause() {
            RagError::InvalidQuery(_) => {
                "Sorry, I couldn't understand that question. Could you rephrase it?"
            }
            RagError::Composition { .. } | RagError::Config(_) => {
                "Sorry, the assistant is misconfigured and can't answer right now. Please contact the maintainer."
            }
            RagError::Generation { retryable: false, .. } => {
                "Sorry, the language model declined this request. Please try a different question."
            }
            RagError::Generation { .. } | RagError::Timeout { .. } => {
                "Sorry, the assistant is temporarily unavailable. Please try again in a moment."
            }
            _ => "Sorry, something went wrong while answering your question. Please try again.",
        }
    }

    /// Error payload for API-style consumers
    pub fn to_json(&self) -> serde_json::Value {
        let mut details = serde_json::Map::new();
        if let Some(stage) = self.failed_stage() {
            details.insert("stage".to_string(), json!(stage.display_name()));
            details.insert("cause".to_string(), json!(self.root_cause().kind()));
        }
        details.insert("retryable".to_string(), json!(self.is_retryable()));

        json!({
            "error": self.kind(),
            "message": self.user_message(),
            "details": details,
        })
    }
}
