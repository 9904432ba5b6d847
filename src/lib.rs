//! Longevity RAG - research-grounded question answering
//!
//! Answers questions about longevity, healthspan and healthy ageing from a
//! curated corpus of research passages, citing the passages it used.
//!
//! # Architecture
//!
//! - **Core**: retrieval, prompt composition, generation and citation
//!   post-processing, driven by [`rag::RagOrchestrator`]
//! - **Capabilities**: embedding, vector index and language model behind
//!   the traits in [`clients`]
//! - **Interface**: one-shot `ask`, interactive `chat`, corpus `ingest`,
//!   `doctor` health checks

pub mod errors;
pub mod types;
pub mod clients;
pub mod context;
pub mod retry;
pub mod rag;
pub mod session;
pub mod corpus;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use rag::{OrchestratorConfig, RagOrchestrator};
pub use session::ConversationSession;
pub use types::{Confidence, GeneratedAnswer};

// Interface layer
pub mod bootstrap;
pub mod cli;
pub mod doctor;
pub mod repl;
pub mod telemetry;
