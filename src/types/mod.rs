//! Type definitions module
//!
//! Core data model shared by retrieval, composition and generation.

pub mod answer;
pub mod messages;
pub mod retrieval;

// Re-export commonly used types
pub use answer::{Confidence, GeneratedAnswer, SourceRef};
pub use messages::{ConversationTurn, Role};
pub use retrieval::{Passage, Query, RetrievedContext, Scalar, ScoredPassage};
