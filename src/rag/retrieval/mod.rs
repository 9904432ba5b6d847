//! Retrieval stage: embed, search, filter, deduplicate, rank
pub mod dedup;
pub mod engine;

pub use engine::{RetrievalConfig, RetrievalStage};
