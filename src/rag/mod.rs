//! Retrieval-augmented answering
//!
//! Components:
//! - Retrieval: embed, search, filter, rank and deduplicate passages
//! - Topics: specialised system instructions per question topic
//! - Prompt: budgeted prompt composition with numbered citations
//! - Citations: marker extraction, validation and confidence
//! - State: per-request stage machine
//! - Pipeline: end-to-end orchestration with retry and degraded mode

pub mod citations;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod state;
pub mod topics;

pub use pipeline::{OrchestratorConfig, RagOrchestrator};
pub use prompt::{ComposedPrompt, PromptComposer};
pub use retrieval::{RetrievalConfig, RetrievalStage};
pub use state::{PipelineEvent, PipelineState};
pub use topics::Topic;
