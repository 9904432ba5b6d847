//! Per-request pipeline state machine
//!
//! Every `answer()` call walks this machine:
//!
//! ```text
//! Retrieving → Composing → Generating → Postprocessing → Done
//!      └───────────┴───────────┴──────────────┴────────→ Failed
//! ```
//!
//! Retrieval failure does not lead to `Failed`; the request continues in
//! degraded mode with an empty context. `Done` and `Failed` are terminal.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Retrieving,
    Composing,
    Generating,
    Postprocessing,
    /// Answer produced (terminal)
    Done,
    /// Unrecoverable failure (terminal)
    Failed,
}

/// Events that drive transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Context retrieved, possibly empty
    ContextReady,
    /// Retrieval retries exhausted; continue without context
    RetrievalDegraded,
    PromptComposed,
    CompletionReceived,
    AnswerBuilt,
    /// Unrecoverable error in the current stage
    StageFailed,
}

impl PipelineState {
    /// Initial state of every request
    pub fn initial() -> Self {
        PipelineState::Retrieving
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Attempt state transition with validation
    pub fn transition(&self, event: PipelineEvent) -> Result<PipelineState> {
        use PipelineEvent::*;
        use PipelineState::*;

        let next = match (self, event) {
            (Done, _) | (Failed, _) => {
                return Err(RagError::Config(format!(
                    "No transition out of terminal state {:?} on {:?}",
                    self, event
                )))
            }

            (_, StageFailed) => Failed,

            (Retrieving, ContextReady) => Composing,
            (Retrieving, RetrievalDegraded) => Composing,
            (Composing, PromptComposed) => Generating,
            (Generating, CompletionReceived) => Postprocessing,
            (Postprocessing, AnswerBuilt) => Done,

            (from, event) => {
                return Err(RagError::Config(format!(
                    "Invalid pipeline transition from {:?} on {:?}",
                    from, event
                )))
            }
        };

        Ok(next)
    }

    /// Human-readable state name
    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineState::Retrieving => "retrieving",
            PipelineState::Composing => "composing",
            PipelineState::Generating => "generating",
            PipelineState::Postprocessing => "postprocessing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = PipelineState::initial();
        for event in [
            PipelineEvent::ContextReady,
            PipelineEvent::PromptComposed,
            PipelineEvent::CompletionReceived,
            PipelineEvent::AnswerBuilt,
        ] {
            state = state.transition(event).unwrap();
        }
        assert_eq!(state, PipelineState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_degraded_retrieval_continues() {
        let state = PipelineState::Retrieving
            .transition(PipelineEvent::RetrievalDegraded)
            .unwrap();
        assert_eq!(state, PipelineState::Composing);
    }

    #[test]
    fn test_failure_reachable_from_every_active_stage() {
        for state in [
            PipelineState::Retrieving,
            PipelineState::Composing,
            PipelineState::Generating,
            PipelineState::Postprocessing,
        ] {
            assert_eq!(
                state.transition(PipelineEvent::StageFailed).unwrap(),
                PipelineState::Failed
            );
        }
    }

    #[test]
    fn test_terminal_states_reject_events() {
        assert!(PipelineState::Done.transition(PipelineEvent::ContextReady).is_err());
        assert!(PipelineState::Failed.transition(PipelineEvent::StageFailed).is_err());
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        assert!(PipelineState::Retrieving
            .transition(PipelineEvent::CompletionReceived)
            .is_err());
        assert!(PipelineState::Composing
            .transition(PipelineEvent::AnswerBuilt)
            .is_err());
    }
}
