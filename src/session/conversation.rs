//! Bounded conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::types::ConversationTurn;

/// Default cap on stored turns
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Ordered turn history for one conversation.
///
/// Never holds more than `max_turns` turns; appending past the cap evicts
/// the oldest. Callers sharing a session between tasks wrap it in a
/// `tokio::sync::Mutex` so that requests on it run one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    max_turns: usize,
    turns: VecDeque<ConversationTurn>,
}

impl ConversationSession {
    pub fn new(max_turns: usize) -> Self {
        Self::with_id(Uuid::new_v4(), max_turns)
    }

    pub fn with_id(id: Uuid, max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            id,
            created_at: Utc::now(),
            max_turns,
            turns: VecDeque::with_capacity(max_turns),
        }
    }

    /// Append a turn, evicting the oldest when over the cap
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        self.enforce_cap();
    }

    /// Re-apply the cap, e.g. after deserializing
    pub fn set_max_turns(&mut self, max_turns: usize) {
        self.max_turns = max_turns.max(1);
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}
