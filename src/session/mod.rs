//! Conversation sessions and their on-disk persistence

pub mod conversation;
pub mod persistence;

pub use conversation::ConversationSession;
pub use persistence::{PersistenceConfig, SessionStore};
