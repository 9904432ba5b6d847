//! Session persistence as pretty JSON files
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{RagError, Result};
use crate::session::conversation::{ConversationSession, DEFAULT_MAX_TURNS};

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Base directory for session storage
    pub storage_dir: PathBuf,
    /// Maximum sessions to keep
    pub max_sessions: usize,
    /// Turn cap re-applied on load
    pub max_turns: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        let storage_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".longevity-rag")
            .join("sessions");

        Self {
            storage_dir,
            max_sessions: 100,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// Saves and restores conversation sessions
pub struct SessionStore {
    config: PersistenceConfig,
}

impl SessionStore {
    /// Create the store, creating its directory if needed
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        if !config.storage_dir.exists() {
            fs::create_dir_all(&config.storage_dir)?;
        }

        Ok(Self { config })
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.config.storage_dir.join(format!("session_{}.json", id))
    }

    /// Save session to disk
    pub fn save(&self, session: &ConversationSession) -> Result<PathBuf> {
        let path = self.path_for(&session.id);
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&path, json)?;
        debug!(session = %session.id, turns = session.len(), "session saved");

        self.cleanup_old_sessions()?;
        Ok(path)
    }

    /// Load session from disk
    pub fn load(&self, id: &Uuid) -> Result<ConversationSession> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(RagError::Config(format!("No saved session with id {}", id)));
        }

        let json = fs::read_to_string(&path)?;
        let mut session: ConversationSession = serde_json::from_str(&json)?;
        session.set_max_turns(self.config.max_turns);
        Ok(session)
    }

    /// Load a saved session or start a fresh one with that id
    pub fn load_or_create(&self, id: &Uuid) -> Result<ConversationSession> {
        if self.path_for(id).exists() {
            self.load(id)
        } else {
            Ok(ConversationSession::with_id(*id, self.config.max_turns))
        }
    }

    /// List all saved session ids
    pub fn list(&self) -> Result<Vec<Uuid>> {
        if !self.config.storage_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.config.storage_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("session_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| Uuid::parse_str(n).ok())
            {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Delete session
    pub fn delete(&self, id: &Uuid) -> Result<()> {
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Keep only the `max_sessions` most recently created sessions
    fn cleanup_old_sessions(&self) -> Result<()> {
        let ids = self.list()?;
        if ids.len() <= self.config.max_sessions {
            return Ok(());
        }

        let mut sessions = Vec::new();
        for id in ids {
            match self.load(&id) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(session = %id, error = %e, "failed to load session during cleanup"),
            }
        }

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for session in sessions.iter().skip(self.config.max_sessions) {
            self.delete(&session.id)?;
        }

        Ok(())
    }

    pub fn storage_dir(&self) -> &Path {
        &self.config.storage_dir
    }
}
