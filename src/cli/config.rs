//! Configuration management for the longevity assistant
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.longevity-rag/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::corpus::ChunkingConfig;
use crate::errors::{RagError, Result};
use crate::rag::{OrchestratorConfig, RetrievalConfig};
use crate::retry::RetryPolicy;
use crate::telemetry::LoggingConfig;

/// Hosted or local model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    Qdrant,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalSection,
    pub prompt: PromptConfig,
    pub session: SessionConfig,
    pub retry: RetryConfig,
    pub corpus: CorpusConfig,
    pub logging: LoggingConfig,
}

/// Language model used for answers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Provider default when unset
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: Provider,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub url: String,
    pub collection: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub top_k: usize,
    pub min_score: f32,
    pub overfetch_factor: usize,
    pub lowercase_query: bool,
    pub dedup_text_similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub token_budget: usize,
    pub max_history_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_turns: usize,
    pub storage_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RetryConfig {
    pub retrieval: RetryPolicy,
    pub generation: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorpusConfig {
    /// File or directory ingested by `ingest` and by the memory backend
    pub path: Option<String>,
    #[serde(flatten)]
    pub chunking: ChunkingConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            base_url: None,
            model: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            base_url: None,
            model: None,
            dimensions: 768,
            timeout_secs: 30,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Memory,
            url: "http://localhost:6334".to_string(),
            collection: "longevity_passages".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for RetrievalSection {
    fn default() -> Self {
        let defaults = RetrievalConfig::default();
        Self {
            top_k: defaults.top_k,
            min_score: defaults.min_score,
            overfetch_factor: defaults.overfetch_factor,
            lowercase_query: defaults.lowercase_query,
            dedup_text_similarity: defaults.dedup_text_similarity,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            token_budget: 4000,
            max_history_turns: 6,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            storage_dir: "~/.longevity-rag/sessions".to_string(),
        }
    }
}

fn config_error(message: impl Into<String>) -> RagError {
    RagError::Config(message.into())
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config {}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| config_error(format!("Failed to parse config {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Standard config location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".longevity-rag").join("config.toml"))
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if !(1..=20).contains(&r.top_k) {
            return Err(config_error(format!("top_k must be between 1 and 20, got {}", r.top_k)));
        }
        if !(0.0..=1.0).contains(&r.min_score) {
            return Err(config_error("min_score must be between 0.0 and 1.0"));
        }
        if r.overfetch_factor == 0 {
            return Err(config_error("overfetch_factor must be at least 1"));
        }
        if !(r.dedup_text_similarity > 0.0 && r.dedup_text_similarity <= 1.0) {
            return Err(config_error("dedup_text_similarity must be in (0.0, 1.0]"));
        }

        if self.prompt.token_budget == 0 {
            return Err(config_error("token_budget must be greater than 0"));
        }
        if !(1..=4000).contains(&self.llm.max_tokens) {
            return Err(config_error("max_tokens must be between 1 and 4000"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(config_error("temperature must be between 0.0 and 2.0"));
        }
        if self.embedding.dimensions == 0 {
            return Err(config_error("embedding dimensions must be greater than 0"));
        }

        if self.retry.retrieval.max_attempts == 0 || self.retry.generation.max_attempts == 0 {
            return Err(config_error("retry max_attempts must be at least 1"));
        }
        if self.session.max_turns < 2 {
            return Err(config_error("session max_turns must be at least 2"));
        }

        self.corpus.chunking.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| config_error(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Render as TOML for display
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| config_error(format!("Failed to serialize config: {}", e)))
    }

    /// Explicit settings for the orchestrator
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            retrieval: RetrievalConfig {
                top_k: self.retrieval.top_k,
                min_score: self.retrieval.min_score,
                overfetch_factor: self.retrieval.overfetch_factor,
                lowercase_query: self.retrieval.lowercase_query,
                dedup_text_similarity: self.retrieval.dedup_text_similarity,
                embedding_dimensions: Some(self.embedding.dimensions),
                embed_timeout_ms: self.embedding.timeout_secs * 1000,
                search_timeout_ms: self.index.timeout_secs * 1000,
            },
            token_budget: self.prompt.token_budget,
            max_history_turns: self.prompt.max_history_turns,
            max_tokens: self.llm.max_tokens,
            generation_timeout_ms: self.llm.timeout_secs * 1000,
            retrieval_retry: self.retry.retrieval.clone(),
            generation_retry: self.retry.generation.clone(),
        }
    }

    /// API key from the environment, after loading `.env`
    pub fn api_key(&self) -> Result<String> {
        let _ = dotenvy::dotenv();
        match std::env::var(&self.llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(config_error(format!(
                "Environment variable {} is not set",
                self.llm.api_key_env
            ))),
        }
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get session storage directory
    pub fn session_dir(&self) -> PathBuf {
        Self::expand_path(&self.session.storage_dir)
    }

    pub fn corpus_path(&self) -> Option<PathBuf> {
        self.corpus.path.as_deref().map(Self::expand_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.prompt.token_budget, 4000);
        assert_eq!(config.corpus.chunking.chunk_size, 1000);
        assert_eq!(config.llm.provider, Provider::Ollama);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"

[retrieval]
top_k = 3

[retry.generation]
max_attempts = 5

[corpus]
path = "data/corpus.jsonl"
chunk_size = 500

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.llm.provider, Provider::OpenAi);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.min_score, 0.7);
        assert_eq!(config.retry.generation.max_attempts, 5);
        assert_eq!(config.retry.retrieval.max_attempts, 3);
        assert_eq!(config.corpus.chunking.chunk_size, 500);
        assert_eq!(config.corpus.chunking.chunk_overlap, 200);
        assert_eq!(config.logging.format, crate::telemetry::LogFormat::Json);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retrieval.min_score = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.corpus.chunking.chunk_overlap = 1000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.max_turns = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = toml::from_str::<Config>("[llm]\nprovider = \"mystery\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.index.backend = IndexBackend::Qdrant;
        config.save(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.index.backend, IndexBackend::Qdrant);
    }

    #[test]
    fn test_orchestrator_config() {
        let config = Config::default();
        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.retrieval.embedding_dimensions, Some(768));
        assert_eq!(orchestrator.retrieval.embed_timeout_ms, 30_000);
        assert_eq!(orchestrator.max_tokens, 1000);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path("~/.longevity-rag");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert_eq!(Config::expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }
}
