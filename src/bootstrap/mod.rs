//! Component wiring from configuration
//!
//! Builds the embedding client, vector index and language model selected
//! in `Config`, and the orchestrator and ingestor that use them.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::cli::config::{Config, IndexBackend, Provider};
use crate::clients::{ollama, openai};
use crate::clients::{EmbeddingClient, InMemoryIndex, LanguageModelClient, OllamaClient, OpenAiClient, QdrantIndex, VectorIndex};
use crate::corpus::{self, IngestionReport, Ingestor, TextChunker};
use crate::errors::Result;
use crate::rag::RagOrchestrator;

/// The three collaborators of the pipeline
#[derive(Clone)]
pub struct Components {
    pub embedder: Arc<dyn EmbeddingClient>,
    pub index: Arc<dyn VectorIndex>,
    pub llm: Arc<dyn LanguageModelClient>,
    pub backend: IndexBackend,
}

impl Components {
    /// Connect to every configured service
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(config)?;
        let llm = build_llm(config)?;
        let index: Arc<dyn VectorIndex> = match config.index.backend {
            IndexBackend::Memory => Arc::new(InMemoryIndex::new()),
            IndexBackend::Qdrant => Arc::new(
                QdrantIndex::connect(
                    &config.index.url,
                    &config.index.collection,
                    config.embedding.dimensions,
                    Duration::from_secs(config.index.timeout_secs),
                )
                .await?,
            ),
        };

        info!(
            llm = llm.model_name(),
            backend = ?config.index.backend,
            "components ready"
        );

        Ok(Self {
            embedder,
            index,
            llm,
            backend: config.index.backend,
        })
    }

    pub fn orchestrator(&self, config: &Config) -> RagOrchestrator {
        RagOrchestrator::new(
            self.embedder.clone(),
            self.index.clone(),
            self.llm.clone(),
            config.orchestrator_config(),
        )
    }

    pub fn ingestor(&self, config: &Config) -> Result<Ingestor> {
        let chunker = TextChunker::new(config.corpus.chunking.clone())?;
        Ok(Ingestor::new(self.embedder.clone(), self.index.clone(), chunker)
            .with_retry(config.retry.retrieval.clone())
            .with_dimensions(config.embedding.dimensions))
    }

    /// The memory backend starts empty; fill it from `[corpus].path`
    pub async fn preload(&self, config: &Config) -> Result<Option<IngestionReport>> {
        if self.backend != IndexBackend::Memory {
            return Ok(None);
        }
        let Some(path) = config.corpus_path() else {
            debug!("no corpus path configured, memory index stays empty");
            return Ok(None);
        };

        let documents = corpus::load_path(&path)?;
        let report = self.ingestor(config)?.ingest(&documents).await?;
        Ok(Some(report))
    }
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingClient>> {
    let section = &config.embedding;
    let timeout = Duration::from_secs(section.timeout_secs);

    Ok(match section.provider {
        Provider::Ollama => Arc::new(OllamaClient::with_config(
            section.base_url.as_deref().unwrap_or(ollama::DEFAULT_OLLAMA_URL),
            section.model.as_deref().unwrap_or(ollama::DEFAULT_EMBEDDING_MODEL),
            timeout,
        )?),
        Provider::OpenAi => Arc::new(
            OpenAiClient::new(
                section.base_url.as_deref().unwrap_or(openai::DEFAULT_OPENAI_URL),
                &config.api_key()?,
                section.model.as_deref().unwrap_or(openai::DEFAULT_EMBEDDING_MODEL),
                timeout,
            )?
            // Vectors must match the configured index width
            .with_dimensions(section.dimensions),
        ),
    })
}

fn build_llm(config: &Config) -> Result<Arc<dyn LanguageModelClient>> {
    let section = &config.llm;
    let timeout = Duration::from_secs(section.timeout_secs);

    Ok(match section.provider {
        Provider::Ollama => Arc::new(
            OllamaClient::with_config(
                section.base_url.as_deref().unwrap_or(ollama::DEFAULT_OLLAMA_URL),
                section.model.as_deref().unwrap_or(ollama::DEFAULT_MODEL),
                timeout,
            )?
            .with_temperature(section.temperature),
        ),
        Provider::OpenAi => Arc::new(
            OpenAiClient::new(
                section.base_url.as_deref().unwrap_or(openai::DEFAULT_OPENAI_URL),
                &config.api_key()?,
                section.model.as_deref().unwrap_or(openai::DEFAULT_CHAT_MODEL),
                timeout,
            )?
            .with_temperature(section.temperature),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_components() {
        let config = Config::default();
        let components = Components::from_config(&config).await.unwrap();
        assert_eq!(components.backend, IndexBackend::Memory);
        assert_eq!(components.llm.model_name(), ollama::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_preload_without_corpus_is_noop() {
        let config = Config::default();
        let components = Components::from_config(&config).await.unwrap();
        assert!(components.preload(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_preload_missing_corpus_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.corpus.path = Some(dir.path().join("missing.json").to_string_lossy().to_string());

        let components = Components::from_config(&config).await.unwrap();
        assert!(components.preload(&config).await.is_err());
    }
}
