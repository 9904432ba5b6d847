//! Deterministic fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use longevity_rag::clients::{EmbeddingClient, LanguageModelClient, VectorIndex};
use longevity_rag::retry::RetryPolicy;
use longevity_rag::types::{Passage, ScoredPassage};
use longevity_rag::{OrchestratorConfig, RagError, RagOrchestrator, Result};

/// Embeds every text to the same unit vector
pub struct FixedEmbedder;

#[async_trait]
impl EmbeddingClient for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

/// Embedding service that is down for every request
pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::Embedding("model not loaded".to_string()))
    }
}

/// Returns a fixed ranking, or fails every search
pub struct ScriptedIndex {
    results: Vec<ScoredPassage>,
    unavailable: bool,
    pub searches: AtomicUsize,
}

impl ScriptedIndex {
    pub fn returning(results: Vec<ScoredPassage>) -> Self {
        Self {
            results,
            unavailable: false,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn unavailable() -> Self {
        Self {
            results: Vec::new(),
            unavailable: true,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn search(&self, _vector: &[f32], limit: usize) -> Result<Vec<ScoredPassage>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RagError::IndexUnavailable("connection refused".to_string()));
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    async fn upsert(&self, _passages: Vec<Passage>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail { retryable: bool },
}

/// Language model with a fixed reply that records every prompt
pub struct ScriptedModel {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Reply::Text(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(retryable: bool) -> Self {
        Self {
            reply: Reply::Fail { retryable },
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedModel {
    async fn generate(&self, prompt: &str, _max_tokens: usize) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail { retryable } => Err(RagError::Generation {
                message: if *retryable { "503 overloaded" } else { "401 invalid api key" }.to_string(),
                retryable: *retryable,
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn scored(id: &str, text: &str, source: &str, score: f32) -> ScoredPassage {
    ScoredPassage {
        passage: Passage::new(id, text, source),
        score,
    }
}

/// The two caloric-restriction passages most tests retrieve
pub fn caloric_restriction_passages() -> Vec<ScoredPassage> {
    vec![
        scored(
            "cr-rhesus",
            "Caloric restriction delayed the onset of age-related disease in rhesus monkeys.",
            "Colman et al. 2009, Science",
            0.91,
        ),
        scored(
            "cr-mice",
            "Mice fed a restricted diet lived up to 40% longer than controls.",
            "Weindruch et al. 1986, J Nutr",
            0.78,
        ),
    ]
}

pub fn config_without_retries() -> OrchestratorConfig {
    OrchestratorConfig {
        retrieval_retry: RetryPolicy::no_retry(),
        generation_retry: RetryPolicy::no_retry(),
        ..OrchestratorConfig::default()
    }
}

pub fn orchestrator(
    index: Arc<ScriptedIndex>,
    model: Arc<ScriptedModel>,
    config: OrchestratorConfig,
) -> RagOrchestrator {
    RagOrchestrator::new(Arc::new(FixedEmbedder), index, model, config)
}
