//! End-to-end RAG orchestration
//!
//! `RagOrchestrator::answer` drives one request through retrieval, prompt
//! composition, generation and citation post-processing. Retrieval
//! failures degrade to an ungrounded answer; composition and generation
//! failures surface as `RagError::OrchestratorFailed`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::clients::{EmbeddingClient, LanguageModelClient, VectorIndex};
use crate::errors::{RagError, Result};
use crate::rag::citations;
use crate::rag::prompt::PromptComposer;
use crate::rag::retrieval::engine::with_timeout;
use crate::rag::retrieval::{RetrievalConfig, RetrievalStage};
use crate::rag::state::{PipelineEvent, PipelineState};
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::session::ConversationSession;
use crate::types::{Confidence, ConversationTurn, GeneratedAnswer, RetrievedContext};

/// Orchestrator configuration, built explicitly by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub retrieval: RetrievalConfig,
    /// Prompt size limit in estimated tokens
    pub token_budget: usize,
    /// Turns of session history offered to the composer
    pub max_history_turns: usize,
    /// Completion length limit passed to the language model
    pub max_tokens: usize,
    /// Deadline for a single generation attempt
    pub generation_timeout_ms: u64,
    pub retrieval_retry: RetryPolicy,
    pub generation_retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            token_budget: 4000,
            max_history_turns: 6,
            max_tokens: 1000,
            generation_timeout_ms: 120_000,
            retrieval_retry: RetryPolicy::default(),
            generation_retry: RetryPolicy::default(),
        }
    }
}

/// Turns questions into cited answers
pub struct RagOrchestrator {
    retrieval: RetrievalStage,
    composer: PromptComposer,
    llm: Arc<dyn LanguageModelClient>,
    config: OrchestratorConfig,
}

impl RagOrchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LanguageModelClient>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            retrieval: RetrievalStage::new(embedder, index, config.retrieval.clone()),
            composer: PromptComposer::new(),
            llm,
            config,
        }
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn retrieval(&self) -> &RetrievalStage {
        &self.retrieval
    }

    /// Answer `question`, using and extending `session` when given.
    ///
    /// The session gains the user and assistant turns only when an answer
    /// is produced. An empty question fails with `RagError::InvalidQuery`
    /// before any stage runs.
    pub async fn answer(
        &self,
        question: &str,
        session: Option<&mut ConversationSession>,
    ) -> Result<GeneratedAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidQuery("Question is empty".to_string()));
        }

        let started = Instant::now();
        let history = session
            .as_ref()
            .map(|s| s.recent(self.config.max_history_turns))
            .unwrap_or_default();

        let session_id = session.as_ref().map(|s| s.id.to_string()).unwrap_or_default();
        let span = info_span!("rag_request", session = %session_id, history_turns = history.len());

        let mut answer = self.run(question, &history).instrument(span).await?;
        answer.latency_ms = started.elapsed().as_millis() as u64;

        info!(
            confidence = answer.confidence.as_str(),
            citations = answer.cited_passage_ids.len(),
            degraded = answer.degraded,
            latency_ms = answer.latency_ms,
            "answer ready"
        );

        if let Some(session) = session {
            session.append(ConversationTurn::user(question));
            session.append(ConversationTurn::assistant(answer.text.clone()));
        }

        Ok(answer)
    }

    async fn run(&self, question: &str, history: &[ConversationTurn]) -> Result<GeneratedAnswer> {
        let mut state = PipelineState::initial();

        // Retrieving
        let (context, degraded) = match self.retrieve(question).await {
            Some(context) => {
                state = state.transition(PipelineEvent::ContextReady)?;
                (context, false)
            }
            None => {
                state = state.transition(PipelineEvent::RetrievalDegraded)?;
                (RetrievedContext::empty(), true)
            }
        };

        // Composing
        let prompt = match self
            .composer
            .compose(question, &context, history, self.config.token_budget)
        {
            Ok(prompt) => prompt,
            Err(e) => return Err(Self::fail(&mut state, e)),
        };
        debug!(
            passages = prompt.citations.len(),
            history_turns = prompt.history_turns,
            estimated_tokens = prompt.estimated_tokens,
            topic = ?prompt.topic,
            "prompt composed"
        );
        state = state.transition(PipelineEvent::PromptComposed)?;

        // Generating
        let completion = match self.generate(&prompt.text).await {
            RetryOutcome::Success { value, attempts } => {
                debug!(attempts, "completion received");
                value
            }
            RetryOutcome::Exhausted { attempts, last_error } => {
                warn!(attempts, "generation retries exhausted");
                return Err(Self::fail(&mut state, last_error));
            }
            RetryOutcome::Fatal { error, .. } => return Err(Self::fail(&mut state, error)),
        };
        state = state.transition(PipelineEvent::CompletionReceived)?;

        // Postprocessing
        let text = completion.trim().to_string();
        let report = citations::resolve(&text, &prompt, &context);
        let confidence = if degraded {
            Confidence::None
        } else {
            citations::confidence(&context, &report)
        };
        state = state.transition(PipelineEvent::AnswerBuilt)?;
        debug!(state = state.display_name(), "pipeline finished");

        Ok(GeneratedAnswer {
            text,
            cited_passage_ids: report.cited_passage_ids,
            confidence,
            latency_ms: 0,
            sources: report.sources,
            degraded,
        })
    }

    /// Retrieved context, or `None` once retries are spent
    async fn retrieve(&self, question: &str) -> Option<RetrievedContext> {
        let retrieval = &self.retrieval;
        let outcome = self
            .config
            .retrieval_retry
            .run("retrieval", |_| retrieval.retrieve_default(question))
            .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                debug!(passages = value.len(), attempts, "context retrieved");
                Some(value)
            }
            RetryOutcome::Exhausted { attempts, last_error: error }
            | RetryOutcome::Fatal { attempts, error } => {
                warn!(
                    attempts,
                    error = %error,
                    kind = error.kind(),
                    "retrieval unavailable, answering without context"
                );
                None
            }
        }
    }

    async fn generate(&self, prompt: &str) -> RetryOutcome<String> {
        let llm = &self.llm;
        let max_tokens = self.config.max_tokens;
        let limit = Duration::from_millis(self.config.generation_timeout_ms);

        self.config
            .generation_retry
            .run("generation", |attempt| async move {
                debug!(attempt, model = llm.model_name(), "requesting completion");
                let completion = with_timeout("generation", limit, llm.generate(prompt, max_tokens)).await?;
                if completion.trim().is_empty() {
                    return Err(RagError::Generation {
                        message: "Language model returned an empty completion".to_string(),
                        retryable: true,
                    });
                }
                Ok(completion)
            })
            .await
    }

    fn fail(state: &mut PipelineState, cause: RagError) -> RagError {
        let stage = *state;
        *state = state
            .transition(PipelineEvent::StageFailed)
            .unwrap_or(PipelineState::Failed);
        error!(
            stage = stage.display_name(),
            kind = cause.kind(),
            error = %cause,
            "request failed"
        );
        RagError::OrchestratorFailed {
            stage,
            cause: Box::new(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryIndex;
    use crate::types::Passage;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct Echo(&'static str);

    #[async_trait]
    impl LanguageModelClient for Echo {
        async fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn orchestrator(passages: Vec<Passage>, reply: &'static str) -> RagOrchestrator {
        RagOrchestrator::new(
            Arc::new(FixedEmbedder),
            Arc::new(InMemoryIndex::with_passages(passages)),
            Arc::new(Echo(reply)),
            OrchestratorConfig {
                retrieval_retry: RetryPolicy::no_retry(),
                generation_retry: RetryPolicy::no_retry(),
                ..OrchestratorConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let orchestrator = orchestrator(Vec::new(), "unused");
        let mut session = ConversationSession::new(10);
        let err = orchestrator.answer("   ", Some(&mut session)).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidQuery(_)));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_grounded_answer_updates_session() {
        let passages = vec![Passage::new("p1", "Zone 2 training improves mitochondrial density.", "Study A")
            .with_embedding(vec![1.0, 0.0])];
        let orchestrator = orchestrator(passages, "Yes, it helps [1].");
        let mut session = ConversationSession::new(10);

        let answer = orchestrator
            .answer("Does zone 2 training help?", Some(&mut session))
            .await
            .unwrap();

        assert_eq!(answer.confidence, Confidence::High);
        assert!(answer.cited_passage_ids.contains("p1"));
        assert_eq!(answer.sources[0].source_reference, "Study A");
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().unwrap().text, "Yes, it helps [1].");
    }

    #[tokio::test]
    async fn test_empty_index_gives_no_confidence() {
        let orchestrator = orchestrator(Vec::new(), "I could not find evidence [1].");
        let answer = orchestrator.answer("What are senolytics?", None).await.unwrap();
        assert_eq!(answer.confidence, Confidence::None);
        assert!(answer.cited_passage_ids.is_empty());
        assert!(!answer.degraded);
    }
}
