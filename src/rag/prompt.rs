//! Prompt composer for grounded answers
//!
//! Sections appear in a fixed order: system instructions, numbered
//! context passages, conversation history, the question. When the
//! estimated size exceeds the budget, history is trimmed oldest-first,
//! then context passages are dropped lowest-score-first. Instructions
//! and question are never dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::TokenCounter;
use crate::errors::{RagError, Result};
use crate::rag::topics::Topic;
use crate::types::{ConversationTurn, RetrievedContext, ScoredPassage};

const CONTEXT_HEADER: &str = "Context:";
const NO_CONTEXT: &str = "No relevant passages were found in the knowledge base.";
const HISTORY_HEADER: &str = "Conversation so far:";
const SECTION_SEPARATOR: &str = "\n\n";

/// Marker number assigned to an included passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub marker: usize,
    pub passage_id: String,
}

/// Prompt text plus the bookkeeping needed to validate citations
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub text: String,
    /// Markers in prompt order, `[1]` first
    pub citations: Vec<Citation>,
    pub history_turns: usize,
    pub dropped_passages: usize,
    pub dropped_turns: usize,
    /// Conservative upper bound on the prompt size
    pub estimated_tokens: usize,
    pub topic: Topic,
}

impl ComposedPrompt {
    pub fn passage_for_marker(&self, marker: usize) -> Option<&str> {
        self.citations
            .iter()
            .find(|c| c.marker == marker)
            .map(|c| c.passage_id.as_str())
    }
}

/// Builds prompts under a token budget
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    counter: TokenCounter,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(counter: TokenCounter) -> Self {
        Self { counter }
    }

    fn passage_block(marker: usize, entry: &ScoredPassage) -> String {
        format!(
            "[{}] (source: {}, relevance: {:.2})\n{}",
            marker,
            entry.passage.source_reference,
            entry.score,
            entry.passage.text.trim()
        )
    }

    fn question_block(question: &str) -> String {
        format!("Question: {}\n\nAnswer:", question.trim())
    }

    /// `context` of `None` omits the context section entirely
    fn render(
        instructions: &str,
        context: Option<&[String]>,
        history: &[&ConversationTurn],
        question: &str,
    ) -> String {
        let mut sections = vec![instructions.to_string()];

        if let Some(passages) = context {
            let body = if passages.is_empty() {
                NO_CONTEXT.to_string()
            } else {
                passages.join(SECTION_SEPARATOR)
            };
            sections.push(format!("{}\n{}", CONTEXT_HEADER, body));
        }

        if !history.is_empty() {
            let lines: Vec<String> = history.iter().map(|t| t.render()).collect();
            sections.push(format!("{}\n{}", HISTORY_HEADER, lines.join("\n")));
        }

        sections.push(Self::question_block(question));
        sections.join(SECTION_SEPARATOR)
    }

    /// Compose a prompt for `question`.
    ///
    /// `history` is chronological (oldest first). Fails with
    /// `RagError::Composition` only when instructions and question alone
    /// exceed `token_budget`. Under pressure the empty-context notice is
    /// the last thing dropped.
    pub fn compose(
        &self,
        question: &str,
        context: &RetrievedContext,
        history: &[ConversationTurn],
        token_budget: usize,
    ) -> Result<ComposedPrompt> {
        let topic = Topic::detect(question);
        let instructions = topic.system_instructions();
        let separator_cost = self.counter.estimate(SECTION_SEPARATOR);

        let core_cost = self.counter.estimate(&Self::render(&instructions, None, &[], question));
        if core_cost > token_budget {
            return Err(RagError::Composition {
                required: core_cost,
                budget: token_budget,
            });
        }

        let context_header_cost = self.counter.estimate(&format!("{}\n", CONTEXT_HEADER)) + separator_cost;
        let notice_cost = self.counter.estimate(&format!("{}\n{}", CONTEXT_HEADER, NO_CONTEXT)) + separator_cost;
        let history_header_cost = self.counter.estimate(HISTORY_HEADER) + separator_cost;

        let mut passages: Vec<(String, usize)> = context
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let block = Self::passage_block(i + 1, entry);
                let cost = self.counter.estimate(&block) + separator_cost;
                (block, cost)
            })
            .collect();

        let mut turns: Vec<(&ConversationTurn, usize)> = history
            .iter()
            .map(|turn| (turn, self.counter.estimate(&turn.render()) + 1))
            .collect();

        let mut include_context = true;
        let total = |passages: &[(String, usize)], turns: &[(&ConversationTurn, usize)], include_context: bool| {
            let context_cost = match (include_context, passages.is_empty()) {
                (false, _) => 0,
                (true, true) => notice_cost,
                (true, false) => context_header_cost + passages.iter().map(|(_, c)| c).sum::<usize>(),
            };
            let history_cost = if turns.is_empty() {
                0
            } else {
                history_header_cost + turns.iter().map(|(_, c)| c).sum::<usize>()
            };
            core_cost + context_cost + history_cost
        };

        let mut dropped_turns = 0;
        let mut dropped_passages = 0;
        let mut estimated = total(&passages, &turns, include_context);
        while estimated > token_budget {
            if !turns.is_empty() {
                turns.remove(0);
                dropped_turns += 1;
            } else if passages.pop().is_some() {
                dropped_passages += 1;
            } else if include_context {
                include_context = false;
            } else {
                break;
            }
            estimated = total(&passages, &turns, include_context);
        }

        let citations = context
            .entries()
            .iter()
            .take(passages.len())
            .enumerate()
            .map(|(i, entry)| Citation {
                marker: i + 1,
                passage_id: entry.passage.id.clone(),
            })
            .collect();

        let blocks: Vec<String> = passages.into_iter().map(|(block, _)| block).collect();
        let kept_turns: Vec<&ConversationTurn> = turns.iter().map(|(turn, _)| *turn).collect();
        let text = Self::render(
            &instructions,
            include_context.then_some(blocks.as_slice()),
            &kept_turns,
            question,
        );

        if dropped_turns > 0 || dropped_passages > 0 || !include_context {
            debug!(
                dropped_turns,
                dropped_passages,
                context_section = include_context,
                token_budget,
                "prompt trimmed to budget"
            );
        }

        Ok(ComposedPrompt {
            text,
            citations,
            history_turns: kept_turns.len(),
            dropped_passages,
            dropped_turns,
            estimated_tokens: estimated,
            topic,
        })
    }
}
