//! Corpus ingestion: chunk, embed, upsert

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::{EmbeddingClient, VectorIndex};
use crate::corpus::chunker::TextChunker;
use crate::corpus::document::Document;
use crate::errors::{RagError, Result};
use crate::retry::RetryPolicy;
use crate::types::Passage;

/// Passages sent to the index per upsert call
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Embedding requests in flight per document
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Counts from one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents: usize,
    /// Chunks embedded and stored
    pub chunks: usize,
    /// Chunks whose embedding failed after retries
    pub failed: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    chunker: TextChunker,
    retry: RetryPolicy,
    batch_size: usize,
    concurrency: usize,
    expected_dimensions: Option<usize>,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, index: Arc<dyn VectorIndex>, chunker: TextChunker) -> Self {
        Self {
            embedder,
            index,
            chunker,
            retry: RetryPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            expected_dimensions: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reject embeddings of any other length
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.expected_dimensions = Some(dimensions);
        self
    }

    /// Passages for one document, without embeddings
    pub fn passages_for(&self, document: &Document) -> Vec<Passage> {
        let source_reference = document.source_reference();

        self.chunker
            .chunk(&document.content)
            .into_iter()
            .map(|chunk| {
                let mut passage = Passage::new(
                    format!("{}:{}", document.id, chunk.index),
                    chunk.text,
                    source_reference.clone(),
                )
                .with_metadata("document_id", document.id.as_str())
                .with_metadata("title", document.title.as_str())
                .with_metadata("source", document.source.as_str())
                .with_metadata("chunk_index", chunk.index as i64);

                if let Some(author) = &document.author {
                    passage = passage.with_metadata("author", author.as_str());
                }
                for (key, value) in &document.metadata {
                    passage.metadata.entry(key.clone()).or_insert_with(|| value.clone());
                }
                passage
            })
            .collect()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = &self.embedder;
        let expected = self.expected_dimensions;

        self.retry
            .run("ingest embedding", |_| async move {
                let embedding = embedder.embed(text).await?;
                match expected {
                    Some(expected) if embedding.len() != expected => Err(RagError::EmbeddingDimension {
                        expected,
                        actual: embedding.len(),
                    }),
                    _ if embedding.is_empty() => {
                        Err(RagError::Embedding("Embedding client returned an empty vector".to_string()))
                    }
                    _ => Ok(embedding),
                }
            })
            .await
            .into_result()
    }

    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestionReport> {
        self.ingest_with_progress(documents, |_, _| {}).await
    }

    /// Ingest documents, calling `progress(done, total)` after each one.
    ///
    /// Chunks whose embedding fails are counted and skipped; index
    /// failures abort the run.
    pub async fn ingest_with_progress<F>(&self, documents: &[Document], mut progress: F) -> Result<IngestionReport>
    where
        F: FnMut(usize, usize),
    {
        let mut report = IngestionReport::default();
        let mut pending: Vec<Passage> = Vec::with_capacity(self.batch_size);

        for (done, document) in documents.iter().enumerate() {
            let passages = self.passages_for(document);
            debug!(document = %document.id, chunks = passages.len(), "chunked document");

            let embedded: Vec<(Passage, Result<Vec<f32>>)> = stream::iter(passages)
                .map(|passage| async move {
                    let result = self.embed(&passage.text).await;
                    (passage, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

            for (passage, result) in embedded {
                match result {
                    Ok(embedding) => {
                        pending.push(passage.with_embedding(embedding));
                        if pending.len() >= self.batch_size {
                            report.chunks += self.flush(&mut pending).await?;
                        }
                    }
                    Err(e) => {
                        warn!(passage = %passage.id, error = %e, "embedding failed, skipping chunk");
                        report.failed += 1;
                    }
                }
            }

            report.documents += 1;
            progress(done + 1, documents.len());
        }

        report.chunks += self.flush(&mut pending).await?;

        info!(
            documents = report.documents,
            chunks = report.chunks,
            failed = report.failed,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn flush(&self, pending: &mut Vec<Passage>) -> Result<usize> {
        if pending.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(pending);
        let count = batch.len();
        self.index.upsert(batch).await?;
        debug!(count, "upserted batch");
        Ok(count)
    }
}
