//! Knowledge-base corpus: loading, chunking and ingestion

pub mod chunker;
pub mod document;
pub mod ingest;
pub mod loader;

pub use chunker::{ChunkingConfig, TextChunker};
pub use document::{Document, DocumentSource};
pub use ingest::{IngestionReport, Ingestor};
pub use loader::load_path;
