//! Overlapping character-window chunking
//!
//! Text is whitespace-normalised first, then cut into windows of at most
//! `chunk_size` characters. A window ends at the last whitespace in its
//! second half when there is one, and the next window starts
//! `chunk_overlap` characters before the previous end.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};

/// Chunks shorter than this (trimmed) are discarded
pub const MIN_CHUNK_CHARS: usize = 20;
/// Chunks with fewer alphanumeric characters are discarded
pub const MIN_ALPHANUMERIC_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunks_per_doc: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_chunks_per_doc: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_chunks_per_doc == 0 {
            return Err(RagError::Config("max_chunks_per_doc must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// A piece of normalised document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    /// Character offsets into the normalised text
    pub start: usize,
    pub end: usize,
}

/// Collapse whitespace runs to single spaces and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a chunk carries enough content to be worth embedding
pub fn is_meaningful(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() >= MIN_CHUNK_CHARS
        && trimmed.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_ALPHANUMERIC_CHARS
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Raw windows over the normalised text, before filtering
    fn windows(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let len = chars.len();

        let mut windows = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + size).min(len);
            if end < len {
                let earliest = start + (size / 2).max(1);
                if let Some(ws) = (earliest..end).rev().find(|&i| chars[i].is_whitespace()) {
                    end = ws;
                }
            }
            windows.push((start, end));

            if end >= len {
                break;
            }

            let mut next = end.saturating_sub(overlap);
            if next <= start {
                next = end;
            }
            // Start the overlap on a word boundary when one is close
            if let Some(ws) = (next..end).find(|&i| chars[i].is_whitespace()) {
                next = ws;
            }
            while next < len && chars[next].is_whitespace() {
                next += 1;
            }
            start = next;
        }

        windows
    }

    /// Split `text` into meaningful chunks, at most `max_chunks_per_doc`
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let cleaned = clean_text(text);
        let chars: Vec<char> = cleaned.chars().collect();

        self.windows(&chars)
            .into_iter()
            .map(|(start, end)| (start, end, chars[start..end].iter().collect::<String>()))
            .filter(|(_, _, text)| is_meaningful(text))
            .take(self.config.max_chunks_per_doc)
            .enumerate()
            .map(|(index, (start, end, text))| Chunk {
                index,
                text: text.trim().to_string(),
                start,
                end,
            })
            .collect()
    }
}
