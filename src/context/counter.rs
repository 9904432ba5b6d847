//! Token estimation by character length
//!
//! A character-count proxy is accurate enough for budgeting prompts:
//! 1 token ≈ 4 characters of English text, rounded up so a non-empty
//! string never costs zero.

/// Token counter with heuristic-based estimation
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    chars_per_token: usize,
}

/// Characters per token for English prose
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

impl TokenCounter {
    /// Create new token counter
    pub fn new() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Counter with a custom ratio (minimum 1)
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Estimate token count for text
    ///
    /// ```
    /// # use longevity_rag::context::counter::TokenCounter;
    /// let counter = TokenCounter::new();
    /// assert_eq!(counter.estimate(&"a".repeat(100)), 25);
    /// assert_eq!(counter.estimate("a"), 1);
    /// ```
    pub fn estimate(&self, text: &str) -> usize {
        let char_count = text.chars().count();
        (char_count + self.chars_per_token - 1) / self.chars_per_token
    }

    /// Sum of estimates for several segments
    pub fn estimate_batch(&self, texts: &[&str]) -> usize {
        texts.iter().map(|text| self.estimate(text)).sum()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_estimation() {
        let counter = TokenCounter::new();
        assert_eq!(counter.estimate(&"a".repeat(100)), 25);
        assert_eq!(counter.estimate(&"a".repeat(101)), 26);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(TokenCounter::new().estimate(""), 0);
    }

    #[test]
    fn test_unicode_counts_chars_not_bytes() {
        let counter = TokenCounter::new();
        // 8 chars, 24 bytes
        assert_eq!(counter.estimate("日本語テキスト語"), 2);
    }

    #[test]
    fn test_custom_ratio() {
        assert_eq!(TokenCounter::with_ratio(1).estimate("abcd"), 4);
        assert_eq!(TokenCounter::with_ratio(0).estimate("abcd"), 4);
    }

    #[test]
    fn test_batch_estimation() {
        let counter = TokenCounter::new();
        let a = "a".repeat(40);
        let b = "b".repeat(41);
        assert_eq!(counter.estimate_batch(&[a.as_str(), b.as_str()]), 10 + 11);
    }
}
