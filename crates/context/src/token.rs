//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token by default.
//! This is an approximation for budgeting, not a tokenizer; counts are in
//! Unicode scalar values so non-ASCII text is not over-counted.

/// Default characters per token.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Length-based token estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl TokenEstimator {
    /// Create an estimator. A ratio of zero is treated as one.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    /// Estimate the token count for a string: `ceil(chars / chars_per_token)`.
    pub fn estimate(&self, text: &str) -> usize {
        self.estimate_chars(text.chars().count())
    }

    /// Estimate the token count for a known character length.
    pub fn estimate_chars(&self, chars: usize) -> usize {
        chars.div_ceil(self.chars_per_token)
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}
