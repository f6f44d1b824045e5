//! Fragments (classified, priority-tagged units of extracted text) and the
//! token budget they are packed into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content category of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    DealTerms,
    FounderInfo,
    DocumentContent,
    ContactInfo,
    WebContent,
    General,
}

impl Category {
    /// All categories, highest priority first.
    pub const ALL: [Category; 6] = [
        Category::DealTerms,
        Category::FounderInfo,
        Category::DocumentContent,
        Category::ContactInfo,
        Category::WebContent,
        Category::General,
    ];

    /// Static priority weight (5..=10, higher is kept first).
    pub fn priority(self) -> u8 {
        match self {
            Category::DealTerms => 10,
            Category::FounderInfo => 9,
            Category::DocumentContent => 8,
            Category::ContactInfo => 7,
            Category::WebContent => 6,
            Category::General => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::DealTerms => "deal_terms",
            Category::FounderInfo => "founder_info",
            Category::DocumentContent => "document_content",
            Category::ContactInfo => "contact_info",
            Category::WebContent => "web_content",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified unit of extracted text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// The trimmed text of this fragment.
    pub text: String,
    /// Content category decided by keyword precedence.
    pub category: Category,
    /// Priority weight derived from the category.
    pub priority: u8,
    /// Length-based token estimate (an approximation, not a tokenizer count).
    pub estimated_tokens: usize,
    /// Identifier of the source this fragment came from.
    pub source_id: String,
}

impl Fragment {
    /// Length of the fragment text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Token ceiling plus unspendable headroom for downstream prompt scaffolding.
///
/// Invariant on packer output: `selected_tokens + reserve <= max_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub max_tokens: usize,
    #[serde(default)]
    pub reserve: usize,
}

impl Budget {
    pub fn new(max_tokens: usize, reserve: usize) -> Self {
        Self { max_tokens, reserve }
    }

    /// Tokens that may actually be spent on fragment text.
    pub fn available(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserve)
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_tokens: 120_000,
            reserve: 0,
        }
    }
}
