//! Fragment classifier: splits material into sections and labels each one.
//!
//! Sections are separated by blank-line runs or start at a known header
//! token (contact, deal terms, extracted text, founder information). Each
//! section is categorised by case-insensitive keyword match against a fixed
//! precedence list; the first matching rule wins.
//!
//! Classification is deterministic: no randomness, no clock, no I/O.

use memoforge_core::{Category, Fragment, is_failure_marker};
use regex_lite::Regex;
use std::sync::LazyLock;

use crate::token::TokenEstimator;

/// Default minimum fragment length in characters.
pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 50;

static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("valid blank-line pattern"));

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)email:|current deal terms:|extracted text|founder information")
        .expect("valid section-header pattern")
});

/// Keyword precedence list. Matching is on lowercased text.
const RULES: &[(Category, &[&str])] = &[
    (Category::ContactInfo, &["email:"]),
    (Category::DealTerms, &["current deal terms", "funding round"]),
    (Category::FounderInfo, &["founder information", "linkedin"]),
    (Category::DocumentContent, &["extracted text", "document"]),
    (Category::WebContent, &["url", "website"]),
];

/// Decide the category of a block of text.
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

/// Splits, filters and labels text blocks.
#[derive(Debug, Clone)]
pub struct Classifier {
    min_fragment_chars: usize,
    estimator: TokenEstimator,
}

impl Classifier {
    pub fn new(min_fragment_chars: usize, estimator: TokenEstimator) -> Self {
        Self {
            min_fragment_chars,
            estimator,
        }
    }

    /// Label one block as a fragment. No length filtering is applied.
    pub fn classify(&self, text: &str, source_id: &str) -> Fragment {
        let text = text.trim().to_string();
        let category = categorize(&text);
        Fragment {
            estimated_tokens: self.estimator.estimate(&text),
            priority: category.priority(),
            category,
            text,
            source_id: source_id.to_string(),
        }
    }

    /// Split material into sections and classify every one of them, short
    /// sections included. Sections are returned in input order.
    pub fn sections(&self, text: &str, source_id: &str) -> Vec<Fragment> {
        split_sections(text)
            .into_iter()
            .map(|section| self.classify(section, source_id))
            .collect()
    }

    /// Like [`sections`](Self::sections), without the noise.
    pub fn split(&self, text: &str, source_id: &str) -> Vec<Fragment> {
        self.sections(text, source_id)
            .into_iter()
            .filter(|f| !is_noise(f, self.min_fragment_chars))
            .collect()
    }
}

/// A section shorter than `min_chars`. Enrichment failure markers are never
/// noise.
pub fn is_noise(fragment: &Fragment, min_chars: usize) -> bool {
    fragment.char_len() < min_chars && !is_failure_marker(&fragment.text)
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FRAGMENT_CHARS, TokenEstimator::default())
    }
}

/// Split on blank-line runs, then before every section header that does not
/// already start a section. Returned slices are trimmed and non-empty.
fn split_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    for part in BLANK_LINE_RUN.split(text) {
        let mut start = 0;
        for m in SECTION_HEADER.find_iter(part) {
            if m.start() > start {
                sections.push(&part[start..m.start()]);
                start = m.start();
            }
        }
        sections.push(&part[start..]);
    }
    sections
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOREM: &str = "The quick brown fox jumps over the lazy dog near the riverbank today.";

    #[test]
    fn first_matching_rule_wins() {
        // Mentions both a contact marker and a funding round: contact comes first.
        assert_eq!(
            categorize("Email: a@b.co, raising a funding round"),
            Category::ContactInfo
        );
        assert_eq!(categorize("CURRENT DEAL TERMS: seed"), Category::DealTerms);
        assert_eq!(categorize("See my LinkedIn"), Category::FounderInfo);
        assert_eq!(categorize("Pitch document, page 3"), Category::DocumentContent);
        assert_eq!(categorize("Company website copy"), Category::WebContent);
        assert_eq!(categorize("Nothing special here"), Category::General);
    }

    #[test]
    fn classify_assigns_priority_and_tokens() {
        let classifier = Classifier::default();
        let fragment = classifier.classify("  Current Deal Terms: Series A at $20M  ", "deal");
        assert_eq!(fragment.category, Category::DealTerms);
        assert_eq!(fragment.priority, 10);
        assert_eq!(fragment.text, "Current Deal Terms: Series A at $20M");
        assert_eq!(fragment.estimated_tokens, 9); // 36 chars
        assert_eq!(fragment.source_id, "deal");
    }

    #[test]
    fn splits_on_blank_lines_and_drops_short_sections() {
        let classifier = Classifier::default();
        let text = format!("{LOREM}\n\n\n  \nshort bit\n\n{LOREM} Again.");
        let fragments = classifier.split(&text, "doc");
        assert_eq!(fragments.len(), 2);
        assert!(fragments.iter().all(|f| f.char_len() >= 50));
        assert!(fragments[1].text.ends_with("Again."));
    }

    #[test]
    fn splits_before_header_tokens() {
        let classifier = Classifier::new(10, TokenEstimator::default());
        let text = "Email: founder@acme.io\nCurrent Deal Terms:\nCurrent Funding Round: Seed\nExtracted Text from Documents:\nAcme builds rockets for small satellites.";
        let fragments = classifier.split(text, "combined");
        let categories: Vec<Category> = fragments.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![Category::ContactInfo, Category::DealTerms, Category::DocumentContent]
        );
        assert!(fragments[1].text.starts_with("Current Deal Terms:"));
    }

    #[test]
    fn sections_keep_short_blocks() {
        let classifier = Classifier::default();
        let text = format!("{LOREM}\n\nARR is $2.4M as of Q3.\n\n[Failed to fetch https://x.io: 404]");
        let all = classifier.sections(&text, "doc");
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].text, "ARR is $2.4M as of Q3.");

        let filtered = classifier.split(&text, "doc");
        assert_eq!(filtered.len(), 2);
        assert!(filtered[1].text.starts_with("[Failed to fetch"));
    }

    #[test]
    fn boundary_length_is_kept() {
        let classifier = Classifier::default();
        let exactly_fifty = "a".repeat(50);
        let forty_nine = "b".repeat(49);
        let text = format!("{exactly_fifty}\n\n{forty_nine}");
        let fragments = classifier.split(&text, "s");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, exactly_fifty);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::default();
        let text = format!("Founder Information from profile lookup:\n{LOREM}\n\nWebsite: {LOREM}");
        let first = classifier.split(&text, "x");
        for _ in 0..10 {
            assert_eq!(classifier.split(&text, "x"), first);
        }
    }
}
