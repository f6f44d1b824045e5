//! Category-specific extractive summaries for fragments that do not fit
//! whole. Summaries only ever reuse sentences and lines from the fragment.

use memoforge_core::{Category, Fragment};
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence pattern"));

static LONG_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{4,}\b").expect("valid word pattern"));

const BUSINESS_TERMS: &[&str] = &[
    "revenue",
    "growth",
    "market",
    "customers",
    "product",
    "technology",
    "team",
    "funding",
    "valuation",
    "competitors",
];

const FOUNDER_MARKERS: &[&str] = &["Name:", "Position:", "Experience:", "Education:"];

const KEY_PHRASE_LIMIT: usize = 10;

/// Summarize a fragment according to its category.
///
/// Returns `None` when nothing worth keeping could be extracted.
pub fn summarize(fragment: &Fragment) -> Option<String> {
    match fragment.category {
        Category::DocumentContent => summarize_document(&fragment.text),
        Category::FounderInfo => summarize_founder(&fragment.text),
        Category::WebContent => summarize_web(&fragment.text),
        _ => summarize_generic(&fragment.text),
    }
}

/// Sentences mentioning business-critical terms, at most three.
fn summarize_document(text: &str) -> Option<String> {
    let picked: Vec<&str> = sentences(text)
        .filter(|s| {
            let lower = s.to_lowercase();
            BUSINESS_TERMS.iter().any(|term| lower.contains(term))
        })
        .take(3)
        .collect();
    (!picked.is_empty()).then(|| format!("Business Summary: {}.", picked.join(". ")))
}

/// Name, position, experience and education lines, at most four.
fn summarize_founder(text: &str) -> Option<String> {
    let picked: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| FOUNDER_MARKERS.iter().any(|m| line.contains(m)))
        .take(4)
        .collect();
    (!picked.is_empty()).then(|| format!("Founder Details: {}.", picked.join(", ")))
}

/// First two sentences longer than 30 characters.
fn summarize_web(text: &str) -> Option<String> {
    let picked: Vec<&str> = sentences(text)
        .filter(|s| s.chars().count() > 30)
        .take(2)
        .collect();
    (!picked.is_empty()).then(|| format!("Web Content Summary: {}.", picked.join(". ")))
}

/// Most frequent long words plus the first two substantial sentences.
fn summarize_generic(text: &str) -> Option<String> {
    let phrases = key_phrases(text, KEY_PHRASE_LIMIT);
    let picked: Vec<&str> = sentences(text)
        .filter(|s| s.chars().count() > 20)
        .take(2)
        .collect();
    if phrases.is_empty() && picked.is_empty() {
        return None;
    }
    let mut summary = format!("Key points: {}.", phrases.join(", "));
    if !picked.is_empty() {
        summary.push(' ');
        summary.push_str(&picked.join(". "));
        summary.push('.');
    }
    Some(summary)
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The `limit` most frequent words of four or more letters, lowercased.
/// Ties keep first-occurrence order.
pub fn key_phrases(text: &str, limit: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, m) in LONG_WORD.find_iter(&lower).enumerate() {
        let entry = counts.entry(m.as_str()).or_insert((0, index));
        entry.0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(word, _, _)| word.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;

    fn fragment(text: &str, category: Category) -> Fragment {
        let mut f = Classifier::default().classify(text, "t");
        f.category = category;
        f.priority = category.priority();
        f
    }

    #[test]
    fn document_summary_keeps_business_sentences() {
        let text = "We love cats. Revenue grew 40% last year. The office is blue! \
                    Our product ships weekly. The team is five people. Funding closes soon.";
        let summary = summarize(&fragment(text, Category::DocumentContent)).unwrap();
        assert_eq!(
            summary,
            "Business Summary: Revenue grew 40% last year. Our product ships weekly. The team is five people."
        );
    }

    #[test]
    fn founder_summary_keeps_marker_lines() {
        let text = "Founder Information from profile lookup:\nName: Jane Doe\nCurrent Position: CTO\nSummary: builder\nExperience: Acme\nEducation: MIT\nSkills: Rust";
        let summary = summarize(&fragment(text, Category::FounderInfo)).unwrap();
        assert_eq!(
            summary,
            "Founder Details: Name: Jane Doe, Current Position: CTO, Experience: Acme, Education: MIT."
        );
    }

    #[test]
    fn web_summary_takes_two_long_sentences() {
        let text = "Short. This sentence is definitely longer than thirty chars. \
                    Another sentence that is also comfortably long enough! A third long sentence that is not needed.";
        let summary = summarize(&fragment(text, Category::WebContent)).unwrap();
        assert!(summary.starts_with("Web Content Summary: This sentence"));
        assert!(summary.contains("Another sentence"));
        assert!(!summary.contains("third"));
    }

    #[test]
    fn generic_summary_has_key_points_and_sentences() {
        let text = "Rockets rockets rockets are loud. Engines and rockets need fuel to fly well. Fuel costs money.";
        let summary = summarize(&fragment(text, Category::General)).unwrap();
        assert!(summary.starts_with("Key points: rockets, fuel"));
        assert!(summary.contains("Rockets rockets rockets are loud"));
    }

    #[test]
    fn nothing_extractable_yields_none() {
        assert!(summarize(&fragment("Cats nap. Dogs bark.", Category::DocumentContent)).is_none());
        assert!(summarize(&fragment("no markers here", Category::FounderInfo)).is_none());
        assert!(summarize(&fragment("a b c", Category::General)).is_none());
    }

    #[test]
    fn key_phrases_break_ties_by_first_occurrence() {
        let phrases = key_phrases("alpha beta gamma beta alpha delta", 3);
        assert_eq!(phrases, vec!["alpha", "beta", "gamma"]);
    }
}
