//! Offline moderation by deny-list.

use async_trait::async_trait;
use memoforge_core::error::ModerationError;
use memoforge_core::{ModerationVerdict, Moderator};
use std::collections::BTreeMap;

/// Flags text containing any configured term (case-insensitive). Each
/// category maps to its own list of terms.
pub struct KeywordModerator {
    deny_terms: BTreeMap<String, Vec<String>>,
}

impl KeywordModerator {
    pub fn new(deny_terms: BTreeMap<String, Vec<String>>) -> Self {
        let deny_terms = deny_terms
            .into_iter()
            .map(|(category, terms)| {
                let terms = terms
                    .into_iter()
                    .map(|t| t.to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                (category, terms)
            })
            .collect();
        Self { deny_terms }
    }
}

#[async_trait]
impl Moderator for KeywordModerator {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        let lower = text.to_lowercase();
        let hits: Vec<&String> = self
            .deny_terms
            .iter()
            .filter(|(_, terms)| terms.iter().any(|t| lower.contains(t.as_str())))
            .map(|(category, _)| category)
            .collect();
        if hits.is_empty() {
            return Ok(ModerationVerdict::clean());
        }
        Ok(ModerationVerdict::flagged(hits.into_iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moderator() -> KeywordModerator {
        KeywordModerator::new(BTreeMap::from([
            ("violence".to_string(), vec!["Attack Plan".to_string()]),
            ("harassment".to_string(), vec!["idiot".to_string()]),
        ]))
    }

    #[tokio::test]
    async fn clean_text_passes() {
        let verdict = moderator().moderate("A friendly pitch deck.").await.unwrap();
        assert!(!verdict.flagged);
        assert!(verdict.categories.is_empty());
    }

    #[tokio::test]
    async fn matching_terms_flag_their_categories() {
        let verdict = moderator()
            .moderate("our ATTACK PLAN for the market")
            .await
            .unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.categories.iter().collect::<Vec<_>>(), vec!["violence"]);
    }
}
