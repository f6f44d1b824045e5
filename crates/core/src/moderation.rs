//! Moderation collaborator: content-policy checks at pipeline checkpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ModerationError;

/// Result of a full-text moderation scan. Not cached across checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl ModerationVerdict {
    /// A verdict that lets the material through.
    pub fn clean() -> Self {
        Self::default()
    }

    /// A flagged verdict with the given categories.
    pub fn flagged<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flagged: true,
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }
}

/// Checks text against a content policy.
///
/// Implementations must be idempotent and side-effect free: the pipeline
/// calls them once per checkpoint with the text accumulated so far.
#[async_trait]
pub trait Moderator: Send + Sync {
    fn name(&self) -> &str;

    async fn moderate(&self, text: &str) -> std::result::Result<ModerationVerdict, ModerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flagged_collects_categories() {
        let verdict = ModerationVerdict::flagged(["violence", "hate", "violence"]);
        assert!(verdict.flagged);
        assert_eq!(verdict.categories.len(), 2);
        assert!(!ModerationVerdict::clean().flagged);
    }

    #[test]
    fn verdict_deserializes_without_categories() {
        let verdict: ModerationVerdict = serde_json::from_str(r#"{"flagged": false}"#).unwrap();
        assert_eq!(verdict, ModerationVerdict::clean());
    }
}
