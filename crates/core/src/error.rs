//! Error types for the memoforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum; [`PipelineError`] is
//! the set of reasons a whole run can abort.

use std::collections::BTreeSet;
use thiserror::Error;

// --- Collaborator errors ---

/// Failure to turn a raw source into text. Never fatal to a run.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Unsupported media type: {0}")]
    Unsupported(String),

    #[error("Source '{0}' is empty")]
    Empty(String),

    #[error("Malformed {media_type} payload: {reason}")]
    Malformed { media_type: String, reason: String },

    #[error("Extractor command failed: {0}")]
    Command(String),
}

/// Failure of a single enrichment fetch (web page or profile lookup).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("HTTP {status_code}: {message}")]
    Http { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream reported an error: {0}")]
    Upstream(String),

    #[error("Unparsable response: {0}")]
    Parse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("No fetch strategies configured")]
    NoStrategies,
}

/// Failure of the moderation collaborator itself (not a flagged verdict).
#[derive(Debug, Clone, Error)]
pub enum ModerationError {
    #[error("Moderation request failed: {0}")]
    Request(String),

    #[error("Moderation response malformed: {0}")]
    Malformed(String),
}

/// Failure of the generation or market-research collaborators.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty completion from model {0}")]
    EmptyCompletion(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Analysis process failed: {0}")]
    Process(String),
}

/// Failure while rendering an artifact into a downloadable format.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export")]
    EmptyArtifact,

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// --- Pipeline errors ---

/// Why a pipeline run reached the `Aborted` state.
///
/// Every variant maps to a stable [`code`](PipelineError::code) that callers
/// can surface without parsing the message.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("No content provided: {0}")]
    NoContent(String),

    #[error("Content flagged by moderation at {checkpoint} checkpoint ({})", join_categories(.categories))]
    ModerationBlocked {
        checkpoint: String,
        categories: BTreeSet<String>,
    },

    #[error("Moderation unavailable at {checkpoint} checkpoint: {reason}")]
    ModerationUnavailable { checkpoint: String, reason: String },

    #[error("Generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoContent(_) => "no_content",
            Self::ModerationBlocked { .. } => "moderation_blocked",
            Self::ModerationUnavailable { .. } => "moderation_unavailable",
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::Generation(_) => "generation_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// Flagged categories, for moderation aborts only.
    pub fn flagged_categories(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::ModerationBlocked { categories, .. } => Some(categories),
            _ => None,
        }
    }
}

fn join_categories(categories: &BTreeSet<String>) -> String {
    if categories.is_empty() {
        "no categories reported".into()
    } else {
        categories.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_blocked_lists_categories() {
        let err = PipelineError::ModerationBlocked {
            checkpoint: "initial".into(),
            categories: ["violence".to_string(), "hate".to_string()].into(),
        };
        assert_eq!(err.code(), "moderation_blocked");
        let msg = err.to_string();
        assert!(msg.contains("hate, violence"));
        assert!(msg.contains("initial"));
        assert_eq!(err.flagged_categories().unwrap().len(), 2);
    }

    #[test]
    fn generation_error_converts_into_pipeline_error() {
        let err: PipelineError = GenerationError::Api {
            status_code: 429,
            message: "Too many requests".into(),
        }
        .into();
        assert_eq!(err.code(), "generation_failed");
        assert!(err.to_string().contains("429"));
        assert!(err.flagged_categories().is_none());
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            PipelineError::NoContent("x".into()),
            PipelineError::ModerationUnavailable {
                checkpoint: "final".into(),
                reason: "down".into(),
            },
            PipelineError::GenerationTimeout { timeout_secs: 90 },
            PipelineError::Internal("boom".into()),
        ];
        let codes: BTreeSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }
}
