//! Stage outcomes and pipeline states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of bounded work a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Extraction,
    Moderation,
    Enrichment,
    MarketResearch,
    Generation,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Extraction => "extraction",
            StageKind::Moderation => "moderation",
            StageKind::Enrichment => "enrichment",
            StageKind::MarketResearch => "market_research",
            StageKind::Generation => "generation",
        })
    }
}

/// Error kind carried by [`StageResult::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    Extraction,
    Fetch,
    Moderation,
    Generation,
    /// The task panicked or was torn down unexpectedly.
    Internal,
}

/// Tagged outcome of one stage invocation. Never both a value and an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    Ok(T),
    Failed { kind: StageErrorKind, message: String },
    TimedOut,
}

impl<T> StageResult<T> {
    pub fn failed(kind: StageErrorKind, message: impl Into<String>) -> Self {
        StageResult::Failed {
            kind,
            message: message.into(),
        }
    }

    /// The success value, discarding failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            StageResult::Ok(value) => Some(value),
            _ => None,
        }
    }
}

/// States of the pipeline orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Ingesting,
    Extracting,
    ModeratingInitial,
    Enriching,
    Compacting,
    ModeratingFinal,
    Generating,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// `Aborted` is reachable from every non-terminal state. `Extracting` may
    /// skip `ModeratingInitial` when nothing was extracted.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Aborted {
            return true;
        }
        matches!(
            (self, next),
            (Ingesting, Extracting)
                | (Extracting, ModeratingInitial)
                | (Extracting, Enriching)
                | (ModeratingInitial, Enriching)
                | (Enriching, Compacting)
                | (Compacting, ModeratingFinal)
                | (ModeratingFinal, Generating)
                | (Generating, Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Ingesting => "ingesting",
            PipelineState::Extracting => "extracting",
            PipelineState::ModeratingInitial => "moderating_initial",
            PipelineState::Enriching => "enriching",
            PipelineState::Compacting => "compacting",
            PipelineState::ModeratingFinal => "moderating_final",
            PipelineState::Generating => "generating",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_discards_failure_detail() {
        let failed: StageResult<u32> = StageResult::failed(StageErrorKind::Fetch, "404");
        assert_eq!(
            failed,
            StageResult::Failed {
                kind: StageErrorKind::Fetch,
                message: "404".into()
            }
        );
        assert_eq!(failed.ok(), None);
        assert_eq!(StageResult::Ok(4).ok(), Some(4));
        assert_eq!(StageResult::<u32>::TimedOut.ok(), None);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use PipelineState::*;
        let path = [
            Ingesting,
            Extracting,
            ModeratingInitial,
            Enriching,
            Compacting,
            ModeratingFinal,
            Generating,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn aborted_reachable_but_terminal_states_are_final() {
        use PipelineState::*;
        assert!(Compacting.can_transition_to(Aborted));
        assert!(Extracting.can_transition_to(Enriching));
        assert!(!Done.can_transition_to(Aborted));
        assert!(!Aborted.can_transition_to(Extracting));
        assert!(!Enriching.can_transition_to(Generating));
    }
}
