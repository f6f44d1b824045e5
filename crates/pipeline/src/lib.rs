//! # memoforge pipeline
//!
//! The stage executor, the concurrent enrichment gather and the orchestrator
//! state machine that turns a [`MemoRequest`] into a [`PipelineReport`].

pub mod enrichment;
pub mod executor;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use enrichment::{Enricher, EnrichmentOutcome, EnrichmentStatus};
pub use executor::{Settled, StageExecutor};
pub use orchestrator::{
    MemoRequest, Pipeline, PipelineReport, PipelineSettings, RunOutcome, SourceOutcome,
    SourceStatus,
};
