//! # memoforge core
//!
//! Domain types, collaborator traits, and error definitions for the memoforge
//! context-compaction pipeline. This crate has no I/O of its own: it defines
//! the model every other crate implements against.
//!
//! Every external capability (extraction, moderation, enrichment, generation,
//! export) is a trait here, so the orchestrator can be driven by real HTTP
//! collaborators in production and by stubs in tests.

pub mod collaborators;
pub mod enrich;
pub mod error;
pub mod event;
pub mod export;
pub mod fragment;
pub mod generate;
pub mod moderation;
pub mod source;
pub mod stage;

// Re-export key types at crate root for ergonomics
pub use collaborators::Collaborators;
pub use enrich::{
    Enrichment, EnrichmentKind, EnrichmentTarget, FetchStrategy, ProfileData, is_failure_marker,
};
pub use error::{
    ExportError, ExtractionError, FetchError, GenerationError, ModerationError, PipelineError,
};
pub use event::{EventBus, PipelineEvent};
pub use export::{ExportFormat, ExportedDocument, Exporter};
pub use fragment::{Budget, Category, Fragment};
pub use generate::{Artifact, DealTerms, Generator, MarketAnalysis, MarketResearch, PromptPayload};
pub use moderation::{ModerationVerdict, Moderator};
pub use source::{Extractor, ExtractorRegistry, Provenance, RawSource};
pub use stage::{PipelineState, StageErrorKind, StageKind, StageResult};
