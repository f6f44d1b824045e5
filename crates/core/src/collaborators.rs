//! The bundle of external capabilities a pipeline is built from.

use std::sync::Arc;

use crate::enrich::FetchStrategy;
use crate::generate::{Generator, MarketResearch};
use crate::moderation::Moderator;
use crate::source::ExtractorRegistry;

/// Every collaborator a pipeline needs.
///
/// Production wiring comes from the providers crate; tests assemble this
/// from stubs.
#[derive(Clone)]
pub struct Collaborators {
    pub extractors: ExtractorRegistry,
    pub moderator: Arc<dyn Moderator>,
    /// Web page fetch capability.
    pub web: Arc<dyn FetchStrategy>,
    /// Profile lookup capability (usually a fallback chain).
    pub profile: Arc<dyn FetchStrategy>,
    pub generator: Arc<dyn Generator>,
    /// Optional market research precursor to generation.
    pub market_research: Option<Arc<dyn MarketResearch>>,
}
