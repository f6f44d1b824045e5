//! The pipeline orchestrator.
//!
//! One [`Pipeline`] drives a request through
//! `Ingesting → Extracting → ModeratingInitial → Enriching → Compacting →
//! ModeratingFinal → Generating → Done`, with `Aborted` reachable from every
//! non-terminal state. Extraction and enrichment absorb their failures; only
//! moderation, an empty result and generation abort a run.

use chrono::Utc;
use futures::future::join_all;
use memoforge_config::{AppConfig, TimeoutConfig};
use memoforge_context::{Classifier, PackReport, Packer, TokenEstimator};
use memoforge_core::{
    Artifact, Budget, Collaborators, DealTerms, EnrichmentTarget, EventBus, Fragment,
    MarketAnalysis, PipelineError, PipelineEvent, PipelineState, PromptPayload, Provenance,
    RawSource, StageErrorKind, StageKind, StageResult,
};
use memoforge_core::error::ExtractionError;
use memoforge_memory::{
    EntryMetadata, KIND_EXTRACTED_SOURCE, KIND_FULL_CONTENT, KIND_FULL_CONTENT_STORED,
    SessionMemory,
};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::enrichment::{Enricher, EnrichmentOutcome};
use crate::executor::{Settled, StageExecutor};

/// Header that introduces each extracted document in the combined material.
const EXTRACTED_HEADER: &str = "Extracted Text from Documents";
/// Source id of the deal-terms block.
const DEAL_TERMS_SOURCE: &str = "deal_terms";
/// Source id of reused context from earlier runs in the same session.
const PREVIOUS_CONTEXT_SOURCE: &str = "previous_context";

// ── Settings ──────────────────────────────────────────────────────────────

/// Tunables for a pipeline, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub budget: Budget,
    pub packer: Packer,
    pub classifier: Classifier,
    pub estimator: TokenEstimator,
    pub timeouts: TimeoutConfig,
    /// Prepend earlier combined material of the same session before compaction.
    pub reuse_previous_context: bool,
    /// How many earlier entries to reuse.
    pub previous_context_limit: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let packer = &config.packer;
        let estimator = TokenEstimator::new(packer.chars_per_token);
        Self {
            budget: packer.budget(),
            packer: Packer::new(packer.whole_buffer, packer.summary_buffer, estimator)
                .with_min_fragment_chars(packer.min_fragment_chars),
            classifier: Classifier::new(packer.min_fragment_chars, estimator),
            estimator,
            timeouts: config.timeouts.clone(),
            reuse_previous_context: config.memory.reuse_previous_context,
            previous_context_limit: 3,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ── Request / report ──────────────────────────────────────────────────────

/// Everything a caller hands to one run.
#[derive(Debug, Clone, Default)]
pub struct MemoRequest {
    /// Session to record into. A fresh one is created when absent.
    pub session_id: Option<String>,
    pub sources: Vec<RawSource>,
    pub targets: Vec<EnrichmentTarget>,
    pub deal_terms: DealTerms,
}

/// How one raw source fared during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Extracted { chars: usize },
    /// The extractor ran but produced no text.
    Empty,
    Skipped { reason: String },
    Failed { error: String },
    TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source_id: String,
    pub provenance: Provenance,
    pub status: SourceStatus,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Done(Artifact),
    Aborted(PipelineError),
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done(_))
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            RunOutcome::Done(artifact) => Some(artifact),
            RunOutcome::Aborted(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            RunOutcome::Done(_) => None,
            RunOutcome::Aborted(e) => Some(e),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum OutcomeView<'a> {
    Done {
        artifact: &'a Artifact,
    },
    Aborted {
        code: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        categories: Option<&'a BTreeSet<String>>,
    },
}

impl Serialize for RunOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view = match self {
            RunOutcome::Done(artifact) => OutcomeView::Done { artifact },
            RunOutcome::Aborted(e) => OutcomeView::Aborted {
                code: e.code(),
                message: e.to_string(),
                categories: e.flagged_categories(),
            },
        };
        view.serialize(serializer)
    }
}

/// Account of one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub trace_id: String,
    pub session_id: String,
    /// States visited, in order, ending in `Done` or `Aborted`.
    pub states: Vec<PipelineState>,
    pub sources: Vec<SourceOutcome>,
    pub enrichments: Vec<EnrichmentOutcome>,
    /// Compaction statistics; absent when the run aborted earlier.
    pub pack: Option<PackReport>,
    pub market_opportunity: Option<String>,
    pub market_analysis: Option<MarketAnalysis>,
    pub outcome: RunOutcome,
}

impl PipelineReport {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Ingesting)
    }

    pub fn reached(&self, state: PipelineState) -> bool {
        self.states.contains(&state)
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.outcome.artifact()
    }

    pub fn error(&self) -> Option<&PipelineError> {
        self.outcome.error()
    }
}

/// Partial results gathered while a run progresses.
#[derive(Default)]
struct Collected {
    sources: Vec<SourceOutcome>,
    enrichments: Vec<EnrichmentOutcome>,
    pack: Option<PackReport>,
    market_opportunity: Option<String>,
    market_analysis: Option<MarketAnalysis>,
}

/// Tracks the current state and publishes every transition.
struct StateTracker {
    trace_id: String,
    events: Arc<EventBus>,
    visited: Vec<PipelineState>,
}

impl StateTracker {
    fn new(trace_id: &str, events: Arc<EventBus>) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            events,
            visited: vec![PipelineState::Ingesting],
        }
    }

    fn current(&self) -> PipelineState {
        self.visited.last().copied().unwrap_or(PipelineState::Ingesting)
    }

    fn advance(&mut self, next: PipelineState) {
        let from = self.current();
        if !from.can_transition_to(next) {
            warn!(trace_id = %self.trace_id, %from, to = %next, "Unexpected state transition");
        }
        debug!(trace_id = %self.trace_id, %from, to = %next, "State transition");
        self.visited.push(next);
        self.events.publish(PipelineEvent::StateChanged {
            trace_id: self.trace_id.clone(),
            from,
            to: next,
            timestamp: Utc::now(),
        });
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────

/// Drives requests through the memo pipeline.
pub struct Pipeline {
    /// External capabilities
    collaborators: Collaborators,

    /// Session audit trail, owned by whoever built the pipeline
    memory: Arc<SessionMemory>,

    settings: PipelineSettings,

    /// Progress events
    events: Arc<EventBus>,

    enricher: Enricher,
}

impl Pipeline {
    pub fn new(
        collaborators: Collaborators,
        memory: Arc<SessionMemory>,
        settings: PipelineSettings,
    ) -> Self {
        let enricher = Enricher::new(
            Arc::clone(&collaborators.web),
            Arc::clone(&collaborators.profile),
            &settings.timeouts,
        );
        Self {
            collaborators,
            memory,
            settings,
            events: Arc::new(EventBus::default()),
            enricher,
        }
    }

    /// Publish progress on an existing event bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one request to `Done` or `Aborted`. Never panics on collaborator
    /// failure; every failure is reflected in the report.
    pub async fn run(&self, request: MemoRequest) -> PipelineReport {
        let trace_id = Uuid::new_v4().to_string();
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let started = Instant::now();
        info!(
            trace_id = %trace_id,
            session_id = %session_id,
            sources = request.sources.len(),
            targets = request.targets.len(),
            "Pipeline run started"
        );

        let executor = StageExecutor::new(trace_id.clone(), Arc::clone(&self.events));
        let mut tracker = StateTracker::new(&trace_id, Arc::clone(&self.events));
        let mut collected = Collected::default();

        let outcome = match self
            .drive(&executor, &mut tracker, &mut collected, &session_id, &request)
            .await
        {
            Ok(artifact) => {
                tracker.advance(PipelineState::Done);
                info!(
                    trace_id = %trace_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run finished"
                );
                RunOutcome::Done(artifact)
            }
            Err(e) => {
                tracker.advance(PipelineState::Aborted);
                warn!(
                    trace_id = %trace_id,
                    code = e.code(),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run aborted"
                );
                RunOutcome::Aborted(e)
            }
        };

        PipelineReport {
            trace_id,
            session_id,
            states: tracker.visited,
            sources: collected.sources,
            enrichments: collected.enrichments,
            pack: collected.pack,
            market_opportunity: collected.market_opportunity,
            market_analysis: collected.market_analysis,
            outcome,
        }
    }

    async fn drive(
        &self,
        executor: &StageExecutor,
        tracker: &mut StateTracker,
        collected: &mut Collected,
        session_id: &str,
        request: &MemoRequest,
    ) -> Result<Artifact, PipelineError> {
        tracker.advance(PipelineState::Extracting);
        let extracted = self.extract_all(executor, &request.sources).await;
        for (outcome, text) in &extracted {
            if let Some(text) = text {
                self.memory
                    .remember(
                        session_id,
                        text.clone(),
                        EntryMetadata::new(KIND_EXTRACTED_SOURCE).with_source(&outcome.source_id),
                    )
                    .await;
            }
        }
        let documents: Vec<(String, String)> = extracted
            .iter()
            .filter_map(|(o, text)| text.clone().map(|t| (o.source_id.clone(), t)))
            .collect();
        collected.sources = extracted.into_iter().map(|(o, _)| o).collect();

        let extracted_text = documents
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        if extracted_text.trim().is_empty() {
            if request.targets.is_empty() {
                return Err(PipelineError::NoContent(
                    "no text could be extracted and no enrichment targets were given".into(),
                ));
            }
            info!(trace_id = executor.trace_id(), "Nothing extracted; continuing with enrichment only");
        } else {
            tracker.advance(PipelineState::ModeratingInitial);
            self.moderate(executor, "initial", extracted_text.clone()).await?;
        }

        tracker.advance(PipelineState::Enriching);
        collected.enrichments = self.enricher.enrich_all(executor, &request.targets).await;

        tracker.advance(PipelineState::Compacting);
        let pack = self
            .compact(session_id, &request.deal_terms, &documents, &collected.enrichments)
            .await;
        let packed_text = pack.text.clone();
        let empty = packed_text.trim().is_empty();
        collected.pack = Some(pack);
        if empty {
            return Err(PipelineError::NoContent(
                "nothing survived compaction".into(),
            ));
        }

        tracker.advance(PipelineState::ModeratingFinal);
        self.moderate(executor, "final", packed_text.clone()).await?;

        tracker.advance(PipelineState::Generating);
        let research_input = if extracted_text.trim().is_empty() {
            &packed_text
        } else {
            &extracted_text
        };
        let (opportunity, analysis) = self.market_research(executor, research_input).await;
        collected.market_opportunity = opportunity.clone();
        collected.market_analysis = analysis.clone();

        self.generate(
            executor,
            PromptPayload {
                trace_id: executor.trace_id().to_string(),
                compacted_text: packed_text,
                deal_terms: request.deal_terms.clone(),
                market_opportunity: opportunity,
                market_analysis: analysis,
            },
        )
        .await
    }

    /// Extract every source concurrently. Each outcome carries the trimmed
    /// text when extraction produced any.
    async fn extract_all(
        &self,
        executor: &StageExecutor,
        sources: &[RawSource],
    ) -> Vec<(SourceOutcome, Option<String>)> {
        join_all(sources.iter().map(|source| self.extract_one(executor, source))).await
    }

    async fn extract_one(
        &self,
        executor: &StageExecutor,
        source: &RawSource,
    ) -> (SourceOutcome, Option<String>) {
        let outcome = |status| SourceOutcome {
            source_id: source.id.clone(),
            provenance: source.provenance,
            status,
        };

        if source.is_empty() {
            warn!(source = %source.id, "Skipping empty source");
            return (
                outcome(SourceStatus::Skipped {
                    reason: ExtractionError::Empty(source.id.clone()).to_string(),
                }),
                None,
            );
        }
        let Some(extractor) = self.collaborators.extractors.resolve(source) else {
            warn!(source = %source.id, media_type = %source.media_type, "No extractor for source");
            return (
                outcome(SourceStatus::Skipped {
                    reason: ExtractionError::Unsupported(source.media_type.clone()).to_string(),
                }),
                None,
            );
        };

        let timeout = if source.provenance == Provenance::OcrUpload {
            self.settings.timeouts.ocr()
        } else {
            self.settings.timeouts.extraction()
        };
        let owned = source.clone();
        let settled = executor
            .run(StageKind::Extraction, &source.id, timeout, move |_| async move {
                extractor.extract(&owned).await
            })
            .await;

        match settled.into_stage_result(StageErrorKind::Extraction) {
            StageResult::Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    warn!(source = %source.id, "Extractor returned no text");
                    (outcome(SourceStatus::Empty), None)
                } else {
                    let chars = text.chars().count();
                    debug!(source = %source.id, chars, "Source extracted");
                    (outcome(SourceStatus::Extracted { chars }), Some(text.to_string()))
                }
            }
            StageResult::Failed { message, .. } => {
                (outcome(SourceStatus::Failed { error: message }), None)
            }
            StageResult::TimedOut => (outcome(SourceStatus::TimedOut), None),
        }
    }

    /// One moderation checkpoint. Fails closed: a moderator error or timeout
    /// aborts the run.
    async fn moderate(
        &self,
        executor: &StageExecutor,
        checkpoint: &str,
        text: String,
    ) -> Result<(), PipelineError> {
        let moderator = Arc::clone(&self.collaborators.moderator);
        let timeout = self.settings.timeouts.moderation();
        let unavailable = |reason: String| PipelineError::ModerationUnavailable {
            checkpoint: checkpoint.to_string(),
            reason,
        };

        let settled = executor
            .run(StageKind::Moderation, checkpoint, timeout, move |_| async move {
                moderator.moderate(&text).await
            })
            .await;
        match settled.into_stage_result(StageErrorKind::Moderation) {
            StageResult::Ok(verdict) if verdict.flagged => Err(PipelineError::ModerationBlocked {
                checkpoint: checkpoint.to_string(),
                categories: verdict.categories,
            }),
            StageResult::Ok(_) => Ok(()),
            StageResult::Failed { message, .. } => Err(unavailable(message)),
            StageResult::TimedOut => {
                Err(unavailable(format!("timed out after {}s", timeout.as_secs())))
            }
        }
    }

    /// Classify the combined material, record it in the session and pack it.
    async fn compact(
        &self,
        session_id: &str,
        deal_terms: &DealTerms,
        documents: &[(String, String)],
        enrichments: &[EnrichmentOutcome],
    ) -> PackReport {
        let classifier = &self.settings.classifier;
        let mut blocks: Vec<String> = Vec::new();
        let mut fragments: Vec<Fragment> = Vec::new();

        if self.settings.reuse_previous_context {
            if let Some(previous) = self
                .memory
                .render_previous(session_id, self.settings.previous_context_limit)
                .await
            {
                fragments.extend(classifier.sections(&previous, PREVIOUS_CONTEXT_SOURCE));
                blocks.push(previous);
            }
        }

        let terms = deal_terms.render();
        fragments.extend(classifier.sections(&terms, DEAL_TERMS_SOURCE));
        blocks.push(terms);

        for (source_id, text) in documents {
            let block = format!("{EXTRACTED_HEADER} ({source_id}):\n{text}");
            fragments.extend(classifier.sections(&block, source_id));
            blocks.push(block);
        }

        for outcome in enrichments {
            if outcome.is_success() {
                fragments.extend(classifier.sections(&outcome.text, &outcome.target.identifier));
            } else {
                fragments.push(classifier.classify(&outcome.text, &outcome.target.identifier));
            }
            blocks.push(outcome.text.clone());
        }

        let report = self.settings.packer.pack_with_report(&fragments, self.settings.budget);

        let combined = blocks.join("\n\n");
        let metadata = if report.trimmed {
            EntryMetadata::new(KIND_FULL_CONTENT_STORED)
                .with_token_count(self.settings.estimator.estimate(&combined))
        } else {
            EntryMetadata::new(KIND_FULL_CONTENT)
        };
        self.memory.remember(session_id, combined, metadata).await;

        info!(
            fragments = fragments.len(),
            whole = report.whole_count(),
            summarized = report.summarized_count(),
            dropped = report.dropped_count(),
            estimated_tokens = report.estimated_tokens,
            trimmed = report.trimmed,
            "Material compacted"
        );
        report
    }

    /// Optional precursor: opportunity summary, then analysis of it. Both
    /// are best effort.
    async fn market_research(
        &self,
        executor: &StageExecutor,
        material: &str,
    ) -> (Option<String>, Option<MarketAnalysis>) {
        let Some(research) = &self.collaborators.market_research else {
            return (None, None);
        };
        let timeouts = &self.settings.timeouts;

        let summarizer = Arc::clone(research);
        let input = material.to_string();
        let trace_id = executor.trace_id().to_string();
        let opportunity = executor
            .run(
                StageKind::MarketResearch,
                "opportunity_summary",
                timeouts.opportunity_summary(),
                move |_| async move { summarizer.summarize_opportunity(&input, &trace_id).await },
            )
            .await
            .into_stage_result(StageErrorKind::Generation)
            .ok()
            .filter(|summary| !summary.trim().is_empty());
        let Some(opportunity) = opportunity else {
            warn!(trace_id = executor.trace_id(), "Market opportunity unavailable");
            return (None, None);
        };

        let analyst = Arc::clone(research);
        let subject = opportunity.clone();
        let trace_id = executor.trace_id().to_string();
        let analysis = executor
            .run(
                StageKind::MarketResearch,
                "market_analysis",
                timeouts.market_analysis(),
                move |_| async move { analyst.analyze(&subject, &trace_id).await },
            )
            .await
            .into_stage_result(StageErrorKind::Generation)
            .ok();
        if analysis.is_none() {
            warn!(trace_id = executor.trace_id(), "Market analysis unavailable");
        }
        (Some(opportunity), analysis)
    }

    async fn generate(
        &self,
        executor: &StageExecutor,
        payload: PromptPayload,
    ) -> Result<Artifact, PipelineError> {
        let generator = Arc::clone(&self.collaborators.generator);
        let timeout = self.settings.timeouts.generation();
        match executor
            .run(StageKind::Generation, "memo", timeout, move |_| async move {
                generator.generate(payload).await
            })
            .await
        {
            Settled::Ok(artifact) => Ok(artifact),
            Settled::Err(e) => Err(PipelineError::Generation(e)),
            Settled::Panicked(message) => Err(PipelineError::Internal(message)),
            Settled::TimedOut => Err(PipelineError::GenerationTimeout {
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}
