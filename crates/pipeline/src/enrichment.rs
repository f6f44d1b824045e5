//! Concurrent enrichment: every target is fetched in parallel under its own
//! deadline, and the batch waits for all of them.
//!
//! A failed or timed-out target never fails the batch. Its contribution is
//! replaced by the target's inline failure marker.

use chrono::Utc;
use futures::future::join_all;
use memoforge_core::{
    EnrichmentKind, EnrichmentTarget, FetchStrategy, PipelineEvent, StageErrorKind, StageKind,
    StageResult,
};
use memoforge_config::TimeoutConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::executor::StageExecutor;

/// How one enrichment target settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Success,
    Failed { error: String },
    TimedOut,
}

/// One target's contribution to the fragment pool.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentOutcome {
    pub target: EnrichmentTarget,
    pub status: EnrichmentStatus,
    /// Rendered enrichment text, or the failure marker.
    pub text: String,
}

impl EnrichmentOutcome {
    pub fn is_success(&self) -> bool {
        self.status == EnrichmentStatus::Success
    }
}

/// The two enrichment capabilities and their deadlines.
#[derive(Clone)]
pub struct Enricher {
    web: Arc<dyn FetchStrategy>,
    profile: Arc<dyn FetchStrategy>,
    web_timeout: Duration,
    profile_timeout: Duration,
}

impl Enricher {
    pub fn new(
        web: Arc<dyn FetchStrategy>,
        profile: Arc<dyn FetchStrategy>,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            web,
            profile,
            web_timeout: timeouts.url_fetch(),
            profile_timeout: timeouts.profile_lookup(),
        }
    }

    fn strategy_for(&self, kind: EnrichmentKind) -> (Arc<dyn FetchStrategy>, Duration) {
        match kind {
            EnrichmentKind::WebPage => (Arc::clone(&self.web), self.web_timeout),
            EnrichmentKind::Profile => (Arc::clone(&self.profile), self.profile_timeout),
        }
    }

    /// Fetch every target concurrently. Outcomes come back in target order.
    pub async fn enrich_all(
        &self,
        executor: &StageExecutor,
        targets: &[EnrichmentTarget],
    ) -> Vec<EnrichmentOutcome> {
        let children = executor.child();
        let outcomes = join_all(
            targets
                .iter()
                .map(|target| self.enrich_one(&children, target.clone())),
        )
        .await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            trace_id = executor.trace_id(),
            targets = targets.len(),
            succeeded,
            failed = targets.len() - succeeded,
            "Enrichment batch settled"
        );
        outcomes
    }

    async fn enrich_one(&self, executor: &StageExecutor, target: EnrichmentTarget) -> EnrichmentOutcome {
        let (strategy, timeout) = self.strategy_for(target.kind);
        let identifier = target.identifier.clone();
        let settled = executor
            .run(StageKind::Enrichment, &target.identifier, timeout, move |_| async move {
                strategy.fetch(&identifier).await
            })
            .await;

        let (status, text) = match settled.into_stage_result(StageErrorKind::Fetch) {
            StageResult::Ok(enrichment) => (EnrichmentStatus::Success, enrichment.render(&target)),
            StageResult::Failed { message, .. } => {
                let marker = target.failure_marker(&message);
                (EnrichmentStatus::Failed { error: message }, marker)
            }
            StageResult::TimedOut => {
                let marker = target
                    .failure_marker(&format!("timed out after {}s", timeout.as_secs()));
                (EnrichmentStatus::TimedOut, marker)
            }
        };

        executor.events().publish(PipelineEvent::EnrichmentItem {
            trace_id: executor.trace_id().to_string(),
            identifier: target.identifier.clone(),
            success: status == EnrichmentStatus::Success,
            timestamp: Utc::now(),
        });

        EnrichmentOutcome { target, status, text }
    }
}
