//! Stage executor: runs one unit of work against a deadline.
//!
//! The work runs as its own task. Whichever finishes first wins: the task or
//! the deadline. On timeout the task's cancellation token fires, the task is
//! aborted and the executor returns immediately without waiting for it to
//! wind down. Work holding a child process with `kill_on_drop` has that
//! process killed when the aborted future is dropped; anything else that
//! ignores cancellation may keep running until its next await point.

use chrono::Utc;
use memoforge_core::{EventBus, PipelineEvent, StageErrorKind, StageKind, StageResult};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a stage task settled, keeping its typed error.
#[derive(Debug)]
pub enum Settled<T, E> {
    Ok(T),
    Err(E),
    /// The task panicked or was aborted from outside.
    Panicked(String),
    TimedOut,
}

impl<T, E: Display> Settled<T, E> {
    /// Collapse into a [`StageResult`], tagging errors with `kind`.
    pub fn into_stage_result(self, kind: StageErrorKind) -> StageResult<T> {
        match self {
            Settled::Ok(value) => StageResult::Ok(value),
            Settled::Err(e) => StageResult::failed(kind, e.to_string()),
            Settled::Panicked(message) => StageResult::failed(StageErrorKind::Internal, message),
            Settled::TimedOut => StageResult::TimedOut,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Settled::Ok(_) => "ok",
            Settled::Err(_) | Settled::Panicked(_) => "failed",
            Settled::TimedOut => "timed_out",
        }
    }
}

/// Aborts the task when the executor's own future is dropped, so cancelling
/// a parent stage tears down the children it spawned.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs stage tasks for one pipeline run and reports them on the event bus.
#[derive(Clone)]
pub struct StageExecutor {
    trace_id: String,
    events: Arc<EventBus>,
    cancel: CancellationToken,
}

impl StageExecutor {
    pub fn new(trace_id: impl Into<String>, events: Arc<EventBus>) -> Self {
        Self {
            trace_id: trace_id.into(),
            events,
            cancel: CancellationToken::new(),
        }
    }

    /// An executor whose tasks are cancelled together with this one's.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            events: Arc::clone(&self.events),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `task` to completion, failure or the deadline.
    ///
    /// `task` receives a cancellation token that fires when the deadline
    /// passes or the run is cancelled.
    pub async fn run<T, E, F, Fut>(
        &self,
        stage: StageKind,
        label: &str,
        timeout: Duration,
        task: F,
    ) -> Settled<T, E>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let token = self.cancel.child_token();
        let started = Instant::now();
        let mut handle = tokio::spawn(task(token.clone()));
        let _guard = AbortOnDrop(handle.abort_handle());

        let settled = tokio::select! {
            joined = &mut handle => match joined {
                Ok(Ok(value)) => Settled::Ok(value),
                Ok(Err(e)) => Settled::Err(e),
                Err(e) => Settled::Panicked(format!("{stage} task failed: {e}")),
            },
            () = tokio::time::sleep(timeout) => {
                token.cancel();
                handle.abort();
                Settled::TimedOut
            }
            () = self.cancel.cancelled() => {
                handle.abort();
                Settled::Panicked(format!("{stage} task cancelled"))
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &settled {
            Settled::Ok(_) => debug!(%stage, label, duration_ms, "Stage finished"),
            Settled::Err(e) => warn!(%stage, label, duration_ms, error = %e, "Stage failed"),
            Settled::Panicked(message) => warn!(%stage, label, duration_ms, %message, "Stage aborted"),
            Settled::TimedOut => warn!(
                %stage,
                label,
                timeout_secs = timeout.as_secs_f64(),
                "Stage timed out; work abandoned"
            ),
        }

        self.events.publish(PipelineEvent::StageFinished {
            trace_id: self.trace_id.clone(),
            stage,
            label: label.to_string(),
            outcome: settled.label().to_string(),
            duration_ms,
            timestamp: Utc::now(),
        });

        settled
    }
}
