//! Pipeline events: progress notifications decoupled from the orchestrator.
//!
//! Events are published as a run moves through its states and as stages
//! finish. The CLI subscribes to print progress; nothing in the pipeline
//! depends on anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::stage::{PipelineState, StageKind};

/// All pipeline events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// The orchestrator moved to a new state.
    StateChanged {
        trace_id: String,
        from: PipelineState,
        to: PipelineState,
        timestamp: DateTime<Utc>,
    },

    /// A stage invocation finished (successfully or not).
    StageFinished {
        trace_id: String,
        stage: StageKind,
        label: String,
        outcome: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// One enrichment child settled.
    EnrichmentItem {
        trace_id: String,
        identifier: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for pipeline events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(PipelineEvent::StateChanged {
            trace_id: "t-1".into(),
            from: PipelineState::Ingesting,
            to: PipelineState::Extracting,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            PipelineEvent::StateChanged { from, to, .. } => {
                assert_eq!(*from, PipelineState::Ingesting);
                assert_eq!(*to, PipelineState::Extracting);
            }
            _ => panic!("Expected StateChanged event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(PipelineEvent::EnrichmentItem {
            trace_id: "t-1".into(),
            identifier: "https://acme.io".into(),
            success: false,
            timestamp: Utc::now(),
        });
    }
}
