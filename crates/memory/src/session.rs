//! Session memory: a bounded FIFO of entries per session id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Default number of entries retained per session.
pub const DEFAULT_CAPACITY: usize = 5;

/// Entry type for one extracted source.
pub const KIND_EXTRACTED_SOURCE: &str = "extracted_source";
/// Entry type for combined material that fit the budget.
pub const KIND_FULL_CONTENT: &str = "full_content";
/// Entry type for combined material that had to be trimmed.
pub const KIND_FULL_CONTENT_STORED: &str = "full_content_stored";

/// Metadata attached to a session entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Type tag used for filtered recall.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
}

impl EntryMetadata {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            source_id: None,
            token_count: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_token_count(mut self, tokens: usize) -> Self {
        self.token_count = Some(tokens);
        self
    }
}

/// One remembered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: String,
    pub content: String,
    pub metadata: EntryMetadata,
    pub timestamp: DateTime<Utc>,
}

type SessionLog = Arc<Mutex<VecDeque<SessionEntry>>>;

/// Per-session bounded store. Volatile; nothing outlives the process.
///
/// Writes to different sessions only share the outer map lock long enough to
/// look up (or create) their own log.
pub struct SessionMemory {
    sessions: RwLock<HashMap<String, SessionLog>>,
    capacity: usize,
}

impl SessionMemory {
    /// Create a store keeping at most `capacity` entries per session
    /// (minimum one).
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    async fn log_for(&self, session_id: &str) -> SessionLog {
        if let Some(log) = self.sessions.read().await.get(session_id) {
            return Arc::clone(log);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(session_id.to_string()).or_default())
    }

    /// Append an entry, evicting the oldest ones beyond capacity.
    /// Returns the new entry's id.
    pub async fn remember(
        &self,
        session_id: &str,
        content: impl Into<String>,
        metadata: EntryMetadata,
    ) -> String {
        let entry = SessionEntry {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
        };
        let id = entry.id.clone();

        let log = self.log_for(session_id).await;
        let mut log = log.lock().await;
        log.push_back(entry);
        let mut evicted = 0;
        while log.len() > self.capacity {
            log.pop_front();
            evicted += 1;
        }
        debug!(session_id, entries = log.len(), evicted, "Session entry stored");
        id
    }

    /// Entries of one session in insertion order, optionally filtered by
    /// metadata type.
    pub async fn recall(&self, session_id: &str, kind: Option<&str>) -> Vec<SessionEntry> {
        let Some(log) = self.sessions.read().await.get(session_id).cloned() else {
            return Vec::new();
        };
        let log = log.lock().await;
        log.iter()
            .filter(|e| kind.is_none_or(|k| e.metadata.kind == k))
            .cloned()
            .collect()
    }

    /// Render up to `limit` of the most recent combined-material entries
    /// under a `Previous Context:` header. `None` when there are none.
    pub async fn render_previous(&self, session_id: &str, limit: usize) -> Option<String> {
        let entries = self.recall(session_id, None).await;
        let previous: Vec<&str> = entries
            .iter()
            .filter(|e| {
                e.metadata.kind == KIND_FULL_CONTENT || e.metadata.kind == KIND_FULL_CONTENT_STORED
            })
            .map(|e| e.content.as_str())
            .collect();
        if previous.is_empty() || limit == 0 {
            return None;
        }
        let start = previous.len().saturating_sub(limit);
        Some(format!("Previous Context:\n{}", previous[start..].join("\n\n")))
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_last_five_of_seven_oldest_first() {
        let memory = SessionMemory::default();
        for i in 0..7 {
            memory
                .remember("s1", format!("entry {i}"), EntryMetadata::new(KIND_EXTRACTED_SOURCE))
                .await;
        }
        let entries = memory.recall("s1", None).await;
        let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["entry 2", "entry 3", "entry 4", "entry 5", "entry 6"]);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let memory = SessionMemory::default();
        memory.remember("a", "alpha", EntryMetadata::new("note")).await;
        memory.remember("b", "beta", EntryMetadata::new("note")).await;

        let a = memory.recall("a", None).await;
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "alpha");
        assert_eq!(memory.recall("b", None).await[0].content, "beta");
        assert!(memory.recall("missing", None).await.is_empty());
    }

    #[tokio::test]
    async fn recall_filters_by_type() {
        let memory = SessionMemory::default();
        memory
            .remember("s", "doc", EntryMetadata::new(KIND_EXTRACTED_SOURCE).with_source("pitch.pdf"))
            .await;
        memory
            .remember("s", "all", EntryMetadata::new(KIND_FULL_CONTENT_STORED).with_token_count(42))
            .await;

        let stored = memory.recall("s", Some(KIND_FULL_CONTENT_STORED)).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].metadata.token_count, Some(42));
        assert_eq!(memory.recall("s", Some(KIND_EXTRACTED_SOURCE)).await[0].metadata.source_id.as_deref(), Some("pitch.pdf"));
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let memory = SessionMemory::default();
        let first = memory.remember("s", "x", EntryMetadata::new("t")).await;
        let second = memory.remember("s", "x", EntryMetadata::new("t")).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn render_previous_uses_latest_combined_entries() {
        let memory = SessionMemory::default();
        memory.remember("s", "one", EntryMetadata::new(KIND_FULL_CONTENT)).await;
        memory.remember("s", "source", EntryMetadata::new(KIND_EXTRACTED_SOURCE)).await;
        memory.remember("s", "two", EntryMetadata::new(KIND_FULL_CONTENT_STORED)).await;
        memory.remember("s", "three", EntryMetadata::new(KIND_FULL_CONTENT)).await;

        let rendered = memory.render_previous("s", 2).await.unwrap();
        assert_eq!(rendered, "Previous Context:\ntwo\n\nthree");
        assert!(memory.render_previous("empty", 3).await.is_none());
    }

    #[tokio::test]
    async fn zero_capacity_keeps_the_latest_entry() {
        let memory = SessionMemory::new(0);
        memory.remember("s", "old", EntryMetadata::new("t")).await;
        memory.remember("s", "new", EntryMetadata::new("t")).await;
        let entries = memory.recall("s", None).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "new");
    }

    #[test]
    fn metadata_serializes_type_tag() {
        let json = serde_json::to_value(EntryMetadata::new(KIND_FULL_CONTENT).with_token_count(7)).unwrap();
        assert_eq!(json["type"], "full_content");
        assert_eq!(json["token_count"], 7);
        assert!(json.get("source_id").is_none());
    }
}
