//! Session & orphan tracking (spec.md §4, component 11; §4.1 tool-count
//! discipline).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::Result;
use crate::metadata_store::MetadataStore;

/// Per-session tool-invocation counter and check-in cadence.
///
/// The counter lives in process memory (spec.md §5: no process-wide
/// mutable state besides config and the embedder registry is required by
/// the *core contract*, but a live session's call count is exactly the
/// kind of short-lived, caller-owned state the orchestration layer keeps
/// here rather than round-tripping to storage on every tool call) and is
/// mirrored to the metadata store via `touch_session` for orphan
/// staleness checks across process restarts.
pub struct SessionTracker {
    metadata: Arc<dyn MetadataStore>,
    counts: Mutex<HashMap<String, u32>>,
}

impl SessionTracker {
    /// Builds a tracker backed by `metadata` for cross-restart durability.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            metadata,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Records one tool invocation for `session_id` and returns the new
    /// count.
    pub async fn record_tool_call(&self, session_id: &str) -> Result<u32> {
        let count = {
            let mut counts = self.counts.lock();
            let entry = counts.entry(session_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.metadata.touch_session(session_id, count, Utc::now()).await?;
        Ok(count)
    }

    /// Whether a check-in is due: `count % frequency == 0` (spec.md §4.1).
    /// `frequency == 0` never triggers a check-in.
    #[must_use]
    pub fn should_check_in(&self, session_id: &str, frequency: u32) -> bool {
        if frequency == 0 {
            return false;
        }
        let counts = self.counts.lock();
        counts.get(session_id).is_some_and(|&c| c % frequency == 0 && c > 0)
    }

    /// Explicitly resets the counter for `session_id`. Never called
    /// implicitly by `resolve` (spec.md §4.1) — check-in cadence and GHAP
    /// resolution are independent concerns.
    pub fn reset(&self, session_id: &str) {
        self.counts.lock().insert(session_id.to_string(), 0);
    }

    /// Current count for `session_id`, `0` if never recorded.
    #[must_use]
    pub fn count(&self, session_id: &str) -> u32 {
        *self.counts.lock().get(session_id).unwrap_or(&0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::InMemoryMetadataStore;

    fn tracker() -> SessionTracker {
        SessionTracker::new(Arc::new(InMemoryMetadataStore::new()))
    }

    #[tokio::test]
    async fn check_in_fires_on_multiples_of_frequency() {
        let t = tracker();
        for _ in 0..9 {
            t.record_tool_call("s1").await.unwrap();
        }
        assert!(!t.should_check_in("s1", 10));
        t.record_tool_call("s1").await.unwrap();
        assert!(t.should_check_in("s1", 10));
    }

    #[tokio::test]
    async fn reset_does_not_happen_implicitly() {
        let t = tracker();
        for _ in 0..5 {
            t.record_tool_call("s1").await.unwrap();
        }
        assert_eq!(t.count("s1"), 5);
        // resolving a GHAP entry is a no-op on the tracker; only an
        // explicit reset() zeroes the counter.
        assert_eq!(t.count("s1"), 5);
        t.reset("s1");
        assert_eq!(t.count("s1"), 0);
    }

    #[tokio::test]
    async fn zero_frequency_never_checks_in() {
        let t = tracker();
        t.record_tool_call("s1").await.unwrap();
        assert!(!t.should_check_in("s1", 0));
    }
}
