//! In-memory [`MetadataStore`] fixture used by calm-core's own unit tests.
//!
//! Production deployments use `calm-storage-redb`'s backend instead; this
//! type exists so calm-core's state machine, gate-pass verifier, and
//! searcher tests don't need a redb dependency to exercise their logic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::MetadataStore;
use crate::error::{Error, Result};
use crate::types::{GHAPEntry, GatePass, SessionJournalEntry, Value};

#[derive(Default)]
struct State {
    active: HashMap<String, GHAPEntry>,
    terminal: HashMap<Uuid, GHAPEntry>,
    gate_passes: HashMap<(String, String), Vec<GatePass>>,
    journal: HashMap<Uuid, SessionJournalEntry>,
    counters: HashMap<String, i64>,
    values: HashMap<String, Vec<Value>>,
    session_touch: HashMap<String, (u32, DateTime<Utc>)>,
}

/// An in-process, `parking_lot`-guarded [`MetadataStore`].
#[derive(Default)]
pub struct InMemoryMetadataStore {
    state: RwLock<State>,
}

impl InMemoryMetadataStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert_active(&self, entry: GHAPEntry) -> Result<()> {
        let mut state = self.state.write();
        if let Some(existing) = state.active.get(&entry.session_id) {
            return Err(Error::ActiveExists(format!(
                "session '{}' already has active entry {}",
                entry.session_id, existing.id
            )));
        }
        state.active.insert(entry.session_id.clone(), entry);
        Ok(())
    }

    async fn replace_active(&self, entry: GHAPEntry) -> Result<()> {
        let mut state = self.state.write();
        state.active.insert(entry.session_id.clone(), entry);
        Ok(())
    }

    async fn get_active(&self, session_id: &str) -> Result<Option<GHAPEntry>> {
        Ok(self.state.read().active.get(session_id).cloned())
    }

    async fn get_orphaned(&self, current_session_id: &str) -> Result<Option<GHAPEntry>> {
        Ok(self
            .state
            .read()
            .active
            .values()
            .find(|e| e.session_id != current_session_id)
            .cloned())
    }

    async fn resolve_active(&self, entry: GHAPEntry) -> Result<()> {
        let mut state = self.state.write();
        state.active.remove(&entry.session_id);
        state.terminal.insert(entry.id, entry);
        Ok(())
    }

    async fn get_terminal(&self, id: Uuid) -> Result<Option<GHAPEntry>> {
        Ok(self.state.read().terminal.get(&id).cloned())
    }

    async fn get_terminal_by_session(&self, session_id: &str) -> Result<Option<GHAPEntry>> {
        Ok(self
            .state
            .read()
            .terminal
            .values()
            .filter(|e| e.session_id == session_id)
            .max_by_key(|e| e.updated_at)
            .cloned())
    }

    async fn record_gate_pass(&self, pass: GatePass) -> Result<()> {
        let mut state = self.state.write();
        let key = (pass.task_id.clone(), pass.transition.clone());
        let entries = state.gate_passes.entry(key).or_default();
        if let Some(existing) = entries.iter_mut().find(|p| p.commit_sha == pass.commit_sha) {
            existing.passed_at = pass.passed_at;
        } else {
            entries.push(pass);
        }
        Ok(())
    }

    async fn latest_gate_pass(&self, task_id: &str, transition: &str) -> Result<Option<GatePass>> {
        let state = self.state.read();
        Ok(state
            .gate_passes
            .get(&(task_id.to_string(), transition.to_string()))
            .and_then(|entries| entries.iter().max_by_key(|p| p.passed_at).cloned()))
    }

    async fn insert_journal_entry(&self, entry: SessionJournalEntry) -> Result<()> {
        self.state.write().journal.insert(entry.id, entry);
        Ok(())
    }

    async fn get_journal_entry(&self, id: Uuid) -> Result<Option<SessionJournalEntry>> {
        Ok(self.state.read().journal.get(&id).cloned())
    }

    async fn increment_counter(&self, name: &str, by: i64) -> Result<i64> {
        let mut state = self.state.write();
        let counter = state.counters.entry(name.to_string()).or_insert(0);
        *counter += by;
        Ok(*counter)
    }

    async fn get_counter(&self, name: &str) -> Result<i64> {
        Ok(*self.state.read().counters.get(name).unwrap_or(&0))
    }

    async fn insert_value(&self, value: Value) -> Result<()> {
        let mut state = self.state.write();
        state
            .values
            .entry(value.axis.collection_name().to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn list_values(&self, axis: &str) -> Result<Vec<Value>> {
        let mut values = self
            .state
            .read()
            .values
            .get(axis)
            .cloned()
            .unwrap_or_default();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(values)
    }

    async fn touch_session(&self, session_id: &str, tool_count: u32, at: DateTime<Utc>) -> Result<()> {
        self.state
            .write()
            .session_touch
            .insert(session_id.to_string(), (tool_count, at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Domain, GHAPStatus, Strategy};

    fn entry(session_id: &str) -> GHAPEntry {
        let now = Utc::now();
        GHAPEntry {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            domain: Domain::Debugging,
            strategy: Strategy::SystematicElimination,
            goal: "g".into(),
            hypothesis: "h".into(),
            action: "a".into(),
            prediction: "p".into(),
            status: GHAPStatus::Active,
            iteration_count: 0,
            outcome: None,
            surprise: None,
            root_cause: None,
            lesson: None,
            confidence_tier: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn second_insert_for_same_session_fails() {
        let store = InMemoryMetadataStore::new();
        store.insert_active(entry("s1")).await.unwrap();
        let err = store.insert_active(entry("s1")).await.unwrap_err();
        assert_eq!(err.kind(), "active_exists");
    }

    #[tokio::test]
    async fn orphan_lookup_excludes_current_session() {
        let store = InMemoryMetadataStore::new();
        store.insert_active(entry("other")).await.unwrap();
        let orphan = store.get_orphaned("s1").await.unwrap();
        assert!(orphan.is_some());
        assert!(store.get_orphaned("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counter_increments_accumulate() {
        let store = InMemoryMetadataStore::new();
        assert_eq!(store.increment_counter("c", 1).await.unwrap(), 1);
        assert_eq!(store.increment_counter("c", 2).await.unwrap(), 3);
        assert_eq!(store.get_counter("c").await.unwrap(), 3);
    }
}
