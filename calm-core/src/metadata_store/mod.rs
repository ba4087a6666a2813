//! Relational-style records owned outside the vector store (spec.md §4,
//! component 3): sessions/active-GHAP, gate passes, journal entries,
//! counters, and values.
//!
//! [`MetadataStore`] is the trait boundary; [`crate::ghap::GhapStateMachine`],
//! [`crate::gatepass::GatePassVerifier`], and [`crate::session::SessionTracker`]
//! all depend on it rather than on a concrete backend, so that a production
//! deployment and an in-memory test fixture satisfy the same contract. The
//! concrete `redb`-backed implementation lives in the `calm-storage-redb`
//! crate (spec.md §1 ownership: the metadata store is in scope, but this
//! crate only defines what it must do).

mod memory;

pub use memory::InMemoryMetadataStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{GHAPEntry, GatePass, SessionJournalEntry, Value};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Inserts a new active GHAP entry for its session.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::ActiveExists`] if the session already
    /// has an active entry; enforced as a single logical operation so that
    /// concurrent callers racing for the same session yield exactly one
    /// success (spec.md §5).
    async fn insert_active(&self, entry: GHAPEntry) -> Result<()>;

    /// Replaces the active entry for `session_id` with `entry` (used by
    /// `update`, which must not touch any other session's row).
    async fn replace_active(&self, entry: GHAPEntry) -> Result<()>;

    /// Returns the active entry for `session_id`, if any.
    async fn get_active(&self, session_id: &str) -> Result<Option<GHAPEntry>>;

    /// Returns an active entry belonging to a session other than
    /// `current_session_id`, if any (spec.md §4.1 orphan hand-off).
    async fn get_orphaned(&self, current_session_id: &str) -> Result<Option<GHAPEntry>>;

    /// Moves the active entry for `session_id` to terminal storage,
    /// replacing its in-place record.
    async fn resolve_active(&self, entry: GHAPEntry) -> Result<()>;

    /// Fetches a terminal entry by id, if present.
    async fn get_terminal(&self, id: Uuid) -> Result<Option<GHAPEntry>>;

    /// Fetches the most recently resolved terminal entry for `session_id`,
    /// if any. Used to distinguish "this session never started an entry"
    /// from "this session's entry already resolved" when an operation is
    /// only valid against an active entry (spec.md §8 invariant 2).
    async fn get_terminal_by_session(&self, session_id: &str) -> Result<Option<GHAPEntry>>;

    /// Inserts-or-replaces a gate pass keyed by `(task_id, transition, commit_sha)`
    /// (spec.md §4.6).
    async fn record_gate_pass(&self, pass: GatePass) -> Result<()>;

    /// Returns the most recent gate pass for `(task_id, transition)`
    /// regardless of recorded sha, used to report the mismatched sha on
    /// verification failure.
    async fn latest_gate_pass(&self, task_id: &str, transition: &str) -> Result<Option<GatePass>>;

    /// Inserts a session journal entry.
    async fn insert_journal_entry(&self, entry: SessionJournalEntry) -> Result<()>;

    /// Fetches a journal entry by id.
    async fn get_journal_entry(&self, id: Uuid) -> Result<Option<SessionJournalEntry>>;

    /// Atomically increments and returns a named counter's new value
    /// (e.g. per-axis resolved-entry counts driving re-clustering cadence,
    /// spec.md §4.4).
    async fn increment_counter(&self, name: &str, by: i64) -> Result<i64>;

    /// Reads a named counter's current value without incrementing it.
    async fn get_counter(&self, name: &str) -> Result<i64>;

    /// Inserts a validated value.
    async fn insert_value(&self, value: Value) -> Result<()>;

    /// Lists all values for an axis, most recent first.
    async fn list_values(&self, axis: &str) -> Result<Vec<Value>>;

    /// Records (or updates) a session's last tool-invocation timestamp and
    /// count, used for orphan-session staleness checks.
    async fn touch_session(&self, session_id: &str, tool_count: u32, at: DateTime<Utc>) -> Result<()>;
}
