//! Table layout, grounded in the teacher's `memory-storage-redb::lib`
//! constants (one `TableDefinition<&str, &[u8]>` per logical record kind,
//! values postcard-encoded).
//!
//! [`MetadataStore`](calm_core::metadata_store::MetadataStore) names five
//! concerns (sessions/active-GHAP, gate passes, journal entries, counters,
//! values); honoring every trait method in full needs two more tables than
//! that summary names — a terminal-entries table (resolved GHAPs move out
//! of the active table rather than being deleted) and a session-touch table
//! (staleness bookkeeping independent of whether a session currently holds
//! an active entry). Noted in the project's design ledger.

use redb::TableDefinition;

/// Active GHAP entries, keyed by `session_id`. At most one row per session
/// (spec.md §5 invariant 1).
pub const ACTIVE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("active");

/// Terminal (resolved) GHAP entries, keyed by their `id` (UUID string form).
pub const TERMINAL_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("terminal");

/// Gate passes, keyed by `"{task_id}\u{1f}{transition}"`, valued as a
/// postcard-encoded `Vec<GatePass>` (one entry per distinct commit sha seen
/// for that pair, insert-or-replace by sha).
pub const GATE_PASSES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("gate_passes");

/// Session journal entries, keyed by their `id` (UUID string form).
pub const JOURNAL_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("journal");

/// Named integer counters, keyed by name, valued as a little-endian `i64`.
pub const COUNTERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("counters");

/// Validated values, keyed by axis collection name, valued as a
/// postcard-encoded `Vec<Value>`.
pub const VALUES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("values");

/// Per-session last-touch bookkeeping, keyed by `session_id`, valued as a
/// postcard-encoded `(u32, DateTime<Utc>)`.
pub const SESSION_TOUCH_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session_touch");
