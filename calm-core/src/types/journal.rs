//! Per-session reflection material that later feeds memory extraction (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single session's reflection record, stored in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionJournalEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub working_directory: String,
    pub session_log_path: String,
    pub summary: String,
    pub friction_points: Vec<String>,
    pub next_steps: Vec<String>,
    pub reflected_at: Option<DateTime<Utc>>,
    pub memories_created: u32,
}
