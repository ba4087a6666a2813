//! Entity-specific result records the searcher maps vector hits onto
//! (spec.md §4.3 step 5).

use chrono::{DateTime, Utc};

use crate::types::{Axis, ConfidenceTier, Domain, OutcomeStatus, Strategy};

/// Fixed collection names (spec.md §6.2); opaque to callers of the
/// searcher, visible to operators.
pub mod collections {
    pub const MEMORIES: &str = "memories";
    pub const CODE_UNITS: &str = "code_units";
    pub const COMMITS: &str = "commits";
    pub const VALUES: &str = "values";
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHit {
    pub id: String,
    pub content: String,
    pub category: Option<String>,
    pub importance: f32,
    pub score: f32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeHit {
    pub id: String,
    pub path: String,
    pub language: Option<String>,
    pub snippet: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceHit {
    pub ghap_id: String,
    pub axis: Axis,
    pub text: String,
    pub domain: Option<Domain>,
    pub strategy: Option<Strategy>,
    pub outcome_status: Option<OutcomeStatus>,
    pub confidence_tier: Option<ConfidenceTier>,
    pub score: f32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueHit {
    pub id: String,
    pub text: String,
    pub cluster_id: String,
    pub axis: Option<Axis>,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitHit {
    pub sha: String,
    pub message: String,
    pub score: f32,
    pub committed_at: Option<DateTime<Utc>>,
}
