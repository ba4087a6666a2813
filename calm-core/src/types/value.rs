//! Clustering output, validated values, and gate-pass anchors (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Axis;

/// Output of clustering one axis collection (spec.md §4.4).
///
/// `cluster_id` is opaque and stable only within the clustering run that
/// produced it (spec.md §9) — callers must re-resolve member ids on read
/// rather than caching the label across re-clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub axis: Axis,
    pub member_ids: Vec<Uuid>,
    pub centroid: Vec<f32>,
    pub member_count: usize,
    pub avg_confidence: f32,
}

impl ClusterInfo {
    /// The synthetic cluster id used for the noise partition of an axis
    /// (label `-1` in the underlying clustering, spec.md §4.4).
    #[must_use]
    pub fn noise_id(axis: Axis) -> String {
        format!("{}_noise", axis.collection_name())
    }

    /// Builds the `{axis}_{label}` cluster id for a non-noise label.
    #[must_use]
    pub fn cluster_id_for(axis: Axis, label: i64) -> String {
        format!("{}_{label}", axis.collection_name())
    }
}

/// A validated human-authored generalization drawn from a cluster (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: Uuid,
    pub axis: Axis,
    pub cluster_id: String,
    pub text: String,
    pub member_count: usize,
    pub avg_confidence: f32,
    pub created_at: DateTime<Utc>,
}

/// Maximum length of [`Value::text`].
pub const VALUE_TEXT_MAX_LEN: usize = 500;

/// A commit-anchored proof that a gated phase transition's checks ran
/// against the code state being transitioned (spec.md §3, §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePass {
    pub task_id: String,
    pub transition: String,
    pub commit_sha: String,
    pub passed_at: DateTime<Utc>,
}
