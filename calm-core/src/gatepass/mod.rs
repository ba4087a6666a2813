//! Gate-pass verifier (spec.md §4, component 10; §4.6).
//!
//! A commit-anchored proof that a gated phase transition's automated checks
//! ran against the exact code state being transitioned. Not present in the
//! teacher at all — this is domain logic spec.md introduces fresh — but the
//! storage idiom (insert-or-replace keyed by a composite natural key) is
//! grounded in the teacher's `memory-storage-redb` table pattern used for
//! episodes: same typed-table/codec shape, new key and payload.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::metadata_store::MetadataStore;
use crate::types::{GatePass, GatedTransition};

/// The closed set of phase transitions that require a proven gate pass
/// before they may complete (spec.md §4.6). Every other transition bypasses
/// verification entirely.
pub const GATED_TRANSITIONS: [GatedTransition; 4] = [
    GatedTransition::ImplementToCodeReview,
    GatedTransition::TestToIntegrate,
    GatedTransition::InvestigatedToFixed,
    GatedTransition::ReviewedToTested,
];

/// Records and verifies gate passes against the metadata store.
pub struct GatePassVerifier {
    metadata: Arc<dyn MetadataStore>,
}

impl GatePassVerifier {
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Records that `transition`'s automated checks passed at `commit_sha`
    /// for `task_id`. Re-recording the same `(task_id, transition,
    /// commit_sha)` triple simply refreshes `passed_at` (spec.md §3).
    ///
    /// # Errors
    /// Propagates metadata store failures.
    pub async fn record_gate_pass(&self, task_id: &str, transition: &str, commit_sha: &str) -> Result<()> {
        self.metadata
            .record_gate_pass(GatePass {
                task_id: task_id.to_string(),
                transition: transition.to_string(),
                commit_sha: commit_sha.to_string(),
                passed_at: Utc::now(),
            })
            .await
    }

    /// Verifies that `transition` has a recorded pass for `task_id` against
    /// `current_sha` (spec.md §4.6). Transitions outside
    /// [`GATED_TRANSITIONS`] always succeed without consulting storage.
    ///
    /// # Errors
    /// [`Error::NoPass`] if no pass was ever recorded for the pair;
    /// [`Error::ShaMismatch`] (both SHAs truncated to 7 characters) if the
    /// most recent recorded pass names a different commit.
    pub async fn verify_gate_pass(&self, task_id: &str, transition: &str, current_sha: &str) -> Result<()> {
        if !is_gated(transition) {
            return Ok(());
        }

        let pass = self.metadata.latest_gate_pass(task_id, transition).await?;
        match pass {
            None => Err(Error::NoPass(format!(
                "no gate pass recorded for task '{task_id}' transition '{transition}'"
            ))),
            Some(pass) if pass.commit_sha == current_sha => Ok(()),
            Some(pass) => Err(Error::ShaMismatch(format!(
                "gate pass for task '{task_id}' transition '{transition}' was recorded at {} but current commit is {}",
                short_sha(&pass.commit_sha),
                short_sha(current_sha),
            ))),
        }
    }
}

fn is_gated(transition: &str) -> bool {
    GATED_TRANSITIONS.iter().any(|t| t.as_str() == transition)
}

fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(7)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::InMemoryMetadataStore;

    fn verifier() -> GatePassVerifier {
        GatePassVerifier::new(Arc::new(InMemoryMetadataStore::new()))
    }

    #[tokio::test]
    async fn verify_without_any_pass_fails_no_pass() {
        let v = verifier();
        let err = v
            .verify_gate_pass("T1", GatedTransition::ImplementToCodeReview.as_str(), "abc123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "no_pass");
    }

    #[tokio::test]
    async fn verify_with_matching_sha_succeeds() {
        let v = verifier();
        let transition = GatedTransition::ImplementToCodeReview.as_str();
        v.record_gate_pass("T1", transition, "abc123").await.unwrap();
        v.verify_gate_pass("T1", transition, "abc123").await.unwrap();
    }

    #[tokio::test]
    async fn amending_the_commit_invalidates_the_pass() {
        let v = verifier();
        let transition = GatedTransition::ImplementToCodeReview.as_str();
        v.record_gate_pass("T1", transition, "abc123").await.unwrap();
        let err = v.verify_gate_pass("T1", transition, "def456").await.unwrap_err();
        assert_eq!(err.kind(), "sha_mismatch");
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("def456"));
    }

    #[tokio::test]
    async fn ungated_transition_bypasses_verification() {
        let v = verifier();
        v.verify_gate_pass("T1", "PLAN-IMPLEMENT", "anything").await.unwrap();
    }

    #[tokio::test]
    async fn re_recording_same_triple_refreshes_timestamp() {
        let v = verifier();
        let transition = GatedTransition::TestToIntegrate.as_str();
        v.record_gate_pass("T2", transition, "sha1").await.unwrap();
        v.record_gate_pass("T2", transition, "sha1").await.unwrap();
        v.verify_gate_pass("T2", transition, "sha1").await.unwrap();
    }
}
