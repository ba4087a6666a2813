//! Observation state machine: the per-session GHAP lifecycle (spec.md §4.1).

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metadata_store::MetadataStore;
use crate::types::{
    Domain, GHAPEntry, GHAPStatus, Lesson, Outcome, OutcomeStatus, RootCause, Strategy,
};

/// Result of [`GhapStateMachine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedId {
    pub id: Uuid,
}

/// Drives the GHAP lifecycle: `start` → zero or more `update` → `resolve`.
///
/// Holds no locks itself (spec.md §5); correctness of the single-active-
/// entry invariant is delegated entirely to the metadata store's
/// `insert_active`, which must make the check-and-insert atomic.
pub struct GhapStateMachine {
    metadata: Arc<dyn MetadataStore>,
}

impl GhapStateMachine {
    /// Builds a state machine over the given metadata store.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Starts a new active GHAP entry for `session_id`.
    ///
    /// # Errors
    /// [`Error::Validation`] if any field violates spec.md §3 length
    /// bounds; [`Error::ActiveExists`] (naming the existing entry's id) if
    /// the session already has an active entry.
    pub async fn start(
        &self,
        session_id: &str,
        domain: Domain,
        strategy: Strategy,
        goal: String,
        hypothesis: String,
        action: String,
        prediction: String,
    ) -> Result<StartedId> {
        GHAPEntry::validate_core_fields(&goal, &hypothesis, &action, &prediction)?;

        let now = Utc::now();
        let entry = GHAPEntry {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            domain,
            strategy,
            goal,
            hypothesis,
            action,
            prediction,
            status: GHAPStatus::Active,
            iteration_count: 0,
            outcome: None,
            surprise: None,
            root_cause: None,
            lesson: None,
            confidence_tier: None,
            created_at: now,
            updated_at: now,
        };
        let id = entry.id;
        self.metadata.insert_active(entry).await?;
        Ok(StartedId { id })
    }

    /// Applies a partial update to the session's active entry.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the session never started an entry;
    /// [`Error::Validation`] if no mutable field is provided, or if the
    /// session's entry already resolved to terminal (spec.md §8
    /// invariant 2 — an update is only valid against an active entry).
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        session_id: &str,
        hypothesis: Option<String>,
        action: Option<String>,
        prediction: Option<String>,
        strategy: Option<Strategy>,
        _note: Option<String>,
    ) -> Result<()> {
        if hypothesis.is_none() && action.is_none() && prediction.is_none() && strategy.is_none() {
            return Err(Error::validation(
                "at least one of hypothesis, action, prediction, strategy must be provided",
            ));
        }

        let mut entry = match self.metadata.get_active(session_id).await? {
            Some(entry) => entry,
            None => {
                if self.metadata.get_terminal_by_session(session_id).await?.is_some() {
                    return Err(Error::validation(format!(
                        "session '{session_id}' has no active entry to update: its entry already resolved to terminal"
                    )));
                }
                return Err(Error::NotFound(format!("no active GHAP entry for session '{session_id}'")));
            }
        };

        if let Some(h) = hypothesis {
            entry.hypothesis = h;
        }
        if let Some(a) = action {
            entry.action = a;
        }
        if let Some(p) = prediction {
            entry.prediction = p;
        }
        if let Some(s) = strategy {
            entry.strategy = s;
        }
        GHAPEntry::validate_core_fields(&entry.goal, &entry.hypothesis, &entry.action, &entry.prediction)?;
        entry.iteration_count += 1;
        entry.updated_at = Utc::now();

        self.metadata.replace_active(entry).await
    }

    /// Resolves the session's active entry to terminal, deriving its
    /// confidence tier.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the session has no active entry;
    /// [`Error::Validation`] if `status == falsified` and `surprise` is
    /// absent or empty, or `outcome.result` exceeds its length bound.
    pub async fn resolve(
        &self,
        session_id: &str,
        status: OutcomeStatus,
        result: String,
        surprise: Option<String>,
        root_cause: Option<RootCause>,
        lesson: Option<Lesson>,
    ) -> Result<GHAPEntry> {
        if result.chars().count() > crate::types::RESULT_MAX_LEN {
            return Err(Error::validation(format!(
                "outcome.result exceeds {} characters",
                crate::types::RESULT_MAX_LEN
            )));
        }
        if status == OutcomeStatus::Falsified && surprise.as_deref().unwrap_or("").is_empty() {
            return Err(Error::validation(
                "surprise is required and must be non-empty when status=falsified",
            ));
        }
        if let Some(s) = &surprise {
            if s.chars().count() > crate::types::SURPRISE_MAX_LEN {
                return Err(Error::validation(format!(
                    "surprise exceeds {} characters",
                    crate::types::SURPRISE_MAX_LEN
                )));
            }
        }
        // root_cause without surprise would strand the surprise/root_cause
        // axis writes (spec.md §4.2); reject it rather than silently drop it.
        if root_cause.is_some() && surprise.as_deref().unwrap_or("").is_empty() {
            return Err(Error::validation(
                "root_cause requires a non-empty surprise",
            ));
        }

        let mut entry = self
            .metadata
            .get_active(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no active GHAP entry for session '{session_id}'")))?;

        let confidence_tier = GHAPEntry::derive_confidence_tier(status, entry.iteration_count, lesson.as_ref());

        entry.status = GHAPStatus::Terminal;
        entry.outcome = Some(Outcome {
            status,
            result,
            captured_at: Utc::now(),
        });
        entry.surprise = surprise;
        entry.root_cause = root_cause;
        entry.lesson = lesson;
        entry.confidence_tier = Some(confidence_tier);
        entry.updated_at = Utc::now();

        self.metadata.resolve_active(entry.clone()).await?;
        Ok(entry)
    }

    /// Returns the session's active entry, if any.
    pub async fn get_active(&self, session_id: &str) -> Result<Option<GHAPEntry>> {
        self.metadata.get_active(session_id).await
    }

    /// Returns an active entry belonging to another session, for hand-off
    /// on session start (spec.md §4.1).
    pub async fn get_orphaned(&self, current_session_id: &str) -> Result<Option<GHAPEntry>> {
        self.metadata.get_orphaned(current_session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::InMemoryMetadataStore;
    use crate::types::RootCauseCategory;

    fn machine() -> GhapStateMachine {
        GhapStateMachine::new(Arc::new(InMemoryMetadataStore::new()))
    }

    #[tokio::test]
    async fn start_then_start_again_is_active_exists() {
        let m = machine();
        m.start(
            "s1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "fix port collision".into(),
            "daemon not cleaned up".into(),
            "kill pid".into(),
            "port frees".into(),
        )
        .await
        .unwrap();

        let err = m
            .start(
                "s1",
                Domain::Debugging,
                Strategy::SystematicElimination,
                "g2".into(),
                "h2".into(),
                "a2".into(),
                "p2".into(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "active_exists");
    }

    #[tokio::test]
    async fn update_requires_a_field() {
        let m = machine();
        m.start(
            "s1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "g".into(),
            "h".into(),
            "a".into(),
            "p".into(),
        )
        .await
        .unwrap();

        let err = m.update("s1", None, None, None, None, None).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn update_increments_iteration_count() {
        let m = machine();
        m.start(
            "s1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "g".into(),
            "h".into(),
            "a".into(),
            "p".into(),
        )
        .await
        .unwrap();
        m.update("s1", Some("h2".into()), None, None, None, None)
            .await
            .unwrap();
        let active = m.get_active("s1").await.unwrap().unwrap();
        assert_eq!(active.iteration_count, 1);
        assert_eq!(active.hypothesis, "h2");
    }

    #[tokio::test]
    async fn falsified_requires_surprise() {
        let m = machine();
        m.start(
            "s1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "g".into(),
            "h".into(),
            "a".into(),
            "p".into(),
        )
        .await
        .unwrap();
        let err = m
            .resolve("s1", OutcomeStatus::Falsified, "failed".into(), None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn falsified_with_recovery_yields_bronze() {
        let m = machine();
        m.start(
            "s1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "fix port collision".into(),
            "daemon not cleaned up".into(),
            "kill pid".into(),
            "port frees".into(),
        )
        .await
        .unwrap();
        m.update("s1", Some("stale lockfile".into()), None, None, None, None)
            .await
            .unwrap();

        let resolved = m
            .resolve(
                "s1",
                OutcomeStatus::Falsified,
                "port still held".into(),
                Some("another process was listening".into()),
                Some(RootCause {
                    category: RootCauseCategory::EnvDrift,
                    description: "sidecar holding port".into(),
                }),
                Some(Lesson {
                    what_worked: Some("lsof -i :6334".into()),
                    takeaway: None,
                }),
            )
            .await
            .unwrap();

        assert_eq!(
            resolved.confidence_tier,
            Some(crate::types::ConfidenceTier::Bronze)
        );
        assert!(m.get_active("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolve_without_active_entry_not_found() {
        let m = machine();
        let err = m
            .resolve("s1", OutcomeStatus::Confirmed, "done".into(), None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn update_after_resolve_is_validation_error_not_not_found() {
        let m = machine();
        m.start(
            "s1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "g".into(),
            "h".into(),
            "a".into(),
            "p".into(),
        )
        .await
        .unwrap();
        m.resolve("s1", OutcomeStatus::Confirmed, "done".into(), None, None, None)
            .await
            .unwrap();

        let err = m
            .update("s1", Some("h2".into()), None, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn update_for_a_session_that_never_started_is_not_found() {
        let m = machine();
        let err = m
            .update("never-started", Some("h2".into()), None, None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
