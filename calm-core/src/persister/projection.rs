//! Multi-axis embedding persister (spec.md §4, component 5; §4.2).

use std::sync::Arc;

use serde_json::{json, Value as Json};
use tracing::warn;
use uuid::Uuid;

use super::templates::{render, TemplateContext};
use crate::embeddings::{Embedder, QUALITY_DIMENSION};
use crate::error::{Error, Result};
use crate::types::{Axis, GHAPEntry, GHAPStatus, OutcomeStatus};
use crate::vector_store::{Distance, StoredPoint, VectorStore};

fn full_template() -> &'static str {
    "Goal: {goal}. Hypothesis: {hypothesis}. Action: {action}. Prediction: {prediction}. \
     Outcome: {outcome_status} — {outcome_result}.[ Surprise: {surprise}.][ Lesson: {lesson}.]"
}

fn strategy_template() -> &'static str {
    "Strategy: {strategy}. Goal: {goal}. Outcome: {outcome_status} after {iteration_count} \
     iteration(s).[ What worked: {what_worked}.]"
}

fn surprise_template() -> &'static str {
    "Expected: {prediction}. Actual: {outcome_result}. Surprise: {surprise}.[ Root cause: \
     {root_cause_description}.]"
}

fn root_cause_template() -> &'static str {
    "Category: {root_cause_category}. Description: {root_cause_description}. Domain: {domain}. \
     Strategy: {strategy}. Original hypothesis: {hypothesis}."
}

fn base_context(entry: &GHAPEntry) -> TemplateContext {
    let outcome = entry.outcome.as_ref();
    TemplateContext::new()
        .with("goal", entry.goal.clone())
        .with("hypothesis", entry.hypothesis.clone())
        .with("action", entry.action.clone())
        .with("prediction", entry.prediction.clone())
        .with("domain", entry.domain.as_str())
        .with("strategy", entry.strategy.as_str())
        .with("iteration_count", entry.iteration_count.to_string())
        .with_opt(
            "outcome_status",
            outcome.map(|o| o.status.as_str()),
        )
        .with_opt("outcome_result", outcome.map(|o| o.result.as_str()))
        .with_opt("surprise", entry.surprise.as_deref())
}

fn base_payload(entry: &GHAPEntry, axis: Axis, text: &str) -> Json {
    json!({
        "ghap_id": entry.id,
        "session_id": entry.session_id,
        "axis": axis.as_str(),
        "domain": entry.domain.as_str(),
        "strategy": entry.strategy.as_str(),
        "outcome_status": entry.outcome.as_ref().map(|o| o.status.as_str()),
        "confidence_tier": entry.confidence_tier.map(|t| t.as_str()),
        "iteration_count": entry.iteration_count,
        "created_at": entry.created_at.timestamp() as f64,
        "updated_at": entry.updated_at.timestamp() as f64,
        "text": text,
    })
}

/// Determines which axes a resolved entry must be projected to
/// (spec.md §8 invariant 3).
#[must_use]
pub fn applicable_axes(entry: &GHAPEntry) -> Vec<Axis> {
    let mut axes = vec![Axis::Full, Axis::Strategy];
    let Some(outcome) = &entry.outcome else {
        return axes;
    };
    if outcome.status != OutcomeStatus::Falsified {
        return axes;
    }
    let has_surprise = entry.surprise.as_deref().is_some_and(|s| !s.is_empty());
    if !has_surprise {
        if entry.root_cause.is_some() {
            warn!(
                ghap_id = %entry.id,
                "root_cause present without surprise; skipping surprise and root_cause axes"
            );
        }
        return axes;
    }
    axes.push(Axis::Surprise);
    if entry.root_cause.is_some() {
        axes.push(Axis::RootCause);
    }
    axes
}

fn render_axis(entry: &GHAPEntry, axis: Axis) -> Result<(String, Json)> {
    let mut ctx = base_context(entry);

    match axis {
        Axis::Full => {
            ctx = ctx.with_opt(
                "lesson",
                entry
                    .lesson
                    .as_ref()
                    .and_then(|l| l.what_worked.as_deref().or(l.takeaway.as_deref())),
            );
            let text = render(full_template(), &ctx)
                .map_err(|e| Error::Internal(format!("template render failed: {e}")))?;
            let payload = base_payload(entry, axis, &text);
            Ok((text, payload))
        }
        Axis::Strategy => {
            ctx = ctx.with_opt(
                "what_worked",
                entry.lesson.as_ref().and_then(|l| l.what_worked.as_deref()),
            );
            let text = render(strategy_template(), &ctx)
                .map_err(|e| Error::Internal(format!("template render failed: {e}")))?;
            let payload = base_payload(entry, axis, &text);
            Ok((text, payload))
        }
        Axis::Surprise => {
            ctx = ctx.with_opt(
                "root_cause_description",
                entry.root_cause.as_ref().map(|r| r.description.as_str()),
            );
            let text = render(surprise_template(), &ctx)
                .map_err(|e| Error::Internal(format!("template render failed: {e}")))?;
            let mut payload = base_payload(entry, axis, &text);
            if let Some(rc) = &entry.root_cause {
                payload["root_cause_category"] = json!(rc.category.as_str());
            }
            Ok((text, payload))
        }
        Axis::RootCause => {
            let rc = entry
                .root_cause
                .as_ref()
                .ok_or_else(|| Error::Internal("root_cause axis requires root_cause".into()))?;
            ctx = ctx
                .with("root_cause_category", rc.category.as_str())
                .with("root_cause_description", rc.description.clone());
            let text = render(root_cause_template(), &ctx)
                .map_err(|e| Error::Internal(format!("template render failed: {e}")))?;
            let mut payload = base_payload(entry, axis, &text);
            payload["root_cause_category"] = json!(rc.category.as_str());
            Ok((text, payload))
        }
    }
}

/// Renders a resolved GHAP entry into its text projections, embeds each
/// with the semantic model, and writes each to its axis collection
/// (spec.md §4.2).
pub struct ObservationPersister {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl ObservationPersister {
    /// Builds a persister. `embedder` must be the quality (768-d) model —
    /// the persister never embeds with the fast/code model.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, vector_store }
    }

    /// Creates all four axis collections at the semantic model's
    /// dimension with cosine distance; idempotent (spec.md §4.2).
    ///
    /// # Errors
    /// Returns [`Error::Storage`] on backend failure.
    pub async fn ensure_collections(&self) -> Result<()> {
        for axis in Axis::ALL {
            self.vector_store
                .create_collection(axis.collection_name(), QUALITY_DIMENSION, Distance::Cosine)
                .await?;
        }
        Ok(())
    }

    /// Persists one resolved entry across its applicable axes
    /// (spec.md §4.2).
    ///
    /// # Errors
    /// [`Error::Validation`] if `entry` is not terminal; [`Error::Embedding`]
    /// or [`Error::Storage`] on a downstream failure, in which case no
    /// partial state is assumed safe to keep — the caller retries the
    /// whole entry (upserts converge).
    pub async fn persist(&self, entry: &GHAPEntry) -> Result<Vec<Axis>> {
        if entry.status != GHAPStatus::Terminal || entry.outcome.is_none() {
            return Err(Error::validation(
                "only terminal entries with an outcome may be persisted",
            ));
        }

        let axes = applicable_axes(entry);
        for axis in &axes {
            let (text, payload) = render_axis(entry, *axis)?;
            let vector = self.embedder.embed(&text).await?;
            self.vector_store
                .upsert(
                    axis.collection_name(),
                    vec![StoredPoint {
                        id: point_id(entry.id, *axis),
                        vector,
                        payload,
                    }],
                )
                .await?;
        }
        Ok(axes)
    }

    /// Persists many entries sequentially, fail-fast (spec.md §4.2).
    ///
    /// # Errors
    /// [`Error::Validation`] on the first entry lacking an outcome (checked
    /// before any writes occur); otherwise the first downstream failure
    /// propagates, leaving earlier entries durably persisted.
    pub async fn persist_batch(&self, entries: &[GHAPEntry]) -> Result<Vec<Vec<Axis>>> {
        for entry in entries {
            if entry.outcome.is_none() {
                return Err(Error::validation(format!(
                    "entry {} has no outcome; batch persist requires every entry resolved",
                    entry.id
                )));
            }
        }
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            results.push(self.persist(entry).await?);
        }
        Ok(results)
    }
}

/// The point id shared by every axis projection of one entry. All axes
/// reuse the GHAP's own id (spec.md §8 invariant 4): cross-collection
/// correlation depends on payload.ghap_id, and the point id itself is kept
/// identical for simplicity of direct lookup/delete by id.
fn point_id(ghap_id: Uuid, _axis: Axis) -> String {
    ghap_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::types::{Domain, Lesson, Outcome, RootCause, RootCauseCategory, Strategy};
    use crate::vector_store::InMemoryVectorStore;
    use chrono::Utc;

    fn falsified_entry() -> GHAPEntry {
        let now = Utc::now();
        GHAPEntry {
            id: Uuid::new_v4(),
            session_id: "s1".into(),
            domain: Domain::Debugging,
            strategy: Strategy::SystematicElimination,
            goal: "fix port collision".into(),
            hypothesis: "stale lockfile".into(),
            action: "kill pid".into(),
            prediction: "port frees".into(),
            status: GHAPStatus::Terminal,
            iteration_count: 1,
            outcome: Some(Outcome {
                status: OutcomeStatus::Falsified,
                result: "port still held".into(),
                captured_at: now,
            }),
            surprise: Some("another process was listening".into()),
            root_cause: Some(RootCause {
                category: RootCauseCategory::EnvDrift,
                description: "sidecar holding port".into(),
            }),
            lesson: Some(Lesson {
                what_worked: Some("lsof -i :6334".into()),
                takeaway: None,
            }),
            confidence_tier: Some(crate::types::ConfidenceTier::Bronze),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn falsified_with_surprise_and_root_cause_yields_four_axes() {
        let axes = applicable_axes(&falsified_entry());
        assert_eq!(axes, vec![Axis::Full, Axis::Strategy, Axis::Surprise, Axis::RootCause]);
    }

    #[test]
    fn root_cause_without_surprise_skips_both() {
        let mut entry = falsified_entry();
        entry.surprise = None;
        let axes = applicable_axes(&entry);
        assert_eq!(axes, vec![Axis::Full, Axis::Strategy]);
    }

    #[test]
    fn confirmed_entry_yields_two_axes() {
        let mut entry = falsified_entry();
        entry.outcome.as_mut().unwrap().status = OutcomeStatus::Confirmed;
        let axes = applicable_axes(&entry);
        assert_eq!(axes, vec![Axis::Full, Axis::Strategy]);
    }

    #[tokio::test]
    async fn persist_writes_every_applicable_axis() {
        let persister = ObservationPersister::new(
            Arc::new(MockEmbedder::quality()),
            Arc::new(InMemoryVectorStore::new()),
        );
        persister.ensure_collections().await.unwrap();
        let entry = falsified_entry();
        let axes = persister.persist(&entry).await.unwrap();
        assert_eq!(axes.len(), 4);
    }

    #[tokio::test]
    async fn persist_rejects_active_entry() {
        let persister = ObservationPersister::new(
            Arc::new(MockEmbedder::quality()),
            Arc::new(InMemoryVectorStore::new()),
        );
        persister.ensure_collections().await.unwrap();
        let mut entry = falsified_entry();
        entry.status = GHAPStatus::Active;
        let err = persister.persist(&entry).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn cross_axis_ids_are_consistent() {
        let store = Arc::new(InMemoryVectorStore::new());
        let persister = ObservationPersister::new(Arc::new(MockEmbedder::quality()), store.clone());
        persister.ensure_collections().await.unwrap();
        let entry = falsified_entry();
        persister.persist(&entry).await.unwrap();

        for axis in Axis::ALL {
            let points = store.scroll(axis.collection_name(), None).await.unwrap();
            assert_eq!(points[0].payload["ghap_id"], json!(entry.id));
        }
    }
}
