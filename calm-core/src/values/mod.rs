//! Value extractor / validator (spec.md §4, component 8; §4.4 value
//! validation and storage).

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{Error, Result};
use crate::metadata_store::MetadataStore;
use crate::types::{ClusterInfo, Value, VALUE_TEXT_MAX_LEN};
use crate::vector_store::{Distance, StoredPoint, VectorStore};

/// Default similarity threshold a value must meet against its cluster's
/// centroid to be accepted (spec.md §4.4, §9 open question: treated here
/// as a single global constant rather than per-axis — see DESIGN.md).
pub const DEFAULT_TAU_ACCEPT: f32 = 0.55;

/// Outcome of validating a candidate value against a cluster (spec.md §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub similarity: f32,
    pub centroid_distance: f32,
    pub warnings: Vec<String>,
}

/// Validates human-authored generalizations against cluster centroids and
/// stores the ones that pass.
pub struct ValueExtractor {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    metadata: Arc<dyn MetadataStore>,
    tau_accept: f32,
    min_cluster_size: usize,
}

impl ValueExtractor {
    /// Builds a value extractor. `embedder` must be the semantic model —
    /// value text is embedded the same way experience projections are.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        metadata: Arc<dyn MetadataStore>,
        min_cluster_size: usize,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            metadata,
            tau_accept: DEFAULT_TAU_ACCEPT,
            min_cluster_size,
        }
    }

    /// Overrides the acceptance threshold (defaults to
    /// [`DEFAULT_TAU_ACCEPT`]).
    #[must_use]
    pub fn with_tau_accept(mut self, tau_accept: f32) -> Self {
        self.tau_accept = tau_accept;
        self
    }

    /// Validates `text` against `cluster`'s centroid (spec.md §4.4).
    ///
    /// # Errors
    /// [`Error::Validation`] if `cluster` is the axis's noise partition
    /// (spec.md §4.4: noise points are excluded from value extraction).
    /// [`Error::Embedding`] if embedding `text` fails.
    pub async fn validate(&self, text: &str, cluster: &ClusterInfo) -> Result<ValidationResult> {
        if cluster.cluster_id == ClusterInfo::noise_id(cluster.axis) {
            return Err(Error::validation(format!(
                "cluster '{}' is the noise partition for axis '{}'; noise points are excluded from value extraction",
                cluster.cluster_id,
                cluster.axis.as_str()
            )));
        }
        let embedding = self.embedder.embed(text).await?;
        let similarity = cosine_similarity(&embedding, &cluster.centroid);
        let valid = similarity >= self.tau_accept;

        let mut warnings = Vec::new();
        if cluster.member_count < self.min_cluster_size * 2 {
            warnings.push(format!(
                "cluster has only {} members, below the {}x-min_cluster_size confidence bar",
                cluster.member_count,
                self.min_cluster_size * 2
            ));
        }
        if cluster.avg_confidence < 0.5 {
            warnings.push(format!(
                "cluster avg_confidence {:.2} is below 0.5",
                cluster.avg_confidence
            ));
        }
        let near_threshold = (similarity - self.tau_accept).abs() < 0.05;
        if near_threshold {
            warnings.push(format!(
                "similarity {similarity:.3} is within 0.05 of the acceptance threshold {:.3}",
                self.tau_accept
            ));
        }

        Ok(ValidationResult {
            valid,
            similarity,
            centroid_distance: 1.0 - similarity,
            warnings,
        })
    }

    /// Validates `text` against `cluster` and, if accepted, stores it as a
    /// [`Value`] in the `values` collection (spec.md §4.4 value storage).
    ///
    /// # Errors
    /// [`Error::Validation`] if `text` exceeds [`VALUE_TEXT_MAX_LEN`] or
    /// fails validation; storage/embedding errors otherwise.
    pub async fn extract_and_store(&self, text: String, cluster: &ClusterInfo) -> Result<Value> {
        if text.chars().count() > VALUE_TEXT_MAX_LEN {
            return Err(Error::validation(format!(
                "value text exceeds {VALUE_TEXT_MAX_LEN} characters"
            )));
        }
        let validation = self.validate(&text, cluster).await?;
        if !validation.valid {
            return Err(Error::validation(format!(
                "value did not meet acceptance threshold: similarity {:.3} < tau_accept {:.3}",
                validation.similarity, self.tau_accept
            )));
        }

        let id = Uuid::new_v4();
        let value = Value {
            id,
            axis: cluster.axis,
            cluster_id: cluster.cluster_id.clone(),
            text: text.clone(),
            member_count: cluster.member_count,
            avg_confidence: cluster.avg_confidence,
            created_at: Utc::now(),
        };

        self.vector_store
            .create_collection("values", self.embedder.dimension(), Distance::Cosine)
            .await?;

        let embedding = self.embedder.embed(&text).await?;
        self.vector_store
            .upsert(
                "values",
                vec![StoredPoint {
                    id: id.to_string(),
                    vector: embedding,
                    payload: json!({
                        "text": text,
                        "axis": cluster.axis.as_str(),
                        "cluster_id": cluster.cluster_id,
                        "member_count": cluster.member_count,
                        "avg_confidence": cluster.avg_confidence,
                        "created_at": value.created_at.to_rfc3339(),
                    }),
                }],
            )
            .await?;

        self.metadata.insert_value(value.clone()).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::metadata_store::InMemoryMetadataStore;
    use crate::types::Axis;
    use crate::vector_store::InMemoryVectorStore;

    fn cluster_around(text: &str, member_count: usize, avg_confidence: f32) -> ClusterInfo {
        let embedder = MockEmbedder::quality();
        ClusterInfo {
            cluster_id: "ghap_full_0".into(),
            axis: Axis::Full,
            member_ids: vec![],
            centroid: embedder.generate(text),
            member_count,
            avg_confidence,
        }
    }

    fn extractor() -> ValueExtractor {
        ValueExtractor::new(
            Arc::new(MockEmbedder::quality()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            5,
        )
    }

    #[tokio::test]
    async fn identical_text_validates_as_similarity_one() {
        let extractor = extractor();
        let cluster = cluster_around("check lsof before killing a process", 10, 0.9);
        let result = extractor
            .validate("check lsof before killing a process", &cluster)
            .await
            .unwrap();
        assert!(result.valid);
        assert!(result.similarity > 0.99);
    }

    #[tokio::test]
    async fn unrelated_text_is_rejected() {
        let extractor = extractor();
        let cluster = cluster_around("check lsof before killing a process", 10, 0.9);
        let result = extractor.validate("completely unrelated zebra migration", &cluster).await.unwrap();
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn small_cluster_warns() {
        let extractor = extractor();
        let cluster = cluster_around("x", 3, 0.9);
        let result = extractor.validate("x", &cluster).await.unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("members")));
    }

    #[tokio::test]
    async fn low_confidence_cluster_warns() {
        let extractor = extractor();
        let cluster = cluster_around("x", 20, 0.2);
        let result = extractor.validate("x", &cluster).await.unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("avg_confidence")));
    }

    #[tokio::test]
    async fn oversized_text_rejected_before_embedding() {
        let extractor = extractor();
        let cluster = cluster_around("x", 10, 0.9);
        let long = "x".repeat(VALUE_TEXT_MAX_LEN + 1);
        let err = extractor.extract_and_store(long, &cluster).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn noise_cluster_is_rejected_even_with_perfect_similarity() {
        let extractor = extractor();
        let mut cluster = cluster_around("check lsof before killing a process", 10, 0.9);
        cluster.cluster_id = ClusterInfo::noise_id(cluster.axis);
        let err = extractor
            .validate("check lsof before killing a process", &cluster)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn extract_and_store_rejects_a_noise_cluster() {
        let extractor = extractor();
        let mut cluster = cluster_around("check lsof before killing a process", 10, 0.9);
        cluster.cluster_id = ClusterInfo::noise_id(cluster.axis);
        let err = extractor
            .extract_and_store("check lsof before killing a process".into(), &cluster)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
