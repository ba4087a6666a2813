//! Experience clusterer (spec.md §4, component 7; §4.4).

pub mod centroid;
pub mod hdbscan;

use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Axis, ClusterInfo, ConfidenceTier};
use crate::vector_store::VectorStore;

/// Runs HDBSCAN over one axis collection and returns one [`ClusterInfo`]
/// per stable cluster plus a synthetic `{axis}_noise` cluster if any point
/// was unassigned (spec.md §4.4).
pub struct Clusterer {
    vector_store: Arc<dyn VectorStore>,
    min_cluster_size: usize,
    min_samples: usize,
}

impl Clusterer {
    /// Builds a clusterer with the given process-start parameters
    /// (spec.md §4.4, `min_cluster_size=5`, `min_samples=3` by default).
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            vector_store,
            min_cluster_size,
            min_samples,
        }
    }

    /// Clusters every current vector in `axis`'s collection.
    ///
    /// # Errors
    /// [`Error::InsufficientData`] if the axis has fewer points than
    /// `min_cluster_size`; [`Error::NotFound`] if the axis collection does
    /// not exist; [`Error::Storage`] on a read failure.
    pub async fn cluster(&self, axis: Axis) -> Result<Vec<ClusterInfo>> {
        let points = self.vector_store.scroll(axis.collection_name(), None).await?;
        if points.len() < self.min_cluster_size {
            return Err(Error::InsufficientData(format!(
                "axis '{}' has {} points, fewer than min_cluster_size={}",
                axis.as_str(),
                points.len(),
                self.min_cluster_size
            )));
        }

        let vectors: Vec<Vec<f32>> = points.iter().map(|p| p.vector.clone()).collect();
        let labels = hdbscan::cluster(&vectors, self.min_cluster_size, self.min_samples);

        let mut by_label: std::collections::HashMap<i64, Vec<usize>> = std::collections::HashMap::new();
        for (idx, &label) in labels.iter().enumerate() {
            by_label.entry(label).or_default().push(idx);
        }

        let mut clusters = Vec::with_capacity(by_label.len());
        for (label, member_indices) in by_label {
            let member_ids: Vec<Uuid> = member_indices
                .iter()
                .filter_map(|&i| parse_member_id(&points[i].payload))
                .collect();

            let weighted: Vec<(Vec<f32>, ConfidenceTier)> = member_indices
                .iter()
                .map(|&i| {
                    let tier = points[i]
                        .payload
                        .get("confidence_tier")
                        .and_then(|v| v.as_str())
                        .and_then(|s| ConfidenceTier::from_str(s).ok())
                        .unwrap_or(ConfidenceTier::Abandoned);
                    (points[i].vector.clone(), tier)
                })
                .collect();

            let avg_confidence = if weighted.is_empty() {
                0.0
            } else {
                weighted.iter().map(|(_, t)| t.weight()).sum::<f32>() / weighted.len() as f32
            };

            let cluster_id = if label == hdbscan::NOISE_LABEL {
                ClusterInfo::noise_id(axis)
            } else {
                ClusterInfo::cluster_id_for(axis, label)
            };

            clusters.push(ClusterInfo {
                cluster_id,
                axis,
                member_count: member_ids.len(),
                member_ids,
                centroid: centroid::weighted_centroid(&weighted),
                avg_confidence,
            });
        }

        Ok(clusters)
    }
}

fn parse_member_id(payload: &serde_json::Value) -> Option<Uuid> {
    payload.get("ghap_id")?.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::vector_store::{Distance, InMemoryVectorStore, StoredPoint};
    use serde_json::json;

    async fn store_with_points(count: usize) -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .create_collection(Axis::Full.collection_name(), 768, Distance::Cosine)
            .await
            .unwrap();
        let embedder = MockEmbedder::quality();
        let mut points = Vec::new();
        for i in 0..count {
            let id = Uuid::new_v4();
            points.push(StoredPoint {
                id: id.to_string(),
                vector: embedder.generate(&format!("entry {i}")),
                payload: json!({"ghap_id": id.to_string(), "confidence_tier": "gold"}),
            });
        }
        store.upsert(Axis::Full.collection_name(), points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn below_min_cluster_size_is_insufficient_data() {
        let store = store_with_points(4).await;
        let clusterer = Clusterer::new(store, 5, 3);
        let err = clusterer.cluster(Axis::Full).await.unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[tokio::test]
    async fn at_min_cluster_size_clustering_runs() {
        let store = store_with_points(6).await;
        let clusterer = Clusterer::new(store, 5, 3);
        let clusters = clusterer.cluster(Axis::Full).await.unwrap();
        let total_members: usize = clusters.iter().map(|c| c.member_count).sum();
        assert_eq!(total_members, 6);
    }
}
