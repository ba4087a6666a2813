//! Benchmarks for the experience clusterer's hot path: scroll + HDBSCAN
//! over a populated axis collection (spec.md §4.4, §5 hot path).

use std::sync::Arc;

use calm_core::clustering::Clusterer;
use calm_core::embeddings::MockEmbedder;
use calm_core::types::{Axis, ConfidenceTier};
use calm_core::vector_store::{Distance, InMemoryVectorStore, StoredPoint, VectorStore};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use uuid::Uuid;

async fn populated_store(point_count: usize) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    store
        .create_collection(Axis::Full.collection_name(), 768, Distance::Cosine)
        .await
        .unwrap();

    let embedder = MockEmbedder::quality();
    let tiers = [
        ConfidenceTier::Gold,
        ConfidenceTier::Silver,
        ConfidenceTier::Bronze,
        ConfidenceTier::Abandoned,
    ];
    for i in 0..point_count {
        let text = format!("lesson learned from investigation number {i}");
        store
            .upsert(
                Axis::Full.collection_name(),
                vec![StoredPoint {
                    id: Uuid::new_v4().to_string(),
                    vector: embedder.generate(&text),
                    payload: json!({
                        "ghap_id": Uuid::new_v4().to_string(),
                        "confidence_tier": tiers[i % tiers.len()].as_str(),
                    }),
                }],
            )
            .await
            .unwrap();
    }
    store
}

fn bench_cluster_by_point_count(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("cluster_axis");
    for &point_count in &[20usize, 100, 500] {
        let store = rt.block_on(populated_store(point_count));
        let clusterer = Clusterer::new(store, 5, 3);
        group.bench_with_input(
            BenchmarkId::from_parameter(point_count),
            &point_count,
            |b, _| {
                b.to_async(&rt).iter(|| async { clusterer.cluster(Axis::Full).await.unwrap() });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_cluster_by_point_count);
criterion_main!(benches);
