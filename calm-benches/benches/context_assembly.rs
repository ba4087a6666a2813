//! Benchmarks for the context assembler's end-to-end fetch → budget →
//! select → emit pipeline (spec.md §4.5, §5 hot path).

use std::sync::Arc;

use calm_core::context::{ContextAssembler, ContextTypes};
use calm_core::embeddings::MockEmbedder;
use calm_core::search::Searcher;
use calm_core::types::Axis;
use calm_core::vector_store::{Distance, InMemoryVectorStore, StoredPoint, VectorStore};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

async fn seeded_assembler(items_per_source: usize) -> ContextAssembler {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("values", 768, Distance::Cosine).await.unwrap();
    store
        .create_collection(Axis::Full.collection_name(), 768, Distance::Cosine)
        .await
        .unwrap();
    store.create_collection("memories", 768, Distance::Cosine).await.unwrap();

    let embedder = MockEmbedder::quality();
    for i in 0..items_per_source {
        let value_text = format!("value number {i}: prefer bisection over linear scan");
        store
            .upsert(
                "values",
                vec![StoredPoint {
                    id: format!("v{i}"),
                    vector: embedder.generate(&value_text),
                    payload: json!({"text": value_text, "axis": "ghap_full", "cluster_id": "ghap_full_0"}),
                }],
            )
            .await
            .unwrap();

        let experience_text = format!("experience number {i}: bisected a regression to one commit");
        store
            .upsert(
                Axis::Full.collection_name(),
                vec![StoredPoint {
                    id: format!("e{i}"),
                    vector: embedder.generate(&experience_text),
                    payload: json!({"ghap_id": format!("e{i}"), "text": experience_text}),
                }],
            )
            .await
            .unwrap();

        let memory_text = format!("memory number {i}: the regression tracker lives at ci.example");
        store
            .upsert(
                "memories",
                vec![StoredPoint {
                    id: format!("m{i}"),
                    vector: embedder.generate(&memory_text),
                    payload: json!({"content": memory_text, "importance": 0.5}),
                }],
            )
            .await
            .unwrap();
    }

    let searcher = Arc::new(Searcher::new(
        Arc::new(MockEmbedder::fast()),
        Arc::new(MockEmbedder::quality()),
        store,
    ));
    ContextAssembler::new(searcher)
}

fn bench_assemble(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let assembler = rt.block_on(seeded_assembler(50));

    c.bench_function("assemble_context_50_candidates_per_source", |b| {
        b.to_async(&rt).iter(|| async {
            assembler
                .assemble("bisecting a regression", ContextTypes::all(), 10, 2000)
                .await
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_assemble);
criterion_main!(benches);
