//! End-to-end context assembly across all three sources, through the
//! public `ContextAssembler` + `Searcher` + `InMemoryVectorStore` stack
//! (spec.md §4.5).

use std::sync::Arc;

use calm_core::context::{ContextAssembler, ContextTypes};
use calm_core::embeddings::MockEmbedder;
use calm_core::search::Searcher;
use calm_core::types::Axis;
use calm_core::vector_store::{Distance, InMemoryVectorStore, StoredPoint, VectorStore};
use serde_json::json;

async fn seeded_assembler() -> ContextAssembler {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("values", 768, Distance::Cosine).await.unwrap();
    store
        .create_collection(Axis::Full.collection_name(), 768, Distance::Cosine)
        .await
        .unwrap();
    store.create_collection("memories", 768, Distance::Cosine).await.unwrap();

    let embedder = MockEmbedder::quality();

    store
        .upsert(
            "values",
            vec![StoredPoint {
                id: "v0".into(),
                vector: embedder.generate("prefer bisection over linear scan for regressions"),
                payload: json!({
                    "text": "prefer bisection over linear scan for regressions",
                    "axis": "ghap_full",
                    "cluster_id": "ghap_full_0",
                }),
            }],
        )
        .await
        .unwrap();

    store
        .upsert(
            Axis::Full.collection_name(),
            vec![StoredPoint {
                id: "e0".into(),
                vector: embedder.generate("bisected a regression down to a single commit"),
                payload: json!({
                    "ghap_id": "e0",
                    "text": "bisected a regression down to a single commit",
                }),
            }],
        )
        .await
        .unwrap();

    store
        .upsert(
            "memories",
            vec![StoredPoint {
                id: "m0".into(),
                vector: embedder.generate("the regression tracker lives at ci.example/regressions"),
                payload: json!({
                    "content": "the regression tracker lives at ci.example/regressions",
                    "importance": 0.6,
                }),
            }],
        )
        .await
        .unwrap();

    let searcher = Arc::new(Searcher::new(
        Arc::new(MockEmbedder::fast()),
        Arc::new(MockEmbedder::quality()),
        store,
    ));
    ContextAssembler::new(searcher)
}

#[tokio::test]
async fn assembled_markdown_draws_from_all_three_sources_within_budget() {
    let assembler = seeded_assembler().await;
    let result = assembler
        .assemble("bisecting a regression", ContextTypes::all(), 10, 500)
        .await
        .unwrap();

    assert!(result.markdown.contains("## Values"));
    assert!(result.markdown.contains("## Experiences"));
    assert!(result.markdown.contains("## Memories"));
    assert!(result.total_tokens <= 500);
    assert_eq!(result.items.len(), 3);
}

#[tokio::test]
async fn an_empty_query_short_circuits_before_any_search() {
    let assembler = seeded_assembler().await;
    let result = assembler.assemble("", ContextTypes::all(), 10, 500).await.unwrap();
    assert_eq!(result.markdown, "");
    assert_eq!(result.total_tokens, 0);
}
