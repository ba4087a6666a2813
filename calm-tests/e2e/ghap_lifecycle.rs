//! End-to-end GHAP lifecycle: start → resolve → persist → search, plus the
//! single-active-entry and orphan-hand-off invariants (spec.md §5, §8).

use std::sync::Arc;

use calm_core::ghap::GhapStateMachine;
use calm_core::metadata_store::InMemoryMetadataStore;
use calm_core::persister::ObservationPersister;
use calm_core::search::Searcher;
use calm_core::types::{Domain, OutcomeStatus, RootCause, RootCauseCategory, SearchMode, Strategy};
use calm_core::vector_store::InMemoryVectorStore;
use calm_test_utils::mock_embedders;

#[tokio::test]
async fn start_resolve_persist_and_find_via_search() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let machine = GhapStateMachine::new(metadata.clone());

    let started = machine
        .start(
            "session-1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "fix the flaky port-bind test".into(),
            "a previous test leaks the socket".into(),
            "add SO_REUSEADDR and rerun ten times".into(),
            "no more bind failures".into(),
        )
        .await
        .unwrap();

    let resolved = machine
        .resolve(
            "session-1",
            OutcomeStatus::Falsified,
            "still flaky, but less often".into(),
            Some("the leak was a red herring — it's a race in test teardown".into()),
            Some(RootCause {
                category: RootCauseCategory::LogicError,
                description: "teardown doesn't await the listener's drop".into(),
            }),
            None,
        )
        .await
        .unwrap();
    assert_eq!(resolved.id, started.id);

    let (_fast, quality) = mock_embedders();
    let vector_store = Arc::new(InMemoryVectorStore::new());
    let persister = ObservationPersister::new(quality.clone(), vector_store.clone());
    persister.ensure_collections().await.unwrap();
    let axes = persister.persist(&resolved).await.unwrap();
    assert!(!axes.is_empty());

    let searcher = Searcher::new(quality.clone(), quality, vector_store);
    let hits = searcher
        .search_experiences(
            "teardown race bind failure",
            calm_core::types::Axis::RootCause,
            None,
            SearchMode::Semantic,
            None,
            None,
        )
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].ghap_id, resolved.id.to_string());
    assert!(hits[0].text.contains("teardown"));
}

#[tokio::test]
async fn a_session_cannot_hold_two_active_entries() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let machine = GhapStateMachine::new(metadata);

    machine
        .start(
            "session-1",
            Domain::Refactoring,
            Strategy::Incremental,
            "split the god object".into(),
            "extracting one responsibility at a time is safe".into(),
            "move the serialization methods out first".into(),
            "tests still pass".into(),
        )
        .await
        .unwrap();

    let err = machine
        .start(
            "session-1",
            Domain::Refactoring,
            Strategy::Incremental,
            "a second goal".into(),
            "h".into(),
            "a".into(),
            "p".into(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "active_exists");
}

#[tokio::test]
async fn updating_a_resolved_session_is_a_validation_error_not_not_found() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let machine = GhapStateMachine::new(metadata);

    machine
        .start(
            "session-1",
            Domain::Debugging,
            Strategy::SystematicElimination,
            "g".into(),
            "h".into(),
            "a".into(),
            "p".into(),
        )
        .await
        .unwrap();
    machine
        .resolve("session-1", OutcomeStatus::Confirmed, "done".into(), None, None, None)
        .await
        .unwrap();

    let err = machine
        .update("session-1", Some("h2".into()), None, None, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");

    let never_started_err = machine
        .update("no-such-session", Some("h2".into()), None, None, None, None)
        .await
        .unwrap_err();
    assert_eq!(never_started_err.kind(), "not_found");
}

#[tokio::test]
async fn a_new_session_can_discover_another_sessions_orphaned_entry() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let machine = GhapStateMachine::new(metadata);

    machine
        .start(
            "abandoned-session",
            Domain::Investigation,
            Strategy::BinarySearch,
            "find which commit introduced the regression".into(),
            "it's somewhere in the last ten commits".into(),
            "bisect".into(),
            "one commit is guilty".into(),
        )
        .await
        .unwrap();

    let orphan = machine.get_orphaned("fresh-session").await.unwrap();
    assert!(orphan.is_some());
    assert_eq!(orphan.unwrap().session_id, "abandoned-session");
    assert!(machine.get_orphaned("abandoned-session").await.unwrap().is_none());
}
