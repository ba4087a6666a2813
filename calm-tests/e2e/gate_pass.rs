//! End-to-end gate-pass verification against a `redb`-backed metadata
//! store: record at one commit, verify at the same commit, then amend and
//! watch verification fail (spec.md §4.6, §8 "Gate-pass anchor").

use std::sync::Arc;

use calm_core::gatepass::GatePassVerifier;
use calm_core::types::GatedTransition;
use calm_test_utils::temp_metadata_store;

#[tokio::test]
async fn recorded_pass_survives_a_process_restart_against_the_same_database() {
    let (store, dir) = temp_metadata_store().await;
    let path = dir.path().join("calm.redb");
    let store = Arc::new(store);
    let verifier = GatePassVerifier::new(store);

    let transition = GatedTransition::TestToIntegrate.as_str();
    verifier.record_gate_pass("T-42", transition, "c0ffee1").await.unwrap();
    verifier.verify_gate_pass("T-42", transition, "c0ffee1").await.unwrap();

    // "Restart": open a fresh store handle over the same file.
    let reopened = calm_storage_redb::RedbMetadataStore::open(&path).await.unwrap();
    let verifier2 = GatePassVerifier::new(Arc::new(reopened));
    verifier2.verify_gate_pass("T-42", transition, "c0ffee1").await.unwrap();
}

#[tokio::test]
async fn amending_the_commit_after_a_gate_pass_invalidates_it() {
    let (store, _dir) = temp_metadata_store().await;
    let verifier = GatePassVerifier::new(Arc::new(store));

    let transition = GatedTransition::ImplementToCodeReview.as_str();
    verifier.record_gate_pass("T-7", transition, "aaaaaaaaaa").await.unwrap();

    let err = verifier
        .verify_gate_pass("T-7", transition, "bbbbbbbbbb")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "sha_mismatch");
}

#[tokio::test]
async fn a_gated_transition_with_no_recorded_pass_is_rejected() {
    let (store, _dir) = temp_metadata_store().await;
    let verifier = GatePassVerifier::new(Arc::new(store));

    let err = verifier
        .verify_gate_pass("T-99", GatedTransition::ReviewedToTested.as_str(), "any")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "no_pass");
}
