//! Shared test fixtures for CALM's workspace crates (SPEC_FULL.md §1).
//!
//! A deterministic mock embedder factory, a pre-wired in-memory vector
//! store, a temp-directory-backed `redb` metadata store, and GHAP/Memory
//! builders with sane defaults a test can override field-by-field. Mirrors
//! the shape of the teacher's scattered `#[cfg(test)]` fixture functions,
//! pulled into one crate so `calm-tests` and `calm-benches` can share them
//! without duplicating setup.

use std::sync::Arc;

use calm_core::embeddings::MockEmbedder;
use calm_core::types::{
    Axis, ConfidenceTier, Domain, GHAPEntry, GHAPStatus, Memory, MemoryCategory, Outcome,
    OutcomeStatus, Strategy,
};
use calm_core::vector_store::{Distance, InMemoryVectorStore, VectorStore};
use calm_storage_redb::RedbMetadataStore;
use chrono::Utc;
use uuid::Uuid;

/// Builds the fast (384-d) and quality (768-d) mock embedders CALM wires up
/// by default (spec.md §2, §6.2).
#[must_use]
pub fn mock_embedders() -> (Arc<MockEmbedder>, Arc<MockEmbedder>) {
    (Arc::new(MockEmbedder::fast()), Arc::new(MockEmbedder::quality()))
}

/// Builds an in-memory vector store with every collection a full CALM
/// deployment would have pre-created: the four GHAP axis collections plus
/// `memories`, `code`, `values`, and `commits`.
///
/// # Panics
/// Never in practice — collection creation against the in-memory store is
/// infallible for valid dimensions.
pub async fn vector_store_with_collections() -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new();
    for axis in Axis::ALL {
        store
            .create_collection(axis.collection_name(), calm_core::embeddings::QUALITY_DIMENSION, Distance::Cosine)
            .await
            .expect("collection creation is infallible for the in-memory store");
    }
    for name in ["memories", "code", "values", "commits"] {
        store
            .create_collection(name, calm_core::embeddings::QUALITY_DIMENSION, Distance::Cosine)
            .await
            .expect("collection creation is infallible for the in-memory store");
    }
    store
}

/// Opens a fresh `redb`-backed metadata store rooted in a temp directory
/// that lives as long as the returned guard. Drop the guard only after the
/// store is no longer needed.
///
/// # Panics
/// If the temp directory or database file cannot be created.
pub async fn temp_metadata_store() -> (RedbMetadataStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("calm.redb");
    let store = RedbMetadataStore::open(&path)
        .await
        .expect("failed to open temp metadata store");
    (store, dir)
}

/// A builder for [`GHAPEntry`] with reasonable defaults, for tests that
/// only care about one or two fields.
pub struct GhapEntryBuilder {
    entry: GHAPEntry,
}

impl GhapEntryBuilder {
    /// Starts a new active entry for `session_id` with placeholder text in
    /// every required field.
    #[must_use]
    pub fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            entry: GHAPEntry {
                id: Uuid::new_v4(),
                session_id: session_id.to_string(),
                domain: Domain::Debugging,
                strategy: Strategy::SystematicElimination,
                goal: "reproduce the failure".into(),
                hypothesis: "a stale cache entry is the cause".into(),
                action: "clear the cache and rerun".into(),
                prediction: "the failure disappears".into(),
                status: GHAPStatus::Active,
                iteration_count: 0,
                outcome: None,
                surprise: None,
                root_cause: None,
                lesson: None,
                confidence_tier: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[must_use]
    pub fn domain(mut self, domain: Domain) -> Self {
        self.entry.domain = domain;
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.entry.strategy = strategy;
        self
    }

    #[must_use]
    pub fn iteration_count(mut self, count: u32) -> Self {
        self.entry.iteration_count = count;
        self
    }

    /// Marks the entry terminal with the given outcome and tier, as if
    /// `GhapStateMachine::resolve` had already run.
    #[must_use]
    pub fn resolved(mut self, status: OutcomeStatus, tier: ConfidenceTier) -> Self {
        self.entry.status = GHAPStatus::Terminal;
        self.entry.outcome = Some(Outcome {
            status,
            result: "resolved".into(),
            captured_at: Utc::now(),
        });
        self.entry.confidence_tier = Some(tier);
        self
    }

    #[must_use]
    pub fn build(self) -> GHAPEntry {
        self.entry
    }
}

/// A builder for [`Memory`] with reasonable defaults.
pub struct MemoryBuilder {
    memory: Memory,
}

impl MemoryBuilder {
    #[must_use]
    pub fn new(content: &str) -> Self {
        Self {
            memory: Memory {
                id: Uuid::new_v4(),
                content: content.to_string(),
                category: MemoryCategory::Fact,
                importance: 0.5,
                tags: Vec::new(),
                created_at: Utc::now(),
            },
        }
    }

    #[must_use]
    pub fn category(mut self, category: MemoryCategory) -> Self {
        self.memory.category = category;
        self
    }

    #[must_use]
    pub fn importance(mut self, importance: f32) -> Self {
        self.memory.importance = importance;
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.memory.tags = tags;
        self
    }

    #[must_use]
    pub fn build(self) -> Memory {
        self.memory
    }
}
