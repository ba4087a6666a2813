//! Freestanding memory storage (spec.md §3 `Memory`, §8 scenario 6).
//!
//! Embeds and upserts a [`Memory`] into the `memories` collection, the
//! write-path counterpart to [`crate::search::Searcher::search_memories`]
//! and grounded in the same embed-then-upsert shape as
//! [`crate::values::ValueExtractor::extract_and_store`], generalized from a
//! cluster-validated value to a freestanding factual assertion that needs
//! no validation beyond its own field bounds.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::error::Result;
use crate::search::types::collections;
use crate::types::{Memory, MemoryCategory};
use crate::vector_store::{Distance, StoredPoint, VectorStore};

/// Embeds and stores freestanding [`Memory`] records.
pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl MemoryStore {
    /// Builds a memory store. `embedder` should be the semantic (quality)
    /// model, matching every other text collection in spec.md §6.2.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, vector_store }
    }

    /// Creates the `memories` collection if absent.
    ///
    /// # Errors
    /// [`crate::error::Error::Storage`] if collection creation fails for a
    /// reason other than already existing.
    pub async fn ensure_collection(&self) -> Result<()> {
        self.vector_store
            .create_collection(collections::MEMORIES, self.embedder.dimension(), Distance::Cosine)
            .await
    }

    /// Validates, embeds, and stores `content` as a new [`Memory`]
    /// (spec.md §8 scenario 6: the response must not echo `content`).
    ///
    /// # Errors
    /// [`crate::error::Error::Validation`] if any field violates spec.md
    /// §3's bounds; [`crate::error::Error::Embedding`] or
    /// [`crate::error::Error::Storage`] otherwise.
    pub async fn store(
        &self,
        content: String,
        category: MemoryCategory,
        importance: f32,
        tags: Vec<String>,
    ) -> Result<Memory> {
        Memory::validate(&content, importance, &tags)?;
        self.ensure_collection().await?;

        let memory = Memory {
            id: Uuid::new_v4(),
            content: content.clone(),
            category,
            importance,
            tags: tags.clone(),
            created_at: Utc::now(),
        };

        let embedding = self.embedder.embed(&content).await?;
        self.vector_store
            .upsert(
                collections::MEMORIES,
                vec![StoredPoint {
                    id: memory.id.to_string(),
                    vector: embedding,
                    payload: json!({
                        "content": content,
                        "category": category.as_str(),
                        "importance": importance,
                        "tags": tags,
                        "created_at": memory.created_at.to_rfc3339(),
                    }),
                }],
            )
            .await?;

        Ok(memory)
    }
}
