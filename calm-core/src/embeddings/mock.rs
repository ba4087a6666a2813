//! Deterministic mock embedder (grounded in the teacher's `MockLocalModel`).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use super::{normalize_vector, Embedder};
use crate::error::Result;

/// A deterministic embedder that hashes text into a fixed-dimension unit
/// vector. Never use this for real semantic ranking quality — it exists so
/// tests and the reference vector store have something to call without a
/// network or a loaded model.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Builds a mock embedder of the given dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// The fast 384-d mock embedder (spec.md §2).
    #[must_use]
    pub fn fast() -> Self {
        Self::new(super::FAST_DIMENSION)
    }

    /// The quality 768-d mock embedder (spec.md §2).
    #[must_use]
    pub fn quality() -> Self {
        Self::new(super::QUALITY_DIMENSION)
    }

    /// Deterministically derives a unit vector from `text`'s hash via a
    /// simple LCG, so equal inputs always produce equal embeddings.
    #[must_use]
    pub fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let value = ((seed >> 16) as f32) / 32_768.0 - 1.0;
            embedding.push(value);
        }
        normalize_vector(embedding)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
