//! Text → fixed-dimension vector capability (spec.md §4, component 1).
//!
//! CALM consumes embeddings through the [`Embedder`] trait only; concrete
//! production backends (a local model, a hosted API) are capability-typed
//! dependencies out of scope for this crate (spec.md §1). The in-tree
//! [`MockEmbedder`] is deterministic, fast, and suitable for tests and for
//! the reference [`crate::vector_store::InMemoryVectorStore`].

mod mock;

pub use mock::MockEmbedder;

#[cfg(feature = "http-embedder")]
mod http;
#[cfg(feature = "http-embedder")]
pub use http::HttpEmbedder;

use async_trait::async_trait;

use crate::error::Result;

/// The fast, 384-dimension model used for code-shaped text (spec.md §2, §6.2).
pub const FAST_DIMENSION: usize = 384;
/// The quality, 768-dimension model used for semantic text (spec.md §2, §6.2).
pub const QUALITY_DIMENSION: usize = 768;

/// Text → fixed-dimension vector, suspendable at the underlying model call
/// (spec.md §5).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds many texts; implementations may batch more efficiently than
    /// repeated [`Self::embed`] calls.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// The fixed dimension this embedder always returns.
    fn dimension(&self) -> usize;
}

/// Cosine similarity between two equal-length vectors; `0.0` if either is
/// zero-length in the relevant sense.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Normalizes `vector` to unit length in place; leaves a zero vector as-is.
pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn normalize_produces_unit_length() {
        let v = normalize_vector(vec![3.0, 4.0]);
        let len: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-6);
    }
}
