//! Confidence-weighted centroid computation (spec.md §4.4).

use crate::embeddings::normalize_vector;
use crate::types::ConfidenceTier;

/// Computes the confidence-weighted mean of `vectors`, using
/// `ConfidenceTier::weight` for each member, then unit-normalizes the
/// result so subsequent cosine similarity is well-defined (spec.md §4.4).
/// Returns a zero vector if `vectors` is empty or all weights are zero.
#[must_use]
pub fn weighted_centroid(vectors: &[(Vec<f32>, ConfidenceTier)]) -> Vec<f32> {
    let Some((first, _)) = vectors.first() else {
        return Vec::new();
    };
    let dim = first.len();
    let mut sum = vec![0.0f32; dim];
    let mut total_weight = 0.0f32;

    for (vector, tier) in vectors {
        let weight = tier.weight();
        total_weight += weight;
        for (s, v) in sum.iter_mut().zip(vector) {
            *s += weight * v;
        }
    }

    if total_weight > 0.0 {
        for s in &mut sum {
            *s /= total_weight;
        }
    }
    normalize_vector(sum)
}
