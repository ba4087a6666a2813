//! Hybrid search result merging (spec.md §4.3 mode `hybrid`).
//!
//! Grounded in the teacher's `HybridSearchConfig`/`HybridSearchResult`
//! shape, generalized from a fixed vector/fts weight pair to CALM's
//! additive `semantic + boost * keyword` merge with a per-entity boost
//! constant (spec.md §9 open question: boost may be per-entity or global;
//! this crate treats it as per-entity — see DESIGN.md's `search`
//! component entry for why).

use std::collections::HashMap;

use crate::vector_store::ScoredPoint;

/// One entity's hybrid weighting: how much a keyword hit contributes
/// relative to semantic similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridConfig {
    pub boost: f32,
}

impl HybridConfig {
    /// The default boost applied when an entity has no override.
    #[must_use]
    pub fn default_boost() -> Self {
        Self { boost: 0.3 }
    }
}

/// Merges semantic and keyword hits by id: `merged = semantic + boost *
/// keyword`, defaulting either side to `0.0` when a point appears in only
/// one list. Ties are broken by semantic score (spec.md §4.3). Result is
/// sorted by descending merged score.
#[must_use]
pub fn merge(
    semantic: Vec<ScoredPoint>,
    keyword: Vec<ScoredPoint>,
    config: HybridConfig,
) -> Vec<ScoredPoint> {
    let mut semantic_scores: HashMap<String, f32> = HashMap::new();
    let mut payloads: HashMap<String, serde_json::Value> = HashMap::new();

    for point in semantic {
        semantic_scores.insert(point.id.clone(), point.score);
        payloads.insert(point.id.clone(), point.payload);
    }
    let mut keyword_scores: HashMap<String, f32> = HashMap::new();
    for point in keyword {
        keyword_scores.insert(point.id.clone(), point.score);
        payloads.entry(point.id.clone()).or_insert(point.payload);
    }

    let mut ids: Vec<String> = payloads.keys().cloned().collect();
    let mut merged: Vec<ScoredPoint> = ids
        .drain(..)
        .map(|id| {
            let sem = *semantic_scores.get(&id).unwrap_or(&0.0);
            let kw = *keyword_scores.get(&id).unwrap_or(&0.0);
            ScoredPoint {
                score: sem + config.boost * kw,
                payload: payloads.remove(&id).unwrap_or(serde_json::Value::Null),
                id,
            }
        })
        .collect();

    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let sem_a = semantic_scores.get(&a.id).copied().unwrap_or(0.0);
                let sem_b = semantic_scores.get(&b.id).copied().unwrap_or(0.0);
                sem_b.partial_cmp(&sem_a).unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: id.to_string(),
            score,
            payload: json!({}),
        }
    }

    #[test]
    fn merges_and_boosts_keyword_hits() {
        let semantic = vec![point("a", 0.5), point("b", 0.4)];
        let keyword = vec![point("b", 1.0)];
        let merged = merge(semantic, keyword, HybridConfig { boost: 0.5 });
        let b = merged.iter().find(|p| p.id == "b").unwrap();
        assert!((b.score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn sorted_descending_by_merged_score() {
        let semantic = vec![point("a", 0.1), point("b", 0.9)];
        let merged = merge(semantic, vec![], HybridConfig::default_boost());
        assert_eq!(merged[0].id, "b");
    }

    #[test]
    fn keyword_only_hit_is_present() {
        let merged = merge(vec![], vec![point("a", 1.0)], HybridConfig { boost: 0.2 });
        assert_eq!(merged.len(), 1);
        assert!((merged[0].score - 0.2).abs() < 1e-6);
    }
}
