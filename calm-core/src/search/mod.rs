//! Unified query façade (spec.md §4, component 6; §4.3).
//!
//! One typed method per searchable entity, each validating parameters,
//! embedding with the right model, translating filters, executing the
//! requested mode, and mapping raw vector hits to entity records. The
//! [`Searcher`] itself holds no per-call state (spec.md §4.3
//! statelessness) — safe to share across concurrent callers.

pub mod filters;
pub mod hybrid;
pub mod keyword;
pub mod types;

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::embeddings::Embedder;
use crate::error::{Error, Result};
use crate::types::{Axis, ConfidenceTier, Domain, OutcomeStatus, SearchMode, Strategy};
use crate::vector_store::{Filter, ScoredPoint, VectorStore};
use filters::{parse_payload_datetime, FilterBuilder};
use hybrid::HybridConfig;
use types::{collections, CodeHit, CommitHit, ExperienceHit, MemoryHit, ValueHit};

/// Default result limit when the caller doesn't specify one.
pub const DEFAULT_LIMIT: usize = 10;
/// Maximum result limit any searcher method will honor.
pub const MAX_LIMIT: usize = 100;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Typed semantic/keyword/hybrid search over CALM's vector collections.
pub struct Searcher {
    fast_embedder: Arc<dyn Embedder>,
    quality_embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl Searcher {
    /// Builds a searcher. `fast_embedder` is used only by
    /// [`Self::search_code`]; every other method uses `quality_embedder`
    /// (spec.md §4.3 step 2).
    #[must_use]
    pub fn new(
        fast_embedder: Arc<dyn Embedder>,
        quality_embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            fast_embedder,
            quality_embedder,
            vector_store,
        }
    }

    async fn execute(
        &self,
        collection: &str,
        embedder: &Arc<dyn Embedder>,
        query: &str,
        limit: usize,
        filter: Option<&Filter>,
        mode: SearchMode,
        keyword_fields: &[&str],
        boost: HybridConfig,
    ) -> Result<Vec<ScoredPoint>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let semantic = match mode {
            SearchMode::Semantic | SearchMode::Hybrid => {
                let vector = embedder.embed(query).await?;
                self.vector_store.search(collection, &vector, limit, filter).await?
            }
            SearchMode::Keyword => Vec::new(),
        };

        let keyword = match mode {
            SearchMode::Keyword | SearchMode::Hybrid => {
                let all = self.vector_store.scroll(collection, filter).await?;
                let mut scored: Vec<ScoredPoint> = all
                    .into_iter()
                    .map(|p| ScoredPoint {
                        score: keyword::keyword_score(&p.payload, keyword_fields, query),
                        id: p.id,
                        payload: p.payload,
                    })
                    .filter(|p| p.score > 0.0)
                    .collect();
                scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
                scored
            }
            SearchMode::Semantic => Vec::new(),
        };

        let mut results = match mode {
            SearchMode::Semantic => semantic,
            SearchMode::Keyword => keyword,
            SearchMode::Hybrid => hybrid::merge(semantic, keyword, boost),
        };
        results.truncate(limit);
        Ok(results)
    }

    /// Searches the `memories` collection (spec.md §4.3).
    ///
    /// # Errors
    /// [`Error::Validation`] for an unparsable `category`;
    /// [`Error::NotFound`] if the collection is absent.
    pub async fn search_memories(
        &self,
        query: &str,
        limit: Option<usize>,
        mode: SearchMode,
        category: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<MemoryHit>> {
        let limit = clamp_limit(limit);
        let category_value = category
            .map(|c| {
                crate::types::MemoryCategory::from_str(c)
                    .map(|_| serde_json::json!(c))
                    .map_err(Error::validation)
            })
            .transpose()?;
        let filter = FilterBuilder::new()
            .eq_opt("category", category_value)
            .since_opt("created_at", since)
            .build();

        let hits = self
            .execute(
                collections::MEMORIES,
                &self.quality_embedder,
                query,
                limit,
                filter.as_ref(),
                mode,
                &["content"],
                HybridConfig { boost: 0.3 },
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|p| MemoryHit {
                id: p.id,
                content: p.payload.get("content").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                category: p.payload.get("category").and_then(|v| v.as_str()).map(str::to_string),
                importance: p.payload.get("importance").and_then(serde_json::Value::as_f64).unwrap_or(0.0) as f32,
                score: p.score,
                created_at: parse_payload_datetime(&p.payload, "created_at"),
            })
            .collect())
    }

    /// Searches the `code_units` collection with the fast (code) embedder
    /// (spec.md §4.3).
    pub async fn search_code(
        &self,
        query: &str,
        limit: Option<usize>,
        mode: SearchMode,
        language: Option<&str>,
    ) -> Result<Vec<CodeHit>> {
        let limit = clamp_limit(limit);
        let filter = FilterBuilder::new()
            .eq_opt("language", language.map(|l| serde_json::json!(l)))
            .build();

        let hits = self
            .execute(
                collections::CODE_UNITS,
                &self.fast_embedder,
                query,
                limit,
                filter.as_ref(),
                mode,
                &["snippet", "path"],
                HybridConfig { boost: 0.3 },
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|p| CodeHit {
                id: p.id,
                path: p.payload.get("path").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                language: p.payload.get("language").and_then(|v| v.as_str()).map(str::to_string),
                snippet: p.payload.get("snippet").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                score: p.score,
            })
            .collect())
    }

    /// Searches one axis of the GHAP experience projections (spec.md §4.3).
    ///
    /// # Errors
    /// [`Error::NotFound`] naming the axis collection if it does not exist
    /// (surfaces as `CollectionNotFoundError` semantics per spec.md §4.3).
    pub async fn search_experiences(
        &self,
        query: &str,
        axis: Axis,
        limit: Option<usize>,
        mode: SearchMode,
        domain: Option<Domain>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExperienceHit>> {
        let limit = clamp_limit(limit);
        let filter = FilterBuilder::new()
            .eq_opt("domain", domain.map(|d| serde_json::json!(d.as_str())))
            .since_opt("created_at", since)
            .build();

        let hits = self
            .execute(
                axis.collection_name(),
                &self.quality_embedder,
                query,
                limit,
                filter.as_ref(),
                mode,
                &["ghap_id", "text"],
                HybridConfig { boost: 0.25 },
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|p| ExperienceHit {
                ghap_id: p
                    .payload
                    .get("ghap_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                axis,
                text: p.payload.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                domain: p
                    .payload
                    .get("domain")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Domain::from_str(s).ok()),
                strategy: p
                    .payload
                    .get("strategy")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Strategy::from_str(s).ok()),
                outcome_status: p
                    .payload
                    .get("outcome_status")
                    .and_then(|v| v.as_str())
                    .and_then(|s| OutcomeStatus::from_str(s).ok()),
                confidence_tier: p
                    .payload
                    .get("confidence_tier")
                    .and_then(|v| v.as_str())
                    .and_then(|s| ConfidenceTier::from_str(s).ok()),
                score: p.score,
                created_at: parse_payload_datetime(&p.payload, "created_at"),
            })
            .collect())
    }

    /// Searches the `values` collection (spec.md §4.3).
    pub async fn search_values(
        &self,
        query: &str,
        limit: Option<usize>,
        mode: SearchMode,
        axis: Option<Axis>,
    ) -> Result<Vec<ValueHit>> {
        let limit = clamp_limit(limit);
        let filter = FilterBuilder::new()
            .eq_opt("axis", axis.map(|a| serde_json::json!(a.as_str())))
            .build();

        let hits = self
            .execute(
                collections::VALUES,
                &self.quality_embedder,
                query,
                limit,
                filter.as_ref(),
                mode,
                &["text"],
                HybridConfig { boost: 0.3 },
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|p| ValueHit {
                id: p.id,
                text: p.payload.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                cluster_id: p
                    .payload
                    .get("cluster_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                axis: p
                    .payload
                    .get("axis")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Axis::from_str(s).ok()),
                score: p.score,
            })
            .collect())
    }

    /// Searches the `commits` collection (spec.md §4.3).
    pub async fn search_commits(
        &self,
        query: &str,
        limit: Option<usize>,
        mode: SearchMode,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CommitHit>> {
        let limit = clamp_limit(limit);
        let filter = FilterBuilder::new().since_opt("committed_at", since).build();

        let hits = self
            .execute(
                collections::COMMITS,
                &self.quality_embedder,
                query,
                limit,
                filter.as_ref(),
                mode,
                &["message"],
                HybridConfig { boost: 0.3 },
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|p| CommitHit {
                sha: p.payload.get("sha").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                message: p.payload.get("message").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                score: p.score,
                committed_at: parse_payload_datetime(&p.payload, "committed_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::vector_store::{Distance, InMemoryVectorStore, StoredPoint};
    use serde_json::json;

    async fn searcher_with_memories() -> (Searcher, Arc<InMemoryVectorStore>) {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .create_collection(collections::MEMORIES, 768, Distance::Cosine)
            .await
            .unwrap();
        let searcher = Searcher::new(
            Arc::new(MockEmbedder::fast()),
            Arc::new(MockEmbedder::quality()),
            store.clone(),
        );
        (searcher, store)
    }

    #[tokio::test]
    async fn empty_query_returns_empty_not_error() {
        let (searcher, _store) = searcher_with_memories().await;
        let hits = searcher
            .search_memories("", None, SearchMode::Semantic, None, None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn result_count_respects_limit() {
        let (searcher, store) = searcher_with_memories().await;
        let embedder = MockEmbedder::quality();
        let mut points = Vec::new();
        for i in 0..5 {
            let text = format!("memory number {i}");
            points.push(StoredPoint {
                id: i.to_string(),
                vector: embedder.generate(&text),
                payload: json!({"content": text, "importance": 0.5}),
            });
        }
        store.upsert(collections::MEMORIES, points).await.unwrap();

        let hits = searcher
            .search_memories("memory", Some(2), SearchMode::Semantic, None, None)
            .await
            .unwrap();
        assert!(hits.len() <= 2);
    }

    #[tokio::test]
    async fn invalid_category_is_validation_error() {
        let (searcher, _store) = searcher_with_memories().await;
        let err = searcher
            .search_memories("x", None, SearchMode::Semantic, Some("not-a-category"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = Arc::new(InMemoryVectorStore::new());
        let searcher = Searcher::new(
            Arc::new(MockEmbedder::fast()),
            Arc::new(MockEmbedder::quality()),
            store,
        );
        let err = searcher
            .search_memories("x", None, SearchMode::Semantic, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn semantic_results_ordered_descending() {
        let (searcher, store) = searcher_with_memories().await;
        let embedder = MockEmbedder::quality();
        for (i, text) in ["completely unrelated zebra", "async bug in scheduler"].iter().enumerate() {
            store
                .upsert(
                    collections::MEMORIES,
                    vec![StoredPoint {
                        id: i.to_string(),
                        vector: embedder.generate(text),
                        payload: json!({"content": text, "importance": 0.5}),
                    }],
                )
                .await
                .unwrap();
        }
        let hits = searcher
            .search_memories("async bug", None, SearchMode::Semantic, None, None)
            .await
            .unwrap();
        for w in hits.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }
}
