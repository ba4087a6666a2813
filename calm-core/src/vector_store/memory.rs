//! In-memory reference [`VectorStore`] used by tests and examples.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Distance, Filter, ScoredPoint, StoredPoint, VectorStore};
use crate::embeddings::cosine_similarity;
use crate::error::{Error, Result};

struct Collection {
    dimension: usize,
    points: HashMap<String, StoredPoint>,
}

/// A `parking_lot`-guarded in-memory [`VectorStore`]; brute-force cosine
/// search, adequate for the data volumes tests operate on.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimension: usize, _distance: Distance) -> Result<()> {
        let mut collections = self.collections.write();
        collections.entry(name.to_string()).or_insert_with(|| Collection {
            dimension,
            points: HashMap::new(),
        });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| Error::NotFound(format!("collection '{collection}' not found")))?;
        for point in points {
            if point.vector.len() != coll.dimension {
                return Err(Error::Storage(format!(
                    "vector has {} dimensions, collection '{collection}' expects {}",
                    point.vector.len(),
                    coll.dimension
                )));
            }
            coll.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::NotFound(format!("collection '{collection}' not found")))?;

        let mut hits: Vec<ScoredPoint> = coll
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(query_vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<StoredPoint>> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::NotFound(format!("collection '{collection}' not found")))?;
        Ok(coll
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .cloned()
            .collect())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write();
        if let Some(coll) = collections.get_mut(collection) {
            for id in ids {
                coll.points.remove(id);
            }
        }
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<usize> {
        Ok(self.scroll(collection, filter).await?.len())
    }
}
