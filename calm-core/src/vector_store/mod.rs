//! Collection create/upsert/search/scroll/delete capability (spec.md §4,
//! component 2).
//!
//! Like [`crate::embeddings`], this is a capability-typed dependency: CALM
//! depends on the [`VectorStore`] trait, never on a concrete vector
//! database. The in-tree [`InMemoryVectorStore`] is the reference
//! implementation used by tests and by [`crate::search`] fixtures.

mod memory;

pub use memory::InMemoryVectorStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Distance metric a collection is created with. CALM only ever uses
/// cosine distance (spec.md §6.2), but the type exists at the trait
/// boundary because the capability itself is general.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
}

/// A single stored point: an id, its vector, and an opaque JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A scored search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// A filter predicate over a point's payload (spec.md §4.3).
///
/// Constructed by [`crate::search`]'s filter translation: equality for
/// scalars, `Gte` for ISO-8601 datetime-since filters, all combined with
/// logical AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    Gte { field: String, value: Value },
    And(Vec<Filter>),
}

impl Filter {
    /// Evaluates this filter against `payload` using string/number/bool
    /// comparisons appropriate to the stored JSON types.
    #[must_use]
    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            Filter::Eq { field, value } => payload.get(field) == Some(value),
            Filter::Gte { field, value } => match (payload.get(field), value) {
                (Some(Value::String(a)), Value::String(b)) => a >= b,
                (Some(Value::Number(a)), Value::Number(b)) => {
                    a.as_f64().unwrap_or(f64::MIN) >= b.as_f64().unwrap_or(f64::MAX)
                }
                _ => false,
            },
            Filter::And(filters) => filters.iter().all(|f| f.matches(payload)),
        }
    }
}

/// Collection create/upsert/search/scroll/delete/count (spec.md §4,
/// component 2). All methods are suspension points (spec.md §5).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates a collection with the given vector `dimension` and
    /// `distance` metric. Treats "already exists" as success (spec.md
    /// §4.2) so `ensure_collections` is safe to call repeatedly.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on backend failure other
    /// than "already exists".
    async fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()>;

    /// Inserts or overwrites points by id.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] if the collection is
    /// missing or the backend rejects the write.
    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()>;

    /// Runs a top-`limit` cosine search for `query_vector`, optionally
    /// constrained by `filter`. Results are ordered by descending score
    /// (spec.md §8 invariant 7).
    ///
    /// # Errors
    /// Returns [`crate::error::Error::NotFound`] naming `collection` if it
    /// does not exist; [`crate::error::Error::Storage`] on backend failure.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Returns every point in a collection, optionally filtered; used by
    /// the clusterer, which must read **all** current vectors (spec.md
    /// §4.4).
    ///
    /// # Errors
    /// Returns [`crate::error::Error::NotFound`] naming `collection` if it
    /// does not exist.
    async fn scroll(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<StoredPoint>>;

    /// Deletes points by id; missing ids are not an error.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Storage`] on backend failure.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Counts points in a collection, optionally filtered.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::NotFound`] naming `collection` if it
    /// does not exist.
    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<usize>;
}
