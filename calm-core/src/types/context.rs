//! A retrieved candidate awaiting budget-based selection (spec.md §3, §4.5).

use chrono::{DateTime, Utc};

use super::enums::ContextSource;

/// One retrieved element considered for inclusion in an assembled context.
///
/// `Eq`/`Hash` are derived by hand over the **full** `text`, never a prefix —
/// hashing only a prefix would collapse distinct long items with a shared
/// prefix into one bucket and silently corrupt deduplication (spec.md §8
/// invariant 6).
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub source: ContextSource,
    pub text: String,
    pub score: f32,
    pub token_estimate: usize,
    pub created_at: DateTime<Utc>,
}

impl ContextItem {
    /// Builds an item and estimates its token cost as `ceil(len(text) / 4)`
    /// per spec.md §4.5.
    #[must_use]
    pub fn new(source: ContextSource, text: String, score: f32, created_at: DateTime<Utc>) -> Self {
        let token_estimate = text.len().div_ceil(4);
        Self {
            source,
            text,
            score,
            token_estimate,
            created_at,
        }
    }
}

impl PartialEq for ContextItem {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.text == other.text
    }
}

impl Eq for ContextItem {}

impl std::hash::Hash for ContextItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.text.hash(state);
    }
}
