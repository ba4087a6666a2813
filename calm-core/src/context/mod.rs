//! Context assembler (spec.md §4, component 9; §4.5).
//!
//! Fetches across up to three sources, converts each hit into a
//! [`ContextItem`], distributes a token budget across the sources that
//! actually returned results, greedily selects within each source by
//! descending score, and emits a single markdown fragment in a fixed
//! section order. Grounded in the teacher's retrieval-then-budget shape
//! (`memory::retrieval::context`), generalized from episode ranking to
//! weighted multi-source token budgeting.

use std::sync::Arc;

use crate::error::Result;
use crate::search::Searcher;
use crate::types::{Axis, ContextItem, ContextSource, SearchMode};

/// Fixed per-source share of `max_tokens` before renormalization
/// (spec.md §4.5 step 3).
const VALUES_WEIGHT: f32 = 0.30;
const EXPERIENCES_WEIGHT: f32 = 0.45;
const MEMORIES_WEIGHT: f32 = 0.25;

/// Result of [`ContextAssembler::assemble`] (spec.md §4.5 step 5).
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub markdown: String,
    pub total_tokens: usize,
    pub items: Vec<ContextItem>,
}

/// Which sources a caller wants considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextTypes {
    pub values: bool,
    pub experiences: bool,
    pub memories: bool,
}

impl ContextTypes {
    #[must_use]
    pub fn all() -> Self {
        Self {
            values: true,
            experiences: true,
            memories: true,
        }
    }
}

/// Composes retrieved items into a token-bounded markdown fragment.
pub struct ContextAssembler {
    searcher: Arc<Searcher>,
}

impl ContextAssembler {
    #[must_use]
    pub fn new(searcher: Arc<Searcher>) -> Self {
        Self { searcher }
    }

    /// Runs the full fetch → budget → select → emit pipeline
    /// (spec.md §4.5).
    ///
    /// An empty `query` returns an empty fragment with zero tokens, not an
    /// error (spec.md §4.5 edge case).
    ///
    /// # Errors
    /// Propagates the first underlying search failure.
    pub async fn assemble(
        &self,
        query: &str,
        types: ContextTypes,
        limit: usize,
        max_tokens: usize,
    ) -> Result<AssembledContext> {
        if query.is_empty() {
            return Ok(AssembledContext {
                markdown: String::new(),
                total_tokens: 0,
                items: Vec::new(),
            });
        }

        let mut pools: Vec<(ContextSource, f32, Vec<ContextItem>)> = Vec::new();
        if types.values {
            pools.push((ContextSource::Values, VALUES_WEIGHT, self.fetch_values(query, limit).await?));
        }
        if types.experiences {
            pools.push((
                ContextSource::Experiences,
                EXPERIENCES_WEIGHT,
                self.fetch_experiences(query, limit).await?,
            ));
        }
        if types.memories {
            pools.push((ContextSource::Memories, MEMORIES_WEIGHT, self.fetch_memories(query, limit).await?));
        }

        let budgets = distribute_budget(&pools, max_tokens);

        let mut selected: Vec<ContextItem> = Vec::new();
        for ((source, _, mut items), budget) in pools.into_iter().zip(budgets) {
            items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            selected.extend(select_within_budget(source, items, budget));
        }

        let total_tokens = selected.iter().map(|i| i.token_estimate).sum();
        let markdown = render_markdown(&selected);

        Ok(AssembledContext {
            markdown,
            total_tokens,
            items: selected,
        })
    }

    async fn fetch_values(&self, query: &str, limit: usize) -> Result<Vec<ContextItem>> {
        let hits = self
            .searcher
            .search_values(query, Some(limit), SearchMode::Hybrid, None)
            .await?;
        Ok(hits
            .into_iter()
            .map(|h| ContextItem::new(ContextSource::Values, h.text, h.score, chrono::Utc::now()))
            .collect())
    }

    async fn fetch_experiences(&self, query: &str, limit: usize) -> Result<Vec<ContextItem>> {
        let hits = self
            .searcher
            .search_experiences(query, Axis::Full, Some(limit), SearchMode::Hybrid, None, None)
            .await?;
        Ok(hits
            .into_iter()
            .filter(|h| !h.text.is_empty())
            .map(|h| {
                ContextItem::new(
                    ContextSource::Experiences,
                    h.text,
                    h.score,
                    h.created_at.unwrap_or_else(chrono::Utc::now),
                )
            })
            .collect())
    }

    async fn fetch_memories(&self, query: &str, limit: usize) -> Result<Vec<ContextItem>> {
        let hits = self
            .searcher
            .search_memories(query, Some(limit), SearchMode::Hybrid, None, None)
            .await?;
        Ok(hits
            .into_iter()
            .map(|h| {
                ContextItem::new(
                    ContextSource::Memories,
                    h.content,
                    h.score,
                    h.created_at.unwrap_or_else(chrono::Utc::now),
                )
            })
            .collect())
    }
}

/// Splits `max_tokens` across the sources that returned at least one item,
/// by fixed weight, renormalizing once over the non-empty sources
/// (spec.md §4.5 step 3).
fn distribute_budget(pools: &[(ContextSource, f32, Vec<ContextItem>)], max_tokens: usize) -> Vec<usize> {
    let present_weight: f32 = pools
        .iter()
        .filter(|(_, _, items)| !items.is_empty())
        .map(|(_, w, _)| w)
        .sum();

    if present_weight <= 0.0 {
        return vec![0; pools.len()];
    }

    pools
        .iter()
        .map(|(_, weight, items)| {
            if items.is_empty() {
                0
            } else {
                ((max_tokens as f32) * (weight / present_weight)).floor() as usize
            }
        })
        .collect()
}

/// Greedily takes items in (already descending-score) order until the next
/// item would exceed `budget`. If the very first item alone exceeds the
/// whole budget, it is truncated on the last newline boundary that fits
/// (spec.md §4.5 step 4).
fn select_within_budget(source: ContextSource, items: Vec<ContextItem>, budget: usize) -> Vec<ContextItem> {
    let mut selected = Vec::new();
    let mut spent = 0usize;

    for item in items {
        if spent + item.token_estimate <= budget {
            spent += item.token_estimate;
            selected.push(item);
            continue;
        }
        if selected.is_empty() && budget > 0 {
            if let Some(truncated) = truncate_to_budget(&item.text, budget) {
                spent += truncated.token_estimate;
                selected.push(ContextItem {
                    source,
                    ..truncated
                });
            }
        }
        break;
    }

    selected
}

fn truncate_to_budget(text: &str, budget_tokens: usize) -> Option<ContextItem> {
    let max_chars = budget_tokens * 4;
    if text.len() <= max_chars {
        return Some(ContextItem::new(
            ContextSource::Memories, // overwritten by caller
            text.to_string(),
            0.0,
            chrono::Utc::now(),
        ));
    }
    let window = &text[..max_chars.min(text.len())];
    let cut = window.rfind('\n').filter(|&i| i > 0).unwrap_or(max_chars.min(text.len()));
    if cut == 0 {
        return None;
    }
    Some(ContextItem::new(
        ContextSource::Memories,
        window[..cut].to_string(),
        0.0,
        chrono::Utc::now(),
    ))
}

/// Emits one markdown section per source with a non-empty selection, in the
/// fixed order values → experiences → memories (spec.md §4.5 step 5).
fn render_markdown(items: &[ContextItem]) -> String {
    let mut out = String::new();
    for (source, heading) in [
        (ContextSource::Values, "## Values"),
        (ContextSource::Experiences, "## Experiences"),
        (ContextSource::Memories, "## Memories"),
    ] {
        let section: Vec<&ContextItem> = items.iter().filter(|i| i.source == source).collect();
        if section.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(heading);
        out.push('\n');
        for item in section {
            out.push_str("- ");
            out.push_str(&item.text.replace('\n', " "));
            out.push('\n');
        }
    }
    out
}
