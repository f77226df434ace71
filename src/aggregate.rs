// src/aggregate.rs
//! Aggregator: normalize → dedupe → rank → truncate.
//!
//! Scores are computed by each adapter with its own heuristic; this module only
//! consumes the score already attached to an [`Item`].

use std::collections::HashSet;

use crate::ingest::normalize_text;
use crate::model::Item;

/// Clean titles, drop items whose title ends up empty, and give unlabeled
/// items the binding's `source_label`.
pub fn normalize(raw: Vec<Item>, source_label: &str) -> Vec<Item> {
    raw.into_iter()
        .filter_map(|mut it| {
            it.title = normalize_text(&it.title);
            if it.title.is_empty() {
                return None;
            }
            if it.source_label.trim().is_empty() {
                it.source_label = source_label.to_string();
            }
            it.url = it.url.filter(|u| !u.trim().is_empty());
            Some(it)
        })
        .collect()
}

/// Exact-title dedupe; the first occurrence wins and order is preserved.
pub fn dedupe(items: Vec<Item>) -> Vec<Item> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|it| seen.insert(it.title.clone()))
        .collect()
}

/// Descending by score; equal scores keep their relative order.
pub fn rank(mut items: Vec<Item>) -> Vec<Item> {
    // `sort_by` is stable.
    items.sort_by(|a, b| b.hot_score.cmp(&a.hot_score));
    items
}

pub fn truncate(mut items: Vec<Item>, max_items: usize) -> Vec<Item> {
    items.truncate(max_items);
    items
}

/// Full pipeline applied to a live fetch before it is cached.
pub fn aggregate(raw: Vec<Item>, source_label: &str, max_items: usize) -> Vec<Item> {
    truncate(rank(dedupe(normalize(raw, source_label))), max_items)
}
