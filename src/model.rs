// src/model.rs
//! Shared data model: items, snapshots and provenance tags.

use serde::{Deserialize, Serialize};

/// One trending entry, already mapped onto the unified schema.
///
/// Field names on the wire (`hot`, `source`) match what the frontend consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "hot", default)]
    pub hot_score: u64,
    #[serde(rename = "source", default)]
    pub source_label: String,
}

impl Item {
    pub fn new(title: impl Into<String>, hot_score: u64, source_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            hot_score,
            source_label: source_label.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }
}

/// Last successfully fetched, normalized item list for a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub category: String,
    pub items: Vec<Item>,
    /// Unix seconds.
    pub fetched_at: i64,
}

impl Snapshot {
    pub fn new(category: impl Into<String>, items: Vec<Item>, fetched_at: i64) -> Self {
        Self {
            category: category.into(),
            items,
            fetched_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Which tier of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Live,
    CacheFresh,
    CacheStaleFallback,
    SeedFallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::CacheFresh => "cache-fresh",
            Provenance::CacheStaleFallback => "cache-stale-fallback",
            Provenance::SeedFallback => "seed-fallback",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one category.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Resolved {
    pub category: String,
    pub provenance: Provenance,
    /// When the served items were fetched; `None` for seed data.
    pub fetched_at: Option<i64>,
    pub items: Vec<Item>,
}
