// src/orchestrator.rs
//! Root of the aggregation core: owns the category bindings, the cache, the
//! last-update registry and the seed data, and drives the fallback chain.
//!
//! Built once at startup and shared as `Arc<Orchestrator>`; there is no global state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use tokio::time::Instant;

use crate::cache::{CacheStore, FileCacheStore, LastUpdateRegistry, MemoryCacheStore};
use crate::clock::Clock;
use crate::config::{AppConfig, SeedData};
use crate::error::{AggregatorError, Result};
use crate::fallback::{CategoryBinding, FallbackChain};
use crate::ingest::http::build_client;
use crate::ingest::providers::build_adapter;
use crate::model::{Item, Resolved};
use crate::staleness::EmptyBackoff;

pub struct Orchestrator {
    /// Configured order, used for listings and get-all passes.
    order: Vec<String>,
    chain: FallbackChain,
}

impl Orchestrator {
    /// Fails with `Config` if ids repeat or any category lacks seed data,
    /// since the seed tier must never come up empty.
    pub fn new(
        bindings: Vec<CategoryBinding>,
        cache: Arc<dyn CacheStore>,
        registry: Arc<LastUpdateRegistry>,
        seeds: SeedData,
    ) -> Result<Self> {
        if bindings.is_empty() {
            return Err(AggregatorError::config("no categories configured"));
        }
        let mut seen = HashSet::new();
        for b in &bindings {
            if !seen.insert(b.id.as_str()) {
                return Err(AggregatorError::config(format!("duplicate category '{}'", b.id)));
            }
        }
        let missing = seeds.missing(bindings.iter().map(|b| b.id.as_str()));
        if !missing.is_empty() {
            return Err(AggregatorError::config(format!(
                "no seed data for {}",
                missing.join(", ")
            )));
        }

        let order = bindings.iter().map(|b| b.id.clone()).collect();
        Ok(Self {
            order,
            chain: FallbackChain::new(bindings, cache, registry, seeds),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.chain = self.chain.with_clock(clock);
        self
    }

    pub fn with_empty_backoff(mut self, backoff: EmptyBackoff) -> Self {
        self.chain = self.chain.with_empty_backoff(backoff);
        self
    }

    /// Wire live adapters, storage and backoff from configuration.
    pub async fn from_config(cfg: &AppConfig, seeds: SeedData) -> anyhow::Result<Self> {
        cfg.validate()?;
        let client = build_client(&cfg.fetch).context("building HTTP client")?;

        let fetch_timeout = Duration::from_secs(cfg.fetch.adapter_timeout_secs);

        let mut bindings = Vec::with_capacity(cfg.categories.len());
        for c in &cfg.categories {
            let adapter = build_adapter(c, &cfg.fetch, client.clone())
                .with_context(|| format!("building adapter for '{}'", c.id))?;
            let display_name = if c.display_name.is_empty() {
                c.id.clone()
            } else {
                c.display_name.clone()
            };
            bindings.push(
                CategoryBinding::new(c.id.clone(), c.refresh_interval_secs, adapter)
                    .with_display_name(display_name)
                    .with_source_label(c.source_label.clone())
                    .with_max_items(c.max_items)
                    .with_fetch_timeout(fetch_timeout),
            );
        }

        let cache: Arc<dyn CacheStore> = match &cfg.storage.cache_dir {
            Some(dir) => Arc::new(FileCacheStore::new(dir.clone())),
            None => Arc::new(MemoryCacheStore::new()),
        };
        let registry = match &cfg.storage.registry_path {
            Some(p) => LastUpdateRegistry::load(p.clone()).await,
            None => LastUpdateRegistry::in_memory(),
        };

        let backoff = EmptyBackoff {
            base_secs: cfg.refresh.empty_backoff_base_secs,
            max_secs: cfg.refresh.empty_backoff_max_secs,
        };

        tracing::info!(
            categories = cfg.categories.len(),
            cache_dir = ?cfg.storage.cache_dir,
            "orchestrator ready"
        );
        Ok(Self::new(bindings, cache, Arc::new(registry), seeds)?.with_empty_backoff(backoff))
    }

    /// Bindings in configured order.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryBinding> + '_ {
        self.order.iter().filter_map(|id| self.chain.binding(id))
    }

    pub fn binding(&self, category: &str) -> Option<&CategoryBinding> {
        self.chain.binding(category)
    }

    pub fn registry(&self) -> &LastUpdateRegistry {
        self.chain.registry()
    }

    /// Items for one category. Never fails for a configured category.
    pub async fn get_category(&self, category: &str, force: bool) -> Result<Vec<Item>> {
        Ok(self.resolve_category(category, force).await?.items)
    }

    /// Like [`get_category`](Self::get_category) but keeps provenance and fetch time.
    pub async fn resolve_category(&self, category: &str, force: bool) -> Result<Resolved> {
        self.chain.resolve(category, force, None).await
    }

    /// Every category, resolved independently.
    pub async fn get_all(&self, force: bool) -> BTreeMap<String, Vec<Item>> {
        self.get_all_within(force, None).await
    }

    pub async fn get_all_within(
        &self,
        force: bool,
        deadline: Option<Duration>,
    ) -> BTreeMap<String, Vec<Item>> {
        self.resolve_all(force, deadline)
            .await
            .into_iter()
            .map(|r| (r.category, r.items))
            .collect()
    }

    /// Resolve all categories concurrently. When `deadline` elapses, pending
    /// fetches are abandoned and those categories fall back to cache or seed.
    pub async fn resolve_all(&self, force: bool, deadline: Option<Duration>) -> Vec<Resolved> {
        let deadline = deadline.map(|d| Instant::now() + d);
        let results = join_all(
            self.order
                .iter()
                .map(|id| self.chain.resolve(id, force, deadline)),
        )
        .await;

        results
            .into_iter()
            .filter_map(|r| match r {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    // Only reachable if the order and the chain disagree.
                    tracing::error!(error = %e, "category resolution failed");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::ingest::SourceAdapter;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Nothing;

    #[async_trait]
    impl SourceAdapter for Nothing {
        async fn fetch(&self) -> std::result::Result<Vec<Item>, FetchError> {
            Ok(vec![])
        }
        fn name(&self) -> &str {
            "nothing"
        }
    }

    fn parts() -> (Arc<dyn CacheStore>, Arc<LastUpdateRegistry>) {
        (
            Arc::new(MemoryCacheStore::new()),
            Arc::new(LastUpdateRegistry::in_memory()),
        )
    }

    #[test]
    fn construction_requires_seed_for_every_category() {
        let (cache, reg) = parts();
        let mut m = HashMap::new();
        m.insert("a".to_string(), vec![Item::new("seed", 1, "s")]);
        let bindings = vec![
            CategoryBinding::new("a", 60, Arc::new(Nothing)),
            CategoryBinding::new("b", 60, Arc::new(Nothing)),
        ];
        let err = Orchestrator::new(bindings, cache, reg, SeedData::new(m))
            .err()
            .unwrap();
        assert!(err.to_string().contains("no seed data for b"), "{err}");
    }

    #[test]
    fn construction_rejects_duplicate_ids() {
        let (cache, reg) = parts();
        let mut m = HashMap::new();
        m.insert("a".to_string(), vec![Item::new("seed", 1, "s")]);
        let bindings = vec![
            CategoryBinding::new("a", 60, Arc::new(Nothing)),
            CategoryBinding::new("a", 60, Arc::new(Nothing)),
        ];
        assert!(Orchestrator::new(bindings, cache, reg, SeedData::new(m)).is_err());
    }

    #[tokio::test]
    async fn categories_keep_configured_order() {
        let (cache, reg) = parts();
        let mut m = HashMap::new();
        for id in ["z", "a", "m"] {
            m.insert(id.to_string(), vec![Item::new("seed", 1, "s")]);
        }
        let bindings = ["z", "a", "m"]
            .into_iter()
            .map(|id| CategoryBinding::new(id, 60, Arc::new(Nothing)))
            .collect();
        let orch = Orchestrator::new(bindings, cache, reg, SeedData::new(m)).unwrap();
        let ids: Vec<_> = orch.categories().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);

        let all = orch.resolve_all(false, None).await;
        let ids: Vec<_> = all.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
