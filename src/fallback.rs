// src/fallback.rs
//! Tiered resolution for one category: fresh cache → live fetch → stale cache → seed.
//!
//! Only `UnknownCategory` escapes; fetch errors, timeouts, empty fetches and
//! cache I/O failures all degrade to the next tier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use metrics::{counter, gauge, histogram};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::aggregate::aggregate;
use crate::cache::{CacheStore, LastUpdateRegistry};
use crate::clock::{Clock, SystemClock};
use crate::config::SeedData;
use crate::error::{AggregatorError, Result};
use crate::ingest::SourceAdapter;
use crate::model::{Item, Provenance, Resolved, Snapshot};
use crate::staleness::{EmptyBackoff, EmptyStreak, StalenessPolicy};

/// A configured category and the adapter it is bound to.
#[derive(Clone)]
pub struct CategoryBinding {
    pub id: String,
    pub display_name: String,
    /// Label for items that arrive without one.
    pub source_label: String,
    pub policy: StalenessPolicy,
    pub max_items: usize,
    pub fetch_timeout: Duration,
    pub adapter: Arc<dyn SourceAdapter>,
}

impl std::fmt::Debug for CategoryBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryBinding")
            .field("id", &self.id)
            .field("adapter", &self.adapter.name())
            .field("policy", &self.policy)
            .field("max_items", &self.max_items)
            .finish()
    }
}

impl CategoryBinding {
    pub fn new(
        id: impl Into<String>,
        refresh_interval_secs: u64,
        adapter: Arc<dyn SourceAdapter>,
    ) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            source_label: String::new(),
            policy: StalenessPolicy::new(refresh_interval_secs),
            max_items: 20,
            fetch_timeout: Duration::from_secs(15),
            adapter,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

struct Slot {
    binding: CategoryBinding,
    /// Single writer per category; also guards the empty-result streak.
    lock: Mutex<EmptyStreak>,
}

pub struct FallbackChain {
    slots: HashMap<String, Slot>,
    cache: Arc<dyn CacheStore>,
    registry: Arc<LastUpdateRegistry>,
    seeds: SeedData,
    clock: Arc<dyn Clock>,
    backoff: EmptyBackoff,
}

impl FallbackChain {
    /// Seed coverage is checked by [`Orchestrator::new`](crate::Orchestrator::new),
    /// the only caller.
    pub(crate) fn new(
        bindings: Vec<CategoryBinding>,
        cache: Arc<dyn CacheStore>,
        registry: Arc<LastUpdateRegistry>,
        seeds: SeedData,
    ) -> Self {
        crate::metrics::ensure_metrics_described();
        let slots = bindings
            .into_iter()
            .map(|b| {
                (
                    b.id.clone(),
                    Slot {
                        binding: b,
                        lock: Mutex::new(EmptyStreak::default()),
                    },
                )
            })
            .collect();
        Self {
            slots,
            cache,
            registry,
            seeds,
            clock: Arc::new(SystemClock),
            backoff: EmptyBackoff::disabled(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_empty_backoff(mut self, backoff: EmptyBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn binding(&self, category: &str) -> Option<&CategoryBinding> {
        self.slots.get(category).map(|s| &s.binding)
    }

    pub fn registry(&self) -> &LastUpdateRegistry {
        &self.registry
    }

    /// Resolve `category` through the tiers. `deadline` bounds the live fetch
    /// (and the wait for a concurrent refresh of the same category).
    pub async fn resolve(
        &self,
        category: &str,
        force: bool,
        deadline: Option<Instant>,
    ) -> Result<Resolved> {
        let slot = self
            .slots
            .get(category)
            .ok_or_else(|| AggregatorError::UnknownCategory(category.to_string()))?;
        let binding = &slot.binding;

        if !force {
            if let Some(snap) = self.fresh_snapshot(binding).await {
                return Ok(self.finish(binding, Provenance::CacheFresh, Some(snap.fetched_at), snap.items));
            }
        }

        // Held through the stale-cache read; released before returning.
        let mut guard = match deadline {
            Some(d) => tokio::time::timeout_at(d, slot.lock.lock()).await.ok(),
            None => Some(slot.lock.lock().await),
        };

        match guard.as_deref_mut() {
            None => {
                tracing::warn!(target: "fallback", category, "deadline passed waiting for concurrent refresh");
                counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "timeout")
                    .increment(1);
            }
            Some(streak) => {
                // Someone may have refreshed while we waited.
                if !force {
                    if let Some(snap) = self.fresh_snapshot(binding).await {
                        return Ok(self.finish(binding, Provenance::CacheFresh, Some(snap.fetched_at), snap.items));
                    }
                }
                if let Some(items) = self.try_live(binding, streak, force, deadline).await {
                    let now = self.clock.now();
                    self.persist(binding, &items, now).await;
                    return Ok(self.finish(binding, Provenance::Live, Some(now), items));
                }
            }
        }

        if let Some(snap) = self.load_cache(category).await {
            if !snap.is_empty() {
                return Ok(self.finish(
                    binding,
                    Provenance::CacheStaleFallback,
                    Some(snap.fetched_at),
                    snap.items,
                ));
            }
        }

        drop(guard);

        // Non-empty: the orchestrator refuses categories without seed items.
        let seed = self.seeds.get(category).to_vec();
        Ok(self.finish(binding, Provenance::SeedFallback, None, seed))
    }

    /// The cached snapshot if the category is recorded fresh and the snapshot is usable.
    async fn fresh_snapshot(&self, binding: &CategoryBinding) -> Option<Snapshot> {
        let now = self.clock.now();
        let last = self.registry.get(&binding.id).await;
        if binding.policy.is_stale(last, now) {
            return None;
        }
        match self.load_cache(&binding.id).await {
            Some(snap) if !snap.is_empty() => Some(snap),
            _ => {
                tracing::debug!(target: "fallback", category = %binding.id, "recorded fresh but no usable snapshot; treating as stale");
                None
            }
        }
    }

    /// Step 3. `Some` only for a non-empty, aggregated result.
    async fn try_live(
        &self,
        binding: &CategoryBinding,
        streak: &mut EmptyStreak,
        force: bool,
        deadline: Option<Instant>,
    ) -> Option<Vec<Item>> {
        let category = binding.id.as_str();
        let now = self.clock.now();

        if !force && streak.holds_off(&self.backoff, now) {
            tracing::debug!(target: "fallback", category, streak = streak.count, "holding off after empty fetches");
            counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "skipped")
                .increment(1);
            return None;
        }

        let timeout = match deadline {
            Some(d) => binding
                .fetch_timeout
                .min(d.saturating_duration_since(Instant::now())),
            None => binding.fetch_timeout,
        };
        if timeout.is_zero() {
            tracing::warn!(target: "fallback", category, "deadline exhausted before fetch");
            counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "timeout")
                .increment(1);
            return None;
        }

        let t0 = StdInstant::now();
        let res = tokio::time::timeout(timeout, binding.adapter.fetch()).await;
        histogram!("hotboard_fetch_ms", "category" => category.to_string())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match res {
            Ok(Ok(raw)) => {
                let fetched = raw.len();
                let items = aggregate(raw, &binding.source_label, binding.max_items);
                if items.is_empty() {
                    streak.record_empty(now);
                    tracing::warn!(target: "fallback", category, adapter = binding.adapter.name(), fetched, streak = streak.count, "source returned no usable items");
                    counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "empty")
                        .increment(1);
                    None
                } else {
                    streak.reset();
                    tracing::info!(target: "fallback", category, adapter = binding.adapter.name(), fetched, kept = items.len(), "live fetch ok");
                    counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "ok")
                        .increment(1);
                    Some(items)
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(target: "fallback", category, adapter = binding.adapter.name(), error = %e, "fetch failed");
                counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "error")
                    .increment(1);
                None
            }
            Err(_) => {
                tracing::warn!(target: "fallback", category, adapter = binding.adapter.name(), ?timeout, "fetch timed out");
                counter!("hotboard_fetch_total", "category" => category.to_string(), "outcome" => "timeout")
                    .increment(1);
                None
            }
        }
    }

    /// Save the snapshot, then advance the registry. A failed save leaves the
    /// registry untouched so the next request retries the fetch.
    async fn persist(&self, binding: &CategoryBinding, items: &[Item], now: i64) {
        let category = binding.id.as_str();
        let snap = Snapshot::new(category, items.to_vec(), now);
        if let Err(e) = self.cache.save(category, &snap).await {
            tracing::warn!(target: "fallback", category, error = %e, "snapshot save failed");
            counter!("hotboard_cache_errors_total", "op" => "save").increment(1);
            return;
        }
        if let Err(e) = self.registry.record(category, now).await {
            tracing::warn!(target: "fallback", category, error = %e, "registry persist failed");
            counter!("hotboard_cache_errors_total", "op" => "registry_save").increment(1);
        }
        gauge!("hotboard_last_refresh_ts", "category" => category.to_string()).set(now as f64);
    }

    /// Read errors count as an empty cache.
    async fn load_cache(&self, category: &str) -> Option<Snapshot> {
        match self.cache.load(category).await {
            Ok(snap) => snap,
            Err(e) => {
                tracing::warn!(target: "fallback", category, error = %e, "snapshot load failed");
                counter!("hotboard_cache_errors_total", "op" => "load").increment(1);
                None
            }
        }
    }

    fn finish(
        &self,
        binding: &CategoryBinding,
        provenance: Provenance,
        fetched_at: Option<i64>,
        items: Vec<Item>,
    ) -> Resolved {
        tracing::debug!(target: "fallback", category = %binding.id, %provenance, items = items.len(), "resolved");
        counter!(
            "hotboard_resolve_total",
            "category" => binding.id.clone(),
            "provenance" => provenance.as_str()
        )
        .increment(1);
        Resolved {
            category: binding.id.clone(),
            provenance,
            fetched_at,
            items,
        }
    }
}
