// tests/common/mod.rs
//! Fakes shared by the orchestration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hotboard::cache::{CacheStore, LastUpdateRegistry, MemoryCacheStore};
use hotboard::clock::ManualClock;
use hotboard::config::SeedData;
use hotboard::error::{CacheError, FetchError};
use hotboard::ingest::SourceAdapter;
use hotboard::{CategoryBinding, Item, Orchestrator, Snapshot};

pub const NOW: i64 = 1_760_000_000;

#[derive(Clone)]
pub enum Behavior {
    Items(Vec<Item>),
    Empty,
    Fail,
    /// Sleep, then return the items.
    Slow(Duration, Vec<Item>),
}

/// Adapter with a scripted answer and a call counter.
pub struct FakeAdapter {
    behavior: parking_lot::Mutex<Behavior>,
    calls: AtomicUsize,
}

impl FakeAdapter {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: parking_lot::Mutex::new(behavior),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().clone();
        match behavior {
            Behavior::Items(items) => Ok(items),
            Behavior::Empty => Ok(vec![]),
            Behavior::Fail => Err(FetchError::Status {
                status: 503,
                url: "https://upstream.test".into(),
            }),
            Behavior::Slow(d, items) => {
                tokio::time::sleep(d).await;
                Ok(items)
            }
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Memory store that can be told to fail, and counts loads.
#[derive(Default)]
pub struct FlakyCache {
    pub inner: MemoryCacheStore,
    pub fail_save: bool,
    pub fail_load: bool,
    pub loads: AtomicUsize,
}

impl FlakyCache {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn load(&self, category: &str) -> Result<Option<Snapshot>, CacheError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(std::io::Error::other("disk read failed").into());
        }
        self.inner.load(category).await
    }

    async fn save(&self, category: &str, snapshot: &Snapshot) -> Result<(), CacheError> {
        if self.fail_save {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.save(category, snapshot).await
    }
}

pub fn items(specs: &[(&str, u64)]) -> Vec<Item> {
    specs
        .iter()
        .map(|(t, h)| Item::new(*t, *h, "src"))
        .collect()
}

pub fn seed_for(ids: &[&str]) -> SeedData {
    let mut m = HashMap::new();
    for id in ids {
        m.insert(
            id.to_string(),
            vec![Item::new(format!("seed {id}"), 1, "seed")],
        );
    }
    SeedData::new(m)
}

/// Everything a test needs to poke at an orchestrator from the outside.
pub struct Harness {
    pub orch: Orchestrator,
    pub cache: Arc<FlakyCache>,
    pub registry: Arc<LastUpdateRegistry>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(bindings: Vec<CategoryBinding>, cache: FlakyCache) -> Harness {
    let ids: Vec<String> = bindings.iter().map(|b| b.id.clone()).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let cache = Arc::new(cache);
    let registry = Arc::new(LastUpdateRegistry::in_memory());
    let clock = Arc::new(ManualClock::new(NOW));
    let orch = Orchestrator::new(
        bindings,
        cache.clone(),
        registry.clone(),
        seed_for(&id_refs),
    )
    .expect("valid orchestrator")
    .with_clock(clock.clone());
    Harness {
        orch,
        cache,
        registry,
        clock,
    }
}
