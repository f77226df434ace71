// src/cache/mod.rs
//! Snapshot persistence.
//!
//! One snapshot per category, keyed by category id. A write is either fully
//! visible or not at all: files are written to `<id>.json.tmp` and renamed
//! over the target.

pub mod registry;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::CacheError;
use crate::model::Snapshot;

pub use registry::LastUpdateRegistry;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored for `category` yet.
    async fn load(&self, category: &str) -> Result<Option<Snapshot>, CacheError>;
    async fn save(&self, category: &str, snapshot: &Snapshot) -> Result<(), CacheError>;
}

/// JSON file per category under a directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{category}.json"))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self, category: &str) -> Result<Option<Snapshot>, CacheError> {
        let path = self.path_for(category);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snap: Snapshot = serde_json::from_str(&raw)?;
        Ok(Some(snap))
    }

    async fn save(&self, category: &str, snapshot: &Snapshot) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path_for(category), &json).await
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Process-local store, used when no cache directory is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: Mutex<HashMap<String, Snapshot>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a category.
    pub fn insert(&self, snapshot: Snapshot) {
        self.inner.lock().insert(snapshot.category.clone(), snapshot);
    }

    pub fn get(&self, category: &str) -> Option<Snapshot> {
        self.inner.lock().get(category).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self, category: &str) -> Result<Option<Snapshot>, CacheError> {
        Ok(self.get(category))
    }

    async fn save(&self, category: &str, snapshot: &Snapshot) -> Result<(), CacheError> {
        self.inner.lock().insert(category.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryCacheStore::new();
        assert!(store.load("tech").await.unwrap().is_none());
        let snap = Snapshot::new("tech", vec![Item::new("a", 1, "x")], 100);
        store.save("tech", &snap).await.unwrap();
        assert_eq!(store.load("tech").await.unwrap(), Some(snap));
    }

    #[tokio::test]
    async fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("nested"));
        assert!(store.load("tech").await.unwrap().is_none());
    }
}
