// src/cache/registry.rs
//! Last-update registry: category id -> unix seconds of the last successful
//! live refresh. Persisted as a flat JSON object so it survives restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::write_atomic;
use crate::error::CacheError;

#[derive(Debug)]
pub struct LastUpdateRegistry {
    path: Option<PathBuf>,
    /// `(map, version)`; the version bumps on every persisted change.
    entries: Mutex<(HashMap<String, i64>, u64)>,
    /// Serializes file writes; holds the version last written to disk.
    written: Mutex<u64>,
}

impl LastUpdateRegistry {
    /// Registry that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new((HashMap::new(), 0)),
            written: Mutex::new(0),
        }
    }

    /// Load from `path`. A missing file starts empty; an unreadable one is
    /// logged and also starts empty, which makes every category stale.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path).await {
            Ok(Some(m)) => m,
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(target: "cache", path = %path.display(), error = %e, "last-update registry unreadable, starting empty");
                metrics::counter!("hotboard_cache_errors_total", "op" => "registry_load").increment(1);
                HashMap::new()
            }
        };
        Self {
            path: Some(path),
            entries: Mutex::new((entries, 0)),
            written: Mutex::new(0),
        }
    }

    pub async fn get(&self, category: &str) -> Option<i64> {
        self.entries.lock().await.0.get(category).copied()
    }

    pub async fn snapshot(&self) -> HashMap<String, i64> {
        self.entries.lock().await.0.clone()
    }

    /// Record a successful refresh at `ts`. Never moves a timestamp backwards.
    ///
    /// The in-memory value is updated even if persisting fails. The file is
    /// written outside the map lock, so readers never wait on disk.
    pub async fn record(&self, category: &str, ts: i64) -> Result<(), CacheError> {
        let (json, version) = {
            let mut guard = self.entries.lock().await;
            let (entries, version) = &mut *guard;
            let slot = entries.entry(category.to_string()).or_insert(ts);
            if ts > *slot {
                *slot = ts;
            }
            if self.path.is_none() {
                return Ok(());
            }
            *version += 1;
            (serde_json::to_vec(&*entries)?, *version)
        };
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut written = self.written.lock().await;
        // A later state already reached disk.
        if *written > version {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        write_atomic(path, &json).await?;
        *written = version;
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<Option<HashMap<String, i64>>, CacheError> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
