// src/ingest/types.rs
use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::Item;

/// Capability contract every data source implements.
///
/// An empty `Ok(vec![])` is a valid answer and distinct from a `FetchError`.
/// Implementations may retry and pace their own requests internally, but the
/// orchestrator still bounds every call with its own timeout.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError>;
    fn name(&self) -> &str;
}

/// Whether an adapter talks to the network or parses captured payloads.
#[derive(Debug, Clone)]
pub enum Mode<F> {
    Fixture(F),
    Http,
}
