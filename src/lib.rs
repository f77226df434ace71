// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod staleness;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::{AggregatorError, CacheError, FetchError};
pub use crate::fallback::{CategoryBinding, FallbackChain};
pub use crate::model::{Item, Provenance, Resolved, Snapshot};
pub use crate::orchestrator::Orchestrator;
