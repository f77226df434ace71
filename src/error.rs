// src/error.rs

//! Error taxonomy for the aggregator.
//!
//! Only [`AggregatorError::UnknownCategory`] ever reaches a caller of the
//! orchestrator at request time. [`FetchError`] and [`CacheError`] are absorbed
//! by the fallback chain and only show up in logs and metrics.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for orchestrator-level operations.
pub type Result<T> = std::result::Result<T, AggregatorError>;

/// Errors surfaced by the orchestrator.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// The requested category is not part of the configuration.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// Configuration rejected while building the orchestrator.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AggregatorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// A source could not deliver items.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Payload could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// Upstream answered but refused the request (e.g. API code != 0).
    #[error("source rejected request: {0}")]
    Rejected(String),

    /// The fetch did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    pub fn parse(message: impl std::fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) => true,
            Self::Parse(_) | Self::Rejected(_) => false,
        }
    }
}

/// Snapshot / registry persistence failure.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
