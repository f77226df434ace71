// src/metrics.rs
use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use axum::{routing::get, Router};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if another recorder is already set.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metric descriptions so series show up with help text on /metrics.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "hotboard_fetch_total",
            "Live fetch attempts by category and outcome (ok, empty, error, timeout, skipped)."
        );
        describe_counter!(
            "hotboard_resolve_total",
            "Resolved category requests by provenance tier."
        );
        describe_histogram!("hotboard_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_histogram!("hotboard_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!(
            "hotboard_cache_errors_total",
            "Snapshot and registry I/O failures by operation."
        );
        describe_counter!(
            "hotboard_provider_errors_total",
            "Per-channel upstream failures inside an adapter."
        );
        describe_gauge!(
            "hotboard_last_refresh_ts",
            "Unix ts of the last successful live refresh per category."
        );
        describe_counter!("hotboard_scheduler_runs_total", "Background refresh passes.");
    });
}
