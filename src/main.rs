//! Hotboard — Binary Entrypoint
//! Loads configuration and seed data, builds the orchestrator, and serves the
//! Axum router (plus `/metrics`) on Shuttle.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hotboard::config::{AppConfig, SeedData};
use hotboard::ingest::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use hotboard::metrics::Metrics;
use hotboard::{router, AppState, Orchestrator};

/// Compact tracing logs filtered by `RUST_LOG` (default `hotboard=info,warn`).
/// Tolerates a subscriber already installed by the runtime.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hotboard=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Before the orchestrator, so metric descriptions reach the recorder.
    let metrics = Metrics::init()?;

    let cfg = AppConfig::load_default().context("loading hotboard config")?;
    let seeds = SeedData::load_default().context("loading seed data")?;

    let orchestrator = Arc::new(
        Orchestrator::from_config(&cfg, seeds)
            .await
            .context("building orchestrator")?,
    );

    if cfg.refresh.scheduler_interval_secs > 0 {
        spawn_refresh_scheduler(
            orchestrator.clone(),
            RefreshSchedulerCfg {
                interval_secs: cfg.refresh.scheduler_interval_secs,
                deadline_secs: cfg.refresh.request_deadline_secs,
            },
        );
    }

    let state = AppState::new(orchestrator).with_request_deadline(cfg.refresh.request_deadline_secs);
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}
