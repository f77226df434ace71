// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::model::Provenance;
use crate::orchestrator::Orchestrator;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_secs: u64,
    /// Deadline for each pass; 0 means none.
    pub deadline_secs: u64,
}

/// Spawn a background task running one non-forced get-all pass per tick.
/// The first tick fires immediately, so caches are warmed at boot.
pub fn spawn_refresh_scheduler(orch: Arc<Orchestrator>, cfg: RefreshSchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let deadline = (cfg.deadline_secs > 0).then(|| Duration::from_secs(cfg.deadline_secs));
        loop {
            ticker.tick().await;
            let results = orch.resolve_all(false, deadline).await;

            let live = results
                .iter()
                .filter(|r| r.provenance == Provenance::Live)
                .count();
            let degraded = results
                .iter()
                .filter(|r| {
                    matches!(
                        r.provenance,
                        Provenance::CacheStaleFallback | Provenance::SeedFallback
                    )
                })
                .count();
            counter!("hotboard_scheduler_runs_total").increment(1);

            tracing::info!(
                target: "ingest",
                categories = results.len(),
                live,
                degraded,
                "scheduled refresh tick"
            );
        }
    })
}
