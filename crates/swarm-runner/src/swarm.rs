//! One complete swarm run: build, start, wait, stop, summarize.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use swarm_kernel::{
    ActivityMap, CanvasApi, Clock, CoordinatorBuilder, DryRunApi, SystemClock,
};

use crate::http_api::HttpCanvasApi;
use crate::monitor::{format_duration, spawn_monitor, RunSummary};
use crate::settings::SwarmSettings;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log placements instead of sending them
    pub dry_run: bool,
    /// Stop after this long; `None` runs until `shutdown` resolves
    pub duration: Option<Duration>,
    /// Overrides the seed from the settings file
    pub seed: Option<u64>,
}

/// Run the swarm described by `settings` until `shutdown` resolves or the
/// configured duration elapses, whichever comes first.
pub async fn run_swarm(
    mut settings: SwarmSettings,
    options: RunOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<RunSummary> {
    if options.seed.is_some() {
        settings.kernel.seed = options.seed;
    }
    let seed = settings.kernel.seed;

    let zones = settings.zone_manager().context("Invalid zone table")?;
    let activity = Arc::new(ActivityMap::new(zones.clone(), settings.activity.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let api: Arc<dyn CanvasApi> = if options.dry_run {
        Arc::new(DryRunApi::new())
    } else {
        let timeout = Duration::from_millis(settings.api.timeout_ms);
        Arc::new(HttpCanvasApi::new(&settings.api.base_url, timeout)?)
    };

    let mut builder = CoordinatorBuilder::new(settings.kernel.clone(), zones)
        .canvas(activity.clone())
        .api(api)
        .clock(Arc::clone(&clock));
    for agent in settings.agents {
        let id = agent.id.clone();
        builder = builder
            .add_agent(agent)
            .with_context(|| format!("Failed to build agent '{id}'"))?;
    }
    let coordinator = builder.build();

    let monitor = spawn_monitor(coordinator.subscribe(), Some(activity), clock);
    let started_at = Utc::now();
    info!(
        agents = coordinator.agent_ids().len(),
        dry_run = options.dry_run,
        seed = ?seed,
        "Starting swarm"
    );
    coordinator.start();

    match options.duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => info!("Run duration elapsed"),
                _ = shutdown => info!("Shutdown requested"),
            }
        }
        None => {
            shutdown.await;
            info!("Shutdown requested");
        }
    }

    coordinator.shutdown().await;
    let stats = monitor.await.context("Event monitor task failed")?;
    let summary = RunSummary::new(
        started_at,
        options.dry_run,
        seed,
        stats,
        coordinator.ledger_stats(),
    );
    info!(
        run_id = %summary.run_id,
        duration = format_duration(summary.duration_ms()),
        accepted = summary.total_accepted,
        skipped = summary.total_skipped,
        errors = summary.total_errors,
        "Swarm finished"
    );
    Ok(summary)
}
