//! Event monitor and run statistics.
//!
//! The monitor is the runner's only event subscriber. It:
//! - logs every coordinator event
//! - feeds accepted placements into the activity map, so hotspot rankings
//!   follow what the swarm actually paints
//! - counts accepted, skipped and failed placements per agent

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use swarm_kernel::{ActivityMap, Clock, LedgerStats, Point, SubmitErrorKind, SwarmEvent};

/// Placement counters for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub accepted: u64,
    pub skipped: u64,
    pub errors: u64,
    /// Failures by class, e.g. `rate_limited`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub error_kinds: BTreeMap<SubmitErrorKind, u64>,
}

/// Counters accumulated from the event stream, keyed by agent name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub agents: BTreeMap<String, AgentStats>,
    /// Events lost because the monitor fell behind
    pub lagged_events: u64,
}

impl RunStats {
    pub fn observe(&mut self, event: &SwarmEvent) {
        match event {
            SwarmEvent::AgentStarted { agent_name } => {
                self.agents.entry(agent_name.clone()).or_default();
            }
            SwarmEvent::PlacementAccepted { agent_name, .. } => {
                self.agents.entry(agent_name.clone()).or_default().accepted += 1;
            }
            SwarmEvent::PlacementSkipped { agent_name, .. } => {
                self.agents.entry(agent_name.clone()).or_default().skipped += 1;
            }
            SwarmEvent::AgentError {
                agent_name, kind, ..
            } => {
                let stats = self.agents.entry(agent_name.clone()).or_default();
                stats.errors += 1;
                *stats.error_kinds.entry(*kind).or_default() += 1;
            }
            SwarmEvent::CoordinatorStopped => {}
        }
    }

    pub fn total_accepted(&self) -> u64 {
        self.agents.values().map(|s| s.accepted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.agents.values().map(|s| s.skipped).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.agents.values().map(|s| s.errors).sum()
    }
}

/// Results of one `run` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub dry_run: bool,
    pub seed: Option<u64>,
    pub total_accepted: u64,
    pub total_skipped: u64,
    pub total_errors: u64,
    pub stats: RunStats,
    pub ledger: LedgerSummary,
}

/// Serializable copy of the kernel's ledger counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub granted: u64,
    pub denied: u64,
    pub rolled_back: u64,
}

impl From<LedgerStats> for LedgerSummary {
    fn from(stats: LedgerStats) -> Self {
        Self {
            granted: stats.granted,
            denied: stats.denied,
            rolled_back: stats.rolled_back,
        }
    }
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        dry_run: bool,
        seed: Option<u64>,
        stats: RunStats,
        ledger: LedgerStats,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            ended_at: Utc::now(),
            dry_run,
            seed,
            total_accepted: stats.total_accepted(),
            total_skipped: stats.total_skipped(),
            total_errors: stats.total_errors(),
            stats,
            ledger: ledger.into(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Save the summary to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let summary = serde_json::from_str(&json)?;
        Ok(summary)
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

/// Consume events until the coordinator stops or the channel closes.
///
/// Returns the accumulated statistics when done.
pub fn spawn_monitor(
    mut events: broadcast::Receiver<SwarmEvent>,
    activity: Option<Arc<ActivityMap>>,
    clock: Arc<dyn Clock>,
) -> JoinHandle<RunStats> {
    tokio::spawn(async move {
        let mut stats = RunStats::default();
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Monitor fell behind; events dropped");
                    stats.lagged_events += missed;
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            stats.observe(&event);
            match &event {
                SwarmEvent::AgentStarted { agent_name } => {
                    info!(agent = %agent_name, "Agent started");
                }
                SwarmEvent::PlacementAccepted {
                    agent_name,
                    x,
                    y,
                    color,
                    note,
                } => {
                    if let Some(activity) = &activity {
                        activity.record(Point::new(*x, *y), clock.now_ms());
                    }
                    info!(
                        agent = %agent_name,
                        x,
                        y,
                        color,
                        note = note.as_deref().unwrap_or(""),
                        "Pixel placed"
                    );
                }
                SwarmEvent::PlacementSkipped {
                    agent_name,
                    x,
                    y,
                    reason,
                } => {
                    debug!(agent = %agent_name, x, y, %reason, "Placement skipped");
                }
                SwarmEvent::AgentError {
                    agent_name,
                    error,
                    kind,
                } => {
                    warn!(agent = %agent_name, %kind, %error, "Agent error");
                }
                SwarmEvent::CoordinatorStopped => {
                    info!(
                        accepted = stats.total_accepted(),
                        skipped = stats.total_skipped(),
                        errors = stats.total_errors(),
                        "Coordinator stopped"
                    );
                    break;
                }
            }
        }
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_kernel::{
        ActivityConfig, CanvasState, EventBus, ManualClock, Zone, ZoneId, ZoneManager,
    };

    fn accepted(agent: &str, x: i32, y: i32) -> SwarmEvent {
        SwarmEvent::PlacementAccepted {
            agent_name: agent.to_string(),
            x,
            y,
            color: 1,
            note: None,
        }
    }

    #[test]
    fn test_stats_count_per_agent() {
        let mut stats = RunStats::default();
        stats.observe(&SwarmEvent::AgentStarted {
            agent_name: "Idle".to_string(),
        });
        stats.observe(&accepted("Zen", 1, 1));
        stats.observe(&accepted("Zen", 2, 2));
        stats.observe(&SwarmEvent::PlacementSkipped {
            agent_name: "Geo".to_string(),
            x: 1,
            y: 1,
            reason: "conflict".to_string(),
        });
        stats.observe(&SwarmEvent::AgentError {
            agent_name: "Geo".to_string(),
            error: "rate limited".to_string(),
            kind: SubmitErrorKind::RateLimited,
        });

        assert_eq!(stats.agents["Zen"].accepted, 2);
        assert_eq!(stats.agents["Idle"], AgentStats::default());
        assert_eq!(stats.agents["Geo"].skipped, 1);
        assert_eq!(stats.agents["Geo"].error_kinds[&SubmitErrorKind::RateLimited], 1);
        assert_eq!(
            (stats.total_accepted(), stats.total_skipped(), stats.total_errors()),
            (2, 1, 1)
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500), "500ms");
        assert_eq!(format_duration(1_500), "1.5s");
        assert_eq!(format_duration(90_000), "1.5m");
    }

    #[test]
    fn test_summary_roundtrips_through_file() {
        let mut stats = RunStats::default();
        stats.observe(&accepted("Zen", 1, 1));
        let summary = RunSummary::new(Utc::now(), true, Some(3), stats, LedgerStats::default());

        let path = std::env::temp_dir().join(format!("swarm-summary-{}.json", summary.run_id));
        summary.save(&path).unwrap();
        let loaded = RunSummary::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.run_id, summary.run_id);
        assert_eq!(loaded.total_accepted, 1);
        assert_eq!(loaded.stats, summary.stats);
    }

    #[tokio::test]
    async fn test_monitor_feeds_activity_and_stops() {
        let zones = ZoneManager::new(vec![
            Zone {
                id: ZoneId(1),
                name: "left".to_string(),
                x_start: 0,
                x_end: 249,
                y_start: 0,
                y_end: 499,
            },
            Zone {
                id: ZoneId(2),
                name: "right".to_string(),
                x_start: 250,
                x_end: 499,
                y_start: 0,
                y_end: 499,
            },
        ])
        .unwrap();
        let activity = Arc::new(ActivityMap::new(zones, ActivityConfig::default()));
        let bus = EventBus::new(16);
        let monitor = spawn_monitor(
            bus.subscribe(),
            Some(Arc::clone(&activity)),
            Arc::new(ManualClock::new(1_000)),
        );

        bus.emit(accepted("Zen", 300, 10));
        bus.emit(accepted("Zen", 310, 10));
        bus.emit(SwarmEvent::CoordinatorStopped);

        let stats = monitor.await.unwrap();
        assert_eq!(stats.total_accepted(), 2);
        assert_eq!(activity.hotspots(), vec![ZoneId(2)]);
        assert_eq!(activity.coldspots()[0], ZoneId(1));
    }
}
