//! Coordinator: turns agents into scheduled tasks and arbitrates their
//! placements.
//!
//! Each agent becomes one [`AgentTask`]. A tick runs the agent, passes any
//! plan through the placement ledger (cooldown and conflict window), submits
//! accepted plans to the canvas API and reports what happened on the event
//! bus:
//!
//! ```text
//! AgentTask::tick
//!   |
//!   +-- next_pixel(ctx) ----- None --------------------------------> Idle
//!   |        |
//!   |        +-- not dispatchable -------------------------------> Dropped
//!   |        |
//!   |        +-- ledger.reserve --- Rejection --> placement_skipped -> Skipped
//!   |                 |
//!   |                 +-- api.submit_pixel
//!   |                          |
//!   |                          +-- Ok  --> confirm, placement_accepted -> Placed
//!   |                          +-- Err --> rollback, agent_error ------> Failed
//!   |
//!   +-- next_delay_ms() is returned in every case
//! ```
//!
//! The delay is always the agent's own, so rejections and failures never
//! distort its cadence. Only a panic inside the agent reaches the
//! scheduler's error backoff: the panicking tick itself, then one more tick
//! that fails on the poisoned agent lock before the agent resumes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::{build_agent, Agent, AgentConfig, AgentContext};
use crate::api::{AgentCredentials, CanvasApi, DryRunApi, SubmitErrorKind};
use crate::canvas::{CanvasState, PixelPlan, StaticCanvas};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, KernelConfig};
use crate::events::{EventBus, SwarmEvent};
use crate::ledger::{LedgerStats, PlacementLedger, Rejection};
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::zone::ZoneManager;

/// Task id of the housekeeping task that prunes expired claims.
pub const LEDGER_SWEEP_TASK_ID: &str = "ledger-sweep";

/// What one agent tick amounted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The agent had nothing to paint this tick.
    Idle,
    /// The plan was off-canvas or used a colour outside the palette.
    Dropped,
    Skipped(Rejection),
    Placed(PixelPlan),
    Failed(SubmitErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub delay_ms: u64,
}

/// State shared by every task of one coordinator.
struct Shared {
    zones: ZoneManager,
    canvas: Arc<dyn CanvasState>,
    api: Arc<dyn CanvasApi>,
    clock: Arc<dyn Clock>,
    ledger: PlacementLedger,
    events: EventBus,
}

struct AgentSlot {
    id: String,
    name: String,
    credentials: AgentCredentials,
    agent: Arc<Mutex<Box<dyn Agent>>>,
}

pub struct CoordinatorBuilder {
    config: KernelConfig,
    zones: ZoneManager,
    canvas: Option<Arc<dyn CanvasState>>,
    api: Option<Arc<dyn CanvasApi>>,
    clock: Option<Arc<dyn Clock>>,
    agents: Vec<Box<dyn Agent>>,
    ids: HashSet<String>,
}

impl std::fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut agents: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        agents.sort_unstable();
        f.debug_struct("CoordinatorBuilder")
            .field("config", &self.config)
            .field("zones", &self.zones.len())
            .field("agents", &agents)
            .finish_non_exhaustive()
    }
}

impl CoordinatorBuilder {
    pub fn new(config: KernelConfig, zones: ZoneManager) -> Self {
        Self {
            config,
            zones,
            canvas: None,
            api: None,
            clock: None,
            agents: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Source of hotspot and coldspot rankings. Defaults to an empty
    /// [`StaticCanvas`].
    pub fn canvas(mut self, canvas: Arc<dyn CanvasState>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    /// Defaults to [`DryRunApi`].
    pub fn api(mut self, api: Arc<dyn CanvasApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the agent for `config` via its type tag.
    pub fn add_agent(self, config: AgentConfig) -> Result<Self, ConfigError> {
        let agent = build_agent(config)?;
        self.add_custom_agent(agent)
    }

    /// Register an agent built outside the factory.
    pub fn add_custom_agent(mut self, agent: Box<dyn Agent>) -> Result<Self, ConfigError> {
        if !self.ids.insert(agent.id().to_string()) {
            return Err(ConfigError::DuplicateAgent(agent.id().to_string()));
        }
        self.agents.push(agent);
        Ok(self)
    }

    pub fn build(self) -> Coordinator {
        let shared = Shared {
            zones: self.zones,
            canvas: self
                .canvas
                .unwrap_or_else(|| Arc::new(StaticCanvas::default())),
            api: self.api.unwrap_or_else(|| Arc::new(DryRunApi::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            ledger: PlacementLedger::new(self.config.cooldown_ms, self.config.conflict_window_ms),
            events: EventBus::new(self.config.event_capacity),
        };

        let agents = self
            .agents
            .into_iter()
            .map(|agent| AgentSlot {
                id: agent.id().to_string(),
                name: agent.name().to_string(),
                credentials: agent.config().credentials(),
                agent: Arc::new(Mutex::new(agent)),
            })
            .collect();

        Coordinator {
            config: self.config,
            shared: Arc::new(shared),
            agents,
            scheduler: Scheduler::new(),
        }
    }
}

/// Owns the scheduler, the zone table and every registered agent.
pub struct Coordinator {
    config: KernelConfig,
    shared: Arc<Shared>,
    agents: Vec<AgentSlot>,
    scheduler: Scheduler,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("agents", &self.agent_ids())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Coordinator {
    /// Schedule every agent for an immediate first tick, plus the ledger
    /// sweep. Must be called from within a tokio runtime.
    pub fn start(&self) {
        info!(
            agents = self.agents.len(),
            zones = self.shared.zones.len(),
            cooldown_ms = self.config.cooldown_ms,
            conflict_window_ms = self.config.conflict_window_ms,
            "Coordinator starting"
        );

        let mut tasks: Vec<Box<dyn ScheduledTask>> = Vec::with_capacity(self.agents.len() + 1);
        for task in self.agent_tasks() {
            self.shared.events.emit(SwarmEvent::AgentStarted {
                agent_name: task.agent_name.clone(),
            });
            tasks.push(Box::new(task));
        }
        tasks.push(Box::new(LedgerSweepTask {
            shared: Arc::clone(&self.shared),
            interval_ms: self.config.ledger_sweep_interval_ms,
        }));

        self.scheduler.start(tasks);
    }

    /// Cancel every pending tick. Ticks already in flight finish normally.
    /// Cancel every timer. Ticks already in flight still finish and may
    /// report after `coordinator_stopped`; see [`shutdown`](Self::shutdown).
    pub fn stop(&self) {
        self.scheduler.stop_all();
        self.announce_stopped();
    }

    /// Cancel every timer and wait for in-flight ticks, so
    /// `coordinator_stopped` is the last event of the run.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.announce_stopped();
    }

    fn announce_stopped(&self) {
        self.shared.events.emit(SwarmEvent::CoordinatorStopped);
        info!(stats = ?self.ledger_stats(), "Coordinator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running() && !self.scheduler.active_tasks().is_empty()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SwarmEvent> {
        self.shared.events.subscribe()
    }

    /// One task per agent, in registration order.
    ///
    /// These are the tasks [`start`](Self::start) schedules; driving them
    /// directly runs the same policy without any timers.
    pub fn agent_tasks(&self) -> Vec<AgentTask> {
        self.agents
            .iter()
            .enumerate()
            .map(|(index, slot)| AgentTask {
                agent_id: slot.id.clone(),
                agent_name: slot.name.clone(),
                credentials: slot.credentials.clone(),
                agent: Arc::clone(&slot.agent),
                rng: agent_rng(self.config.seed, index),
                shared: Arc::clone(&self.shared),
            })
            .collect()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|slot| slot.id.clone()).collect()
    }

    pub fn zones(&self) -> &ZoneManager {
        &self.shared.zones
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        self.shared.ledger.stats()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

fn agent_rng(seed: Option<u64>, index: usize) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

/// The scheduled task behind one agent.
pub struct AgentTask {
    agent_id: String,
    agent_name: String,
    credentials: AgentCredentials,
    agent: Arc<Mutex<Box<dyn Agent>>>,
    rng: ChaCha8Rng,
    shared: Arc<Shared>,
}

impl AgentTask {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Run the agent once and settle its plan, if any.
    pub async fn tick(&mut self) -> anyhow::Result<TickReport> {
        let now_ms = self.shared.clock.now_ms();

        let (plan, delay_ms) = {
            let mut agent = match self.agent.lock() {
                Ok(agent) => agent,
                Err(_) => {
                    // Skip this tick; the next one resumes with the agent as the panic left it
                    self.agent.clear_poison();
                    anyhow::bail!("agent '{}' panicked during its previous tick", self.agent_id);
                }
            };
            let mut ctx = AgentContext::new(
                self.shared.canvas.as_ref(),
                &self.shared.zones,
                now_ms,
                &mut self.rng,
            );
            let plan = agent.next_pixel(&mut ctx);
            (plan, agent.next_delay_ms(&mut self.rng))
        };

        let outcome = match plan {
            None => TickOutcome::Idle,
            Some(plan) => self.settle(plan, now_ms).await,
        };
        Ok(TickReport { outcome, delay_ms })
    }

    async fn settle(&self, plan: PixelPlan, now_ms: u64) -> TickOutcome {
        if !plan.is_dispatchable() {
            debug!(
                agent = %self.agent_id,
                x = plan.x,
                y = plan.y,
                color = plan.color,
                "Dropping plan outside canvas or palette"
            );
            return TickOutcome::Dropped;
        }

        let reservation = match self.shared.ledger.reserve(&self.agent_id, plan.point(), now_ms) {
            Ok(reservation) => reservation,
            Err(rejection) => {
                self.shared.events.emit(SwarmEvent::PlacementSkipped {
                    agent_name: self.agent_name.clone(),
                    x: plan.x,
                    y: plan.y,
                    reason: rejection.to_string(),
                });
                return TickOutcome::Skipped(rejection);
            }
        };

        match self.shared.api.submit_pixel(&plan, &self.credentials).await {
            Ok(()) => {
                self.shared.ledger.confirm(reservation);
                debug!(
                    agent = %self.agent_id,
                    x = plan.x,
                    y = plan.y,
                    color = plan.color,
                    "Placement accepted"
                );
                self.shared.events.emit(SwarmEvent::PlacementAccepted {
                    agent_name: self.agent_name.clone(),
                    x: plan.x,
                    y: plan.y,
                    color: plan.color,
                    note: plan.note.clone(),
                });
                TickOutcome::Placed(plan)
            }
            Err(err) => {
                self.shared.ledger.rollback(reservation);
                if let Some(retry_after_ms) = err.retry_after_ms() {
                    let until_ms = self.shared.clock.now_ms().saturating_add(retry_after_ms);
                    self.shared.ledger.hold(&self.agent_id, until_ms);
                }
                warn!(
                    agent = %self.agent_id,
                    kind = %err.kind(),
                    error = %err,
                    "Pixel submission failed"
                );
                self.shared.events.emit(SwarmEvent::AgentError {
                    agent_name: self.agent_name.clone(),
                    error: err.to_string(),
                    kind: err.kind(),
                });
                TickOutcome::Failed(err.kind())
            }
        }
    }
}

#[async_trait]
impl ScheduledTask for AgentTask {
    fn id(&self) -> &str {
        &self.agent_id
    }

    fn name(&self) -> &str {
        &self.agent_name
    }

    async fn run(&mut self) -> anyhow::Result<u64> {
        Ok(self.tick().await?.delay_ms)
    }
}

/// Periodically drops ledger claims that can no longer conflict.
struct LedgerSweepTask {
    shared: Arc<Shared>,
    interval_ms: u64,
}

#[async_trait]
impl ScheduledTask for LedgerSweepTask {
    fn id(&self) -> &str {
        LEDGER_SWEEP_TASK_ID
    }

    async fn run(&mut self) -> anyhow::Result<u64> {
        let pruned = self.shared.ledger.prune(self.shared.clock.now_ms());
        if pruned > 0 {
            debug!(pruned, "Swept expired claims");
        }
        Ok(self.interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentKind, MinimalistZen};
    use crate::canvas::ZoneId;
    use crate::clock::ManualClock;
    use crate::zone::Zone;

    fn zen(id: &str) -> AgentConfig {
        AgentConfig {
            id: id.to_string(),
            name: format!("Zen {id}"),
            description: String::new(),
            kind: AgentKind::MinimalistZen.as_str().to_string(),
            colors: vec![0],
            min_delay_ms: 1_000,
            max_delay_ms: 1_000,
            preferred_zones: Vec::new(),
            api_key: None,
        }
    }

    fn whole_canvas() -> ZoneManager {
        ZoneManager::new(vec![Zone {
            id: ZoneId(1),
            name: "all".to_string(),
            x_start: 0,
            x_end: 499,
            y_start: 0,
            y_end: 499,
        }])
        .unwrap()
    }

    #[test]
    fn test_duplicate_agent_ids_rejected() {
        let err = CoordinatorBuilder::new(KernelConfig::default(), whole_canvas())
            .add_agent(zen("a"))
            .unwrap()
            .add_custom_agent(Box::new(MinimalistZen::new(zen("a"))))
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateAgent("a".to_string()));
    }

    #[test]
    fn test_builder_debug_lists_agents() {
        let builder = CoordinatorBuilder::new(KernelConfig::default(), whole_canvas())
            .add_agent(zen("b"))
            .unwrap()
            .add_agent(zen("a"))
            .unwrap();
        let rendered = format!("{builder:?}");
        assert!(rendered.contains(r#"agents: ["a", "b"]"#));
    }

    #[test]
    fn test_unknown_agent_type_rejected() {
        let mut config = zen("a");
        config.kind = "sculptor".to_string();
        let err = CoordinatorBuilder::new(KernelConfig::default(), whole_canvas())
            .add_agent(config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAgentType { .. }));
    }

    #[tokio::test]
    async fn test_tick_returns_agent_delay() {
        let clock = Arc::new(ManualClock::new(1_000));
        let coordinator = CoordinatorBuilder::new(KernelConfig::default(), whole_canvas())
            .clock(clock)
            .add_agent(zen("a"))
            .unwrap()
            .build();

        let mut tasks = coordinator.agent_tasks();
        let first = tasks[0].tick().await.unwrap();
        assert!(matches!(first.outcome, TickOutcome::Placed(_)));
        assert_eq!(first.delay_ms, 1_000);

        // Default cooldown rejects the second tick; the cadence is unchanged
        let second = tasks[0].tick().await.unwrap();
        assert!(matches!(
            second.outcome,
            TickOutcome::Skipped(Rejection::Cooldown { .. })
        ));
        assert_eq!(second.delay_ms, 1_000);
    }

    /// Zen that panics on its first `next_pixel`.
    struct Fragile {
        inner: MinimalistZen,
        armed: bool,
    }

    impl Agent for Fragile {
        fn config(&self) -> &AgentConfig {
            self.inner.config()
        }

        fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
            if std::mem::take(&mut self.armed) {
                panic!("brush snapped");
            }
            self.inner.next_pixel(ctx)
        }

        fn next_delay_ms(&mut self, rng: &mut dyn rand::RngCore) -> u64 {
            self.inner.next_delay_ms(rng)
        }
    }

    #[tokio::test]
    async fn test_agent_resumes_after_panic() {
        use futures::FutureExt;
        use std::panic::AssertUnwindSafe;

        let coordinator = CoordinatorBuilder::new(KernelConfig::default(), whole_canvas())
            .clock(Arc::new(ManualClock::new(0)))
            .add_custom_agent(Box::new(Fragile {
                inner: MinimalistZen::new(zen("a")),
                armed: true,
            }))
            .unwrap()
            .build();
        let mut tasks = coordinator.agent_tasks();

        let panicked = AssertUnwindSafe(tasks[0].tick()).catch_unwind().await;
        assert!(panicked.is_err());

        let poisoned = tasks[0].tick().await.unwrap_err();
        assert!(poisoned.to_string().contains("panicked"));

        let resumed = tasks[0].tick().await.unwrap();
        assert!(matches!(resumed.outcome, TickOutcome::Placed(_)));
    }

    #[tokio::test]
    async fn test_seeded_tasks_replay() {
        let config = KernelConfig {
            cooldown_ms: 0,
            conflict_window_ms: 0,
            seed: Some(42),
            ..KernelConfig::default()
        };
        let build = || {
            CoordinatorBuilder::new(config.clone(), whole_canvas())
                .clock(Arc::new(ManualClock::new(0)))
                .add_agent(zen("a"))
                .unwrap()
                .build()
        };

        let (one, two) = (build(), build());
        let (mut a, mut b) = (one.agent_tasks(), two.agent_tasks());
        for _ in 0..5 {
            assert_eq!(a[0].tick().await.unwrap(), b[0].tick().await.unwrap());
        }
    }
}
