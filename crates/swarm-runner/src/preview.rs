//! Offline preview: drive one agent without a scheduler or canvas API.
//!
//! Time is simulated: each step advances the clock by the delay the agent
//! asked for. Every plan the agent produces is fed back into an activity
//! map, so hot- and cold-biased personalities react to their own output the
//! way they would on a live canvas.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use swarm_kernel::{
    build_agent, ActivityConfig, ActivityMap, AgentConfig, AgentContext, ConfigError, PixelPlan,
    ZoneManager,
};

#[derive(Debug, Clone, Serialize)]
pub struct PreviewStep {
    pub tick: usize,
    pub at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PixelPlan>,
    pub next_delay_ms: u64,
}

pub fn preview_agent(
    config: AgentConfig,
    zones: ZoneManager,
    activity: ActivityConfig,
    ticks: usize,
    seed: u64,
) -> Result<Vec<PreviewStep>, ConfigError> {
    let mut agent = build_agent(config)?;
    let canvas = ActivityMap::new(zones.clone(), activity);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut now_ms = 0;
    let mut steps = Vec::with_capacity(ticks);
    for tick in 0..ticks {
        let plan = {
            let mut ctx = AgentContext::new(&canvas, &zones, now_ms, &mut rng);
            agent.next_pixel(&mut ctx)
        };
        if let Some(plan) = plan.as_ref().filter(|p| p.is_dispatchable()) {
            canvas.record(plan.point(), now_ms);
        }
        let next_delay_ms = agent.next_delay_ms(&mut rng);

        steps.push(PreviewStep {
            tick,
            at_ms: now_ms,
            plan,
            next_delay_ms,
        });
        now_ms += next_delay_ms;
    }
    Ok(steps)
}
