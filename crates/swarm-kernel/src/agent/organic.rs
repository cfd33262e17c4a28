//! Organic Flow: sine waves and wandering flow-field strokes in quiet zones.

use rand::{Rng, RngCore};

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue, ZoneBias};
use crate::canvas::{PixelPlan, Point};
use crate::pattern;

pub struct OrganicFlowAgent {
    core: AgentCore,
    queue: PlanQueue,
}

impl OrganicFlowAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
        }
    }

    fn compose(&self, ctx: &mut AgentContext<'_>) -> Option<(&'static str, Vec<Point>)> {
        let anchor = self.core.anchor(ctx, ZoneBias::Cold)?;
        let rng = &mut *ctx.rng;

        if rng.random_bool(0.5) {
            let length = rng.random_range(30..=80);
            let amplitude = rng.random_range(3.0..15.0);
            let frequency = rng.random_range(0.05..0.3);
            Some((
                "sine",
                pattern::sine_wave(anchor.x - length / 2, anchor.y, length, amplitude, frequency),
            ))
        } else {
            let steps = rng.random_range(30..=80);
            let angle_step = rng.random_range(0.2..0.8);
            Some((
                "flow",
                pattern::flow_field(anchor.x, anchor.y, steps, angle_step, rng),
            ))
        }
    }
}

impl Agent for OrganicFlowAgent {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let (motif, points) = self.compose(ctx)?;
            self.queue.load(motif, points);
        }
        self.queue
            .next_plan(AgentKind::OrganicFlow.as_str(), self.core.colors(), ctx.rng)
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}
