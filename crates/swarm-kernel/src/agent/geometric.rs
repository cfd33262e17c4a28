//! Geometric: circles, spirals, lines and grids anchored on busy zones.

use rand::{Rng, RngCore};

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue, ZoneBias};
use crate::canvas::{PixelPlan, Point};
use crate::pattern;

pub struct GeometricAgent {
    core: AgentCore,
    queue: PlanQueue,
}

impl GeometricAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
        }
    }

    fn compose(&self, ctx: &mut AgentContext<'_>) -> Option<(&'static str, Vec<Point>)> {
        let anchor = self.core.anchor(ctx, ZoneBias::Hot)?;
        let rng = &mut *ctx.rng;

        let motif = match rng.random_range(0..4) {
            0 => {
                let r = rng.random_range(5..=30);
                ("circle", pattern::circle(anchor.x, anchor.y, r))
            }
            1 => {
                let turns = rng.random_range(2.0..4.0);
                let step = rng.random_range(3.0..6.0);
                ("spiral", pattern::spiral(anchor.x, anchor.y, turns, step))
            }
            2 => {
                let dx = rng.random_range(-40..=40);
                let dy = rng.random_range(-40..=40);
                (
                    "line",
                    pattern::line(anchor.x, anchor.y, anchor.x + dx, anchor.y + dy),
                )
            }
            _ => {
                let w = rng.random_range(10..=40);
                let h = rng.random_range(10..=40);
                let spacing = rng.random_range(3..=6);
                ("grid", pattern::grid(anchor.x, anchor.y, w, h, spacing))
            }
        };
        Some(motif)
    }
}

impl Agent for GeometricAgent {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let (motif, points) = self.compose(ctx)?;
            self.queue.load(motif, points);
        }
        self.queue
            .next_plan(AgentKind::Geometric.as_str(), self.core.colors(), ctx.rng)
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}
