//! Quantum Painter: scatters of pre-coloured pixels around a centre.
//!
//! Each pixel in a scatter independently takes the base colour (70%) or its
//! harmonic complement (30%).

use rand::{Rng, RngCore};

use super::{
    complement, pick_color, Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue,
    ZoneBias,
};
use crate::canvas::{PixelPlan, Point};

const BASE_COLOR_PROBABILITY: f64 = 0.7;

pub struct QuantumPainter {
    core: AgentCore,
    queue: PlanQueue,
}

impl QuantumPainter {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
        }
    }

    fn compose(&self, ctx: &mut AgentContext<'_>) -> Option<Vec<(Point, u8)>> {
        let bias = ZoneBias::random(ctx.rng);
        let center = self.core.anchor(ctx, bias)?;
        let rng = &mut *ctx.rng;

        let half = rng.random_range(10..=25);
        let count = rng.random_range(8..=20);
        let base = pick_color(self.core.colors(), rng);

        let batch = (0..count)
            .map(|_| {
                let point = center.offset(rng.random_range(-half..=half), rng.random_range(-half..=half));
                let color = if rng.random_bool(BASE_COLOR_PROBABILITY) {
                    base
                } else {
                    complement(base)
                };
                (point, color)
            })
            .collect();
        Some(batch)
    }
}

impl Agent for QuantumPainter {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let batch = self.compose(ctx)?;
            self.queue.load_colored("scatter", batch);
        }
        self.queue
            .next_plan(AgentKind::QuantumPainter.as_str(), self.core.colors(), ctx.rng)
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}
