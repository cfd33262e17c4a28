//! Retro Bot: rectangle wireframes, one side at a time.

use rand::{Rng, RngCore};

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue, ZoneBias};
use crate::canvas::{PixelPlan, Point};
use crate::pattern;

pub struct RetroBot {
    core: AgentCore,
    queue: PlanQueue,
}

impl RetroBot {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
        }
    }

    fn compose(&self, ctx: &mut AgentContext<'_>) -> Option<Vec<Point>> {
        let corner = self.core.anchor(ctx, ZoneBias::Hot)?;
        let w = ctx.rng.random_range(10..=50);
        let h = ctx.rng.random_range(10..=40);
        Some(wireframe(corner, w, h))
    }
}

/// Four sides of the `w × h` rectangle with top-left `corner`, clockwise.
fn wireframe(corner: Point, w: i32, h: i32) -> Vec<Point> {
    let top_right = corner.offset(w, 0);
    let bottom_right = corner.offset(w, h);
    let bottom_left = corner.offset(0, h);
    let mut outline = pattern::polyline(&[corner, top_right, bottom_right, bottom_left, corner]);
    // The last side ends where the first began
    outline.pop();
    outline
}

impl Agent for RetroBot {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let outline = self.compose(ctx)?;
            self.queue.load("wireframe", outline);
        }
        self.queue
            .next_plan(AgentKind::RetroBot.as_str(), self.core.colors(), ctx.rng)
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}
