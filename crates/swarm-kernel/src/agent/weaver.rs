//! Pattern Weaver: alternates a fine lattice with an L-shaped corner stroke.

use rand::{Rng, RngCore};

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue, ZoneBias};
use crate::canvas::{PixelPlan, Point};
use crate::pattern;

const FINE_SPACING: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weave {
    Lattice,
    Corner,
}

pub struct PatternWeaver {
    core: AgentCore,
    queue: PlanQueue,
    next_weave: Weave,
}

impl PatternWeaver {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
            next_weave: Weave::Lattice,
        }
    }

    fn compose(&mut self, ctx: &mut AgentContext<'_>) -> Option<(&'static str, Vec<Point>)> {
        let anchor = self.core.anchor(ctx, ZoneBias::Cold)?;
        let rng = &mut *ctx.rng;

        let weave = self.next_weave;
        self.next_weave = match weave {
            Weave::Lattice => Weave::Corner,
            Weave::Corner => Weave::Lattice,
        };

        match weave {
            Weave::Lattice => {
                let w = rng.random_range(6..=14);
                let h = rng.random_range(6..=14);
                Some((
                    "lattice",
                    pattern::grid(anchor.x, anchor.y, w, h, FINE_SPACING),
                ))
            }
            Weave::Corner => {
                let arm_x = rng.random_range(8..=30) * if rng.random_bool(0.5) { 1 } else { -1 };
                let arm_y = rng.random_range(8..=30) * if rng.random_bool(0.5) { 1 } else { -1 };
                let start = anchor.offset(-arm_x, 0);
                let end = anchor.offset(0, arm_y);
                Some(("corner", pattern::polyline(&[start, anchor, end])))
            }
        }
    }
}

impl Agent for PatternWeaver {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let (motif, points) = self.compose(ctx)?;
            self.queue.load(motif, points);
        }
        self.queue
            .next_plan(AgentKind::PatternWeaver.as_str(), self.core.colors(), ctx.rng)
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{config, drive};

    #[test]
    fn test_weaver_alternates_motifs() {
        let mut agent = PatternWeaver::new(config(AgentKind::PatternWeaver));
        let plans: Vec<PixelPlan> = drive(&mut agent, 400, 10).into_iter().flatten().collect();
        let mut labels: Vec<&str> = plans.iter().filter_map(|p| p.note.as_deref()).collect();
        labels.dedup();
        assert!(labels.len() >= 3);
        for pair in labels.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(labels[0], "pattern_weaver:lattice");
    }

    #[test]
    fn test_corner_is_two_axis_aligned_segments() {
        let mut agent = PatternWeaver::new(config(AgentKind::PatternWeaver));
        agent.next_weave = Weave::Corner;
        let plans: Vec<PixelPlan> = drive(&mut agent, 200, 6)
            .into_iter()
            .flatten()
            .take_while(|p| p.note.as_deref() == Some("pattern_weaver:corner"))
            .collect();
        assert!(plans.len() >= 2);
        for pair in plans.windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }
}
