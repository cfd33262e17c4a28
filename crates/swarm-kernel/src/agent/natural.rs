//! Natural Code: double helices built from two phase-opposed sine traces.

use std::f64::consts::PI;

use rand::{Rng, RngCore};

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue, ZoneBias};
use crate::canvas::{PixelPlan, Point};
use crate::pattern;

pub struct NaturalCodeAgent {
    core: AgentCore,
    queue: PlanQueue,
}

impl NaturalCodeAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
        }
    }

    fn compose(&self, ctx: &mut AgentContext<'_>) -> Option<Vec<Point>> {
        let anchor = self.core.anchor(ctx, ZoneBias::Cold)?;
        let rng = &mut *ctx.rng;

        let length = rng.random_range(40..=100);
        let amplitude = rng.random_range(4.0..12.0);
        let frequency = rng.random_range(0.08..0.25);
        Some(double_helix(anchor.x - length / 2, anchor.y, length, amplitude, frequency))
    }
}

/// Two strands sharing the same x progression, interleaved column by column.
fn double_helix(x0: i32, y_center: i32, length: i32, amplitude: f64, frequency: f64) -> Vec<Point> {
    let strand_a = pattern::sine_wave_phased(x0, y_center, length, amplitude, frequency, 0.0);
    let strand_b = pattern::sine_wave_phased(x0, y_center, length, amplitude, frequency, PI);
    strand_a
        .into_iter()
        .zip(strand_b)
        .flat_map(|(a, b)| [a, b])
        .collect()
}

impl Agent for NaturalCodeAgent {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let helix = self.compose(ctx)?;
            self.queue.load("helix", helix);
        }
        self.queue
            .next_plan(AgentKind::NaturalCode.as_str(), self.core.colors(), ctx.rng)
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
    fn test_helix_strands_share_columns() {
        let helix = double_helix(100, 200, 30, 8.0, 0.2);
        assert_eq!(helix.len(), 62);
        for pair in helix.chunks(2) {
            assert_eq!(pair[0].x, pair[1].x);
            // Opposed phases mirror around the centre line
            assert!((pair[0].y - 200 + pair[1].y - 200).abs() <= 1);
        }
    }

    #[test]
    fn test_natural_code_notes() {
        let mut agent = NaturalCodeAgent::new(config(AgentKind::NaturalCode));
        let plans: Vec<PixelPlan> = drive(&mut agent, 50, 9).into_iter().flatten().collect();
        assert!(!plans.is_empty());
        assert!(plans.iter().all(|p| p.note.as_deref() == Some("natural_code:helix")));
    }
}
