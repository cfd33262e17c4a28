//! Chaos Crafter: long silences broken by short bursts of scattered pixels.
//!
//! Every [`BURST_INTERVAL_MS`] a window opens for [`BURST_LEN`] single-pixel
//! placements spaced 500 to 1100 ms apart. Between windows the agent sleeps
//! until the next one is due.

use std::ops::RangeInclusive;

use rand::{Rng, RngCore};
use tracing::debug;

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, ZoneBias};
use crate::canvas::PixelPlan;

/// Placements per burst window.
pub const BURST_LEN: u32 = 10;

/// Time between the openings of two burst windows.
pub const BURST_INTERVAL_MS: u64 = 5 * 60 * 1_000;

const BURST_SPACING_MS: RangeInclusive<u64> = 500..=1_100;

pub struct ChaosCrafter {
    core: AgentCore,
    /// When the next window opens; `None` until the first tick
    next_window_ms: Option<u64>,
    burst_left: u32,
    last_seen_ms: u64,
}

impl ChaosCrafter {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
            next_window_ms: None,
            burst_left: 0,
            last_seen_ms: 0,
        }
    }

    pub fn is_bursting(&self) -> bool {
        self.burst_left > 0
    }
}

impl Agent for ChaosCrafter {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        self.last_seen_ms = ctx.now_ms;

        if self.burst_left == 0 {
            let due = self.next_window_ms.map_or(true, |at| ctx.now_ms >= at);
            if !due {
                return None;
            }
            self.burst_left = BURST_LEN;
            self.next_window_ms = Some(ctx.now_ms + BURST_INTERVAL_MS);
            debug!(agent = %self.core.config().name, now_ms = ctx.now_ms, "Chaos burst window opened");
        }

        let bias = ZoneBias::random(ctx.rng);
        let point = self.core.anchor(ctx, bias)?;
        if !point.in_bounds() {
            return None;
        }
        self.burst_left -= 1;

        let color = super::pick_color(self.core.colors(), ctx.rng);
        Some(PixelPlan::new(point, color).with_note(format!("{}:burst", AgentKind::ChaosCrafter)))
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        if self.burst_left > 0 {
            return rng.random_range(BURST_SPACING_MS);
        }
        let min = self.core.min_delay_ms();
        match self.next_window_ms {
            Some(at) => at.saturating_sub(self.last_seen_ms).max(min),
            None => min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{canvas, config, quadrants};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Tick the agent at the times it asks for, returning (time, produced) pairs.
    fn follow_cadence(agent: &mut ChaosCrafter, until_ms: u64) -> Vec<(u64, bool)> {
        let zones = quadrants();
        let canvas = canvas();
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let mut now = 0;
        let mut log = Vec::new();
        while now < until_ms {
            let mut ctx = AgentContext::new(&canvas, &zones, now, &mut rng);
            let produced = agent.next_pixel(&mut ctx).is_some();
            log.push((now, produced));
            now += agent.next_delay_ms(&mut rng);
        }
        log
    }

    #[test]
    fn test_first_burst_fires_immediately_then_sleeps() {
        let mut agent = ChaosCrafter::new(config(AgentKind::ChaosCrafter));
        let log = follow_cadence(&mut agent, BURST_INTERVAL_MS - 1);

        let placed: Vec<u64> = log.iter().filter(|(_, p)| *p).map(|(t, _)| *t).collect();
        assert_eq!(placed.len(), BURST_LEN as usize);
        for pair in placed.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((500..=1_100).contains(&gap));
        }
        // After the burst the agent asks to sleep until the next window
        assert_eq!(log.len(), BURST_LEN as usize);
    }

    #[test]
    fn test_bursts_repeat_every_interval() {
        let mut agent = ChaosCrafter::new(config(AgentKind::ChaosCrafter));
        let log = follow_cadence(&mut agent, 3 * BURST_INTERVAL_MS - 1);
        let placed = log.iter().filter(|(_, p)| *p).count();
        assert_eq!(placed, 3 * BURST_LEN as usize);
        assert!(log.iter().any(|(t, p)| *p && *t == BURST_INTERVAL_MS));
    }

    #[test]
    fn test_idle_delay_bounded_below_by_min_delay() {
        let mut cfg = config(AgentKind::ChaosCrafter);
        cfg.min_delay_ms = 2_000;
        let mut agent = ChaosCrafter::new(cfg);
        agent.next_window_ms = Some(10_500);
        agent.last_seen_ms = 10_000;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(agent.next_delay_ms(&mut rng), 2_000);
        agent.last_seen_ms = 0;
        assert_eq!(agent.next_delay_ms(&mut rng), 10_500);
    }

    #[test]
    fn test_idle_tick_produces_nothing() {
        let mut agent = ChaosCrafter::new(config(AgentKind::ChaosCrafter));
        agent.next_window_ms = Some(60_000);
        let zones = quadrants();
        let canvas = canvas();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut ctx = AgentContext::new(&canvas, &zones, 1_000, &mut rng);
        assert!(agent.next_pixel(&mut ctx).is_none());
        assert!(!agent.is_bursting());
    }
}
