//! Minimalist Zen: a single quiet pixel per tick in the emptiest zones.

use rand::RngCore;

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, ZoneBias};
use crate::canvas::PixelPlan;

pub struct MinimalistZen {
    core: AgentCore,
}

impl MinimalistZen {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            core: AgentCore::new(config),
        }
    }
}

impl Agent for MinimalistZen {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        let point = self.core.anchor(ctx, ZoneBias::Cold)?;
        if !point.in_bounds() {
            return None;
        }
        let color = super::pick_color(self.core.colors(), ctx.rng);
        Some(PixelPlan::new(point, color).with_note(format!("{}:dot", AgentKind::MinimalistZen)))
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{config, drive, quadrants};
    use crate::canvas::ZoneId;

    #[test]
    fn test_zen_paints_every_tick_in_coldspot() {
        let zones = quadrants();
        let mut agent = MinimalistZen::new(config(AgentKind::MinimalistZen));
        let plans = drive(&mut agent, 50, 12);
        assert!(plans.iter().all(Option::is_some));
        for plan in plans.into_iter().flatten() {
            assert_eq!(zones.zone_of(plan.point()).map(|z| z.id), Some(ZoneId(4)));
        }
    }
}
