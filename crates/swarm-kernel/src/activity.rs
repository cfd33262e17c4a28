//! ActivityMap: a canvas-state ranking built from observed placements.
//!
//! Each zone accumulates heat when a placement lands in it; heat decays
//! exponentially with a configurable half-life, so hotspots follow recent
//! activity rather than all-time totals.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use crate::canvas::{CanvasState, Point, ZoneId};
use crate::zone::ZoneManager;

/// Heat below this counts as no recent activity.
const HEAT_FLOOR: f64 = 1e-3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Time for a zone's heat to halve (milliseconds)
    pub half_life_ms: u64,

    /// Zones reported as hotspots (and as coldspots)
    pub rank_limit: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            half_life_ms: 600_000,
            rank_limit: 3,
        }
    }
}

/// Apply exponential decay with the given half-life.
pub fn half_life_decay(value: &mut f64, dt_ms: u64, half_life_ms: u64) {
    if half_life_ms == 0 {
        return;
    }
    let lambda = std::f64::consts::LN_2 / half_life_ms as f64;
    *value *= (-lambda * dt_ms as f64).exp();
}

#[derive(Debug)]
struct HeatState {
    heat: Vec<f64>,
    updated_ms: u64,
}

impl HeatState {
    fn decay_to(&mut self, now_ms: u64, half_life_ms: u64) {
        let dt_ms = now_ms.saturating_sub(self.updated_ms);
        if dt_ms == 0 {
            return;
        }
        for heat in &mut self.heat {
            half_life_decay(heat, dt_ms, half_life_ms);
        }
        self.updated_ms = now_ms;
    }
}

#[derive(Debug)]
pub struct ActivityMap {
    ids: Vec<ZoneId>,
    zones: ZoneManager,
    config: ActivityConfig,
    state: Mutex<HeatState>,
}

impl ActivityMap {
    pub fn new(zones: ZoneManager, config: ActivityConfig) -> Self {
        let ids = zones.ids();
        let state = HeatState {
            heat: vec![0.0; ids.len()],
            updated_ms: 0,
        };
        Self {
            ids,
            zones,
            config,
            state: Mutex::new(state),
        }
    }

    /// Attribute one placement to the zone containing `point`.
    ///
    /// Returns the zone, or `None` for points outside every zone.
    pub fn record(&self, point: Point, now_ms: u64) -> Option<ZoneId> {
        let zone = self.zones.zone_of(point)?.id;
        let index = self.ids.iter().position(|id| *id == zone)?;

        let mut state = self.lock();
        state.decay_to(now_ms, self.config.half_life_ms);
        state.heat[index] += 1.0;
        Some(zone)
    }

    /// Age every zone's heat to `now_ms` without recording anything.
    pub fn decay_to(&self, now_ms: u64) {
        self.lock().decay_to(now_ms, self.config.half_life_ms);
    }

    pub fn heat(&self, zone: ZoneId) -> f64 {
        self.ids
            .iter()
            .position(|id| *id == zone)
            .map_or(0.0, |index| self.lock().heat[index])
    }

    /// Zones in ascending heat order, ties in declaration order.
    fn ranked(&self) -> Vec<(ZoneId, f64)> {
        let state = self.lock();
        let mut ranked: Vec<(ZoneId, f64)> =
            self.ids.iter().copied().zip(state.heat.iter().copied()).collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }

    fn lock(&self) -> MutexGuard<'_, HeatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hottest zones first, at most `limit`, skipping zones without recent heat.
fn hottest(ranked: &[(ZoneId, f64)], limit: usize) -> Vec<ZoneId> {
    let mut ranked = ranked.to_vec();
    // Stable sort keeps declaration order among equal heat
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .filter(|(_, heat)| *heat > HEAT_FLOOR)
        .take(limit)
        .map(|(id, _)| id)
        .collect()
}

impl CanvasState for ActivityMap {
    fn hotspots(&self) -> Vec<ZoneId> {
        hottest(&self.ranked(), self.config.rank_limit)
    }

    /// Coolest zones first. A zone already reported hot is never cold.
    fn coldspots(&self) -> Vec<ZoneId> {
        let ranked = self.ranked();
        let hot = hottest(&ranked, self.config.rank_limit);
        ranked
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| !hot.contains(id))
            .take(self.config.rank_limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Zone;

    fn strip(id: u32) -> Zone {
        let x = id as i32 * 100;
        Zone {
            id: ZoneId(id),
            name: format!("strip {id}"),
            x_start: x,
            x_end: x + 99,
            y_start: 0,
            y_end: 499,
        }
    }

    fn map(rank_limit: usize) -> ActivityMap {
        let zones = ZoneManager::new((0..5).map(strip).collect()).unwrap();
        ActivityMap::new(
            zones,
            ActivityConfig {
                half_life_ms: 60_000,
                rank_limit,
            },
        )
    }

    #[test]
    fn test_half_life_decay() {
        let mut value = 1.0;
        half_life_decay(&mut value, 600_000, 600_000);
        assert!((value - 0.5).abs() < 1e-9);

        let mut frozen = 1.0;
        half_life_decay(&mut frozen, 600_000, 0);
        assert_eq!(frozen, 1.0);
    }

    #[test]
    fn test_untouched_canvas_has_no_hotspots() {
        let activity = map(2);
        assert!(activity.hotspots().is_empty());
        assert_eq!(activity.coldspots(), vec![ZoneId(0), ZoneId(1)]);
    }

    #[test]
    fn test_busiest_zones_rank_first() {
        let activity = map(2);
        for _ in 0..3 {
            activity.record(Point::new(350, 10), 1_000);
        }
        activity.record(Point::new(150, 10), 1_000);
        activity.record(Point::new(450, 10), 1_000);

        assert_eq!(activity.hotspots(), vec![ZoneId(3), ZoneId(1)]);
        assert_eq!(activity.coldspots(), vec![ZoneId(0), ZoneId(2)]);
    }

    #[test]
    fn test_small_zone_table_never_ranks_a_zone_both_ways() {
        let zones = ZoneManager::new((1..=4).map(strip).collect()).unwrap();
        let activity = ActivityMap::new(zones, ActivityConfig::default());
        for (x, count) in [(150, 50), (250, 40), (350, 1)] {
            for _ in 0..count {
                activity.record(Point::new(x, 10), 1_000);
            }
        }

        let hot = activity.hotspots();
        let cold = activity.coldspots();
        assert_eq!(hot, vec![ZoneId(1), ZoneId(2), ZoneId(3)]);
        assert_eq!(cold, vec![ZoneId(4)]);
        assert!(cold.iter().all(|id| !hot.contains(id)));
    }

    #[test]
    fn test_heat_decays_with_half_life() {
        let activity = map(5);
        activity.record(Point::new(10, 10), 0);
        activity.decay_to(60_000);
        assert!((activity.heat(ZoneId(0)) - 0.5).abs() < 1e-9);

        // A fresh placement outweighs a stale one
        activity.record(Point::new(110, 10), 120_000);
        assert_eq!(activity.hotspots()[0], ZoneId(1));
    }

    #[test]
    fn test_points_outside_zones_are_ignored() {
        let activity = map(5);
        assert_eq!(activity.record(Point::new(-1, 0), 0), None);
        assert!(activity.hotspots().is_empty());
    }
}
