//! Zones: named rectangles that partition the canvas for spatial arbitration.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::canvas::{Point, ZoneId};
use crate::config::ConfigError;

/// Axis-aligned rectangle with inclusive bounds on both axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub x_start: i32,
    pub x_end: i32,
    pub y_start: i32,
    pub y_end: i32,
}

impl Zone {
    pub fn contains(&self, point: Point) -> bool {
        (self.x_start..=self.x_end).contains(&point.x)
            && (self.y_start..=self.y_end).contains(&point.y)
    }

    pub fn width(&self) -> i32 {
        self.x_end - self.x_start + 1
    }

    pub fn height(&self) -> i32 {
        self.y_end - self.y_start + 1
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x_start + (self.x_end - self.x_start) / 2,
            self.y_start + (self.y_end - self.y_start) / 2,
        )
    }

    fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            rng.random_range(self.x_start..=self.x_end),
            rng.random_range(self.y_start..=self.y_end),
        )
    }
}

/// Immutable zone table, in declaration order.
///
/// Declaration order doubles as priority: when zones overlap, [`zone_of`]
/// answers with the first one declared.
///
/// [`zone_of`]: ZoneManager::zone_of
#[derive(Debug, Clone)]
pub struct ZoneManager {
    zones: Vec<Zone>,
}

impl ZoneManager {
    pub fn new(zones: Vec<Zone>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for zone in &zones {
            if zone.x_start > zone.x_end {
                return Err(ConfigError::InvertedZone {
                    id: zone.id,
                    axis: "x",
                });
            }
            if zone.y_start > zone.y_end {
                return Err(ConfigError::InvertedZone {
                    id: zone.id,
                    axis: "y",
                });
            }
            if !seen.insert(zone.id) {
                return Err(ConfigError::DuplicateZone(zone.id));
            }
        }
        Ok(Self { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn ids(&self) -> Vec<ZoneId> {
        self.zones.iter().map(|z| z.id).collect()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First zone, in declaration order, whose rectangle contains the point.
    pub fn zone_of(&self, point: Point) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(point))
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Uniform integer point within the zone's inclusive bounds.
    pub fn random_point_in<R: Rng + ?Sized>(&self, id: ZoneId, rng: &mut R) -> Option<Point> {
        self.zone(id).map(|zone| zone.random_point(rng))
    }

    /// Uniform zone, then a uniform point inside it.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Point> {
        self.zones.choose(rng).map(|zone| zone.random_point(rng))
    }

    /// Three-tier zone choice: uniform over `preferred` if non-empty, else
    /// over `fallback` if non-empty, else over every zone.
    ///
    /// Returns `None` only when no zones are loaded.
    pub fn pick_zone<R: Rng + ?Sized>(
        &self,
        preferred: &[ZoneId],
        fallback: &[ZoneId],
        rng: &mut R,
    ) -> Option<ZoneId> {
        if let Some(id) = preferred.choose(rng) {
            return Some(*id);
        }
        if let Some(id) = fallback.choose(rng) {
            return Some(*id);
        }
        self.zones.choose(rng).map(|z| z.id)
    }
}
