//! Canvas coordinate model: points, placement plans, and the read-only
//! canvas-state statistics agents consult when choosing where to paint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width and height of the shared canvas, in pixels.
pub const CANVAS_SIZE: i32 = 500;

/// Number of colours in the canvas palette. Valid colours are `0..PALETTE_SIZE`.
pub const PALETTE_SIZE: u8 = 16;

/// Identifier of a zone, as declared in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone-{}", self.0)
    }
}

/// A canvas-space coordinate.
///
/// Coordinates may be negative or beyond the canvas while a motif is being
/// generated; they are filtered (never clamped or wrapped) before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether the point lies inside `[0, CANVAS_SIZE)` on both axes.
    pub fn in_bounds(&self) -> bool {
        (0..CANVAS_SIZE).contains(&self.x) && (0..CANVAS_SIZE).contains(&self.y)
    }

    /// Translate by an offset.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// One proposed placement, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPlan {
    pub x: i32,
    pub y: i32,
    pub color: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PixelPlan {
    pub fn new(point: Point, color: u8) -> Self {
        Self {
            x: point.x,
            y: point.y,
            color,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// A plan may only reach the canvas API when it is in bounds and uses a
    /// palette colour.
    pub fn is_dispatchable(&self) -> bool {
        self.point().in_bounds() && self.color < PALETTE_SIZE
    }
}

/// Read-only view of recent placement density on the canvas.
///
/// Both lists are ranked: hotspots from busiest down, coldspots from
/// emptiest up. This core only reads them as a heuristic input.
pub trait CanvasState: Send + Sync {
    fn hotspots(&self) -> Vec<ZoneId>;

    fn coldspots(&self) -> Vec<ZoneId>;
}

/// Canvas state with fixed rankings. Useful for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCanvas {
    pub hotspots: Vec<ZoneId>,
    pub coldspots: Vec<ZoneId>,
}

impl StaticCanvas {
    pub fn new(hotspots: Vec<ZoneId>, coldspots: Vec<ZoneId>) -> Self {
        Self {
            hotspots,
            coldspots,
        }
    }
}

impl CanvasState for StaticCanvas {
    fn hotspots(&self) -> Vec<ZoneId> {
        self.hotspots.clone()
    }

    fn coldspots(&self) -> Vec<ZoneId> {
        self.coldspots.clone()
    }
}
