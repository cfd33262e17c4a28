//! Painting agents: the per-tick decision of what to paint where.
//!
//! Every personality implements the same two-operation contract
//! ([`Agent::next_pixel`] and [`Agent::next_delay_ms`]). Agents keep their
//! own state across ticks (motif queues, burst counters); the context handed
//! to them each tick is read-only apart from the random source.
//!
//! ```text
//! tick ──► next_pixel(ctx)
//!            ├─ queue non-empty? ──► pop next visible point
//!            └─ queue empty ──► anchor = pick_zone(hot/cold bias) ──► compose motif ──► load queue
//!      ──► next_delay_ms() ──► scheduler re-arms
//! ```

mod chaos;
mod geometric;
mod natural;
mod organic;
mod quantum;
mod retro;
mod sprite;
mod weaver;
mod zen;

use std::collections::{HashSet, VecDeque};
use std::fmt;

use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::api::AgentCredentials;
use crate::canvas::{CanvasState, PixelPlan, Point, ZoneId, PALETTE_SIZE};
use crate::config::ConfigError;
use crate::zone::ZoneManager;

pub use chaos::{ChaosCrafter, BURST_INTERVAL_MS, BURST_LEN};
pub use geometric::GeometricAgent;
pub use natural::NaturalCodeAgent;
pub use organic::OrganicFlowAgent;
pub use quantum::QuantumPainter;
pub use retro::RetroBot;
pub use sprite::SpriteAgent;
pub use weaver::PatternWeaver;
pub use zen::MinimalistZen;

/// Static personality of one agent, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Personality tag, e.g. `geometric` or `chaos_crafter`
    #[serde(rename = "type")]
    pub kind: String,
    pub colors: Vec<u8>,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Zones this agent favours, in priority order
    #[serde(default)]
    pub preferred_zones: Vec<ZoneId>,
    /// Credential forwarded to the canvas API
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.colors.is_empty() {
            return Err(ConfigError::EmptyPalette(self.id.clone()));
        }
        if let Some(&color) = self.colors.iter().find(|c| **c >= PALETTE_SIZE) {
            return Err(ConfigError::ColorOutOfRange {
                agent: self.id.clone(),
                color,
            });
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvertedDelay {
                agent: self.id.clone(),
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }

    pub fn credentials(&self) -> AgentCredentials {
        AgentCredentials {
            agent_id: self.id.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

/// The closed set of personalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Geometric,
    OrganicFlow,
    PixelPunk,
    MemeLord,
    MinimalistZen,
    ChaosCrafter,
    PatternWeaver,
    QuantumPainter,
    RetroBot,
    NaturalCode,
}

impl AgentKind {
    pub const ALL: [AgentKind; 10] = [
        Self::Geometric,
        Self::OrganicFlow,
        Self::PixelPunk,
        Self::MemeLord,
        Self::MinimalistZen,
        Self::ChaosCrafter,
        Self::PatternWeaver,
        Self::QuantumPainter,
        Self::RetroBot,
        Self::NaturalCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometric => "geometric",
            Self::OrganicFlow => "organic_flow",
            Self::PixelPunk => "pixel_punk",
            Self::MemeLord => "meme_lord",
            Self::MinimalistZen => "minimalist_zen",
            Self::ChaosCrafter => "chaos_crafter",
            Self::PatternWeaver => "pattern_weaver",
            Self::QuantumPainter => "quantum_painter",
            Self::RetroBot => "retro_bot",
            Self::NaturalCode => "natural_code",
        }
    }

    /// Parse a configuration tag. Case-insensitive; `-` and `_` are interchangeable.
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an agent may consult during one tick.
pub struct AgentContext<'a> {
    pub canvas: &'a dyn CanvasState,
    pub zones: &'a ZoneManager,
    pub now_ms: u64,
    pub rng: &'a mut dyn RngCore,
}

impl<'a> AgentContext<'a> {
    pub fn new(
        canvas: &'a dyn CanvasState,
        zones: &'a ZoneManager,
        now_ms: u64,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            canvas,
            zones,
            now_ms,
            rng,
        }
    }
}

/// The capability contract every personality implements.
pub trait Agent: Send {
    fn config(&self) -> &AgentConfig;

    fn id(&self) -> &str {
        &self.config().id
    }

    fn name(&self) -> &str {
        &self.config().name
    }

    /// Next placement to attempt, or `None` when nothing is ready this tick.
    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan>;

    /// Wait before the next invocation, normally within the configured bounds.
    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64;
}

/// Build the agent for a configuration entry.
///
/// Unknown type tags and invalid personalities fail here, at startup.
pub fn build_agent(config: AgentConfig) -> Result<Box<dyn Agent>, ConfigError> {
    config.validate()?;
    let kind = AgentKind::parse(&config.kind).ok_or_else(|| ConfigError::UnknownAgentType {
        agent: config.id.clone(),
        kind: config.kind.clone(),
    })?;

    let agent: Box<dyn Agent> = match kind {
        AgentKind::Geometric => Box::new(GeometricAgent::new(config)),
        AgentKind::OrganicFlow => Box::new(OrganicFlowAgent::new(config)),
        AgentKind::PixelPunk => Box::new(SpriteAgent::pixel_punk(config)),
        AgentKind::MemeLord => Box::new(SpriteAgent::meme_lord(config)),
        AgentKind::MinimalistZen => Box::new(MinimalistZen::new(config)),
        AgentKind::ChaosCrafter => Box::new(ChaosCrafter::new(config)),
        AgentKind::PatternWeaver => Box::new(PatternWeaver::new(config)),
        AgentKind::QuantumPainter => Box::new(QuantumPainter::new(config)),
        AgentKind::RetroBot => Box::new(RetroBot::new(config)),
        AgentKind::NaturalCode => Box::new(NaturalCodeAgent::new(config)),
    };
    Ok(agent)
}

/// Whether a personality reinforces busy regions or fills neglected ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneBias {
    Hot,
    Cold,
}

impl ZoneBias {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Self::Hot
        } else {
            Self::Cold
        }
    }
}

/// Shared zone-selection heuristic.
///
/// The biased ranking is the preferred tier and the opposite ranking the
/// fallback. Agents with their own preferred zones narrow both tiers to the
/// overlap; a fallback overlap that comes up empty widens back to the whole
/// opposite ranking.
pub fn choose_anchor(
    ctx: &mut AgentContext<'_>,
    preferred_zones: &[ZoneId],
    bias: ZoneBias,
) -> Option<Point> {
    let hot = ctx.canvas.hotspots();
    let cold = ctx.canvas.coldspots();
    let (primary, secondary) = match bias {
        ZoneBias::Hot => (hot, cold),
        ZoneBias::Cold => (cold, hot),
    };

    let (preferred, fallback) = if preferred_zones.is_empty() {
        (primary, secondary)
    } else {
        let mine: HashSet<ZoneId> = preferred_zones.iter().copied().collect();
        let overlap: Vec<ZoneId> = primary.into_iter().filter(|id| mine.contains(id)).collect();
        let mut fallback: Vec<ZoneId> =
            secondary.iter().copied().filter(|id| mine.contains(id)).collect();
        if fallback.is_empty() {
            fallback = secondary;
        }
        (overlap, fallback)
    };

    ctx.zones
        .pick_zone(&preferred, &fallback, ctx.rng)
        .and_then(|id| ctx.zones.random_point_in(id, ctx.rng))
        .or_else(|| ctx.zones.random_point(ctx.rng))
}

/// Uniform pick from the agent's palette.
pub fn pick_color<R: Rng + ?Sized>(colors: &[u8], rng: &mut R) -> u8 {
    colors.choose(rng).copied().unwrap_or(0)
}

/// Harmonic complement: the colour half a palette away.
pub fn complement(color: u8) -> u8 {
    (color + PALETTE_SIZE / 2) % PALETTE_SIZE
}

/// Uniform delay in `[min_ms, max_ms]`.
pub fn random_delay<R: Rng + ?Sized>(min_ms: u64, max_ms: u64, rng: &mut R) -> u64 {
    if min_ms >= max_ms {
        min_ms
    } else {
        rng.random_range(min_ms..=max_ms)
    }
}

/// Fields every personality carries, plus the helpers built on them.
#[derive(Debug, Clone)]
pub struct AgentCore {
    config: AgentConfig,
}

impl AgentCore {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn min_delay_ms(&self) -> u64 {
        self.config.min_delay_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.config.max_delay_ms
    }

    pub fn colors(&self) -> &[u8] {
        &self.config.colors
    }

    pub fn anchor(&self, ctx: &mut AgentContext<'_>, bias: ZoneBias) -> Option<Point> {
        choose_anchor(ctx, &self.config.preferred_zones, bias)
    }

    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        random_delay(self.config.min_delay_ms, self.config.max_delay_ms, rng)
    }
}

#[derive(Debug, Clone, Copy)]
struct QueuedPixel {
    point: Point,
    color: Option<u8>,
}

/// FIFO of motif points, drained one per tick.
///
/// Off-canvas points are discarded while draining, never up front, so a
/// motif anchored near an edge simply yields fewer plans.
#[derive(Debug, Default)]
pub struct PlanQueue {
    pending: VecDeque<QueuedPixel>,
    motif: &'static str,
}

impl PlanQueue {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Queue an uncoloured motif; colours are picked as points are drained.
    pub fn load(&mut self, motif: &'static str, points: impl IntoIterator<Item = Point>) {
        self.motif = motif;
        self.pending.extend(
            points
                .into_iter()
                .map(|point| QueuedPixel { point, color: None }),
        );
    }

    /// Queue a motif whose pixels already carry their colour.
    pub fn load_colored(
        &mut self,
        motif: &'static str,
        pixels: impl IntoIterator<Item = (Point, u8)>,
    ) {
        self.motif = motif;
        self.pending.extend(pixels.into_iter().map(|(point, color)| QueuedPixel {
            point,
            color: Some(color),
        }));
    }

    /// Pop the next on-canvas pixel, dropping any off-canvas ones before it.
    pub fn next_plan<R: Rng + ?Sized>(
        &mut self,
        agent_kind: &str,
        colors: &[u8],
        rng: &mut R,
    ) -> Option<PixelPlan> {
        while let Some(queued) = self.pending.pop_front() {
            if !queued.point.in_bounds() {
                continue;
            }
            let color = queued.color.unwrap_or_else(|| pick_color(colors, rng));
            return Some(
                PixelPlan::new(queued.point, color).with_note(format!("{agent_kind}:{}", self.motif)),
            );
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::canvas::StaticCanvas;
    use crate::zone::Zone;

    pub fn config(kind: AgentKind) -> AgentConfig {
        AgentConfig {
            id: format!("{kind}-1"),
            name: format!("Test {kind}"),
            description: String::new(),
            kind: kind.as_str().to_string(),
            colors: vec![2, 5, 9],
            min_delay_ms: 1_000,
            max_delay_ms: 4_000,
            preferred_zones: Vec::new(),
            api_key: None,
        }
    }

    pub fn zone(id: u32, x: (i32, i32), y: (i32, i32)) -> Zone {
        Zone {
            id: ZoneId(id),
            name: format!("zone {id}"),
            x_start: x.0,
            x_end: x.1,
            y_start: y.0,
            y_end: y.1,
        }
    }

    /// Four quadrants of the canvas.
    pub fn quadrants() -> ZoneManager {
        ZoneManager::new(vec![
            zone(1, (0, 249), (0, 249)),
            zone(2, (250, 499), (0, 249)),
            zone(3, (0, 249), (250, 499)),
            zone(4, (250, 499), (250, 499)),
        ])
        .unwrap()
    }

    pub fn canvas() -> StaticCanvas {
        StaticCanvas::new(vec![ZoneId(1)], vec![ZoneId(4)])
    }

    /// Drive an agent for `ticks` ticks at one-second spacing.
    pub fn drive(agent: &mut dyn Agent, ticks: usize, seed: u64) -> Vec<Option<PixelPlan>> {
        use rand::SeedableRng;
        let zones = quadrants();
        let canvas = canvas();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        (0..ticks)
            .map(|i| {
                let mut ctx = AgentContext::new(&canvas, &zones, i as u64 * 1_000, &mut rng);
                agent.next_pixel(&mut ctx)
            })
            .collect()
    }
}
