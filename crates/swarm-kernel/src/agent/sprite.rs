//! Sprite personalities: small bitmap stamps centred on a chosen zone.
//!
//! Pixel Punk stamps any sprite wherever a coin flip between hot and cold
//! zones lands. Meme Lord sticks to the friendly sprites and piles onto
//! whatever is already popular.

use rand::seq::IndexedRandom;
use rand::RngCore;

use super::{Agent, AgentConfig, AgentContext, AgentCore, AgentKind, PlanQueue, ZoneBias};
use crate::canvas::{PixelPlan, Point};
use crate::pattern::{self, SPRITE_NAMES};

const MEME_SPRITES: &[&str] = &["heart", "smiley", "star"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpriteStyle {
    Punk,
    Meme,
}

pub struct SpriteAgent {
    core: AgentCore,
    queue: PlanQueue,
    style: SpriteStyle,
}

impl SpriteAgent {
    pub fn pixel_punk(config: AgentConfig) -> Self {
        Self::with_style(config, SpriteStyle::Punk)
    }

    pub fn meme_lord(config: AgentConfig) -> Self {
        Self::with_style(config, SpriteStyle::Meme)
    }

    fn with_style(config: AgentConfig, style: SpriteStyle) -> Self {
        Self {
            core: AgentCore::new(config),
            queue: PlanQueue::default(),
            style,
        }
    }

    fn kind(&self) -> AgentKind {
        match self.style {
            SpriteStyle::Punk => AgentKind::PixelPunk,
            SpriteStyle::Meme => AgentKind::MemeLord,
        }
    }

    fn compose(&self, ctx: &mut AgentContext<'_>) -> Option<(&'static str, Vec<Point>)> {
        let (bias, names) = match self.style {
            SpriteStyle::Punk => (ZoneBias::random(ctx.rng), SPRITE_NAMES),
            SpriteStyle::Meme => (ZoneBias::Hot, MEME_SPRITES),
        };
        let anchor = self.core.anchor(ctx, bias)?;
        let name = *names.choose(ctx.rng)?;

        let bitmap = pattern::sprite_bitmap(name);
        let width = bitmap.first().map_or(0, |row| row.len() as i32);
        let height = bitmap.len() as i32;
        Some((
            name,
            pattern::sprite(name, anchor.x - width / 2, anchor.y - height / 2),
        ))
    }
}

impl Agent for SpriteAgent {
    fn config(&self) -> &AgentConfig {
        self.core.config()
    }

    fn next_pixel(&mut self, ctx: &mut AgentContext<'_>) -> Option<PixelPlan> {
        if self.queue.is_empty() {
            let (motif, points) = self.compose(ctx)?;
            self.queue.load(motif, points);
        }
        let kind = self.kind();
        self.queue.next_plan(kind.as_str(), self.core.colors(), ctx.rng)
    }

    fn next_delay_ms(&mut self, rng: &mut dyn RngCore) -> u64 {
        self.core.delay(rng)
    }
}
