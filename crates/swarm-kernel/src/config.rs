//! Configuration types for the swarm kernel.

use serde::Deserialize;
use thiserror::Error;

use crate::canvas::ZoneId;

/// Global coordination settings shared by every agent.
///
/// Loaded from TOML/JSON by the runner; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Minimum time between two accepted placements of the same agent (milliseconds)
    pub cooldown_ms: u64,

    /// How long a claimed point blocks other agents (milliseconds)
    pub conflict_window_ms: u64,

    /// Interval of the housekeeping task that drops expired claims (milliseconds)
    pub ledger_sweep_interval_ms: u64,

    /// Buffered events per subscriber before slow observers start lagging
    pub event_capacity: usize,

    /// Seed for the per-agent random sources; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 30_000,
            conflict_window_ms: 10_000,
            ledger_sweep_interval_ms: 60_000,
            event_capacity: 1024,
            seed: None,
        }
    }
}

/// Startup-time configuration failures. None of these can occur once the
/// coordinator is running.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("zone {id} has an inverted rectangle ({axis} start > end)")]
    InvertedZone { id: ZoneId, axis: &'static str },

    #[error("zone id {0} is declared more than once")]
    DuplicateZone(ZoneId),

    #[error("unknown agent type '{kind}' for agent '{agent}'")]
    UnknownAgentType { agent: String, kind: String },

    #[error("agent '{0}' has no colours configured")]
    EmptyPalette(String),

    #[error("agent '{agent}' uses colour {color}, outside the 16-colour palette")]
    ColorOutOfRange { agent: String, color: u8 },

    #[error("agent '{agent}' has min delay {min_ms}ms above max delay {max_ms}ms")]
    InvertedDelay {
        agent: String,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("agent id '{0}' is declared more than once")]
    DuplicateAgent(String),
}
