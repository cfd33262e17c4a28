//! Swarm Kernel: scheduling core for a swarm of autonomous painting agents
//! sharing one 500×500, 16-colour canvas.
//!
//! Agents are independent personalities that decide, tick by tick, which
//! pixel to paint next and how long to wait before deciding again. The
//! kernel runs each agent on its own self-rescheduling timer and arbitrates
//! the placements they produce:
//!
//! - [`pattern`]: procedural motif generators (lines, spirals, flow fields,
//!   sprites, ...) producing raw coordinate lists.
//! - [`zone`]: named rectangles used for spatial arbitration and biasing.
//! - [`agent`]: the two-operation agent contract and its ten variants.
//! - [`scheduler`]: recurring tasks that return their own next delay, with a
//!   minimum backoff after failures.
//! - [`ledger`]: cooldown and conflict-window bookkeeping.
//! - [`coordinator`]: wires agents, ledger, canvas API and event bus together.
//!
//! The canvas itself lives behind two seams: [`canvas::CanvasState`] (read
//! hotspot rankings) and [`api::CanvasApi`] (submit a pixel).

pub mod activity;
pub mod agent;
pub mod api;
pub mod canvas;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod ledger;
pub mod pattern;
pub mod scheduler;
pub mod zone;

pub use activity::{ActivityConfig, ActivityMap};
pub use agent::{build_agent, Agent, AgentConfig, AgentContext, AgentKind};
pub use api::{AgentCredentials, CanvasApi, DryRunApi, SubmitError, SubmitErrorKind};
pub use canvas::{CanvasState, PixelPlan, Point, StaticCanvas, ZoneId, CANVAS_SIZE, PALETTE_SIZE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, KernelConfig};
pub use coordinator::{AgentTask, Coordinator, CoordinatorBuilder, TickOutcome, TickReport};
pub use events::{EventBus, SwarmEvent};
pub use ledger::{LedgerStats, PlacementLedger, Rejection};
pub use scheduler::{ScheduledTask, Scheduler, MIN_ERROR_BACKOFF_MS};
pub use zone::{Zone, ZoneManager};
