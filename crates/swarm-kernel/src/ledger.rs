//! PlacementLedger: the shared cooldown and conflict-window bookkeeping.
//!
//! Every agent tick passes through [`PlacementLedger::reserve`] before it is
//! allowed to reach the canvas API. A reservation tentatively claims the
//! point and stamps the agent's last placement at once, so other ticks that
//! run while the dispatch is in flight already see it. The outcome of the
//! dispatch then either confirms the reservation or rolls it back:
//!
//! ```text
//! reserve(agent, point, now)
//!   |
//!   +-- held / cooling down / point claimed by another agent --> Rejection
//!   |
//!   +-- claim point + stamp agent --> Reservation
//!                                        |
//!                         dispatch ok ---+--- dispatch failed
//!                              |                   |
//!                          confirm()           rollback()
//!                                          (previous claim and stamp restored)
//! ```
//!
//! Lock order is always agent entry first, then point entry.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::canvas::Point;

/// Why a placement was not allowed to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("cooldown: {remaining_ms}ms remaining")]
    Cooldown { remaining_ms: u64 },

    #[error("conflict: point recently claimed by '{holder}'")]
    Conflict { holder: String },

    #[error("held after rate limit: {remaining_ms}ms remaining")]
    Held { remaining_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Claim {
    agent_id: String,
    at_ms: u64,
}

#[derive(Debug, Clone, Default)]
struct AgentStamp {
    last_placed_ms: Option<u64>,
    held_until_ms: Option<u64>,
}

/// A granted, not yet settled placement. Settle it with
/// [`PlacementLedger::confirm`] or [`PlacementLedger::rollback`].
#[derive(Debug)]
#[must_use = "a reservation must be confirmed or rolled back"]
pub struct Reservation {
    agent_id: String,
    point: Point,
    at_ms: u64,
    previous_claim: Option<Claim>,
    previous_placed_ms: Option<u64>,
}

impl Reservation {
    pub fn point(&self) -> Point {
        self.point
    }

    pub fn at_ms(&self) -> u64 {
        self.at_ms
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub granted: u64,
    pub denied: u64,
    pub rolled_back: u64,
    pub active_claims: usize,
}

pub struct PlacementLedger {
    cooldown_ms: u64,
    conflict_window_ms: u64,
    claims: DashMap<Point, Claim>,
    agents: DashMap<String, AgentStamp>,
    granted: AtomicU64,
    denied: AtomicU64,
    rolled_back: AtomicU64,
}

impl std::fmt::Debug for PlacementLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementLedger")
            .field("cooldown_ms", &self.cooldown_ms)
            .field("conflict_window_ms", &self.conflict_window_ms)
            .field("active_claims", &self.claims.len())
            .finish()
    }
}

impl PlacementLedger {
    pub fn new(cooldown_ms: u64, conflict_window_ms: u64) -> Self {
        Self {
            cooldown_ms,
            conflict_window_ms,
            claims: DashMap::new(),
            agents: DashMap::new(),
            granted: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }

    /// Check the hold, cooldown and conflict policies (in that order) and,
    /// if all pass, claim the point for `agent_id`.
    pub fn reserve(
        &self,
        agent_id: &str,
        point: Point,
        now_ms: u64,
    ) -> Result<Reservation, Rejection> {
        let mut stamp = self.agents.entry(agent_id.to_string()).or_default();

        if let Some(until) = stamp.held_until_ms.filter(|&until| now_ms < until) {
            return Err(self.deny(agent_id, Rejection::Held {
                remaining_ms: until - now_ms,
            }));
        }

        if let Some(last) = stamp.last_placed_ms {
            let ready_at = last.saturating_add(self.cooldown_ms);
            if now_ms < ready_at {
                return Err(self.deny(agent_id, Rejection::Cooldown {
                    remaining_ms: ready_at - now_ms,
                }));
            }
        }

        let claim = Claim {
            agent_id: agent_id.to_string(),
            at_ms: now_ms,
        };
        let previous_claim = match self.claims.entry(point) {
            Entry::Occupied(mut existing) => {
                let holder = existing.get();
                let age_ms = now_ms.saturating_sub(holder.at_ms);
                if holder.agent_id != agent_id && age_ms < self.conflict_window_ms {
                    let holder = holder.agent_id.clone();
                    return Err(self.deny(agent_id, Rejection::Conflict { holder }));
                }
                Some(existing.insert(claim))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(claim);
                None
            }
        };

        let previous_placed_ms = stamp.last_placed_ms.replace(now_ms);
        self.granted.fetch_add(1, Ordering::Relaxed);
        trace!(agent = agent_id, x = point.x, y = point.y, "Placement reserved");

        Ok(Reservation {
            agent_id: agent_id.to_string(),
            point,
            at_ms: now_ms,
            previous_claim,
            previous_placed_ms,
        })
    }

    /// Keep a reservation after a successful dispatch.
    pub fn confirm(&self, reservation: Reservation) {
        trace!(
            agent = %reservation.agent_id,
            x = reservation.point.x,
            y = reservation.point.y,
            "Placement confirmed"
        );
    }

    /// Undo a reservation whose dispatch failed.
    ///
    /// Only entries still carrying this reservation's stamp are restored;
    /// anything written since is left alone.
    pub fn rollback(&self, reservation: Reservation) {
        let Reservation {
            agent_id,
            point,
            at_ms,
            previous_claim,
            previous_placed_ms,
        } = reservation;

        if let Some(mut stamp) = self.agents.get_mut(&agent_id) {
            if stamp.last_placed_ms == Some(at_ms) {
                stamp.last_placed_ms = previous_placed_ms;
            }
        }

        if let Entry::Occupied(mut current) = self.claims.entry(point) {
            let ours = current.get().agent_id == agent_id && current.get().at_ms == at_ms;
            if ours {
                match previous_claim {
                    Some(previous) => {
                        current.insert(previous);
                    }
                    None => {
                        current.remove();
                    }
                }
            }
        }

        self.granted.fetch_sub(1, Ordering::Relaxed);
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
        debug!(agent = %agent_id, x = point.x, y = point.y, "Placement rolled back");
    }

    /// Refuse every reservation for `agent_id` until `until_ms`.
    pub fn hold(&self, agent_id: &str, until_ms: u64) {
        let mut stamp = self.agents.entry(agent_id.to_string()).or_default();
        let until = stamp.held_until_ms.map_or(until_ms, |held| held.max(until_ms));
        stamp.held_until_ms = Some(until);
        debug!(agent = agent_id, until_ms = until, "Agent held");
    }

    /// Drop claims that can no longer cause a conflict. Returns how many.
    pub fn prune(&self, now_ms: u64) -> usize {
        let before = self.claims.len();
        self.claims
            .retain(|_, claim| now_ms.saturating_sub(claim.at_ms) < self.conflict_window_ms);
        before.saturating_sub(self.claims.len())
    }

    /// Current holder of a point, if its claim is still inside the window.
    pub fn holder(&self, point: Point, now_ms: u64) -> Option<String> {
        self.claims
            .get(&point)
            .filter(|claim| now_ms.saturating_sub(claim.at_ms) < self.conflict_window_ms)
            .map(|claim| claim.agent_id.clone())
    }

    pub fn last_placed_ms(&self, agent_id: &str) -> Option<u64> {
        self.agents.get(agent_id).and_then(|stamp| stamp.last_placed_ms)
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            granted: self.granted.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            active_claims: self.claims.len(),
        }
    }

    fn deny(&self, agent_id: &str, rejection: Rejection) -> Rejection {
        self.denied.fetch_add(1, Ordering::Relaxed);
        debug!(agent = agent_id, %rejection, "Placement denied");
        rejection
    }
}
