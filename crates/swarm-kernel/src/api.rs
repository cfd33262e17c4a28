//! The canvas API seam: how an accepted plan reaches the shared canvas.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::canvas::PixelPlan;

/// Identity presented to the canvas API on behalf of one agent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCredentials {
    pub agent_id: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl fmt::Debug for AgentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentCredentials")
            .field("agent_id", &self.agent_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Failure classes upstream backoff decisions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitErrorKind {
    RateLimited,
    Unauthorized,
    Network,
    Server,
}

impl SubmitErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitErrorKind::RateLimited => "rate_limited",
            SubmitErrorKind::Unauthorized => "unauthorized",
            SubmitErrorKind::Network => "network",
            SubmitErrorKind::Server => "server",
        }
    }
}

impl fmt::Display for SubmitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

impl SubmitError {
    pub fn kind(&self) -> SubmitErrorKind {
        match self {
            SubmitError::RateLimited { .. } => SubmitErrorKind::RateLimited,
            SubmitError::Unauthorized { .. } => SubmitErrorKind::Unauthorized,
            SubmitError::Network { .. } => SubmitErrorKind::Network,
            SubmitError::Server { .. } => SubmitErrorKind::Server,
        }
    }

    /// Server-requested wait before this agent tries again, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SubmitError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

/// Submits one pixel to the shared canvas.
///
/// Timeouts are the implementation's concern; the coordinator awaits
/// whatever the call returns.
#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn submit_pixel(
        &self,
        plan: &PixelPlan,
        credentials: &AgentCredentials,
    ) -> Result<(), SubmitError>;
}

/// Accepts every submission without sending anything.
#[derive(Debug, Default)]
pub struct DryRunApi {
    submitted: AtomicU64,
}

impl DryRunApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CanvasApi for DryRunApi {
    async fn submit_pixel(
        &self,
        plan: &PixelPlan,
        credentials: &AgentCredentials,
    ) -> Result<(), SubmitError> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        info!(
            agent = %credentials.agent_id,
            x = plan.x,
            y = plan.y,
            color = plan.color,
            note = plan.note.as_deref().unwrap_or(""),
            "[dry-run] pixel"
        );
        Ok(())
    }
}
