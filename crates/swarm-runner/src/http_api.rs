//! HTTP client for the shared canvas API.
//!
//! Submits one pixel per request and maps every failure onto the
//! [`SubmitError`] classes the coordinator reacts to.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;

use swarm_kernel::{AgentCredentials, CanvasApi, PixelPlan, SubmitError};

/// Request body for `POST /api/pixel`.
#[derive(Serialize)]
struct PixelRequest {
    x: i32,
    y: i32,
    color: u8,
}

/// Canvas API client. Cloning shares the connection pool.
#[derive(Clone)]
pub struct HttpCanvasApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCanvasApi {
    /// Create a client for the canvas API at `base_url`
    /// (e.g. "http://localhost:3000").
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn pixel_url(&self) -> String {
        format!("{}/api/pixel", self.base_url)
    }
}

#[async_trait]
impl CanvasApi for HttpCanvasApi {
    async fn submit_pixel(
        &self,
        plan: &PixelPlan,
        credentials: &AgentCredentials,
    ) -> Result<(), SubmitError> {
        let body = PixelRequest {
            x: plan.x,
            y: plan.y,
            color: plan.color,
        };

        let mut request = self
            .client
            .post(self.pixel_url())
            .header("X-Agent-Id", &credentials.agent_id)
            .json(&body);
        if let Some(key) = &credentials.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| SubmitError::Network {
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after_ms = retry_after_ms(response.headers());
        let message = response.text().await.unwrap_or_default();
        Err(classify(status, retry_after_ms, message))
    }
}

/// Map a non-success response onto a submission error.
fn classify(status: StatusCode, retry_after_ms: Option<u64>, body: String) -> SubmitError {
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => SubmitError::RateLimited {
            message,
            retry_after_ms,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SubmitError::Unauthorized { message },
        _ => SubmitError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// `Retry-After` in whole seconds; the HTTP-date form is ignored.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1_000))
}
