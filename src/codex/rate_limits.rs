//! Rate-limit windows read through `account/rateLimits/read`.

use std::future::Future;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::appserver::{AppServerClient, RpcError};
use crate::config::AppServerConfig;

/// Method name of the rate-limit query.
pub const RATE_LIMITS_METHOD: &str = "account/rateLimits/read";

/// Request id used for the rate-limit query (the handshake owns id 1).
const RATE_LIMITS_REQUEST_ID: i64 = 2;

/// Result payload of `account/rateLimits/read`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitsResponse {
    #[serde(default)]
    pub rate_limits: RateLimitSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub primary: Option<RateLimitWindow>,
    #[serde(default)]
    pub secondary: Option<RateLimitWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitWindow {
    #[serde(default)]
    pub used_percent: i64,
    #[serde(default)]
    pub window_duration_mins: i64,
    /// Unix seconds; non-positive means unknown.
    #[serde(default)]
    pub resets_at: i64,
}

/// A rate-limit window ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageWindow {
    pub window_duration_mins: i64,
    /// Fraction used, nominally 0.0-1.0.
    pub utilization: f64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl From<&RateLimitWindow> for UsageWindow {
    fn from(window: &RateLimitWindow) -> Self {
        let reset_at = if window.resets_at > 0 {
            Utc.timestamp_opt(window.resets_at, 0).single()
        } else {
            None
        };
        Self {
            window_duration_mins: window.window_duration_mins,
            utilization: window.used_percent as f64 / 100.0,
            reset_at,
        }
    }
}

/// Somewhere rate limits can be read from.
pub trait RateLimitSource {
    fn fetch(&self) -> impl Future<Output = Result<RateLimitSnapshot, RpcError>> + Send;
}

/// Reads rate limits from a freshly spawned `codex app-server`.
#[derive(Debug, Clone)]
pub struct AppServerRateLimits {
    config: AppServerConfig,
}

impl AppServerRateLimits {
    pub fn new(config: AppServerConfig) -> Self {
        Self { config }
    }
}

impl RateLimitSource for AppServerRateLimits {
    async fn fetch(&self) -> Result<RateLimitSnapshot, RpcError> {
        let client = AppServerClient::connect(self.config.clone()).await?;

        // A `null` result is an answer with no limits, not a decode failure.
        let response: Result<Option<RateLimitsResponse>, RpcError> = client
            .send_request(
                self.config.request_timeout,
                RATE_LIMITS_REQUEST_ID,
                RATE_LIMITS_METHOD,
                Value::Null,
            )
            .await;
        client.close().await;

        let response = response?.unwrap_or_default();
        debug!("Codex rate limits: {:?}", response.rate_limits);
        Ok(response.rate_limits)
    }
}
