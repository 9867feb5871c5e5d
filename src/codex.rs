//! Codex plan and rate-limit lookup.
//!
//! The plan is derived from local credentials (`auth.json` or
//! `OPENAI_API_KEY`); the live rate-limit windows come from
//! `codex app-server` through [`crate::appserver`]. A failing app-server
//! never fails the lookup: the usage is returned with
//! `rate_source = "unavailable"` and no windows.

mod auth;
mod plan;
mod rate_limits;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;

pub use auth::{plan_from_token, AuthFile, Tokens};
pub use plan::{plan_limits_for, LimitRange, Plan, PlanLimits};
pub use rate_limits::{
    AppServerRateLimits, RateLimitSnapshot, RateLimitSource, RateLimitWindow, RateLimitsResponse,
    UsageWindow, RATE_LIMITS_METHOD,
};

/// Rate source label when the app-server answered.
pub const RATE_SOURCE_APP_SERVER: &str = "codex app-server";
/// Rate source label when rate limits could not be read.
pub const RATE_SOURCE_UNAVAILABLE: &str = "unavailable";

/// Codex credential errors.
#[derive(Debug, Error)]
pub enum CodexError {
    #[error("codex credentials not found: Please run `codex login`")]
    AuthNotFound,

    #[error("failed to parse codex auth.json: {0}")]
    InvalidAuthFile(#[source] serde_json::Error),

    #[error("invalid JWT: {0}")]
    InvalidToken(String),
}

/// Codex plan and rate-limit windows.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    pub plan: Plan,
    /// Where the plan came from (`codex auth` or `api key`).
    pub plan_source: String,
    pub auth_mode: String,
    pub primary: Option<UsageWindow>,
    pub secondary: Option<UsageWindow>,
    /// Where the windows came from, empty until a fetch was attempted.
    pub rate_source: String,
}

impl Usage {
    fn api_key(auth_mode: &str) -> Self {
        Self {
            plan: Plan::ApiKey,
            plan_source: "api key".to_string(),
            auth_mode: auth_mode.to_string(),
            primary: None,
            secondary: None,
            rate_source: String::new(),
        }
    }

    /// Merge an app-server snapshot into this usage.
    ///
    /// A reported `planType` overrides the plan derived from credentials.
    pub fn apply_rate_limits(&mut self, snapshot: &RateLimitSnapshot) {
        self.rate_source = RATE_SOURCE_APP_SERVER.to_string();
        if let Some(plan_type) = &snapshot.plan_type {
            self.plan = Plan::normalize(plan_type);
        }
        if let Some(primary) = &snapshot.primary {
            self.primary = Some(UsageWindow::from(primary));
        }
        if let Some(secondary) = &snapshot.secondary {
            self.secondary = Some(UsageWindow::from(secondary));
        }
    }

    /// Windows in display order.
    pub fn windows(&self) -> impl Iterator<Item = &UsageWindow> {
        self.primary.iter().chain(self.secondary.iter())
    }
}

/// Look up Codex usage with the app-server configured in `settings`.
pub async fn fetch_usage(settings: &Settings) -> Result<Usage, CodexError> {
    let source = AppServerRateLimits::new(settings.app_server.clone());
    fetch_usage_with(
        settings.codex_auth_path.as_deref(),
        settings.openai_api_key.as_deref(),
        &source,
    )
    .await
}

/// Look up Codex usage from an explicit auth path, API key and rate source.
///
/// # Errors
///
/// - `CodexError::AuthNotFound` if there is no auth file and no API key
/// - `CodexError::InvalidAuthFile` if the auth file is not valid JSON
pub async fn fetch_usage_with<S: RateLimitSource>(
    auth_path: Option<&Path>,
    env_api_key: Option<&str>,
    source: &S,
) -> Result<Usage, CodexError> {
    let env_api_key = env_api_key.map(str::trim).filter(|k| !k.is_empty());

    let auth = match auth_path {
        Some(path) => AuthFile::load(path)?,
        None => None,
    };

    let mut usage = match auth {
        Some(auth) => {
            let api_key = env_api_key.or_else(|| auth.api_key());
            if auth.auth_mode == "api_key" || api_key.is_some() {
                Usage::api_key(&auth.auth_mode)
            } else {
                Usage {
                    plan: auth.token_plan(),
                    plan_source: "codex auth".to_string(),
                    auth_mode: auth.auth_mode.clone(),
                    primary: None,
                    secondary: None,
                    rate_source: String::new(),
                }
            }
        }
        None if env_api_key.is_some() => Usage::api_key("api_key"),
        None => return Err(CodexError::AuthNotFound),
    };

    match source.fetch().await {
        Ok(snapshot) => usage.apply_rate_limits(&snapshot),
        Err(e) => {
            warn!("Codex rate limits unavailable: {}", e);
            usage.rate_source = RATE_SOURCE_UNAVAILABLE.to_string();
        }
    }

    debug!("Codex usage: plan={}, source={}", usage.plan, usage.rate_source);
    Ok(usage)
}

/// Whether Codex credentials exist (API key or auth file), without reading them.
pub fn has_credentials(settings: &Settings) -> bool {
    if settings.openai_api_key.is_some() {
        return true;
    }
    settings
        .codex_auth_path
        .as_deref()
        .is_some_and(Path::exists)
}
