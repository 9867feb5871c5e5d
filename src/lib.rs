//! ccstats library
//!
//! This library provides the components behind the `ccstats` binary:
//!
//! - `appserver` - JSON-RPC client for a `codex app-server` child process
//! - `codex` - Codex plan detection and rate-limit lookup
//! - `display` - Progress bar and reset-time rendering
//! - `config` - Settings resolved from the environment
//!
//! # App-server Module
//!
//! ```ignore
//! use ccstats::appserver::AppServerClient;
//! use ccstats::config::AppServerConfig;
//!
//! let client = AppServerClient::connect(AppServerConfig::default()).await?;
//! let result: serde_json::Value = client
//!     .call("account/rateLimits/read", serde_json::Value::Null)
//!     .await?;
//! client.close().await;
//! ```

pub mod appserver;
pub mod codex;
pub mod config;
pub mod display;
