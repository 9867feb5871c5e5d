//! Client for the `codex app-server` JSON-RPC process.
//!
//! The Codex CLI exposes account information through a long-lived child
//! process that speaks line-delimited JSON over stdio:
//!
//! ```text
//! ┌─────────────────┐      stdin / stdout       ┌─────────────────────┐
//! │    ccstats      │  ◄──────────────────────► │  codex app-server   │
//! │(AppServerClient)│   one JSON object / line  │                     │
//! └─────────────────┘                           └─────────────────────┘
//! ```
//!
//! # Protocol
//!
//! ```text
//! → {"id":1,"method":"initialize","params":{"clientInfo":{"name":"ccstats","version":"0.3.0"}}}
//! ← {"id":1,"result":{...}}
//! → {"method":"initialized","params":null}
//! → {"id":2,"method":"account/rateLimits/read","params":null}
//! ← {"id":2,"result":{"rateLimits":{...}}}
//! ```
//!
//! The handshake runs inside [`AppServerClient::connect`]; a client that is
//! returned is always ready. Responses may echo the id as a number or as a
//! string.
//!
//! # Usage
//!
//! ```ignore
//! use ccstats::appserver::AppServerClient;
//! use ccstats::config::AppServerConfig;
//!
//! let client = AppServerClient::connect(AppServerConfig::default()).await?;
//! let result: serde_json::Value = client.call("account/rateLimits/read", Value::Null).await?;
//! client.close().await;
//! ```

mod client;
mod error;
mod message;
mod process;
mod reader;

pub use client::{AppServerClient, ClientState, HANDSHAKE_REQUEST_ID};
pub use error::RpcError;
pub use message::{id_key, ErrorDescriptor, Message, NOT_INITIALIZED_MESSAGE};
pub use process::{launch, ProcessHandle};
pub use reader::NOTIFICATION_BUFFER;
