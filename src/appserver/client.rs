//! Correlating JSON-RPC client for `codex app-server`.
//!
//! This module provides `AppServerClient`, which owns the child process,
//! performs the `initialize`/`initialized` handshake during construction and
//! then matches each request to its response by id.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::RpcError;
use super::message::{encode, Message, Notification, Request};
use super::process::{self, ProcessHandle};
use super::reader::{self, Router, NOTIFICATION_BUFFER};
use crate::config::AppServerConfig;

/// Request id reserved for the `initialize` call.
pub const HANDSHAKE_REQUEST_ID: i64 = 1;

/// Lifecycle of a client: `Uninitialized → Handshaking → Ready → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientState {
    Uninitialized = 0,
    Handshaking = 1,
    Ready = 2,
    Closed = 3,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClientState::Uninitialized,
            1 => ClientState::Handshaking,
            2 => ClientState::Ready,
            _ => ClientState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Handshaking => "handshaking",
            ClientState::Ready => "ready",
            ClientState::Closed => "closed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for a long-lived `codex app-server` child process.
///
/// All methods take `&self`; writes are serialized by a single lock so
/// concurrent callers never interleave partial lines, and responses are
/// routed to the caller that registered the matching id.
///
/// # Example
///
/// ```ignore
/// use ccstats::appserver::AppServerClient;
/// use ccstats::config::AppServerConfig;
///
/// let client = AppServerClient::connect(AppServerConfig::default()).await?;
/// let limits: serde_json::Value = client.call("account/rateLimits/read", Value::Null).await?;
/// client.close().await;
/// ```
pub struct AppServerClient {
    config: AppServerConfig,
    state: AtomicU8,
    /// Write half. `None` once the client is closed.
    stdin: Mutex<Option<ChildStdin>>,
    process: Mutex<Option<ProcessHandle>>,
    pid: Option<u32>,
    router: Arc<Router>,
    reader: JoinHandle<()>,
    unsolicited: Mutex<Option<mpsc::Receiver<Message>>>,
    next_id: AtomicI64,
}

impl AppServerClient {
    /// Spawn the app-server and complete the handshake.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Spawn` if the process cannot be started, or the
    /// error of the `initialize` request (timeout, remote error, closed
    /// connection). The child is terminated before the error is returned.
    pub async fn connect(config: AppServerConfig) -> Result<Self, RpcError> {
        let (process, stdin, stdout) = process::launch(&config.program, &config.args)?;
        let pid = process.pid();

        let (unsolicited_tx, unsolicited_rx) = mpsc::channel(NOTIFICATION_BUFFER);
        let router = Arc::new(Router::new(unsolicited_tx));
        let reader = tokio::spawn(reader::read_loop(stdout, Arc::clone(&router)));

        let client = Self {
            config,
            state: AtomicU8::new(ClientState::Uninitialized as u8),
            stdin: Mutex::new(Some(stdin)),
            process: Mutex::new(Some(process)),
            pid,
            router,
            reader,
            unsolicited: Mutex::new(Some(unsolicited_rx)),
            next_id: AtomicI64::new(HANDSHAKE_REQUEST_ID + 1),
        };

        if let Err(e) = client.handshake().await {
            warn!("app-server handshake failed: {}", e);
            client.close().await;
            return Err(e);
        }

        info!("app-server ready (pid {:?})", pid);
        Ok(client)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// OS process id of the child.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Number of requests currently waiting for a response.
    pub async fn pending_calls(&self) -> usize {
        self.router.in_flight().await
    }

    /// Take the receiver for messages no call was waiting for.
    ///
    /// Holds at most 16 undelivered messages; further ones are dropped.
    /// Returns `None` after the first call.
    pub async fn take_notifications(&self) -> Option<mpsc::Receiver<Message>> {
        self.unsolicited.lock().await.take()
    }

    /// Send a request with an id allocated by the client and the configured
    /// per-call timeout, decoding the result into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send_request(self.config.request_timeout, id, method, params)
            .await
    }

    /// Send a request and wait up to `timeout` for the response with `id`.
    ///
    /// Use `T = serde_json::Value` (or `serde::de::IgnoredAny`) when the
    /// result shape does not matter.
    ///
    /// # Errors
    ///
    /// - `RpcError::Timeout` if no response arrives in time
    /// - `RpcError::NotInitialized` / `RpcError::Remote` for error responses
    /// - `RpcError::Decode` if the result does not fit `T`
    /// - `RpcError::Transport` if writing to the child fails
    pub async fn send_request<T: DeserializeOwned>(
        &self,
        timeout: Duration,
        id: i64,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        self.ensure_ready()?;
        let result = self.request(timeout, id, method, &params).await?;
        serde_json::from_value(result).map_err(RpcError::Decode)
    }

    /// Send a notification. No response is awaited.
    pub async fn send_notification(&self, method: &str, params: Value) -> Result<(), RpcError> {
        self.ensure_ready()?;
        self.notify(method, &params).await
    }

    /// Terminate the child process and release its pipes.
    ///
    /// Closes stdin, stops the reader (releasing stdout), kills the process
    /// and waits for it. Every step is attempted and teardown errors are
    /// not reported; the stdin handle is released even when a writer held
    /// it at the start. Calling `close` again is a no-op.
    pub async fn close(&self) {
        let previous = self.state.swap(ClientState::Closed as u8, Ordering::SeqCst);
        if previous == ClientState::Closed as u8 {
            return;
        }
        debug!("Closing app-server client (pid {:?})", self.pid);

        // A writer blocked on a full pipe holds the lock; the kill below unblocks it.
        match self.stdin.try_lock() {
            Ok(mut guard) => {
                if let Some(mut stdin) = guard.take() {
                    if let Err(e) = stdin.shutdown().await {
                        debug!("Failed to close app-server stdin: {}", e);
                    }
                }
            }
            Err(_) => debug!("app-server stdin busy, skipping graceful close"),
        }

        self.reader.abort();

        if let Some(mut process) = self.process.lock().await.take() {
            process.terminate().await;
        }

        // The kill has failed any blocked writer, so the lock is free again.
        drop(self.stdin.lock().await.take());

        self.router.shutdown().await;
    }

    async fn handshake(&self) -> Result<(), RpcError> {
        self.set_state(ClientState::Handshaking);

        let params = json!({
            "clientInfo": {
                "name": self.config.client_name,
                "version": self.config.client_version,
            }
        });
        self.request(
            self.config.init_timeout,
            HANDSHAKE_REQUEST_ID,
            "initialize",
            &params,
        )
        .await?;

        self.notify("initialized", &Value::Null).await?;

        // close() may have raced the handshake; never resurrect a closed client.
        let _ = self.state.compare_exchange(
            ClientState::Handshaking as u8,
            ClientState::Ready as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), RpcError> {
        match self.state() {
            ClientState::Ready => Ok(()),
            ClientState::Closed => Err(RpcError::Closed),
            other => Err(RpcError::NotReady(other)),
        }
    }

    fn set_state(&self, state: ClientState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    async fn request(
        &self,
        timeout: Duration,
        id: i64,
        method: &str,
        params: &Value,
    ) -> Result<Value, RpcError> {
        let line = encode(&Request { id, method, params }).map_err(RpcError::Encode)?;

        // Register before writing so a fast response cannot slip past.
        let waiter = self.router.register(id).await?;

        debug!("app-server request {} {}", id, method);
        if let Err(e) = self.write_line(line).await {
            self.router.unregister(id).await;
            return Err(e);
        }

        let message = match tokio::time::timeout(timeout, waiter).await {
            Ok(Ok(message)) => message,
            Ok(Err(_)) => return Err(RpcError::ConnectionClosed),
            Err(_) => {
                self.router.unregister(id).await;
                debug!("app-server request {} {} timed out", id, method);
                return Err(RpcError::Timeout(timeout));
            }
        };

        if let Some(err) = message.error {
            return Err(RpcError::from_descriptor(err));
        }
        Ok(message.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str, params: &Value) -> Result<(), RpcError> {
        let line = encode(&Notification { method, params }).map_err(RpcError::Encode)?;
        debug!("app-server notification {}", method);
        self.write_line(line).await
    }

    async fn write_line(&self, mut line: Vec<u8>) -> Result<(), RpcError> {
        line.push(b'\n');

        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(RpcError::Closed)?;
        stdin.write_all(&line).await?;
        stdin.flush().await?;
        Ok(())
    }
}

impl Drop for AppServerClient {
    fn drop(&mut self) {
        // The child itself is killed by kill_on_drop.
        self.reader.abort();
        if self.state() != ClientState::Closed {
            debug!("app-server client dropped without close (pid {:?})", self.pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_client_state_roundtrip() {
        for state in [
            ClientState::Uninitialized,
            ClientState::Handshaking,
            ClientState::Ready,
            ClientState::Closed,
        ] {
            assert_eq!(ClientState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_client_state_display() {
        assert_eq!(ClientState::Ready.to_string(), "ready");
        assert_eq!(ClientState::Closed.to_string(), "closed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_releases_stdin_held_by_writer() {
        let config = AppServerConfig::new("sh").with_args([
            "-c",
            r#"read -r init; echo '{"id":1,"result":{}}'; read -r note; exec cat >/dev/null"#,
        ]);
        let client = tokio::time::timeout(TEST_TIMEOUT, AppServerClient::connect(config))
            .await
            .expect("Test timed out")
            .expect("Handshake should succeed");

        let held = client.stdin.lock().await;
        let release = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(held);
        };
        tokio::time::timeout(TEST_TIMEOUT, async { tokio::join!(client.close(), release) })
            .await
            .expect("close should not hang");

        assert_eq!(client.state(), ClientState::Closed);
        assert!(client.stdin.lock().await.is_none());
        assert!(client.process.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_missing_binary_is_spawn_error() {
        let config = AppServerConfig::new("/nonexistent/ccstats-no-such-binary");
        match AppServerClient::connect(config).await {
            Err(RpcError::Spawn { .. }) => {}
            Err(other) => panic!("Expected Spawn error, got {:?}", other),
            Ok(_) => panic!("Expected Spawn error"),
        }
    }
}
