//! Background reader that drains the app-server's stdout.
//!
//! One task per client owns the read half for the client's whole lifetime.
//! Each newline-terminated line is trimmed, decoded and handed to the
//! [`Router`], which fulfils the waiter registered for the message's id.
//! Lines that are not JSON objects are dropped and reading continues.

use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

use super::error::RpcError;
use super::message::Message;

/// Capacity of the unsolicited-message channel.
pub const NOTIFICATION_BUFFER: usize = 16;

#[derive(Default)]
struct Pending {
    waiters: HashMap<i64, oneshot::Sender<Message>>,
    /// Set once the reader has stopped; no new waiters are accepted.
    closed: bool,
}

/// Routes decoded messages to the call waiting for them.
///
/// Messages nobody is waiting for (notifications, server requests, late
/// responses to timed-out calls) go to a bounded channel. When that channel
/// is full they are dropped so the reader never stalls behind a slow consumer.
pub(crate) struct Router {
    pending: Mutex<Pending>,
    unsolicited: mpsc::Sender<Message>,
}

impl Router {
    pub(crate) fn new(unsolicited: mpsc::Sender<Message>) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            unsolicited,
        }
    }

    /// Register a waiter for `id`. Must happen before the request is written.
    pub(crate) async fn register(&self, id: i64) -> Result<oneshot::Receiver<Message>, RpcError> {
        let mut pending = self.pending.lock().await;
        if pending.closed {
            return Err(RpcError::ConnectionClosed);
        }
        if pending.waiters.contains_key(&id) {
            return Err(RpcError::DuplicateRequestId(id));
        }
        let (tx, rx) = oneshot::channel();
        pending.waiters.insert(id, tx);
        Ok(rx)
    }

    /// Forget the waiter for `id` (after a timeout or failed write).
    pub(crate) async fn unregister(&self, id: i64) {
        self.pending.lock().await.waiters.remove(&id);
    }

    /// Number of calls currently waiting for a response.
    pub(crate) async fn in_flight(&self) -> usize {
        self.pending.lock().await.waiters.len()
    }

    pub(crate) async fn route(&self, message: Message) {
        let mut pending = self.pending.lock().await;

        if let Some(id) = message.request_id() {
            if let Some(waiter) = pending.waiters.remove(&id) {
                let _ = waiter.send(message);
                return;
            }
        }

        // An error that matches no waiter still ends every call in flight.
        if message.error.is_some() && !pending.waiters.is_empty() {
            debug!(
                "Uncorrelated error response, failing {} pending call(s)",
                pending.waiters.len()
            );
            for (_, waiter) in pending.waiters.drain() {
                let _ = waiter.send(message.clone());
            }
            return;
        }
        drop(pending);

        if message.is_inbound_call() {
            debug!("app-server message {:?} (id: {:?})", message.method, message.id);
        } else {
            debug!("Response with no waiting call (id: {:?})", message.id);
        }
        match self.unsolicited.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification buffer full, dropping app-server message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Stop accepting waiters and drop the existing ones.
    ///
    /// Dropped senders wake their callers, which report `ConnectionClosed`.
    pub(crate) async fn shutdown(&self) {
        let mut pending = self.pending.lock().await;
        pending.closed = true;
        if !pending.waiters.is_empty() {
            debug!("Dropping {} pending call(s)", pending.waiters.len());
        }
        pending.waiters.clear();
    }
}

/// Read newline-delimited JSON from `stdout` until EOF or a read error.
pub(crate) async fn read_loop<R>(stdout: R, router: std::sync::Arc<Router>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                debug!("app-server stdout closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Failed to read from app-server: {}", e);
                break;
            }
        }

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }

        match Message::from_line(trimmed) {
            Ok(message) => router.route(message).await,
            Err(e) => debug!("Dropping malformed app-server line: {}", e),
        }
    }

    router.shutdown().await;
}
