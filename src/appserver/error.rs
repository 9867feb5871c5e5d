//! Error taxonomy for the app-server client.

use std::time::Duration;

use thiserror::Error;

use super::client::ClientState;
use super::message::ErrorDescriptor;

/// Errors surfaced by [`AppServerClient`](super::AppServerClient).
///
/// None of these are retried inside the client. Malformed inbound lines
/// never show up here; the reader drops them.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The child process or one of its pipes could not be created.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the child's stdin failed (e.g. broken pipe).
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The server answered "Not initialized"; a fresh handshake may help.
    #[error("codex app-server not initialized")]
    NotInitialized,

    /// Any other error descriptor returned by the server.
    #[error("codex app-server error: {message}")]
    Remote { code: i64, message: String },

    /// The result payload did not match the expected shape.
    #[error("codex app-server parse: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// No response arrived before the call's deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server's stdout closed while the call was waiting.
    #[error("codex app-server closed the connection")]
    ConnectionClosed,

    /// Another call with the same id is still waiting for its response.
    #[error("Request id {0} is already in flight")]
    DuplicateRequestId(i64),

    /// The client has not completed its handshake.
    #[error("Client is not ready (state: {0})")]
    NotReady(ClientState),

    /// The client has been closed.
    #[error("Client is closed")]
    Closed,
}

impl RpcError {
    /// Map a remote error descriptor onto the taxonomy.
    pub fn from_descriptor(err: ErrorDescriptor) -> Self {
        if err.is_not_initialized() {
            RpcError::NotInitialized
        } else {
            RpcError::Remote {
                code: err.code,
                message: err.message,
            }
        }
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, RpcError::NotInitialized)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_descriptor_not_initialized() {
        let err = RpcError::from_descriptor(ErrorDescriptor {
            code: -1,
            message: "Not initialized".to_string(),
        });
        assert!(err.is_not_initialized());
    }

    #[test]
    fn test_from_descriptor_remote_keeps_text() {
        let err = RpcError::from_descriptor(ErrorDescriptor {
            code: -32601,
            message: "Method not found".to_string(),
        });
        match err {
            RpcError::Remote { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("Expected Remote, got {:?}", other),
        }
    }

    #[test]
    fn test_error_display() {
        let timeout = RpcError::Timeout(Duration::from_secs(4));
        assert_eq!(timeout.to_string(), "Request timed out after 4s");

        let remote = RpcError::Remote {
            code: 1,
            message: "boom".to_string(),
        };
        assert_eq!(remote.to_string(), "codex app-server error: boom");

        let not_ready = RpcError::NotReady(ClientState::Handshaking);
        assert_eq!(not_ready.to_string(), "Client is not ready (state: handshaking)");
    }

    #[test]
    fn test_io_error_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: RpcError = io.into();
        assert!(matches!(err, RpcError::Transport(_)));
    }
}
