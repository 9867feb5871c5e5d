//! Wire types for the line-delimited JSON protocol spoken by `codex app-server`.
//!
//! Every message is a single JSON object terminated by `\n`. Outbound
//! requests carry an integer `id`; notifications omit it. Inbound messages
//! are decoded into the permissive [`Message`] shape and classified later
//! by the reader.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remote error message that marks a call issued before the handshake finished.
pub const NOT_INITIALIZED_MESSAGE: &str = "Not initialized";

/// Outbound request (`{"id", "method", "params"}`).
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: i64,
    pub method: &'a str,
    pub params: &'a Value,
}

/// Outbound notification. No `id` field is ever written.
#[derive(Debug, Serialize)]
pub struct Notification<'a> {
    pub method: &'a str,
    pub params: &'a Value,
}

/// Error descriptor attached to a failed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl ErrorDescriptor {
    /// Whether the remote rejected the call because the handshake has not run.
    ///
    /// The comparison is exact and case-sensitive.
    pub fn is_not_initialized(&self) -> bool {
        self.message == NOT_INITIALIZED_MESSAGE
    }
}

/// Any message read from the app-server's stdout.
///
/// The `id` is kept as a raw JSON value because the server may echo it
/// either as a number or as a string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorDescriptor>,
}

impl Message {
    /// Decode one inbound line. Only a JSON object is a message; arrays and
    /// scalars are rejected even when they would fit the fields positionally.
    pub fn from_line(line: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice::<Value>(line)? {
            object @ Value::Object(_) => serde_json::from_value(object),
            _ => Err(serde::de::Error::custom(
                "app-server message is not a JSON object",
            )),
        }
    }

    /// Integer request id this message answers, if it carries a usable one.
    pub fn request_id(&self) -> Option<i64> {
        self.id.as_ref().and_then(id_key)
    }

    /// True for server-initiated notifications and requests.
    pub fn is_inbound_call(&self) -> bool {
        self.method.is_some()
    }
}

/// Normalise a raw inbound id to the integer key used for correlation.
///
/// Numbers must be integral; strings must be the exact base-10 rendering
/// of an integer (`"2"` matches, `"02"` and `" 2"` do not).
pub fn id_key(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let n: i64 = s.parse().ok()?;
            (n.to_string() == *s).then_some(n)
        }
        _ => None,
    }
}

/// Encode an outbound message as one line, without the trailing newline.
pub(crate) fn encode<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(message)
}
