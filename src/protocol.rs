//! Wire frame types
//!
//! Every message on the wire is one standalone JSON object tagged by
//! `type`. There are exactly four shapes:
//!
//! ```json
//! {"type":"on","eventName":"onRecvPacket"}
//! {"type":"emit","eventName":"sendPacket","data":{"packet":"..."},"id":"f81d4fae-..."}
//! {"type":"return","eventName":"sendPacket","data":{"ok":true},"id":"f81d4fae-..."}
//! {"type":"error","msg":"no subscriber for event: sendPacket","eventName":"sendPacket"}
//! ```
//!
//! `data` is opaque to the protocol: any JSON value rides through
//! untouched. The `id` field, when present on an `emit`, asks for
//! exactly one correlated `return`. `error` frames never carry an id,
//! so a failed invocation does not resolve the caller's wait.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One protocol message.
///
/// Unknown fields on incoming frames are ignored; a well-formed object
/// whose `type` is not one of the four below fails to parse here and is
/// dropped by [`parse_or_log`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// Subscribe the sending connection to an event name.
    On {
        #[serde(rename = "eventName")]
        event_name: String,
    },

    /// Invoke an event on whoever subscribed to it. An `id` asks the
    /// first responding subscriber for a correlated reply.
    Emit {
        #[serde(rename = "eventName")]
        event_name: String,
        #[serde(default)]
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Correlated reply to an earlier `emit`.
    Return {
        #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
        event_name: Option<String>,
        #[serde(default)]
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Failure notice from the hub. Deliberately uncorrelated.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
        #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
        event_name: Option<String>,
    },
}

/// Parse one extracted frame, logging and swallowing the two failure
/// modes: bytes that are not a JSON object at all, and well-formed
/// objects the protocol does not recognize. The stream continues either
/// way; only the offending frame is lost.
pub(crate) fn parse_or_log(raw: &[u8]) -> Option<Frame> {
    match serde_json::from_slice::<Frame>(raw) {
        Ok(frame) => Some(frame),
        Err(err) => {
            match serde_json::from_slice::<Value>(raw) {
                Ok(value) => {
                    tracing::warn!("Dropping unrecognized frame (type {:?})", value.get("type"));
                }
                Err(_) => {
                    tracing::warn!("Dropping frame that is not valid JSON: {}", err);
                }
            }
            None
        }
    }
}
