//! Error types for relaybus
//!
//! Transport and codec failures surface through [`RelayError`]. Routing
//! problems (no subscriber, stale correlation id) are reported in-band as
//! `error` frames or dropped with a log line, never as `Err` values.

use thiserror::Error;

/// Main error type for relaybus operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// The peer connection has been stopped or lost.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A bounded reply wait elapsed before any subscriber answered.
    #[error("Timed out waiting for reply to \"{event}\"")]
    ReplyTimeout { event: String },

    /// Packet text shorter than the fixed hex header.
    #[error("Packet header truncated: {len} of 34 chars")]
    PacketTruncated { len: usize },

    /// A fixed-width header field held something other than hex digits.
    #[error("Packet {field} field is not hex")]
    PacketField { field: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for relaybus operations
pub type Result<T> = std::result::Result<T, RelayError>;
