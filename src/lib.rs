//! Relaybus: framed JSON event bus with correlated request/reply
//!
//! Peers hold one persistent TCP connection each to a central hub. A
//! peer subscribes to event names; anyone may invoke a name with an
//! arbitrary JSON payload, and the hub fans the invocation out to every
//! subscriber. An invocation carrying a correlation id gets exactly one
//! reply back: the first subscriber to answer wins, later answers are
//! dropped.
//!
//! Frames on the wire are bare JSON objects with no length prefix or
//! delimiter; boundaries are recovered by brace counting (see
//! [`framing`]). Payloads may carry a fixed-width hex packet record
//! (see [`packet`]) that the bus itself never inspects.
//!
//! # Wire exchanges
//!
//! ```json
//! {"type":"on","eventName":"sendPacket"}
//! {"type":"emit","eventName":"sendPacket","data":{"packet":"..."},"id":"f81d4fae-..."}
//! {"type":"return","eventName":"sendPacket","data":{"ok":true},"id":"f81d4fae-..."}
//! {"type":"error","msg":"no subscriber for event: sendPacket","eventName":"sendPacket"}
//! ```
//!
//! # Example
//!
//! ```ignore
//! use relaybus::{Hub, PeerClient};
//! use serde_json::json;
//!
//! let hub = Hub::bind("127.0.0.1:0").await?;
//! let addr = hub.local_addr()?;
//! let _hub = hub.spawn();
//!
//! let worker = PeerClient::connect(addr).await?;
//! worker.on("double", |data| async move {
//!     json!(data.as_i64().unwrap_or(0) * 2)
//! }).await?;
//!
//! let caller = PeerClient::connect(addr).await?;
//! let reply = caller.acquire("double", json!(21)).await?;
//! assert_eq!(reply, json!(42));
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod framing;
pub mod hub;
pub mod packet;
pub mod protocol;

// Re-export commonly used types
pub use cli::Cli;
pub use client::{ClientStatus, EventHandler, PeerClient};
pub use error::{RelayError, Result};
pub use framing::FrameScanner;
pub use hub::{Hub, HubHandle, HubStats};
pub use packet::{Packet, HEADER_LEN};
pub use protocol::Frame;
