//! Command modules for the relaybus CLI
//!
//! Each command module implements a single top-level command:
//! - `serve` - Run the hub daemon
//! - `emit` - Invoke an event once, optionally awaiting the reply
//! - `listen` - Subscribe to events and print deliveries
//!
//! All command handlers take their respective `Args` struct from
//! `cli.rs` and report failures through `anyhow` so the binary can
//! print them with context.

pub mod emit;
pub mod listen;
pub mod serve;

// Re-export command handlers for easy access
pub use emit::run_emit;
pub use listen::run_listen;
pub use serve::run_serve;
