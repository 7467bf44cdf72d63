//! CLI argument definitions using clap with subcommand architecture
//!
//! Three subcommands cover the daemon and the two peer roles: `serve`
//! runs a hub, `listen` subscribes and prints deliveries, `emit` fires
//! one invocation and can wait for the correlated reply.

use clap::{Args, Parser, Subcommand};

/// Default hub port.
pub const DEFAULT_PORT: u16 = 7320;

/// Fallback of `--addr` on the peer commands. Keep in sync with
/// [`DEFAULT_PORT`].
pub const DEFAULT_ADDR: &str = "127.0.0.1:7320";

/// Framed JSON event bus with correlated request/reply
#[derive(Parser, Debug)]
#[command(name = "relaybus")]
#[command(about = "Event bus hub and peers speaking bare JSON frames over TCP")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================
// Main Commands Enum
// ============================================

/// Available subcommands for relaybus
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the hub daemon
    Serve(ServeArgs),

    /// Invoke an event once, optionally awaiting the reply
    Emit(EmitArgs),

    /// Subscribe to events and print every delivery
    Listen(ListenArgs),
}

// ============================================
// Serve Subcommand
// ============================================

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

// ============================================
// Emit Subcommand
// ============================================

/// Arguments for the emit command
#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Event name to invoke
    #[arg(value_name = "EVENT")]
    pub event: String,

    /// JSON payload for the invocation (defaults to null)
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,

    /// Wait for the correlated reply and print it
    #[arg(long)]
    pub reply: bool,

    /// Give up on the reply after this many seconds
    #[arg(long, value_name = "SECS", requires = "reply")]
    pub timeout: Option<u64>,

    /// Hub address
    #[arg(long, env = "RELAYBUS_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,
}

// ============================================
// Listen Subcommand
// ============================================

/// Arguments for the listen command
#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Event names to subscribe to
    #[arg(value_name = "EVENT", required = true)]
    pub events: Vec<String>,

    /// Hub address
    #[arg(long, env = "RELAYBUS_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,
}
