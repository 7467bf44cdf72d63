//! relaybus CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relaybus::cli::{Cli, Commands};
use relaybus::commands::{run_emit, run_listen, run_serve};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins when set; --verbose only raises the default.
    let default_filter = if cli.verbose {
        "relaybus=debug"
    } else {
        "relaybus=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Emit(args) => run_emit(args).await,
        Commands::Listen(args) => run_listen(args).await,
    }
}
