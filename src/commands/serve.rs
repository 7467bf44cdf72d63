//! Serve command handler
//!
//! Binds the hub listener and runs the accept loop until the process is
//! killed. There is no drain protocol: peers notice the close and their
//! read loops end.

use anyhow::{Context, Result};

use crate::cli::ServeArgs;
use crate::hub::Hub;

/// Run the hub daemon.
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let hub = Hub::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;

    tracing::info!(
        "relaybus hub v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        hub.local_addr()?
    );

    hub.run().await?;
    Ok(())
}
