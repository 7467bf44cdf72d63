//! Listen command handler
//!
//! Connects as a long-lived peer, registers a printing handler for each
//! requested event name and stays up until Ctrl-C. Correlated
//! invocations are acknowledged with `null`, other subscribers are
//! unaffected.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::cli::ListenArgs;
use crate::client::PeerClient;

/// Subscribe to events and print every delivery.
pub async fn run_listen(args: &ListenArgs) -> Result<()> {
    let client = PeerClient::connect(args.addr.as_str())
        .await
        .with_context(|| format!("Failed to connect to hub at {}", args.addr))?;

    for event in &args.events {
        let name = event.clone();
        client
            .on(event, move |data| {
                let name = name.clone();
                async move {
                    println!("[{}] {}", name, data);
                    Value::Null
                }
            })
            .await
            .with_context(|| format!("Failed to subscribe to \"{}\"", event))?;
        tracing::info!("Listening for \"{}\"", event);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, closing connection");
    client.stop().await;
    Ok(())
}
