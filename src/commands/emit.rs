//! Emit command handler
//!
//! Connects as a short-lived peer, fires one invocation and exits. With
//! `--reply` it waits for the correlated reply and prints it to stdout;
//! without `--timeout` that wait is unbounded, matching the library
//! default.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::cli::EmitArgs;
use crate::client::PeerClient;

/// Run a one-shot invocation against the hub.
pub async fn run_emit(args: &EmitArgs) -> Result<()> {
    let data: Value = match &args.data {
        Some(text) => serde_json::from_str(text).context("--data is not valid JSON")?,
        None => Value::Null,
    };

    let client = PeerClient::connect(args.addr.as_str())
        .await
        .with_context(|| format!("Failed to connect to hub at {}", args.addr))?;

    if args.reply {
        let reply = match args.timeout {
            Some(secs) => {
                client
                    .acquire_timeout(&args.event, data, Duration::from_secs(secs))
                    .await?
            }
            None => client.acquire(&args.event, data).await?,
        };
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        client.emit(&args.event, data).await?;
        tracing::info!("Emitted \"{}\"", args.event);
    }

    client.stop().await;
    Ok(())
}
