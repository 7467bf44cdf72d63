//! Per-connection task: frame reassembly in, queued frames out
//!
//! Each connection runs one task that multiplexes three things: bytes
//! arriving on the socket (fed through a [`FrameScanner`]), frames
//! queued for this peer by the routing tables, and the hub-wide
//! shutdown signal. Whatever ends the loop, the connection's traces are
//! removed from the tables before the task exits.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

use crate::framing::FrameScanner;
use crate::protocol::parse_or_log;

use super::HubState;

pub(super) async fn serve(
    stream: TcpStream,
    state: Arc<HubState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer_addr = stream.peer_addr().ok();
    let (mut read_half, mut write_half) = stream.into_split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let conn = state.register_conn(outbound_tx);
    tracing::debug!("Connection {} open ({:?})", conn, peer_addr);

    let mut scanner = FrameScanner::new();
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            read = read_half.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::info!("Connection {} closed by peer", conn);
                    break;
                }
                Ok(n) => {
                    for raw in scanner.push(&buf[..n]) {
                        if let Some(frame) = parse_or_log(&raw) {
                            state.handle_frame(conn, frame);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("Connection {} read error: {}", conn, err);
                    break;
                }
            },
            queued = outbound_rx.recv() => match queued {
                Some(json) => {
                    if let Err(err) = write_half.write_all(json.as_bytes()).await {
                        tracing::warn!("Connection {} write error: {}", conn, err);
                        break;
                    }
                }
                None => break,
            },
            // Fires on shutdown(), and again as an Err when the hub is
            // dropped outright; both end the connection.
            _ = shutdown.changed() => {
                tracing::debug!("Connection {} closing on hub shutdown", conn);
                break;
            }
        }
    }

    state.remove_conn(conn);
    let _ = write_half.shutdown().await;
    tracing::debug!("Connection {} cleaned up", conn);
}
