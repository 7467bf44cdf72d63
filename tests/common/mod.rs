//! Common test utilities for relaybus integration tests
//!
//! Provides a hub spawner bound to an ephemeral port and `RawPeer`, a
//! bare protocol speaker used to pin down exact wire behavior without
//! going through the client's conveniences.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use relaybus::{Frame, FrameScanner, Hub, HubHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Spawn a hub on an OS-assigned port.
pub async fn spawn_hub() -> (HubHandle, SocketAddr) {
    let hub = Hub::bind("127.0.0.1:0").await.expect("bind hub");
    let addr = hub.local_addr().expect("local addr");
    (hub.spawn(), addr)
}

/// Registrations race the frames that depend on them when they travel
/// on different connections; give the hub a moment to process.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}

/// A peer speaking the wire protocol directly over a TCP stream.
pub struct RawPeer {
    stream: TcpStream,
    scanner: FrameScanner,
    queue: VecDeque<Frame>,
}

impl RawPeer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to hub");
        Self {
            stream,
            scanner: FrameScanner::new(),
            queue: VecDeque::new(),
        }
    }

    /// Send one frame as its bare JSON text, no delimiter.
    pub async fn send(&mut self, frame: &Frame) {
        let json = serde_json::to_string(frame).expect("serialize frame");
        self.stream
            .write_all(json.as_bytes())
            .await
            .expect("write frame");
    }

    /// Send raw bytes exactly as given, for split and garbage cases.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write bytes");
    }

    /// Receive the next frame, failing the test if none arrives in time.
    pub async fn recv(&mut self) -> Frame {
        self.try_recv(Duration::from_secs(2))
            .await
            .expect("expected a frame before the deadline")
    }

    /// Receive the next frame if one arrives before `wait` elapses.
    pub async fn try_recv(&mut self, wait: Duration) -> Option<Frame> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(frame) = self.queue.pop_front() {
                return Some(frame);
            }
            let mut buf = [0u8; 4096];
            match tokio::time::timeout_at(deadline, self.stream.read(&mut buf)).await {
                Ok(Ok(0)) => return None,
                Ok(Ok(n)) => {
                    for raw in self.scanner.push(&buf[..n]) {
                        let frame = serde_json::from_slice(&raw).expect("frame parses");
                        self.queue.push_back(frame);
                    }
                }
                Ok(Err(_)) | Err(_) => return None,
            }
        }
    }

    /// Assert nothing is delivered to this peer for `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Some(frame) = self.try_recv(wait).await {
            panic!("expected no frame, got {:?}", frame);
        }
    }

    /// Close the connection from this side.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// Shorthand frame constructors for hand-written wire traffic.
pub fn on(event: &str) -> Frame {
    Frame::On {
        event_name: event.to_string(),
    }
}

pub fn emit(event: &str, data: serde_json::Value, id: Option<&str>) -> Frame {
    Frame::Emit {
        event_name: event.to_string(),
        data,
        id: id.map(str::to_string),
    }
}

pub fn ret(event: &str, data: serde_json::Value, id: &str) -> Frame {
    Frame::Return {
        event_name: Some(event.to_string()),
        data,
        id: Some(id.to_string()),
    }
}
