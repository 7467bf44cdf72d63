//! Peer client: one persistent connection to the hub
//!
//! A [`PeerClient`] owns a single TCP connection. Incoming bytes are
//! reassembled into frames by a background read task; `emit` frames are
//! dispatched to registered handlers, `return` frames resolve pending
//! [`PeerClient::acquire`] waits, and `error` frames are logged.
//!
//! Handlers registered under one event name stack in registration
//! order, but only the first ever services an incoming frame. Later
//! registrations are retained and become live only if earlier ones are
//! somehow gone, which today means never; register distinct event names
//! for distinct behavior.
//!
//! Each handler invocation runs on its own task, so a slow handler
//! never stalls frame parsing or other events on the same connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{RelayError, Result};
use crate::framing::FrameScanner;
use crate::protocol::{parse_or_log, Frame};

/// Boxed handler invoked for events delivered to this peer.
///
/// The resolved value becomes the reply payload when the incoming frame
/// carried a correlation id; it is discarded otherwise.
pub type EventHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Value> + Send + Sync>;

/// Connection state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Running,
    Closed,
}

/// A peer endpoint on the bus.
pub struct PeerClient {
    inner: Arc<ClientInner>,
    reader: JoinHandle<()>,
}

struct ClientInner {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    status: Mutex<ClientStatus>,
}

impl PeerClient {
    /// Connect to a hub and start the background read task.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();

        let inner = Arc::new(ClientInner {
            writer: tokio::sync::Mutex::new(write_half),
            handlers: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            status: Mutex::new(ClientStatus::Running),
        });

        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&inner)));
        Ok(Self { inner, reader })
    }

    /// Register a handler and subscribe to `event` at the hub.
    ///
    /// The handler receives the frame's `data` payload. If the same name
    /// is registered more than once, only the first handler is ever
    /// invoked.
    pub async fn on<F, Fut>(&self, event: &str, handler: F) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Value> + Send + 'static,
    {
        let boxed: EventHandler =
            Arc::new(move |data| Box::pin(handler(data)) as BoxFuture<'static, Value>);
        self.inner
            .handlers
            .lock()
            .entry(event.to_string())
            .or_default()
            .push(boxed);
        self.inner
            .send(&Frame::On {
                event_name: event.to_string(),
            })
            .await
    }

    /// Subscribe to `event` without a local handler. Deliveries for the
    /// name are dropped on arrival; if one carries a correlation id, no
    /// reply is ever produced and the invoker keeps waiting.
    pub async fn subscribe(&self, event: &str) -> Result<()> {
        self.inner
            .send(&Frame::On {
                event_name: event.to_string(),
            })
            .await
    }

    /// Fire-and-forget invocation of `event` on its subscribers.
    pub async fn emit(&self, event: &str, data: Value) -> Result<()> {
        self.inner
            .send(&Frame::Emit {
                event_name: event.to_string(),
                data,
                id: None,
            })
            .await
    }

    /// Invoke `event` and await the correlated reply.
    ///
    /// There is no timeout: if no subscriber exists or none replies,
    /// this waits forever. Use [`acquire_timeout`](Self::acquire_timeout)
    /// to bound the wait.
    pub async fn acquire(&self, event: &str, data: Value) -> Result<Value> {
        let (id, rx) = self.inner.register_reply();
        let frame = Frame::Emit {
            event_name: event.to_string(),
            data,
            id: Some(id.clone()),
        };
        if let Err(err) = self.inner.send(&frame).await {
            self.inner.pending.lock().remove(&id);
            return Err(err);
        }
        rx.await.map_err(|_| RelayError::ConnectionClosed)
    }

    /// Bounded variant of [`acquire`](Self::acquire). On expiry the
    /// pending entry is removed, so a reply arriving later is dropped
    /// instead of resolving a wait that no longer exists.
    pub async fn acquire_timeout(
        &self,
        event: &str,
        data: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let (id, rx) = self.inner.register_reply();
        let frame = Frame::Emit {
            event_name: event.to_string(),
            data,
            id: Some(id.clone()),
        };
        if let Err(err) = self.inner.send(&frame).await {
            self.inner.pending.lock().remove(&id);
            return Err(err);
        }
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(RelayError::ConnectionClosed),
            Err(_) => {
                self.inner.pending.lock().remove(&id);
                Err(RelayError::ReplyTimeout {
                    event: event.to_string(),
                })
            }
        }
    }

    /// Current connection state.
    pub fn status(&self) -> ClientStatus {
        self.inner.status()
    }

    /// Tear the connection down. Further sends fail with
    /// [`RelayError::ConnectionClosed`]. Waits already in flight are not
    /// failed; they keep waiting unless bounded.
    pub async fn stop(&self) {
        self.inner.mark_closed();
        {
            let mut writer = self.inner.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        self.reader.abort();
    }
}

impl Drop for PeerClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl ClientInner {
    fn status(&self) -> ClientStatus {
        *self.status.lock()
    }

    fn mark_closed(&self) {
        *self.status.lock() = ClientStatus::Closed;
    }

    fn register_reply(&self) -> (String, oneshot::Receiver<Value>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        (id, rx)
    }

    async fn send(&self, frame: &Frame) -> Result<()> {
        if self.status() == ClientStatus::Closed {
            return Err(RelayError::ConnectionClosed);
        }
        let json = serde_json::to_string(frame)?;
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.write_all(json.as_bytes()).await {
            self.mark_closed();
            return Err(err.into());
        }
        Ok(())
    }
}

async fn read_loop(mut read_half: OwnedReadHalf, inner: Arc<ClientInner>) {
    let mut scanner = FrameScanner::new();
    let mut buf = [0u8; 4096];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::info!("Hub closed the connection");
                break;
            }
            Ok(n) => {
                for raw in scanner.push(&buf[..n]) {
                    if let Some(frame) = parse_or_log(&raw) {
                        dispatch(&inner, frame);
                    }
                }
            }
            Err(err) => {
                tracing::error!("Connection error: {}", err);
                break;
            }
        }
    }
    inner.mark_closed();
}

fn dispatch(inner: &Arc<ClientInner>, frame: Frame) {
    match frame {
        Frame::Emit {
            event_name,
            data,
            id,
        } => dispatch_emit(inner, event_name, data, id),
        Frame::Return { data, id, .. } => {
            let Some(id) = id else {
                tracing::debug!("Ignoring reply without correlation id");
                return;
            };
            let sender = inner.pending.lock().remove(&id);
            match sender {
                Some(tx) => {
                    let _ = tx.send(data);
                }
                None => tracing::debug!("Ignoring reply with no pending wait (id {})", id),
            }
        }
        Frame::Error { msg, event_name } => {
            tracing::warn!(
                "Hub error{}: {}",
                event_name
                    .map(|e| format!(" for \"{}\"", e))
                    .unwrap_or_default(),
                msg.as_deref().unwrap_or("unspecified")
            );
        }
        Frame::On { event_name } => {
            tracing::debug!(
                "Ignoring subscription frame for \"{}\" sent to a peer",
                event_name
            );
        }
    }
}

fn dispatch_emit(inner: &Arc<ClientInner>, event_name: String, data: Value, id: Option<String>) {
    // First-registered handler wins; the rest of the list is never
    // consulted.
    let handler = {
        let handlers = inner.handlers.lock();
        handlers
            .get(&event_name)
            .and_then(|list| list.first())
            .cloned()
    };
    let Some(handler) = handler else {
        tracing::debug!("No local handler for \"{}\", frame dropped", event_name);
        return;
    };

    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        let result = handler(data).await;
        if let Some(id) = id {
            let reply = Frame::Return {
                event_name: Some(event_name),
                data: result,
                id: Some(id),
            };
            if let Err(err) = inner.send(&reply).await {
                tracing::warn!("Failed to send reply: {}", err);
            }
        }
    });
}
