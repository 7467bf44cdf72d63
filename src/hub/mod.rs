//! Broker hub: accepts peer connections and routes frames between them
//!
//! # Architecture
//!
//! ```text
//!   peer A ──┐                       ┌── peer C
//!             ├── TcpListener ── Hub ─┤
//!   peer B ──┘          │             └── peer D
//!                       ▼
//!                   HubState
//!        subscribers   event name → {conn}
//!        pending       correlation id → caller conn
//!        outbound      conn → frame queue
//! ```
//!
//! Every accepted socket gets its own task (see [`connection`]) that
//! parses frames off the read half and drains an outbound queue into
//! the write half. All routing is plain synchronous table work under
//! one lock, so a stalled peer cannot block another: frames for a slow
//! peer pile up in its queue while everyone else proceeds.
//!
//! The hub never interprets `data` payloads and never times anything
//! out on its own. Subscriptions and pending replies vanish only when
//! their connection does.

mod connection;

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::protocol::Frame;

type ConnId = u64;

/// A bound hub that has not started accepting yet.
pub struct Hub {
    listener: TcpListener,
    state: Arc<HubState>,
    shutdown_tx: watch::Sender<bool>,
}

impl Hub {
    /// Bind the hub listener. Pass port 0 to let the OS pick.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            listener,
            state: Arc::new(HubState::new()),
            shutdown_tx,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Snapshot of the routing tables.
    pub fn stats(&self) -> HubStats {
        self.state.stats()
    }

    /// Accept and serve connections until the process ends.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::info!("Accepted connection from {}", addr);
                    let state = Arc::clone(&self.state);
                    let shutdown_rx = self.shutdown_tx.subscribe();
                    tokio::spawn(connection::serve(stream, state, shutdown_rx));
                }
                Err(err) => {
                    tracing::error!("Accept failed: {}", err);
                }
            }
        }
    }

    /// Run the hub on a background task. The returned handle stops the
    /// hub when shut down or dropped.
    pub fn spawn(self) -> HubHandle {
        let state = Arc::clone(&self.state);
        let shutdown = self.shutdown_tx.clone();
        let task = tokio::spawn(async move {
            if let Err(err) = self.run().await {
                tracing::error!("Hub terminated: {}", err);
            }
        });
        HubHandle {
            state,
            shutdown,
            task,
        }
    }
}

/// Handle to a hub running in the background. Dropping it stops the
/// accept loop and closes every open connection.
pub struct HubHandle {
    state: Arc<HubState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HubHandle {
    /// Snapshot of the routing tables.
    pub fn stats(&self) -> HubStats {
        self.state.stats()
    }

    /// Stop accepting and close every open connection.
    pub fn shutdown(self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

impl Drop for HubHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

/// Snapshot of hub routing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Open connections.
    pub connections: usize,
    /// Event names with at least one subscriber.
    pub events: usize,
    /// Correlation ids still awaiting a reply.
    pub pending_replies: usize,
}

/// Shared routing state, one per hub.
struct HubState {
    tables: Mutex<Tables>,
    next_conn_id: AtomicU64,
}

#[derive(Default)]
struct Tables {
    /// Event name → connections subscribed to it.
    subscribers: HashMap<String, HashSet<ConnId>>,
    /// Reverse index of `subscribers`, for close cleanup.
    subscribed_by: HashMap<ConnId, HashSet<String>>,
    /// Correlation id → connection owed the reply.
    pending: HashMap<String, ConnId>,
    /// Outbound frame queue of every open connection.
    outbound: HashMap<ConnId, mpsc::UnboundedSender<String>>,
}

impl HubState {
    fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            next_conn_id: AtomicU64::new(1),
        }
    }

    fn register_conn(&self, tx: mpsc::UnboundedSender<String>) -> ConnId {
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.tables.lock().outbound.insert(id, tx);
        id
    }

    /// Remove every trace of a closed connection: its outbound queue,
    /// all of its subscriptions (dropping event entries that become
    /// empty), and any reply it was still owed.
    fn remove_conn(&self, conn: ConnId) {
        let mut tables = self.tables.lock();
        tables.outbound.remove(&conn);

        if let Some(events) = tables.subscribed_by.remove(&conn) {
            for event in events {
                let emptied = match tables.subscribers.get_mut(&event) {
                    Some(set) => {
                        set.remove(&conn);
                        set.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    tables.subscribers.remove(&event);
                }
            }
        }

        // A reply owed to this connection can never be delivered now.
        tables.pending.retain(|_, caller| *caller != conn);
    }

    fn handle_frame(&self, conn: ConnId, frame: Frame) {
        match frame {
            Frame::On { event_name } => self.register(conn, event_name),
            Frame::Emit {
                event_name,
                data,
                id,
            } => self.route_emit(conn, event_name, data, id),
            Frame::Return {
                event_name,
                data,
                id,
            } => self.route_return(conn, event_name, data, id),
            Frame::Error { msg, .. } => {
                // Peers have no business sending these; note and move on.
                tracing::warn!("Ignoring error frame from connection {}: {:?}", conn, msg);
            }
        }
    }

    fn register(&self, conn: ConnId, event: String) {
        tracing::debug!("Connection {} subscribed to \"{}\"", conn, event);
        let mut tables = self.tables.lock();
        tables
            .subscribers
            .entry(event.clone())
            .or_default()
            .insert(conn);
        tables.subscribed_by.entry(conn).or_default().insert(event);
    }

    fn route_emit(&self, caller: ConnId, event: String, data: Value, id: Option<String>) {
        let mut tables = self.tables.lock();
        let targets: Vec<ConnId> = tables
            .subscribers
            .get(&event)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        if targets.is_empty() {
            tracing::debug!(
                "No subscriber for \"{}\", notifying connection {}",
                event,
                caller
            );
            let error = Frame::Error {
                msg: Some(format!("no subscriber for event: {}", event)),
                event_name: Some(event),
            };
            send_to(&tables, caller, &error);
            return;
        }

        // One pending entry regardless of fan-out width: the first
        // subscriber to answer wins, the rest are dropped.
        if let Some(id) = &id {
            tables.pending.insert(id.clone(), caller);
        }

        let count = targets.len();
        tracing::debug!("Routing \"{}\" to {} subscriber(s)", event, count);
        let forward = Frame::Emit {
            event_name: event,
            data,
            id,
        };
        match serde_json::to_string(&forward) {
            Ok(json) => {
                for target in targets {
                    if let Some(tx) = tables.outbound.get(&target) {
                        let _ = tx.send(json.clone());
                    }
                }
            }
            Err(err) => tracing::error!("Failed to serialize forwarded frame: {}", err),
        }
    }

    fn route_return(
        &self,
        from: ConnId,
        event_name: Option<String>,
        data: Value,
        id: Option<String>,
    ) {
        let Some(id) = id else {
            tracing::debug!("Dropping reply without correlation id from connection {}", from);
            return;
        };
        let mut tables = self.tables.lock();
        let Some(caller) = tables.pending.remove(&id) else {
            tracing::debug!("Dropping reply with no pending caller (id {})", id);
            return;
        };
        let reply = Frame::Return {
            event_name,
            data,
            id: Some(id),
        };
        send_to(&tables, caller, &reply);
    }

    fn stats(&self) -> HubStats {
        let tables = self.tables.lock();
        HubStats {
            connections: tables.outbound.len(),
            events: tables.subscribers.len(),
            pending_replies: tables.pending.len(),
        }
    }
}

/// Queue one frame for a single connection. A missing or closed queue
/// means the connection is gone; the frame is silently dropped.
fn send_to(tables: &Tables, conn: ConnId, frame: &Frame) {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!("Failed to serialize frame: {}", err);
            return;
        }
    };
    if let Some(tx) = tables.outbound.get(&conn) {
        let _ = tx.send(json);
    }
}
