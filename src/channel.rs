//! Real-time channel to the backend.
//!
//! ## Design
//! - [`ChannelHandle`] owns one Socket.IO connection: a writer task fed by an
//!   unbounded mpsc queue and a reader task that decodes frames, answers
//!   pings, and dispatches events to the listener table.
//! - [`Listeners`] is the listener table: `Arc<Mutex<..>>` shared between the
//!   handle and the reader task.
//! - [`Subscription`] is a scoped registration. Dropping it deregisters it;
//!   closing the handle deregisters every subscription at once and makes
//!   pending `recv` calls return `None`, even for events already queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, trace, warn};

use crate::error::WandError;
use crate::socketio::{self, Packet};

/// An event as it came off the wire: name plus JSON payload.
pub type RawEvent = (String, serde_json::Value);

// ---------------------------------------------------------------------------
// Listener table
// ---------------------------------------------------------------------------

struct Listener {
    events: Vec<String>,
    tx: mpsc::UnboundedSender<RawEvent>,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: HashMap<u64, Listener>,
    /// Closed locally: queued events are discarded.
    closed: bool,
    /// Closed by the remote end: queued events still drain.
    hung_up: bool,
}

impl ListenerTable {
    fn accepting(&self) -> bool {
        !self.closed && !self.hung_up
    }
}

/// Shared table of event listeners for one connection.
#[derive(Clone, Default)]
pub struct Listeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl Listeners {
    /// Register for the given event names.
    ///
    /// Subscribing to a closed table yields a subscription that never
    /// receives anything.
    pub fn subscribe(&self, events: &[&str]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut id = None;
        if let Ok(mut guard) = self.table.lock() {
            if guard.accepting() {
                let next = guard.next_id;
                guard.next_id += 1;
                guard.entries.insert(
                    next,
                    Listener {
                        events: events.iter().map(|e| e.to_string()).collect(),
                        tx,
                    },
                );
                id = Some(next);
            }
        }
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
            rx,
        }
    }

    /// Deliver an event to every listener registered for `name`.
    ///
    /// Returns the number of listeners it reached. Listeners whose receiver
    /// is gone are pruned.
    pub fn dispatch(&self, name: &str, payload: serde_json::Value) -> usize {
        let mut guard = match self.table.lock() {
            Ok(g) => g,
            Err(_) => return 0,
        };
        if !guard.accepting() {
            return 0;
        }
        let mut delivered = 0;
        guard.entries.retain(|_, listener| {
            if !listener.events.iter().any(|e| e == name) {
                return !listener.tx.is_closed();
            }
            match listener.tx.send((name.to_string(), payload.clone())) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// Drop every listener and refuse new ones. Events already queued are
    /// discarded.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.table.lock() {
            guard.closed = true;
            guard.entries.clear();
        }
    }

    /// The remote end went away. Listeners receive what was already queued,
    /// then `None`.
    pub fn hang_up(&self) {
        if let Ok(mut guard) = self.table.lock() {
            guard.hung_up = true;
            guard.entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|g| g.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No further events will be dispatched, for either reason.
    pub fn is_closed(&self) -> bool {
        self.table.lock().map(|g| !g.accepting()).unwrap_or(true)
    }

    /// The remote end closed the connection before it was closed locally.
    pub fn is_hung_up(&self) -> bool {
        self.table.lock().map(|g| g.hung_up && !g.closed).unwrap_or(false)
    }
}

/// A live listener registration. Deregistered on drop.
pub struct Subscription {
    id: Option<u64>,
    table: Weak<Mutex<ListenerTable>>,
    rx: mpsc::UnboundedReceiver<RawEvent>,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// `None` once the channel is closed locally, even if events were
    /// queued. After a remote hang-up, queued events are still returned in
    /// order before `None`.
    pub async fn recv(&mut self) -> Option<RawEvent> {
        if self.discarding() {
            return None;
        }
        let event = self.rx.recv().await?;
        if self.discarding() {
            None
        } else {
            Some(event)
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<RawEvent> {
        if self.discarding() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Nothing further will be dispatched to this subscription.
    pub fn is_closed(&self) -> bool {
        let (Some(id), Some(table)) = (self.id, self.table.upgrade()) else {
            return true;
        };
        let guard = match table.lock() {
            Ok(guard) => guard,
            Err(_) => return true,
        };
        !guard.accepting() || !guard.entries.contains_key(&id)
    }

    fn discarding(&self) -> bool {
        let Some(table) = self.table.upgrade() else {
            return true;
        };
        table.lock().map(|g| g.closed).unwrap_or(true)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let (Some(id), Some(table)) = (self.id, self.table.upgrade()) else {
            return;
        };
        let removed = match table.lock() {
            Ok(mut guard) => guard.entries.remove(&id).is_some(),
            Err(_) => false,
        };
        if removed {
            trace!(listener = id, "subscription dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Connection handle
// ---------------------------------------------------------------------------

/// The one real-time connection a session owns.
pub struct ChannelHandle {
    url: String,
    outbound: Option<mpsc::UnboundedSender<String>>,
    listeners: Listeners,
    reader: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Open a Socket.IO connection at `url` (a `ws://` or `wss://` endpoint
    /// including the `/socket.io/?EIO=4&transport=websocket` path).
    ///
    /// # Returns
    /// - `Ok(handle)` once the websocket handshake completes.
    /// - `Err(WandError::Connect)` on timeout or handshake failure.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, WandError> {
        let (ws, _response) =
            tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| WandError::Connect {
                    url: url.to_string(),
                    detail: format!("timed out after {}ms", connect_timeout.as_millis()),
                })?
                .map_err(|e| WandError::Connect {
                    url: url.to_string(),
                    detail: e.to_string(),
                })?;

        let (mut ws_sink, mut ws_stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let listeners = Listeners::default();

        // Writer: drains the queue, then closes the socket once every sender is gone.
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if ws_sink.send(WsMessage::Text(frame)).await.is_err() {
                    break;
                }
            }
            let _ = ws_sink.close().await;
        });

        let reader_listeners = listeners.clone();
        let pong_tx = out_tx.clone();
        let reader_url = url.to_string();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                let text = match msg {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, url = %reader_url, "channel read failed");
                        break;
                    }
                };
                match socketio::decode(&text) {
                    Ok(Packet::Ping) => {
                        let _ = pong_tx.send(socketio::encode(&Packet::Pong));
                    }
                    Ok(Packet::Event { name, payload, .. }) => {
                        let delivered = reader_listeners.dispatch(&name, payload);
                        debug!(event = %name, delivered, "channel event");
                    }
                    Ok(Packet::Open(handshake)) => {
                        debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "engine open");
                    }
                    Ok(Packet::Connect { sid }) => {
                        info!(sid = ?sid, url = %reader_url, "channel connected");
                    }
                    Ok(Packet::ConnectError(detail)) => {
                        warn!(detail = %detail, "channel connect refused");
                        break;
                    }
                    Ok(Packet::Disconnect) | Ok(Packet::Close) => break,
                    Ok(Packet::Pong) | Ok(Packet::Noop) => {}
                    Err(e) => warn!(error = %e, "dropping malformed frame"),
                }
            }
            reader_listeners.hang_up();
            info!(url = %reader_url, "channel reader stopped");
        });

        out_tx
            .send(socketio::encode(&Packet::Connect { sid: None }))
            .map_err(|_| WandError::ChannelClosed)?;

        Ok(ChannelHandle {
            url: url.to_string(),
            outbound: Some(out_tx),
            listeners,
            reader: Some(reader),
        })
    }

    /// A handle with no socket behind it. Outbound frames land in the
    /// returned receiver; inbound events are injected through
    /// [`listeners`](Self::listeners).
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ChannelHandle {
            url: "detached".to_string(),
            outbound: Some(tx),
            listeners: Listeners::default(),
            reader: None,
        };
        (handle, rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn subscribe(&self, events: &[&str]) -> Subscription {
        self.listeners.subscribe(events)
    }

    pub fn is_open(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed()) && !self.listeners.is_closed()
    }

    /// Queue an event for the backend. No acknowledgement is awaited.
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) -> Result<(), WandError> {
        if !self.is_open() {
            return Err(WandError::ChannelClosed);
        }
        let value = serde_json::to_value(payload).map_err(|e| WandError::payload(event, e))?;
        let tx = self.outbound.as_ref().ok_or(WandError::ChannelClosed)?;
        tx.send(socketio::event_frame(event, value))
            .map_err(|_| WandError::ChannelClosed)
    }

    /// Disconnect, stop reading, and deregister every listener. Idempotent.
    pub fn close(&mut self) {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(socketio::encode(&Packet::Disconnect));
            debug!(url = %self.url, "channel closing");
        }
        self.listeners.clear();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}
