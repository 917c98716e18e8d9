//! Realtime client and connection controller
//!
//! # Architecture
//!
//! ```text
//! caller ──subscribe/dispose──> SubscriptionRegistry (mutex, synchronous)
//!    │                                   │
//!    └──rebuild commands──> Actor task ──┴─> one WebSocket connection
//!                               │
//!                               ├─ debounced rebuilds (burst → one connect)
//!                               ├─ heartbeat task while connected
//!                               ├─ stepped backoff on unintentional close
//!                               └─ inline parse + fan-out (arrival order)
//! ```
//!
//! A single actor task owns the socket and all connection state. Subscribe
//! and dispose mutate the shared registry synchronously and then nudge the
//! actor with a rebuild command; the actor tears down the old connection
//! before opening a new one, so at most one connection is ever live.

use crate::core::config::ClientConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::core::heartbeat;
use crate::core::protocol::{self, InboundMessage, RawEvent, RealtimeEvent};
use crate::core::registry::{Dispatcher, SubscriptionRegistry};
use crate::traits::{RealtimeError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Internal command messages for the actor task
#[derive(Debug)]
enum Command {
    /// Re-evaluate the channel set and rebuild the connection.
    /// Debounced for subscribe bursts, immediate for disposes.
    Rebuild { debounce: bool },
    /// Shut down the client
    Shutdown,
}

/// Observer events emitted by the client
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Connection opened
    Connected,
    /// Connection closed (any reason)
    Disconnected,
    /// Reconnection attempt in flight (consecutive-failure count)
    Reconnecting(usize),
    /// Server reported an error over the live connection
    ServerError { code: i64, message: String },
    /// Transport-level failure, handled internally by the reconnect loop
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub events_dispatched: u64,
    pub connection_state: ConnectionState,
}

/// Why the drive loop released its connection
#[derive(Debug)]
enum CloseReason {
    /// A rebuild command superseded this connection
    Superseded,
    /// Client is shutting down
    Shutdown,
    /// Remote end closed with the policy-violation marker
    Intentional,
    /// Remote end closed with any other code
    ServerClosed(Option<CloseCode>),
    /// Stream ended without a close frame
    StreamEnded,
    /// Transport failure (read or write)
    Transport(String),
}

enum BackoffOutcome {
    /// Delay elapsed or a rebuild superseded the wait; reconnect now
    Retry,
    /// Strategy gave up; stay idle until the next subscribe
    Exhausted,
    Shutdown,
}

/// Realtime subscription client
///
/// Maintains a single multiplexed WebSocket connection to the realtime
/// endpoint, encodes the union of all subscribed channels on the connection
/// URL, and fans inbound events out to matching subscriptions.
///
/// Created via [`crate::builder()`]:
///
/// ```ignore
/// let client = livechannels::builder()
///     .endpoint("wss://cloud.example.com/v1")
///     .project("my-project")
///     .build()
///     .await?;
///
/// let sub = client.subscribe::<ChatMessage, _, _, _>(["chat.1"], |event| {
///     println!("{}: {:?}", event.channels[0], event.payload);
/// })?;
///
/// // Dropping (or closing) the handle unsubscribes
/// drop(sub);
/// ```
pub struct RealtimeClient {
    registry: Arc<SubscriptionRegistry>,
    command_tx: mpsc::UnboundedSender<Command>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    event_rx: Receiver<ClientEvent>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RealtimeClient {
    /// Spawn the actor task for this configuration
    ///
    /// Called by the builder's `build()` method; use
    /// [`crate::builder()`] to create a client.
    pub(crate) fn spawn(config: ClientConfig) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let actor = Actor {
            config,
            registry: Arc::clone(&registry),
            state: Arc::clone(&state),
            metrics: Arc::clone(&metrics),
            command_rx,
            event_tx,
            attempts: 0,
        };
        let task_handle = tokio::spawn(actor.run());

        Self {
            registry,
            command_tx,
            state,
            metrics,
            event_rx,
            task_handle: Some(task_handle),
        }
    }

    /// Subscribe to one or more channels with a typed callback
    ///
    /// `T` is the payload type hint: for every matching event the raw payload
    /// is decoded into `T` and the callback invoked with the typed event.
    /// Decode failures are logged and skipped for this subscription without
    /// affecting others. Use `serde_json::Value` for untyped payloads.
    ///
    /// Rapid consecutive subscribes coalesce into a single connection
    /// rebuild. The returned [`Subscription`] unsubscribes on drop.
    pub fn subscribe<T, F, I, C>(&self, channels: I, callback: F) -> Result<Subscription>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(RealtimeEvent<T>) + Send + Sync + 'static,
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if channels.is_empty() {
            return Err(RealtimeError::Configuration(
                "subscribe requires at least one channel".into(),
            ));
        }

        let dispatch: Dispatcher = Arc::new(move |raw: &RawEvent| {
            match serde_json::from_value::<T>(raw.payload.clone()) {
                Ok(payload) => callback(RealtimeEvent {
                    channels: raw.channels.clone(),
                    timestamp: raw.timestamp.clone(),
                    payload,
                }),
                Err(e) => warn!(
                    payload_type = std::any::type_name::<T>(),
                    error = %e,
                    "payload decode failed, skipping callback"
                ),
            }
        });

        let id = self.registry.insert(channels, dispatch);
        if self
            .command_tx
            .send(Command::Rebuild { debounce: true })
            .is_err()
        {
            self.registry.remove(id);
            return Err(RealtimeError::ChannelSend("client is shut down".into()));
        }

        Ok(Subscription {
            id,
            registry: Arc::clone(&self.registry),
            command_tx: self.command_tx.clone(),
            disposed: false,
        })
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Snapshot of the channel set (union of all live subscriptions)
    pub fn active_channels(&self) -> Vec<String> {
        self.registry.active_channels()
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.registry.subscription_count()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            events_dispatched: self.metrics.events_dispatched(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive an observer event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an observer event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Shut down the client, closing any live connection
    pub async fn shutdown(mut self) -> Result<()> {
        info!("shutting down realtime client");
        self.state.set(ConnectionState::ShuttingDown);
        let _ = self.command_tx.send(Command::Shutdown);
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

/// Handle to a live subscription
///
/// Disposing (via [`Subscription::close`] or drop) removes the subscription
/// from the registry synchronously, then triggers an immediate connection
/// rebuild so unsubscribed channels stop receiving traffic. Disposing twice
/// is a no-op.
pub struct Subscription {
    id: u64,
    registry: Arc<SubscriptionRegistry>,
    command_tx: mpsc::UnboundedSender<Command>,
    disposed: bool,
}

impl Subscription {
    /// Opaque subscription identity
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unsubscribe explicitly
    pub fn close(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if self.registry.remove(self.id) {
            debug!(id = self.id, "subscription disposed");
            // Not debounced: removed channels must stop receiving promptly,
            // and an empty channel set tears the connection down.
            let _ = self.command_tx.send(Command::Rebuild { debounce: false });
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Actor task owning the connection, timers, and rebuild scheduling
struct Actor {
    config: ClientConfig,
    registry: Arc<SubscriptionRegistry>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: Sender<ClientEvent>,
    /// Consecutive-failure count; reset to 0 on every successful open
    attempts: usize,
}

impl Actor {
    async fn run(mut self) {
        // Wait for the first subscribe before doing anything
        let mut wait_for_trigger = true;

        loop {
            if wait_for_trigger {
                match self.command_rx.recv().await {
                    None | Some(Command::Shutdown) => break,
                    Some(Command::Rebuild { debounce }) => {
                        if debounce && self.coalesce().await {
                            break;
                        }
                    }
                }
            }
            wait_for_trigger = true;

            let channels = self.registry.active_channels();
            if channels.is_empty() {
                // Empty channel set: no connection may exist
                self.state.set(ConnectionState::Disconnected);
                debug!("channel set empty, staying disconnected");
                continue;
            }

            let url = self.config.connection_url(&channels);
            self.state.set(if self.attempts == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });
            if self.attempts > 0 {
                let _ = self.event_tx.send(ClientEvent::Reconnecting(self.attempts));
            }

            debug!(%url, "opening realtime connection");
            match connect_async(url.as_str()).await {
                Ok((ws, _)) => {
                    info!(channels = channels.len(), "realtime connection established");
                    self.attempts = 0;
                    self.state.set(ConnectionState::Connected);
                    let _ = self.event_tx.send(ClientEvent::Connected);

                    let reason = self.drive(ws).await;
                    self.state.set(ConnectionState::Disconnected);
                    let _ = self.event_tx.send(ClientEvent::Disconnected);

                    match reason {
                        CloseReason::Shutdown => break,
                        CloseReason::Superseded => {
                            // Rebuild right away with the current channel set
                            wait_for_trigger = false;
                        }
                        CloseReason::Intentional => {
                            info!("connection closed intentionally, not reconnecting");
                        }
                        unintentional => {
                            match &unintentional {
                                CloseReason::ServerClosed(code) => {
                                    warn!(?code, "connection closed by server")
                                }
                                CloseReason::StreamEnded => warn!("connection stream ended"),
                                CloseReason::Transport(err) => {
                                    error!(error = %err, "transport failure");
                                    let _ = self.event_tx.send(ClientEvent::Error(err.clone()));
                                }
                                _ => {}
                            }
                            match self.backoff().await {
                                BackoffOutcome::Retry => wait_for_trigger = false,
                                BackoffOutcome::Exhausted => {}
                                BackoffOutcome::Shutdown => break,
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to open realtime connection");
                    self.state.set(ConnectionState::Disconnected);
                    let _ = self.event_tx.send(ClientEvent::Error(e.to_string()));
                    match self.backoff().await {
                        BackoffOutcome::Retry => wait_for_trigger = false,
                        BackoffOutcome::Exhausted => {}
                        BackoffOutcome::Shutdown => break,
                    }
                }
            }
        }

        self.state.set(ConnectionState::Disconnected);
        info!("realtime client task exiting");
    }

    /// Debounce window: sleep, then drain queued rebuild commands so a burst
    /// of subscribes yields exactly one rebuild
    ///
    /// Returns true if a shutdown was seen while draining.
    async fn coalesce(&mut self) -> bool {
        tokio::time::sleep(self.config.debounce_window).await;
        loop {
            match self.command_rx.try_recv() {
                Ok(Command::Rebuild { .. }) => continue,
                Ok(Command::Shutdown) => return true,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// Wait out the backoff delay for the current attempt count
    ///
    /// A rebuild command arriving during the wait supersedes it (the rebuild
    /// re-reads current state, so it degrades to a teardown if the channel
    /// set emptied in the meantime).
    async fn backoff(&mut self) -> BackoffOutcome {
        let delay = match self.config.reconnect_strategy.next_delay(self.attempts) {
            Some(delay) => delay,
            None => {
                warn!(
                    attempts = self.attempts,
                    "reconnection strategy exhausted, waiting for next subscribe"
                );
                let _ = self
                    .event_tx
                    .send(ClientEvent::Error("reconnection strategy exhausted".into()));
                return BackoffOutcome::Exhausted;
            }
        };

        info!(?delay, attempt = self.attempts, "reconnecting after delay");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                self.attempts += 1;
                self.metrics.increment_reconnects();
                BackoffOutcome::Retry
            }
            cmd = self.command_rx.recv() => match cmd {
                None | Some(Command::Shutdown) => BackoffOutcome::Shutdown,
                Some(Command::Rebuild { debounce }) => {
                    if debounce && self.coalesce().await {
                        return BackoffOutcome::Shutdown;
                    }
                    BackoffOutcome::Retry
                }
            }
        }
    }

    /// Drive one live connection until something ends it
    async fn drive(&mut self, ws: WsStream) -> CloseReason {
        let (mut write, mut read) = ws.split();
        let mut heartbeat = heartbeat::spawn_heartbeat(self.config.heartbeat_interval);

        let reason = loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(message)) => {
                        if let Some(reason) = self.handle_message(message) {
                            break reason;
                        }
                    }
                    Some(Err(e)) => break CloseReason::Transport(e.to_string()),
                    None => break CloseReason::StreamEnded,
                },
                cmd = self.command_rx.recv() => match cmd {
                    None | Some(Command::Shutdown) => break CloseReason::Shutdown,
                    Some(Command::Rebuild { debounce }) => {
                        if debounce && self.coalesce().await {
                            break CloseReason::Shutdown;
                        }
                        break CloseReason::Superseded;
                    }
                },
                tick = heartbeat.tick() => {
                    if tick.is_none() {
                        break CloseReason::Transport("heartbeat task stopped".into());
                    }
                    debug!("heartbeat tick, sending ping");
                    if let Err(e) = write
                        .send(Message::Text(protocol::PING_FRAME.to_string()))
                        .await
                    {
                        break CloseReason::Transport(format!("failed to send ping: {e}"));
                    }
                    self.metrics.increment_sent();
                }
            }
        };

        // Heartbeat never outlives the connection
        heartbeat.stop();

        // Mark our own teardown with the policy-violation close code so it is
        // distinguishable from a server- or network-initiated close
        if matches!(reason, CloseReason::Superseded | CloseReason::Shutdown) {
            let frame = CloseFrame {
                code: CloseCode::Policy,
                reason: "".into(),
            };
            let _ = write.send(Message::Close(Some(frame))).await;
            let _ = write.close().await;
        }

        reason
    }

    /// Handle one inbound transport message; returns a close reason if the
    /// message ends the connection
    fn handle_message(&self, message: Message) -> Option<CloseReason> {
        match message {
            Message::Text(text) => {
                self.metrics.increment_received();
                self.handle_frame(&text);
                None
            }
            Message::Binary(_) => {
                warn!("binary frame ignored");
                None
            }
            Message::Close(frame) => {
                let code = frame.as_ref().map(|f| f.code);
                if code == Some(CloseCode::Policy) {
                    Some(CloseReason::Intentional)
                } else {
                    Some(CloseReason::ServerClosed(code))
                }
            }
            // Transport-level ping/pong is handled by tungstenite itself
            _ => None,
        }
    }

    /// Parse and dispatch one inbound text frame
    ///
    /// Runs inline on the actor path so frames are processed in arrival
    /// order. Malformed frames and server-reported errors never close the
    /// connection.
    fn handle_frame(&self, text: &str) {
        match protocol::parse_frame(text) {
            Ok(InboundMessage::Event(event)) => {
                let delivered = self.registry.dispatch(&event);
                if delivered > 0 {
                    self.metrics.add_dispatched(delivered as u64);
                    debug!(channels = ?event.channels, delivered, "event dispatched");
                } else {
                    debug!(channels = ?event.channels, "event dropped, no matching subscription");
                }
            }
            Ok(InboundMessage::ServerError(err)) => {
                error!(code = err.code, message = %err.message, "server reported realtime error");
                let _ = self.event_tx.send(ClientEvent::ServerError {
                    code: err.code,
                    message: err.message,
                });
            }
            Ok(InboundMessage::Pong) => {
                // Heartbeat acknowledgment, nothing to do
            }
            Ok(InboundMessage::Unknown(kind)) => {
                warn!(%kind, "unknown message type");
            }
            Err(e) => {
                error!(error = %e, "malformed frame skipped");
            }
        }
    }
}
