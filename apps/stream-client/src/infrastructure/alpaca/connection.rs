//! Connection Lifecycle Manager
//!
//! Owns the WebSocket and drives the connect → authenticate → stream state
//! machine, including the reconnect/backoff policy.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect──► Connecting ──socket open──► AwaitingAuth
//!        ▲                                                   │ auth frame sent
//!        │                                                   ▼
//!        └──────socket error / close / keepalive──── Authenticated
//! ```
//!
//! Every failure path converges on the same disconnect handling: registry
//! confirmations are cleared, the pending set is repopulated, and a
//! reconnect is scheduled with exponential backoff. The attempt counter is
//! reset only upon reaching `Authenticated`; a socket that opens but never
//! authenticates still consumes an attempt when it closes. After the
//! attempt budget is exhausted the task parks in `Disconnected` and stops;
//! a new client must be constructed to recover.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::auth::{ConnectionState, Credentials};
use super::codec::{CodecError, Decoded, JsonCodec};
use super::messages::SubscriptionRequest;
use super::reconnect::{BackoffConfig, BackoffPolicy};
use crate::domain::dispatch::dispatch;
use crate::domain::registry::SubscriptionRegistry;
use crate::infrastructure::config::{ClientSettings, WebSocketSettings};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the connection task.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error on an outbound frame.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Connection-level failure with reason.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed by the server or the stream ended.
    #[error("connection closed")]
    ConnectionClosed,

    /// No pong within the keepalive timeout.
    #[error("keepalive timeout")]
    KeepaliveTimeout,
}

// =============================================================================
// Client Events
// =============================================================================

/// Lifecycle events emitted to the embedding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Authenticated and streaming; subscriptions have been replayed.
    Connected,
    /// Connection lost; a reconnect may follow.
    Disconnected,
    /// Reconnect scheduled.
    Reconnecting {
        /// Reconnection attempt number, counted from 1.
        attempt: u32,
    },
    /// The reconnect attempt budget is exhausted; the client will not
    /// recover on its own.
    ReconnectsExhausted,
}

// =============================================================================
// Configuration
// =============================================================================

/// Keepalive ping configuration.
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Interval between ping frames.
    pub ping_interval: Duration,
    /// Timeout for a pong response before the connection is considered
    /// dead.
    pub pong_timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(20),
        }
    }
}

impl KeepaliveConfig {
    /// Create configuration from [`WebSocketSettings`].
    #[must_use]
    pub const fn from_settings(settings: &WebSocketSettings) -> Self {
        Self {
            ping_interval: settings.keepalive_interval,
            pong_timeout: settings.keepalive_timeout,
        }
    }
}

/// Configuration for the connection task.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// API credentials.
    pub credentials: Credentials,
    /// Reconnection configuration.
    pub backoff: BackoffConfig,
    /// Keepalive configuration.
    pub keepalive: KeepaliveConfig,
}

impl ConnectionConfig {
    /// Derive the connection configuration from client settings.
    #[must_use]
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            url: settings.stream_url(),
            credentials: settings.credentials.clone(),
            backoff: BackoffConfig::from_settings(&settings.websocket),
            keepalive: KeepaliveConfig::from_settings(&settings.websocket),
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

/// State shared between the facade and the connection task.
///
/// One mutex guards the registry, the pending set inside it, and the
/// connection state, so subscribe/unsubscribe calls are serialized against
/// inbound message handling and no update is lost.
pub(crate) struct SharedState {
    /// Per-symbol consumer interest and pending subscriptions.
    pub(crate) registry: SubscriptionRegistry,
    /// Current lifecycle state; owned by the connection task, read by the
    /// facade to decide between an immediate frame and the pending set.
    pub(crate) connection: ConnectionState,
    /// Set once by `close()`; the client never leaves this state.
    pub(crate) closed: bool,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            connection: ConnectionState::Disconnected,
            closed: false,
        }
    }
}

// =============================================================================
// Connection Task
// =============================================================================

/// The connection lifecycle task.
///
/// Created by the facade and consumed by `run`, which lives until the
/// client is closed, the facade is dropped, or the reconnect budget runs
/// out.
pub(crate) struct Connection {
    config: ConnectionConfig,
    codec: JsonCodec,
    shared: Arc<Mutex<SharedState>>,
    event_tx: mpsc::Sender<ClientEvent>,
    cancel: CancellationToken,
}

impl Connection {
    pub(crate) fn new(
        config: ConnectionConfig,
        shared: Arc<Mutex<SharedState>>,
        event_tx: mpsc::Sender<ClientEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            shared,
            event_tx,
            cancel,
        }
    }

    /// Run the connection loop until cancelled or out of attempts.
    pub(crate) async fn run(self, mut frame_rx: mpsc::UnboundedReceiver<SubscriptionRequest>) {
        let mut policy = BackoffPolicy::new(self.config.backoff.clone());

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let result = self.connect_and_stream(&mut frame_rx, &mut policy).await;
            self.mark_disconnected();

            match result {
                // Cancelled, or the facade went away.
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stream connection lost");
                    let _ = self.event_tx.try_send(ClientEvent::Disconnected);

                    let Some(delay) = policy.next_delay() else {
                        tracing::error!(
                            attempts = policy.attempt(),
                            "max reconnect attempts reached"
                        );
                        let _ = self.event_tx.try_send(ClientEvent::ReconnectsExhausted);
                        break;
                    };

                    let attempt = policy.attempt();
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        "reconnecting to market data stream"
                    );
                    let _ = self.event_tx.try_send(ClientEvent::Reconnecting { attempt });

                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Connect, authenticate, and stream until an error or cancellation.
    async fn connect_and_stream(
        &self,
        frame_rx: &mut mpsc::UnboundedReceiver<SubscriptionRequest>,
        policy: &mut BackoffPolicy,
    ) -> Result<(), ConnectionError> {
        // Frames queued for a previous socket are invalidated by the
        // reconnect; the post-auth replay re-derives them from the
        // registry.
        drain_stale_frames(frame_rx);

        self.set_state(ConnectionState::Connecting);
        tracing::info!(url = %self.config.url, "connecting to market data stream");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Socket is open: authenticate before anything else. The server
        // drops connections that stay unauthenticated.
        self.set_state(ConnectionState::AwaitingAuth);
        let auth = self.codec.encode(&self.config.credentials.to_auth_request())?;
        write.send(Message::Text(auth.into())).await?;

        let mut ping_interval = tokio::time::interval(self.config.keepalive.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_pong = Instant::now();
        let mut awaiting_pong = false;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Ok(());
                }
                _ = ping_interval.tick() => {
                    if awaiting_pong && last_pong.elapsed() > self.config.keepalive.pong_timeout {
                        tracing::warn!("keepalive timeout, dropping connection");
                        return Err(ConnectionError::KeepaliveTimeout);
                    }
                    write.send(Message::Ping(vec![].into())).await?;
                    awaiting_pong = true;
                }
                frame = frame_rx.recv() => {
                    match frame {
                        Some(request) => {
                            let json = self.codec.encode(&request)?;
                            write.send(Message::Text(json.into())).await?;
                        }
                        // The facade is gone; nobody is left to serve.
                        None => return Ok(()),
                    }
                }
                message = read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            last_pong = Instant::now();
                            awaiting_pong = false;
                            self.handle_frame(&text, &mut write, policy).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_pong = Instant::now();
                            awaiting_pong = false;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("server sent close frame");
                            return Err(ConnectionError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("stream ended");
                            return Err(ConnectionError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Handle one inbound text frame.
    async fn handle_frame<W>(
        &self,
        text: &str,
        write: &mut W,
        policy: &mut BackoffPolicy,
    ) -> Result<(), ConnectionError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        match self.codec.decode(text) {
            Ok(Decoded::Authenticated) => {
                // Reaching authenticated is the only thing that restores
                // the full reconnect budget.
                policy.reset();

                let replay = {
                    let mut shared = self.shared.lock();
                    shared.connection = ConnectionState::Authenticated;
                    let symbols = shared.registry.flush_pending();
                    (!symbols.is_empty()).then(|| SubscriptionRequest::subscribe(symbols))
                };

                tracing::info!("stream authenticated");

                if let Some(request) = replay {
                    tracing::debug!(
                        symbols = request.trades.len(),
                        "subscribing pending and replayed symbols"
                    );
                    let json = self.codec.encode(&request)?;
                    write.send(Message::Text(json.into())).await.map_err(|e| {
                        ConnectionError::ConnectionFailed(format!("failed to send subscribe: {e}"))
                    })?;
                }

                let _ = self.event_tx.try_send(ClientEvent::Connected);
            }
            Ok(Decoded::Event { symbol, event }) => {
                let consumers = self.shared.lock().registry.consumers_for(&symbol);
                let delivered = dispatch(&symbol, &consumers, &event);
                tracing::trace!(symbol = %symbol, delivered, "market event dispatched");
            }
            Ok(Decoded::Ignored) => {}
            Err(e) => {
                // Malformed frames are dropped; the connection stays up.
                tracing::warn!(error = %e, "dropping malformed frame");
            }
        }

        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        self.shared.lock().connection = state;
    }

    fn mark_disconnected(&self) {
        let mut shared = self.shared.lock();
        shared.connection = ConnectionState::Disconnected;
        shared.registry.mark_disconnected();
    }
}

/// Discard frames queued for a socket that no longer exists.
fn drain_stale_frames(frame_rx: &mut mpsc::UnboundedReceiver<SubscriptionRequest>) {
    let mut drained = 0_usize;
    while frame_rx.try_recv().is_ok() {
        drained += 1;
    }
    if drained > 0 {
        tracing::debug!(drained, "discarded stale frames from previous connection");
    }
}
