//! Client Facade
//!
//! The public surface consumers interact with: construct a client, register
//! and deregister per-symbol interest, and tear the client down. Everything
//! else (the socket, the state machine, the backoff timer) lives behind the
//! connection task.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::market::Symbol;
use crate::domain::registry::{Consumer, UpstreamChange};
use crate::infrastructure::alpaca::auth::ConnectionState;
use crate::infrastructure::alpaca::connection::{
    ClientEvent, Connection, ConnectionConfig, SharedState,
};
use crate::infrastructure::alpaca::messages::SubscriptionRequest;
use crate::infrastructure::config::ClientSettings;

/// Capacity of the lifecycle event channel handed to the embedder.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors returned by facade operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client was closed; construct a new one to reconnect.
    #[error("client is closed")]
    Closed,
}

/// A handle to one logical market data connection.
///
/// Multiple independent consumers share the single upstream connection:
/// the registry multiplexes their per-symbol interest onto one subscribe
/// set, and the dispatcher fans decoded events back out.
///
/// All operations are non-blocking: subscribe/unsubscribe enqueue at most
/// one frame for the connection task and return immediately. The client is
/// done once [`close`](Self::close) is called; it is not restartable.
pub struct StreamClient {
    shared: Arc<Mutex<SharedState>>,
    frame_tx: mpsc::UnboundedSender<SubscriptionRequest>,
    cancel: CancellationToken,
}

impl StreamClient {
    /// Construct a client and spawn its connection task.
    ///
    /// Returns the client handle and a receiver for lifecycle events
    /// (connected, disconnected, reconnecting, exhausted). The receiver
    /// may be dropped if the embedder has no use for it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn connect(settings: ClientSettings) -> (Self, mpsc::Receiver<ClientEvent>) {
        let shared = Arc::new(Mutex::new(SharedState::new()));
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let connection = Connection::new(
            ConnectionConfig::from_settings(&settings),
            Arc::clone(&shared),
            event_tx,
            cancel.clone(),
        );
        tokio::spawn(connection.run(frame_rx));

        (
            Self {
                shared,
                frame_tx,
                cancel,
            },
            event_rx,
        )
    }

    /// Register a consumer for a symbol.
    ///
    /// If the connection is authenticated a subscribe frame for this
    /// symbol goes out immediately (fire-and-forget); otherwise the
    /// interest is queued and flushed when authentication completes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after `close()`.
    pub fn subscribe(
        &self,
        symbol: impl Into<Symbol>,
        consumer: Consumer,
    ) -> Result<(), ClientError> {
        let symbol = symbol.into();
        let change = {
            let mut shared = self.shared.lock();
            if shared.closed {
                return Err(ClientError::Closed);
            }
            let authenticated = shared.connection.is_authenticated();
            shared.registry.add_consumer(&symbol, consumer, authenticated)
        };

        self.send_change(change);
        Ok(())
    }

    /// Deregister a consumer from a symbol.
    ///
    /// Removal is by handle identity: pass the same [`Consumer`] clone
    /// that was registered. Other consumers of the symbol are unaffected.
    /// Removing the last consumer emits an unsubscribe frame when the
    /// connection is authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after `close()`.
    pub fn unsubscribe(&self, symbol: &str, consumer: &Consumer) -> Result<(), ClientError> {
        let change = {
            let mut shared = self.shared.lock();
            if shared.closed {
                return Err(ClientError::Closed);
            }
            let authenticated = shared.connection.is_authenticated();
            shared.registry.remove_consumer(symbol, consumer, authenticated)
        };

        self.send_change(change);
        Ok(())
    }

    /// Tear the client down.
    ///
    /// Clears the registry (no unsubscribe frames are sent; the socket is
    /// going away), cancels the connection task and any scheduled
    /// reconnect, and makes the client permanently unusable. Idempotent.
    pub fn close(&self) {
        {
            let mut shared = self.shared.lock();
            if shared.closed {
                return;
            }
            shared.closed = true;
            shared.registry.clear();
            shared.connection = ConnectionState::Disconnected;
        }

        self.cancel.cancel();
        tracing::info!("stream client closed");
    }

    /// Whether `close()` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Symbols that currently have at least one registered consumer.
    #[must_use]
    pub fn desired_symbols(&self) -> Vec<Symbol> {
        self.shared.lock().registry.desired_symbols()
    }

    fn send_change(&self, change: Option<UpstreamChange>) {
        let Some(change) = change else { return };

        let request = match change {
            UpstreamChange::Subscribe(symbol) => SubscriptionRequest::subscribe(vec![symbol]),
            UpstreamChange::Unsubscribe(symbol) => SubscriptionRequest::unsubscribe(vec![symbol]),
        };

        // Fire-and-forget: if the connection task already exited, the
        // registry remains authoritative for whatever comes next.
        let _ = self.frame_tx.send(request);
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
