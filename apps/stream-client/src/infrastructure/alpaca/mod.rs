//! Alpaca WebSocket Adapter
//!
//! Implements the client side of Alpaca's market data stream protocol:
//!
//! - **messages**: wire frame types (JSON)
//! - **codec**: frame decoding into domain events
//! - **auth**: credentials and connection state
//! - **reconnect**: exponential backoff policy
//! - **connection**: the connection lifecycle task

pub mod auth;
pub mod codec;
pub mod connection;
pub mod messages;
pub mod reconnect;

pub use auth::{ConnectionState, Credentials};
pub use codec::{CodecError, Decoded, JsonCodec};
pub use connection::{ClientEvent, ConnectionConfig, ConnectionError, KeepaliveConfig};
pub use messages::{AuthRequest, SubscriptionAction, SubscriptionRequest};
pub use reconnect::{BackoffConfig, BackoffPolicy};
