#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Alpaca Stream Client - Market Data Subscription Multiplexer
//!
//! A resilient WebSocket client that maintains one logical connection to
//! Alpaca's market data feed, multiplexing per-symbol subscriptions across
//! multiple independent consumers and recovering transparently from
//! connection loss.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types and logic, no I/O
//!   - `market`: Market event types
//!   - `registry`: Per-symbol consumer tracking and the pending set
//!   - `dispatch`: Fault-isolated delivery to consumers
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `alpaca`: Wire types, codec, backoff policy, connection lifecycle
//!   - `config`: Configuration from the environment
//!   - `telemetry`: Tracing subscriber setup
//!
//! - **Client**: The facade consumers call
//!
//! # Data Flow
//!
//! ```text
//!                       ┌─────────────┐     ┌─────────────┐──► Consumer 1
//! Alpaca data WS ──────►│ Connection  │────►│ Dispatcher  │──► Consumer 2
//!                       │    Task     │     └─────────────┘──► Consumer N
//!                       └─────────────┘            ▲
//!                              ▲                   │
//!                        subscribe frames    consumer lists
//!                              │                   │
//!                       ┌─────────────────────────────┐
//!                       │   Facade + Registry/Pending │
//!                       └─────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Client facade - the public surface consumers call.
pub mod client;

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Facade
pub use client::{ClientError, StreamClient};

// Domain types
pub use domain::market::{MarketEvent, Symbol};
pub use domain::registry::{Consumer, SubscriptionRegistry, UpstreamChange, consumer};

// Infrastructure config
pub use infrastructure::config::{ClientSettings, ConfigError, DataFeed, WebSocketSettings};

// Connection types (for embedders and integration tests)
pub use infrastructure::alpaca::{
    AuthRequest, BackoffConfig, BackoffPolicy, ClientEvent, CodecError, ConnectionState,
    Credentials, Decoded, JsonCodec, SubscriptionAction, SubscriptionRequest,
};

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
