//! Infrastructure layer - Adapters and external integrations.

/// Alpaca WebSocket adapter: wire types, codec, connection lifecycle.
pub mod alpaca;

/// Configuration loaded from the environment.
pub mod config;

/// Tracing subscriber setup.
pub mod telemetry;
