//! Configuration Module
//!
//! Typed settings for the stream client, loaded from environment variables.

mod settings;

pub use settings::{ClientSettings, ConfigError, DataFeed, WebSocketSettings};
