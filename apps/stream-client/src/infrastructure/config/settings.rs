//! Client Configuration Settings
//!
//! Configuration types for the stream client, loaded from environment
//! variables. Credential loading mechanics live here; everything else in
//! the crate receives typed settings.

use std::time::Duration;

use crate::infrastructure::alpaca::auth::Credentials;

/// Market data feed type for the stream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFeed {
    /// IEX (Investors Exchange) - free tier with limited data.
    #[default]
    Iex,
    /// SIP (Securities Information Processor) - full market data.
    Sip,
}

impl DataFeed {
    /// Parse feed type from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sip" => Self::Sip,
            _ => Self::Iex,
        }
    }

    /// Get the feed name for WebSocket URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Iex => "iex",
            Self::Sip => "sip",
        }
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Keepalive ping interval.
    pub keepalive_interval: Duration,
    /// Keepalive timeout before the connection is considered dead.
    pub keepalive_timeout: Duration,
    /// Base reconnection delay; doubles each consecutive attempt.
    pub reconnect_delay_base: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Jitter fraction applied to reconnect delays (0.0 = exact schedule).
    pub reconnect_jitter: f64,
    /// Maximum consecutive reconnection attempts before giving up
    /// (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(20),
            keepalive_timeout: Duration::from_secs(20),
            reconnect_delay_base: Duration::from_millis(1000),
            reconnect_delay_max: Duration::from_secs(64),
            reconnect_jitter: 0.0,
            max_reconnect_attempts: 5,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Market data feed type.
    pub feed: DataFeed,
    /// Explicit stream URL; overrides the feed-derived endpoint.
    pub endpoint_override: Option<String>,
    /// API credentials.
    pub credentials: Credentials,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
}

impl ClientSettings {
    /// Create settings with defaults for everything but the credentials.
    #[must_use]
    pub const fn new(credentials: Credentials, websocket: WebSocketSettings) -> Self {
        Self {
            feed: DataFeed::Iex,
            endpoint_override: None,
            credentials,
            websocket,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required: `ALPACA_KEY`, `ALPACA_SECRET` (non-empty).
    /// Optional: `ALPACA_FEED` ("iex" | "sip"), `ALPACA_STREAM_URL`,
    /// `STREAM_CLIENT_KEEPALIVE_INTERVAL_SECS`,
    /// `STREAM_CLIENT_KEEPALIVE_TIMEOUT_SECS`,
    /// `STREAM_CLIENT_RECONNECT_DELAY_BASE_MS`,
    /// `STREAM_CLIENT_RECONNECT_DELAY_MAX_SECS`,
    /// `STREAM_CLIENT_RECONNECT_JITTER`,
    /// `STREAM_CLIENT_MAX_RECONNECT_ATTEMPTS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required environment variable is missing or
    /// empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ALPACA_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ALPACA_KEY".to_string()))?;

        let api_secret = std::env::var("ALPACA_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("ALPACA_SECRET".to_string()))?;

        if api_key.is_empty() {
            return Err(ConfigError::EmptyValue("ALPACA_KEY".to_string()));
        }

        if api_secret.is_empty() {
            return Err(ConfigError::EmptyValue("ALPACA_SECRET".to_string()));
        }

        let feed = std::env::var("ALPACA_FEED")
            .map(|s| DataFeed::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let endpoint_override = std::env::var("ALPACA_STREAM_URL")
            .ok()
            .filter(|url| !url.is_empty());

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            keepalive_interval: parse_env_duration_secs(
                "STREAM_CLIENT_KEEPALIVE_INTERVAL_SECS",
                defaults.keepalive_interval,
            ),
            keepalive_timeout: parse_env_duration_secs(
                "STREAM_CLIENT_KEEPALIVE_TIMEOUT_SECS",
                defaults.keepalive_timeout,
            ),
            reconnect_delay_base: parse_env_duration_millis(
                "STREAM_CLIENT_RECONNECT_DELAY_BASE_MS",
                defaults.reconnect_delay_base,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "STREAM_CLIENT_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_jitter: parse_env_f64("STREAM_CLIENT_RECONNECT_JITTER", defaults.reconnect_jitter),
            max_reconnect_attempts: parse_env_u32(
                "STREAM_CLIENT_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
        };

        Ok(Self {
            feed,
            endpoint_override,
            credentials: Credentials::new(api_key, api_secret),
            websocket,
        })
    }

    /// The WebSocket URL the client connects to.
    #[must_use]
    pub fn stream_url(&self) -> String {
        self.endpoint_override.clone().unwrap_or_else(|| {
            format!("wss://stream.data.alpaca.markets/v2/{}", self.feed.as_str())
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
