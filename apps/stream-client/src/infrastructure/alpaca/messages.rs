//! Alpaca WebSocket Message Types
//!
//! Wire format types for the market data stream. Outbound frames are JSON
//! objects; inbound frames are JSON arrays whose first element carries the
//! payload.
//!
//! # Outbound
//!
//! ```json
//! {"action":"auth","key":"…","secret":"…"}
//! {"action":"subscribe","trades":["AAPL"],"quotes":["AAPL"]}
//! {"action":"unsubscribe","trades":["AAPL"],"quotes":["AAPL"]}
//! ```
//!
//! # Inbound
//!
//! ```json
//! [{"T":"success","msg":"authenticated"}]
//! [{"T":"t","S":"AAPL","t":"2024-01-15T10:00:00Z","o":189.5,"h":190.1,"l":189.2,"c":189.9,"v":1200}]
//! [{"T":"q","S":"AAPL","t":"2024-01-15T10:00:00Z","ap":189.95}]
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Outbound Frames
// =============================================================================

/// Authentication request, sent immediately after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Always "auth".
    pub action: String,

    /// API key id.
    pub key: String,

    /// API secret key.
    pub secret: String,
}

impl AuthRequest {
    /// Create an authentication request.
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            action: "auth".to_string(),
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// Subscription action discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    /// Add symbols to the upstream subscription.
    Subscribe,
    /// Remove symbols from the upstream subscription.
    Unsubscribe,
}

/// Subscribe/unsubscribe request covering the trades and quotes channels.
///
/// Every symbol is subscribed on both channels; the codec folds trade and
/// quote frames into the same event shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// "subscribe" or "unsubscribe".
    pub action: SubscriptionAction,

    /// Symbols on the trades channel.
    pub trades: Vec<String>,

    /// Symbols on the quotes channel.
    pub quotes: Vec<String>,
}

impl SubscriptionRequest {
    /// Create a subscribe request for the given symbols.
    #[must_use]
    pub fn subscribe(symbols: Vec<String>) -> Self {
        Self {
            action: SubscriptionAction::Subscribe,
            trades: symbols.clone(),
            quotes: symbols,
        }
    }

    /// Create an unsubscribe request for the given symbols.
    #[must_use]
    pub fn unsubscribe(symbols: Vec<String>) -> Self {
        Self {
            action: SubscriptionAction::Unsubscribe,
            trades: symbols.clone(),
            quotes: symbols,
        }
    }
}

// =============================================================================
// Inbound Frames
// =============================================================================

/// Raw inbound message, one element of the array-wrapped frame.
///
/// All payload fields are optional: control messages carry `msg`, market
/// events carry `T`/`S`/`t` plus whichever price and size fields the
/// upstream included. The codec applies the fallback rules.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStreamMessage {
    /// Message type tag: "t" (trade), "q" (quote), "success", "error", …
    #[serde(rename = "T")]
    pub kind: Option<String>,

    /// Control message text, e.g. "connected" or "authenticated".
    pub msg: Option<String>,

    /// Ticker symbol.
    #[serde(rename = "S")]
    pub symbol: Option<String>,

    /// Event timestamp (RFC-3339).
    #[serde(rename = "t")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Open price.
    #[serde(rename = "o")]
    pub open: Option<Decimal>,

    /// High price.
    #[serde(rename = "h")]
    pub high: Option<Decimal>,

    /// Low price.
    #[serde(rename = "l")]
    pub low: Option<Decimal>,

    /// Close price.
    #[serde(rename = "c")]
    pub close: Option<Decimal>,

    /// Ask price (quote frames); fallback for absent price fields.
    #[serde(rename = "ap")]
    pub ask_price: Option<Decimal>,

    /// Volume (shares).
    #[serde(rename = "v")]
    pub volume: Option<i64>,
}
