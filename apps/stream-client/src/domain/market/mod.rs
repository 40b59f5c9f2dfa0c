//! Market Data Event Types
//!
//! Canonical internal representation of a market data update. The wire
//! format (Alpaca's JSON frames) is mapped onto this type by the codec;
//! consumers only ever see `MarketEvent`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A ticker symbol (e.g. "AAPL").
pub type Symbol = String;

/// A single OHLCV market data update for one symbol.
///
/// Price fields are zero when the upstream payload omits them; the
/// timestamp is always taken from the upstream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketEvent {
    /// Event timestamp (upstream-provided, RFC-3339 on the wire).
    pub timestamp: DateTime<Utc>,

    /// Open price.
    pub open: Decimal,

    /// High price.
    pub high: Decimal,

    /// Low price.
    pub low: Decimal,

    /// Close price.
    pub close: Decimal,

    /// Volume (shares).
    pub volume: i64,
}
