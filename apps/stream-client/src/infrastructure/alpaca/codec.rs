//! Stream Codec
//!
//! Decodes one array-wrapped JSON frame from the market data stream into
//! either an authentication confirmation, a market event keyed by symbol,
//! or an ignorable frame. Pure and stateless.
//!
//! # Field Mapping
//!
//! Open/high/low/close each fall back to the quote ask price (`ap`) when
//! the primary field is absent, then to zero. Volume falls back to zero.
//! The timestamp is always upstream-provided; a market event without one
//! is malformed.
//!
//! Decode failures are local: the caller logs and drops the frame, they
//! never affect connection state.

use crate::domain::market::{MarketEvent, Symbol};
use crate::infrastructure::alpaca::messages::RawStreamMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound frame was not a JSON array.
    #[error("expected JSON array frame, got: {0}")]
    NotAnArray(String),

    /// Market event frame without a symbol key.
    #[error("market event frame is missing the symbol key")]
    MissingSymbol,

    /// Market event frame without a timestamp.
    #[error("market event frame is missing the timestamp")]
    MissingTimestamp,
}

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Authentication confirmation.
    Authenticated,

    /// A market event for one symbol.
    Event {
        /// The symbol the event belongs to.
        symbol: Symbol,
        /// The decoded event.
        event: MarketEvent,
    },

    /// Recognized as noise (control messages, empty frames, unknown types).
    Ignored,
}

/// JSON codec for the market data stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound text frame.
    ///
    /// The stream wraps every message in a JSON array; the first element
    /// carries the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON, is not an array,
    /// or is a market event missing its symbol or timestamp.
    pub fn decode(&self, text: &str) -> Result<Decoded, CodecError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('[') {
            return Err(CodecError::NotAnArray(trimmed.chars().take(50).collect()));
        }

        let frames: Vec<RawStreamMessage> = serde_json::from_str(trimmed)?;
        let Some(first) = frames.first() else {
            return Ok(Decoded::Ignored);
        };

        if first.msg.as_deref() == Some("authenticated") {
            return Ok(Decoded::Authenticated);
        }

        match first.kind.as_deref() {
            Some("t" | "q") => {
                let symbol = first.symbol.clone().ok_or(CodecError::MissingSymbol)?;
                let timestamp = first.timestamp.ok_or(CodecError::MissingTimestamp)?;

                let event = MarketEvent {
                    timestamp,
                    open: first.open.or(first.ask_price).unwrap_or_default(),
                    high: first.high.or(first.ask_price).unwrap_or_default(),
                    low: first.low.or(first.ask_price).unwrap_or_default(),
                    close: first.close.or(first.ask_price).unwrap_or_default(),
                    volume: first.volume.unwrap_or(0),
                };

                Ok(Decoded::Event { symbol, event })
            }
            _ => Ok(Decoded::Ignored),
        }
    }

    /// Encode an outbound frame to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn codec() -> JsonCodec {
        JsonCodec::new()
    }

    #[test]
    fn decodes_auth_confirmation() {
        let frame = r#"[{"T":"success","msg":"authenticated"}]"#;
        assert_eq!(codec().decode(frame).unwrap(), Decoded::Authenticated);
    }

    #[test]
    fn connected_greeting_is_ignored() {
        let frame = r#"[{"T":"success","msg":"connected"}]"#;
        assert_eq!(codec().decode(frame).unwrap(), Decoded::Ignored);
    }

    #[test]
    fn decodes_trade_with_full_price_fields() {
        let frame = r#"[{"T":"t","S":"AAPL","t":"2024-01-15T10:00:00Z","o":189.5,"h":190.25,"l":188.75,"c":189.5,"v":1200}]"#;

        let Decoded::Event { symbol, event } = codec().decode(frame).unwrap() else {
            panic!("expected market event");
        };

        assert_eq!(symbol, "AAPL");
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(event.open, Decimal::new(18950, 2));
        assert_eq!(event.high, Decimal::new(19025, 2));
        assert_eq!(event.low, Decimal::new(18875, 2));
        assert_eq!(event.close, Decimal::new(18950, 2));
        assert_eq!(event.volume, 1200);
    }

    #[test]
    fn quote_falls_back_to_ask_price() {
        let frame = r#"[{"T":"q","S":"AMD","t":"2024-01-15T10:00:00Z","ap":87.5}]"#;

        let Decoded::Event { symbol, event } = codec().decode(frame).unwrap() else {
            panic!("expected market event");
        };

        assert_eq!(symbol, "AMD");
        let ask = Decimal::new(8750, 2);
        assert_eq!(event.open, ask);
        assert_eq!(event.high, ask);
        assert_eq!(event.low, ask);
        assert_eq!(event.close, ask);
        assert_eq!(event.volume, 0);
    }

    #[test]
    fn primary_fields_win_over_ask_price() {
        let frame = r#"[{"T":"q","S":"AMD","t":"2024-01-15T10:00:00Z","c":88.25,"ap":87.5}]"#;

        let Decoded::Event { event, .. } = codec().decode(frame).unwrap() else {
            panic!("expected market event");
        };

        assert_eq!(event.close, Decimal::new(8825, 2));
        assert_eq!(event.open, Decimal::new(8750, 2));
    }

    #[test]
    fn prices_and_volume_default_to_zero() {
        let frame = r#"[{"T":"t","S":"AAPL","t":"2024-01-15T10:00:00Z"}]"#;

        let Decoded::Event { event, .. } = codec().decode(frame).unwrap() else {
            panic!("expected market event");
        };

        assert_eq!(event.open, Decimal::ZERO);
        assert_eq!(event.high, Decimal::ZERO);
        assert_eq!(event.low, Decimal::ZERO);
        assert_eq!(event.close, Decimal::ZERO);
        assert_eq!(event.volume, 0);
    }

    #[test]
    fn missing_symbol_is_an_error() {
        let frame = r#"[{"T":"t","t":"2024-01-15T10:00:00Z","c":88.25}]"#;
        assert!(matches!(
            codec().decode(frame),
            Err(CodecError::MissingSymbol)
        ));
    }

    #[test]
    fn missing_timestamp_is_an_error() {
        let frame = r#"[{"T":"t","S":"AAPL","c":88.25}]"#;
        assert!(matches!(
            codec().decode(frame),
            Err(CodecError::MissingTimestamp)
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            codec().decode("[{not json"),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn non_array_frame_is_an_error() {
        assert!(matches!(
            codec().decode(r#"{"T":"t","S":"AAPL"}"#),
            Err(CodecError::NotAnArray(_))
        ));
    }

    #[test]
    fn empty_array_is_ignored() {
        assert_eq!(codec().decode("[]").unwrap(), Decoded::Ignored);
    }

    #[test]
    fn unknown_message_types_are_ignored() {
        let frame = r#"[{"T":"subscription","trades":["AAPL"],"quotes":["AAPL"]}]"#;
        assert_eq!(codec().decode(frame).unwrap(), Decoded::Ignored);

        let frame = r#"[{"T":"error","code":405,"msg":"symbol limit exceeded"}]"#;
        assert_eq!(codec().decode(frame).unwrap(), Decoded::Ignored);
    }

    #[test]
    fn only_the_first_element_is_decoded() {
        let frame = r#"[
            {"T":"t","S":"AAPL","t":"2024-01-15T10:00:00Z","c":189.5},
            {"T":"t","S":"MSFT","t":"2024-01-15T10:00:01Z","c":400.5}
        ]"#;

        let Decoded::Event { symbol, .. } = codec().decode(frame).unwrap() else {
            panic!("expected market event");
        };
        assert_eq!(symbol, "AAPL");
    }

    #[test]
    fn encodes_outbound_frames() {
        use crate::infrastructure::alpaca::messages::SubscriptionRequest;

        let json = codec()
            .encode(&SubscriptionRequest::subscribe(vec!["AAPL".to_string()]))
            .unwrap();
        assert!(json.contains(r#""action":"subscribe""#));
    }
}
