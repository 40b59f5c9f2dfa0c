//! Event Dispatch
//!
//! Delivers a decoded market event to every consumer registered for its
//! symbol, in registration order. A fault raised by one consumer is caught
//! and logged; it never prevents delivery to subsequent consumers and
//! never reaches the connection state machine.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::domain::market::MarketEvent;
use crate::domain::registry::Consumer;

/// Deliver `event` to each consumer in list order.
///
/// Consumers run outside any registry lock, so a callback may re-enter
/// subscribe/unsubscribe. Returns the number of consumers that completed
/// without panicking.
pub fn dispatch(symbol: &str, consumers: &[Consumer], event: &MarketEvent) -> usize {
    let mut delivered = 0;

    for consumer in consumers {
        let result = catch_unwind(AssertUnwindSafe(|| consumer(event.clone())));
        match result {
            Ok(()) => delivered += 1,
            Err(_) => {
                tracing::error!(symbol, "consumer callback panicked during dispatch");
            }
        }
    }

    delivered
}
