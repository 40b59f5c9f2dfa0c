//! Subscription Registry
//!
//! Domain state for tracking per-symbol consumer interest and reconciling
//! it with the upstream subscription protocol.
//!
//! # Design
//!
//! The registry tracks, per symbol:
//! - The ordered list of consumer callbacks interested in that symbol
//! - Whether the symbol is currently confirmed-subscribed upstream
//!
//! plus the pending set: symbols whose subscribe frame could not be sent
//! yet because the connection was not authenticated at request time.
//!
//! A symbol exists in the registry iff it has at least one consumer.
//! Consumers are compared by `Arc` pointer identity, so removal is
//! exact-match and never relies on structural equality of closures.
//!
//! The registry itself performs no I/O. Operations take an `authenticated`
//! flag and report the upstream change (if any) the caller must emit, which
//! keeps this module trivially unit-testable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::market::{MarketEvent, Symbol};

// =============================================================================
// Types
// =============================================================================

/// A consumer callback handle.
///
/// The `Arc` is the identity: the same clone that was passed to
/// `add_consumer` must be passed to `remove_consumer`. Two closures with
/// identical bodies are distinct consumers.
pub type Consumer = Arc<dyn Fn(MarketEvent) + Send + Sync>;

/// Wrap a closure into a [`Consumer`] handle.
#[must_use]
pub fn consumer<F>(f: F) -> Consumer
where
    F: Fn(MarketEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An upstream subscription change the caller must put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamChange {
    /// Send a subscribe frame for this symbol.
    Subscribe(Symbol),
    /// Send an unsubscribe frame for this symbol.
    Unsubscribe(Symbol),
}

/// Per-symbol subscription state.
struct SymbolSubscription {
    /// Interested consumers, in registration order.
    consumers: Vec<Consumer>,
    /// Whether a subscribe frame was sent for this symbol while the
    /// connection was authenticated. Confirmation is optimistic on send;
    /// the upstream protocol has no per-symbol ack.
    confirmed: bool,
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Tracks consumer interest per symbol together with the pending set.
///
/// # Example
///
/// ```rust
/// use alpaca_stream_client::domain::registry::{SubscriptionRegistry, UpstreamChange, consumer};
///
/// let mut registry = SubscriptionRegistry::new();
/// let cb = consumer(|_event| {});
///
/// // Not authenticated yet: interest is queued in the pending set.
/// let change = registry.add_consumer("AAPL", cb.clone(), false);
/// assert!(change.is_none());
/// assert_eq!(registry.pending_symbols(), vec!["AAPL".to_string()]);
///
/// // Authentication completes: the pending set is flushed exactly once.
/// let flushed = registry.flush_pending();
/// assert_eq!(flushed, vec!["AAPL".to_string()]);
/// assert!(registry.pending_symbols().is_empty());
///
/// // Removing the last consumer while authenticated emits an unsubscribe.
/// let change = registry.remove_consumer("AAPL", &cb, true);
/// assert_eq!(change, Some(UpstreamChange::Unsubscribe("AAPL".to_string())));
/// ```
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<Symbol, SymbolSubscription>,
    pending: HashSet<Symbol>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of consumers registered for a symbol.
    #[must_use]
    pub fn consumer_count(&self, symbol: &str) -> usize {
        self.entries.get(symbol).map_or(0, |e| e.consumers.len())
    }

    /// Register a consumer for a symbol.
    ///
    /// Appends the consumer to the symbol's list, creating the entry if
    /// absent. If the connection is authenticated and the symbol is not
    /// already confirmed upstream, returns the subscribe change to emit;
    /// otherwise the symbol is added to the pending set and nothing is
    /// sent until authentication completes.
    pub fn add_consumer(
        &mut self,
        symbol: &str,
        consumer: Consumer,
        authenticated: bool,
    ) -> Option<UpstreamChange> {
        let entry = self
            .entries
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolSubscription {
                consumers: Vec::new(),
                confirmed: false,
            });
        entry.consumers.push(consumer);

        if !authenticated {
            self.pending.insert(symbol.to_string());
            return None;
        }

        if entry.confirmed {
            // Already subscribed upstream via another consumer.
            return None;
        }

        entry.confirmed = true;
        Some(UpstreamChange::Subscribe(symbol.to_string()))
    }

    /// Deregister a consumer from a symbol.
    ///
    /// Removes the exact consumer reference (pointer identity); other
    /// consumers of the same symbol are unaffected. When the last consumer
    /// is removed the entry is deleted, and if the symbol was confirmed
    /// while the connection is authenticated, returns the unsubscribe
    /// change to emit.
    pub fn remove_consumer(
        &mut self,
        symbol: &str,
        consumer: &Consumer,
        authenticated: bool,
    ) -> Option<UpstreamChange> {
        let entry = self.entries.get_mut(symbol)?;
        entry.consumers.retain(|c| !Arc::ptr_eq(c, consumer));

        if !entry.consumers.is_empty() {
            return None;
        }

        let confirmed = entry.confirmed;
        self.entries.remove(symbol);
        self.pending.remove(symbol);

        if authenticated && confirmed {
            Some(UpstreamChange::Unsubscribe(symbol.to_string()))
        } else {
            None
        }
    }

    /// Drain the pending set for a freshly authenticated connection.
    ///
    /// Returns the union of the pending set and the full desired-symbol
    /// set, sorted. The pending set is cleared and every registry entry is
    /// marked confirmed. Called on every transition to authenticated, so
    /// interest lost to a reconnect is replayed alongside interest that
    /// never made it onto the wire.
    pub fn flush_pending(&mut self) -> Vec<Symbol> {
        let mut symbols: HashSet<Symbol> = self.pending.drain().collect();
        for (symbol, entry) in &mut self.entries {
            entry.confirmed = true;
            symbols.insert(symbol.clone());
        }

        let mut symbols: Vec<Symbol> = symbols.into_iter().collect();
        symbols.sort_unstable();
        symbols
    }

    /// Reset upstream state after a disconnect.
    ///
    /// The upstream connection has no memory of subscriptions across a
    /// reconnect: every confirmed flag is cleared and the pending set is
    /// repopulated from the full desired-symbol set so the next
    /// authentication replays all current interest.
    pub fn mark_disconnected(&mut self) {
        self.pending.clear();
        for (symbol, entry) in &mut self.entries {
            entry.confirmed = false;
            self.pending.insert(symbol.clone());
        }
    }

    /// Snapshot the consumers registered for a symbol, in list order.
    ///
    /// Returns clones of the handles so dispatch can run without holding
    /// any lock over the registry.
    #[must_use]
    pub fn consumers_for(&self, symbol: &str) -> Vec<Consumer> {
        self.entries
            .get(symbol)
            .map(|e| e.consumers.clone())
            .unwrap_or_default()
    }

    /// All symbols with at least one registered consumer, sorted.
    #[must_use]
    pub fn desired_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.entries.keys().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    /// Symbols awaiting their first subscribe frame, sorted.
    #[must_use]
    pub fn pending_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.pending.iter().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    /// Whether a symbol is currently confirmed-subscribed upstream.
    #[must_use]
    pub fn is_confirmed(&self, symbol: &str) -> bool {
        self.entries.get(symbol).is_some_and(|e| e.confirmed)
    }

    /// Number of symbols with registered consumers.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no consumers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all consumers and pending interest.
    ///
    /// Used by client close; no unsubscribe frames are derived from this.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Consumer {
        consumer(|_| {})
    }

    #[test]
    fn subscribe_unauthenticated_queues_pending() {
        let mut registry = SubscriptionRegistry::new();

        let change = registry.add_consumer("AAPL", noop(), false);

        assert!(change.is_none());
        assert_eq!(registry.pending_symbols(), vec!["AAPL".to_string()]);
        assert!(!registry.is_confirmed("AAPL"));
    }

    #[test]
    fn subscribe_authenticated_emits_subscribe() {
        let mut registry = SubscriptionRegistry::new();

        let change = registry.add_consumer("AAPL", noop(), true);

        assert_eq!(change, Some(UpstreamChange::Subscribe("AAPL".to_string())));
        assert!(registry.is_confirmed("AAPL"));
        assert!(registry.pending_symbols().is_empty());
    }

    #[test]
    fn second_consumer_does_not_resubscribe() {
        let mut registry = SubscriptionRegistry::new();

        registry.add_consumer("AAPL", noop(), true);
        let change = registry.add_consumer("AAPL", noop(), true);

        assert!(change.is_none());
        assert_eq!(registry.consumer_count("AAPL"), 2);
    }

    #[test]
    fn remove_exact_consumer_leaves_others() {
        let mut registry = SubscriptionRegistry::new();
        let first = noop();
        let second = noop();

        registry.add_consumer("AAPL", first.clone(), true);
        registry.add_consumer("AAPL", second.clone(), true);

        let change = registry.remove_consumer("AAPL", &first, true);

        assert!(change.is_none());
        let remaining = registry.consumers_for("AAPL");
        assert_eq!(remaining.len(), 1);
        assert!(Arc::ptr_eq(&remaining[0], &second));
    }

    #[test]
    fn remove_last_consumer_emits_unsubscribe() {
        let mut registry = SubscriptionRegistry::new();
        let cb = noop();

        registry.add_consumer("AAPL", cb.clone(), true);
        let change = registry.remove_consumer("AAPL", &cb, true);

        assert_eq!(
            change,
            Some(UpstreamChange::Unsubscribe("AAPL".to_string()))
        );
        assert_eq!(registry.symbol_count(), 0);
    }

    #[test]
    fn remove_last_consumer_unauthenticated_drops_pending() {
        let mut registry = SubscriptionRegistry::new();
        let cb = noop();

        registry.add_consumer("AAPL", cb.clone(), false);
        let change = registry.remove_consumer("AAPL", &cb, false);

        assert!(change.is_none());
        assert!(registry.pending_symbols().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_unconfirmed_symbol_while_authenticated_sends_nothing() {
        let mut registry = SubscriptionRegistry::new();
        let cb = noop();

        // Subscribed while disconnected, then the consumer left before
        // authentication ever completed.
        registry.add_consumer("AAPL", cb.clone(), false);
        let change = registry.remove_consumer("AAPL", &cb, true);

        assert!(change.is_none());
    }

    #[test]
    fn remove_unknown_consumer_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        let registered = noop();
        let stranger = noop();

        registry.add_consumer("AAPL", registered, true);
        let change = registry.remove_consumer("AAPL", &stranger, true);

        assert!(change.is_none());
        assert_eq!(registry.consumers_for("AAPL").len(), 1);
    }

    #[test]
    fn remove_from_unknown_symbol_is_noop() {
        let mut registry = SubscriptionRegistry::new();

        let change = registry.remove_consumer("MSFT", &noop(), true);

        assert!(change.is_none());
    }

    #[test]
    fn duplicate_handle_registrations_are_removed_together() {
        let mut registry = SubscriptionRegistry::new();
        let cb = noop();

        registry.add_consumer("AAPL", cb.clone(), true);
        registry.add_consumer("AAPL", cb.clone(), true);

        let change = registry.remove_consumer("AAPL", &cb, true);

        // Both registrations of the same handle are gone.
        assert_eq!(
            change,
            Some(UpstreamChange::Unsubscribe("AAPL".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn flush_unions_pending_and_desired() {
        let mut registry = SubscriptionRegistry::new();

        registry.add_consumer("MSFT", noop(), false);
        registry.add_consumer("AAPL", noop(), false);

        let flushed = registry.flush_pending();

        assert_eq!(flushed, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert!(registry.pending_symbols().is_empty());
        assert!(registry.is_confirmed("AAPL"));
        assert!(registry.is_confirmed("MSFT"));
    }

    #[test]
    fn flush_on_empty_registry_is_empty() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.flush_pending().is_empty());
    }

    #[test]
    fn disconnect_repopulates_pending_from_desired() {
        let mut registry = SubscriptionRegistry::new();

        registry.add_consumer("AAPL", noop(), true);
        registry.add_consumer("MSFT", noop(), true);
        assert!(registry.pending_symbols().is_empty());

        registry.mark_disconnected();

        assert_eq!(
            registry.pending_symbols(),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
        assert!(!registry.is_confirmed("AAPL"));
        assert!(!registry.is_confirmed("MSFT"));

        // Re-authentication replays the full set.
        let flushed = registry.flush_pending();
        assert_eq!(flushed, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }

    #[test]
    fn consumers_for_preserves_registration_order() {
        let mut registry = SubscriptionRegistry::new();
        let first = noop();
        let second = noop();
        let third = noop();

        registry.add_consumer("AAPL", first.clone(), true);
        registry.add_consumer("AAPL", second.clone(), true);
        registry.add_consumer("AAPL", third.clone(), true);

        let snapshot = registry.consumers_for("AAPL");
        assert_eq!(snapshot.len(), 3);
        assert!(Arc::ptr_eq(&snapshot[0], &first));
        assert!(Arc::ptr_eq(&snapshot[1], &second));
        assert!(Arc::ptr_eq(&snapshot[2], &third));
    }

    #[test]
    fn consumers_for_unknown_symbol_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.consumers_for("AAPL").is_empty());
    }

    #[test]
    fn same_consumer_across_symbols_is_independent() {
        let mut registry = SubscriptionRegistry::new();
        let cb = noop();

        registry.add_consumer("AAPL", cb.clone(), true);
        registry.add_consumer("MSFT", cb.clone(), true);

        registry.remove_consumer("AAPL", &cb, true);

        assert!(registry.consumers_for("AAPL").is_empty());
        assert_eq!(registry.consumers_for("MSFT").len(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let mut registry = SubscriptionRegistry::new();

        registry.add_consumer("AAPL", noop(), true);
        registry.add_consumer("MSFT", noop(), false);

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.pending_symbols().is_empty());
        assert!(registry.desired_symbols().is_empty());
    }
}
