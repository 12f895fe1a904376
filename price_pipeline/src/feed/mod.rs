//! Price feed contract consumed by the pipeline.
//!
//! A feed is an opaque source of `PriceChanged` notifications. The pipeline only
//! relies on the start/stop contract and on subscribe/unsubscribe:
//!
//! - `start` blocks the calling worker until `stop` is invoked or the feed ends
//!   on its own, so it must run on a dedicated thread.
//! - `stop` is idempotent and safe to call when the feed is not running.
//! - notifications for the same symbol are delivered in feed order.
//!
//! `FeedSubscribers` is the handler registry the built-in feeds share.
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use price_common::{PriceChanged, Result};

pub mod replay;
pub mod simulated;

pub use replay::ReplayFeed;
pub use simulated::SimulatedFeed;

/// Callback invoked for every notification.
pub type PriceHandler = Arc<dyn Fn(&PriceChanged) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// External source of price updates.
pub trait PriceFeed: Send + Sync {
    /// Run the feed on the calling thread until stopped or exhausted.
    fn start(&self) -> Result<()>;
    /// Ask a running `start` to return.
    fn stop(&self) -> Result<()>;
    /// Whether `start` is currently executing.
    fn is_running(&self) -> bool;
    /// Register a notification handler.
    fn subscribe(&self, handler: PriceHandler) -> SubscriptionId;
    /// Remove a handler. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Ordered list of notification handlers.
#[derive(Default)]
pub struct FeedSubscribers {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, PriceHandler)>>,
}

impl FeedSubscribers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler and return its id.
    pub fn add(&self, handler: PriceHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.handlers.lock() {
            Ok(mut handlers) => handlers.push((id, handler)),
            Err(poisoned) => poisoned.into_inner().push((id, handler)),
        }
        id
    }

    /// Remove the handler registered under `id`.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut handlers = match self.handlers.lock() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every handler registered at the time of the call.
    ///
    /// Handlers run outside the registry lock, so a handler may unsubscribe.
    pub fn notify(&self, event: &PriceChanged) {
        let snapshot: Vec<PriceHandler> = match self.handlers.lock() {
            Ok(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            Err(e) => {
                warn!("Subscriber list poisoned, dropping update for {}: {}", event.symbol, e);
                return;
            }
        };
        for handler in snapshot {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::atomic::AtomicUsize;

    fn event(symbol: &str) -> PriceChanged {
        PriceChanged::new(symbol, Decimal::ONE, Decimal::TWO, Decimal::ONE, Decimal::ONE)
    }

    #[test]
    fn unsubscribed_handler_is_not_called() {
        let subscribers = FeedSubscribers::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = subscribers.add(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        subscribers.notify(&event("A"));
        assert!(subscribers.remove(id));
        assert!(!subscribers.remove(id));
        subscribers.notify(&event("A"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn ids_are_distinct() {
        let subscribers = FeedSubscribers::new();
        let a = subscribers.add(Arc::new(|_| {}));
        let b = subscribers.add(Arc::new(|_| {}));
        assert_ne!(a, b);
        assert_eq!(subscribers.len(), 2);
    }
}
