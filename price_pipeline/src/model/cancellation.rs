//! Cooperative cancellation flag shared by the workers of one pipeline cycle.
//!
//! The controller creates a fresh signal on every start, hands clones to the
//! producer, the consumer and the notification handler, and raises it once on
//! stop. Workers poll `is_cancelled` at each loop iteration; nothing is ever
//! terminated forcibly.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, clonable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    /// Create a signal in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` only for the call that raised it.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_cancel() {
        let signal = CancellationSignal::new();
        let worker_view = signal.clone();
        assert!(!worker_view.is_cancelled());
        assert!(signal.cancel());
        assert!(worker_view.is_cancelled());
        assert!(!signal.cancel());
    }
}
