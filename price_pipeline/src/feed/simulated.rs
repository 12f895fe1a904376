//! Random-walk price feed.
//!
//! `SimulatedFeed` synthesizes bid/ask updates for a fixed set of symbols and
//! delivers them to its subscribers from the thread that called `start`. Each
//! tick moves every symbol's bid by at most one percent, quotes an ask a few
//! cents above it and draws fresh quantities.
//!
//! Design notes:
//! - Last bids live in a `HashMap<String, Decimal>` owned by the running loop,
//!   so subscribers observe a continuous price path per symbol.
//! - `stop` raises a flag; the loop sleeps in short slices so it returns
//!   promptly even with a long emit interval.
//! - A `stop` that arrives before `start` is latched: the next `start` returns
//!   at once. The flag is cleared when `start` returns.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use price_common::{PipelineError, PriceChanged, Result};
use rand::Rng;
use rust_decimal::Decimal;

use super::{FeedSubscribers, PriceFeed, PriceHandler, SubscriptionId};

/// Longest uninterrupted sleep of the emit loop.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(20);

/// Calculate the next bid using a small random walk around `current`.
///
/// The change is sampled uniformly from `[-1%, +1%]` in basis points and the
/// result is rounded to cents and clamped to a minimum of one cent.
pub fn next_bid(current: Decimal) -> Decimal {
    let mut rng = rand::rng();
    let change_bps: i64 = rng.random_range(-100..=100);
    let next = (current * (Decimal::ONE + Decimal::new(change_bps, 4))).round_dp(2);
    next.max(Decimal::new(1, 2))
}

/// Build a full update for `symbol` from a bid.
fn quote(symbol: &str, bid_price: Decimal) -> PriceChanged {
    let mut rng = rand::rng();
    let spread = Decimal::new(rng.random_range(1..=5), 2);
    let bid_qty = Decimal::from(rng.random_range(1..=50) * 100);
    let ask_qty = Decimal::from(rng.random_range(1..=50) * 100);
    PriceChanged::new(symbol, bid_price, bid_price + spread, bid_qty, ask_qty)
}

/// Background-free market data generator driven by the caller's thread.
pub struct SimulatedFeed {
    symbols: Vec<String>,
    interval: Duration,
    initial_bid: Decimal,
    running: AtomicBool,
    stop_requested: AtomicBool,
    subscribers: FeedSubscribers,
}

impl SimulatedFeed {
    /// Create a feed for `symbols` emitting one round of updates per `interval`.
    pub fn new(symbols: Vec<String>, interval: Duration) -> Self {
        Self {
            symbols,
            interval,
            initial_bid: Decimal::from(100),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            subscribers: FeedSubscribers::new(),
        }
    }

    /// Set the bid every symbol starts from.
    pub fn with_initial_bid(mut self, initial_bid: Decimal) -> Self {
        self.initial_bid = initial_bid;
        self
    }

    fn sleep_unless_stopped(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stop_requested.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(STOP_CHECK_SLICE));
        }
    }
}

impl PriceFeed for SimulatedFeed {
    fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::Feed("simulated feed already running".to_string()));
        }
        info!(
            "Simulated feed started for {} symbols (Thread ID: {:?})",
            self.symbols.len(),
            thread::current().id()
        );

        let mut current_bids: HashMap<String, Decimal> = self
            .symbols
            .iter()
            .map(|s| (s.clone(), self.initial_bid))
            .collect();

        while !self.stop_requested.load(Ordering::SeqCst) {
            for symbol in &self.symbols {
                if self.stop_requested.load(Ordering::SeqCst) {
                    break;
                }
                let current = current_bids.get(symbol).copied().unwrap_or(self.initial_bid);
                let bid = next_bid(current);
                current_bids.insert(symbol.clone(), bid);

                let event = quote(symbol, bid);
                debug!(
                    "Price changed: {} bid {}@{} ask {}@{}",
                    event.symbol, event.bid_qty, event.bid_price, event.ask_qty, event.ask_price
                );
                self.subscribers.notify(&event);
            }
            self.sleep_unless_stopped(self.interval);
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        info!("Simulated feed stopped");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn subscribe(&self, handler: PriceHandler) -> SubscriptionId {
        self.subscribers.add(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn next_bid_stays_within_one_percent() {
        let current = Decimal::from(100);
        for _ in 0..200 {
            let next = next_bid(current);
            assert!(next >= Decimal::from(99) && next <= Decimal::from(101), "{}", next);
        }
    }

    #[test]
    fn next_bid_never_reaches_zero() {
        assert_eq!(next_bid(Decimal::ZERO), Decimal::new(1, 2));
    }

    #[test]
    fn emits_until_stopped() {
        let feed = Arc::new(SimulatedFeed::new(
            vec!["AAPL".to_string(), "MSFT".to_string()],
            Duration::from_millis(5),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        feed.subscribe(Arc::new(move |e: &PriceChanged| {
            sink.lock().unwrap().push(e.clone());
        }));

        let runner = Arc::clone(&feed);
        let handle = thread::spawn(move || runner.start());
        while seen.lock().unwrap().len() < 4 {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(feed.is_running());
        feed.stop().unwrap();
        handle.join().unwrap().unwrap();
        assert!(!feed.is_running());

        let events = seen.lock().unwrap();
        assert!(events.iter().all(|e| e.ask_price > e.bid_price));
        assert_eq!(events[0].symbol, "AAPL");
        assert_eq!(events[1].symbol, "MSFT");
    }

    #[test]
    fn stop_before_start_is_latched_once() {
        let feed = SimulatedFeed::new(vec!["A".to_string()], Duration::from_millis(5));
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        feed.subscribe(Arc::new(move |_: &PriceChanged| *sink.lock().unwrap() += 1));

        feed.stop().unwrap();
        feed.stop().unwrap();
        assert!(!feed.is_running());
        feed.start().unwrap();
        assert_eq!(*seen.lock().unwrap(), 0);
        assert!(!feed.stop_requested.load(Ordering::SeqCst));
    }
}
