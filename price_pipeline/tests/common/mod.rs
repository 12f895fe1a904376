//! Shared fixtures for the pipeline integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use price_common::{PipelineError, PriceChanged, PriceRecord, Result};
use price_pipeline::feed::{FeedSubscribers, PriceFeed, PriceHandler, SubscriptionId};
use rust_decimal::Decimal;

pub const WAIT: Duration = Duration::from_secs(5);

enum FeedMessage {
    Update(PriceChanged),
    Stop,
}

/// Feed driven by the test: `emit` queues an update that the thread running
/// `start` delivers to subscribers.
pub struct ManualFeed {
    tx: Sender<FeedMessage>,
    rx: Receiver<FeedMessage>,
    running: AtomicBool,
    stop_pending: AtomicBool,
    starts: AtomicUsize,
    subscribers: FeedSubscribers,
}

impl ManualFeed {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = unbounded();
        Arc::new(Self {
            tx,
            rx,
            running: AtomicBool::new(false),
            stop_pending: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            subscribers: FeedSubscribers::new(),
        })
    }

    pub fn emit(&self, event: PriceChanged) {
        self.tx.send(FeedMessage::Update(event)).unwrap();
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl PriceFeed for ManualFeed {
    fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::Feed("manual feed already running".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        while let Ok(FeedMessage::Update(event)) = self.rx.recv() {
            self.subscribers.notify(&event);
        }
        self.stop_pending.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.stop_pending.swap(true, Ordering::SeqCst) {
            self.tx
                .send(FeedMessage::Stop)
                .map_err(|e| PipelineError::ChannelSend(e.to_string()))?;
        }
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

pub fn update(symbol: &str, bid: i64, ask: i64, bid_qty: i64, ask_qty: i64) -> PriceChanged {
    PriceChanged::new(
        symbol,
        Decimal::from(bid),
        Decimal::from(ask),
        Decimal::from(bid_qty),
        Decimal::from(ask_qty),
    )
}

pub fn record(symbol: &str, bid: i64, ask: i64, bid_qty: i64, ask_qty: i64) -> PriceRecord {
    update(symbol, bid, ask, bid_qty, ask_qty).to_record()
}

/// Poll `done` from a thread that is not the presentation thread.
pub fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
