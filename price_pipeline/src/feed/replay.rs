//! Feed that replays recorded updates.
//!
//! Input is one `SYMBOL,bid,ask,bidQty,askQty` update per line; see
//! `price_common::record::PriceParser`. Updates are delivered in file order,
//! optionally spaced by an interval. Unless `repeat` is set the feed ends on its
//! own after the last update.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::info;
use price_common::record::PriceParser;
use price_common::{PipelineError, PriceChanged, Result};

use super::{FeedSubscribers, PriceFeed, PriceHandler, SubscriptionId};

/// Plays back a fixed list of updates.
pub struct ReplayFeed {
    updates: Vec<PriceChanged>,
    interval: Duration,
    repeat: bool,
    running: AtomicBool,
    stop_requested: AtomicBool,
    subscribers: FeedSubscribers,
}

impl ReplayFeed {
    /// Create a feed replaying `updates` back to back.
    pub fn new(updates: Vec<PriceChanged>) -> Self {
        Self {
            updates,
            interval: Duration::ZERO,
            repeat: false,
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            subscribers: FeedSubscribers::new(),
        }
    }

    /// Parse updates from a reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Ok(Self::new(PriceChanged::parse_from_reader(reader)?))
    }

    /// Parse updates from a file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Wait `interval` after each update.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start over from the first update instead of ending.
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Number of recorded updates.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Whether there is nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    fn stopped(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

impl PriceFeed for ReplayFeed {
    fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::Feed("replay feed already running".to_string()));
        }
        info!("Replay feed started with {} updates", self.updates.len());

        let mut delivered = 0usize;
        'replay: loop {
            for update in &self.updates {
                if self.stopped() {
                    break 'replay;
                }
                let mut event = update.clone();
                event.timestamp = Utc::now();
                self.subscribers.notify(&event);
                delivered += 1;
                if !self.interval.is_zero() {
                    thread::sleep(self.interval);
                }
            }
            if !self.repeat || self.updates.is_empty() {
                break;
            }
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        info!("Replay feed finished after {} updates", delivered);
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
