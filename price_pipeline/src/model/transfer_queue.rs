//! Buffer between feed notifications and the draining consumer.
//!
//! A `TransferQueue` is a multi-producer/single-consumer FIFO of `PriceRecord`
//! backed by a `crossbeam_channel`. It is unbounded by default since feed
//! rates are expected to be modest; a bounded queue applies backpressure by
//! blocking the producer for at most the configured enqueue timeout.
//!
//! Once `complete` is called no further items are accepted, and the consumer
//! keeps draining until `is_drained` reports both completion and emptiness.
use std::sync::RwLock;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded, unbounded};
use price_common::{PipelineError, PriceRecord, Result};

/// Capacity policy of a transfer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueCapacity {
    /// Never blocks the producer.
    #[default]
    Unbounded,
    /// Holds at most this many records.
    Bounded(usize),
}

impl QueueCapacity {
    /// Maps a configured capacity to a policy; `0` means unbounded.
    pub fn from_setting(capacity: usize) -> Self {
        match capacity {
            0 => QueueCapacity::Unbounded,
            n => QueueCapacity::Bounded(n),
        }
    }
}

/// FIFO buffer of price records with a terminal completed state.
pub struct TransferQueue {
    tx: Sender<PriceRecord>,
    rx: Receiver<PriceRecord>,
    /// Held for reading while enqueuing so that `complete` cannot interleave
    /// with an in-flight send.
    completed: RwLock<bool>,
    enqueue_timeout: Duration,
}

impl TransferQueue {
    /// Create an empty queue with the given capacity policy.
    ///
    /// `enqueue_timeout` only matters for bounded queues.
    pub fn new(capacity: QueueCapacity, enqueue_timeout: Duration) -> Self {
        let (tx, rx) = match capacity {
            QueueCapacity::Unbounded => unbounded(),
            QueueCapacity::Bounded(n) => bounded(n),
        };
        Self {
            tx,
            rx,
            completed: RwLock::new(false),
            enqueue_timeout,
        }
    }

    /// Create an empty unbounded queue.
    pub fn unbounded() -> Self {
        Self::new(QueueCapacity::Unbounded, Duration::ZERO)
    }

    /// Append a record.
    ///
    /// Fails with `QueueCompleted` after `complete`, and with `QueueFull` when
    /// a bounded queue stays full for the whole enqueue timeout.
    pub fn enqueue(&self, record: PriceRecord) -> Result<()> {
        let completed = self.completed.read()?;
        if *completed {
            return Err(PipelineError::QueueCompleted);
        }
        match self.tx.send_timeout(record, self.enqueue_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(record)) => Err(PipelineError::QueueFull(record.symbol)),
            Err(SendTimeoutError::Disconnected(_)) => {
                Err(PipelineError::ChannelSend("transfer queue".to_string()))
            }
        }
    }

    /// Take the oldest record without blocking.
    pub fn try_dequeue(&self) -> Option<PriceRecord> {
        self.rx.try_recv().ok()
    }

    /// Take the oldest record, waiting at most `timeout` for one to arrive.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<PriceRecord> {
        match self.rx.recv_timeout(timeout) {
            Ok(record) => Some(record),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Mark that no more items will be enqueued. Idempotent.
    pub fn complete(&self) -> Result<()> {
        let mut completed = self.completed.write()?;
        *completed = true;
        Ok(())
    }

    /// Whether `complete` has been called.
    pub fn is_completed(&self) -> bool {
        self.completed.read().map(|c| *c).unwrap_or(true)
    }

    /// Completed and empty: the consumer has nothing left to do.
    pub fn is_drained(&self) -> bool {
        self.is_completed() && self.rx.is_empty()
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
