//! Producer/consumer lifecycle of the price pipeline.
//!
//! A `PipelineController` wires a `PriceFeed` to the live view owned by the
//! presentation thread. Each start/stop cycle has its own workers:
//!
//! - Producer — a dedicated thread blocked inside `feed.start()` until the feed
//!   is stopped or ends. Feed notifications are handled on that thread.
//! - Consumer (buffered mode only) — a second thread draining the cycle's
//!   `TransferQueue` and merging each record through the `Dispatcher`.
//!
//! In direct mode the notification handler merges synchronously; in buffered
//! mode it only enqueues. Either way records for one symbol reach the view in
//! feed order.
//!
//! Shutdown is cooperative: `stop` unsubscribes, completes the queue, raises
//! the cycle's `CancellationSignal` and asks the feed to stop, then returns
//! without joining. The consumer keeps draining what was already buffered.
//! Every start creates a fresh cancellation signal and a fresh queue, so a
//! completed queue from the previous cycle never reaches a new consumer.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use price_common::{PipelineError, PriceChanged, Result};
use strum_macros::Display;

use crate::config::{DispatchMode, PipelineConfig};
use crate::feed::{PriceFeed, PriceHandler, SubscriptionId};
use crate::model::cancellation::CancellationSignal;
use crate::model::transfer_queue::TransferQueue;
use crate::presentation::Dispatcher;

/// Wait between checks while the previous cycle's feed run winds down.
const PRODUCER_RESTART_BACKOFF: Duration = Duration::from_millis(5);

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PipelineState {
    /// No workers of the current cycle are running.
    Stopped,
    /// Workers are being spawned.
    Starting,
    /// Workers are spawned and the feed is subscribed.
    Running,
    /// Cancellation is being signalled.
    Stopping,
}

/// Counts of updates seen by the controller across all cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    /// Notifications accepted by the handler.
    pub received: u64,
    /// Records merged into the live view.
    pub merged: u64,
    /// Updates dropped (empty symbol, full queue, closed context).
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    merged: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            received: self.received.load(Ordering::Relaxed),
            merged: self.merged.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrates the producer and consumer workers of the pipeline.
pub struct PipelineController {
    feed: Arc<dyn PriceFeed>,
    dispatcher: Dispatcher,
    config: PipelineConfig,
    state: PipelineState,
    cycle: u64,
    cancel: CancellationSignal,
    queue: Option<Arc<TransferQueue>>,
    subscription: Option<SubscriptionId>,
    producer: Option<JoinHandle<()>>,
    consumer: Option<JoinHandle<()>>,
    /// Workers of earlier cycles that may still be finishing.
    retired: Vec<JoinHandle<()>>,
    spawned: usize,
    counters: Arc<Counters>,
}

impl PipelineController {
    /// Create a stopped controller.
    pub fn new(feed: Arc<dyn PriceFeed>, dispatcher: Dispatcher, config: PipelineConfig) -> Self {
        Self {
            feed,
            dispatcher,
            config,
            state: PipelineState::Stopped,
            cycle: 0,
            cancel: CancellationSignal::new(),
            queue: None,
            subscription: None,
            producer: None,
            consumer: None,
            retired: Vec::new(),
            spawned: 0,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Spawn the workers of a new cycle. Does nothing unless stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.state != PipelineState::Stopped {
            debug!("Start ignored, pipeline is {}", self.state);
            return Ok(());
        }
        self.reap_finished();
        self.state = PipelineState::Starting;
        self.cycle += 1;
        self.cancel = CancellationSignal::new();
        self.queue = match self.config.mode {
            DispatchMode::Buffered => Some(Arc::new(TransferQueue::new(
                self.config.queue_capacity,
                self.config.enqueue_timeout,
            ))),
            DispatchMode::Direct => None,
        };

        self.subscription = Some(self.feed.subscribe(self.notification_handler()));

        if let Err(e) = self.spawn_workers() {
            error!("Failed to spawn pipeline workers: {}", e);
            self.state = PipelineState::Running;
            self.stop();
            return Err(e);
        }

        self.state = PipelineState::Running;
        info!("Pipeline cycle {} running in {} mode", self.cycle, self.config.mode);
        Ok(())
    }

    /// Signal the current cycle to wind down. Does nothing when stopped.
    ///
    /// Returns without waiting for the workers; failures while stopping are
    /// logged and the controller ends up stopped regardless.
    pub fn stop(&mut self) {
        if self.state == PipelineState::Stopped {
            debug!("Stop ignored, pipeline is already stopped");
            return;
        }
        self.state = PipelineState::Stopping;

        if let Some(id) = self.subscription.take() {
            if !self.feed.unsubscribe(id) {
                debug!("Feed subscription {:?} was already gone", id);
            }
        }
        if let Some(queue) = &self.queue {
            if let Err(e) = queue.complete() {
                warn!("Failed to complete transfer queue: {}", e);
            }
        }
        self.cancel.cancel();

        let producer_alive = self.producer.as_ref().is_some_and(|h| !h.is_finished());
        if self.feed.is_running() || producer_alive {
            if let Err(e) = self.feed.stop() {
                warn!("Feed stop failed: {}", e);
            }
        }

        self.retired.extend(self.producer.take());
        self.retired.extend(self.consumer.take());
        self.reap_finished();

        self.state = PipelineState::Stopped;
        info!("Pipeline cycle {} stopped", self.cycle);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether a cycle is running.
    pub fn is_running(&self) -> bool {
        self.state == PipelineState::Running
    }

    /// Configured dispatch mode.
    pub fn mode(&self) -> DispatchMode {
        self.config.mode
    }

    /// Number of start transitions so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Records buffered in the latest cycle's queue; zero in direct mode.
    pub fn queue_len(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.len())
    }

    /// Number of worker threads spawned and not yet finished.
    pub fn live_workers(&self) -> usize {
        self.producer
            .iter()
            .chain(self.consumer.iter())
            .chain(self.retired.iter())
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Number of worker threads spawned since the controller was created.
    pub fn spawned_workers(&self) -> usize {
        self.spawned
    }

    /// Whether every worker of every cycle has finished.
    pub fn is_idle(&self) -> bool {
        self.live_workers() == 0
    }

    /// Update counters since the controller was created.
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    fn spawn_workers(&mut self) -> Result<()> {
        let feed = Arc::clone(&self.feed);
        let cancel = self.cancel.clone();
        let producer = thread::Builder::new()
            .name(format!("price-producer-{}", self.cycle))
            .spawn(move || run_producer(feed, cancel))?;
        self.producer = Some(producer);
        self.spawned += 1;

        if let Some(queue) = &self.queue {
            let queue = Arc::clone(queue);
            let dispatcher = self.dispatcher.clone();
            let cancel = self.cancel.clone();
            let counters = Arc::clone(&self.counters);
            let poll_interval = self.config.poll_interval;
            let consumer = thread::Builder::new()
                .name(format!("price-consumer-{}", self.cycle))
                .spawn(move || run_consumer(queue, dispatcher, cancel, counters, poll_interval))?;
            self.consumer = Some(consumer);
            self.spawned += 1;
        }
        Ok(())
    }

    fn notification_handler(&self) -> PriceHandler {
        let cancel = self.cancel.clone();
        let queue = self.queue.clone();
        let dispatcher = self.dispatcher.clone();
        let counters = Arc::clone(&self.counters);
        let feed: Weak<dyn PriceFeed> = Arc::downgrade(&self.feed);

        Arc::new(move |event: &PriceChanged| {
            if cancel.is_cancelled() {
                return;
            }
            counters.received.fetch_add(1, Ordering::Relaxed);
            let record = event.to_record();
            if !record.has_symbol() {
                warn!("Dropping price update without a symbol");
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }

            let outcome = match &queue {
                Some(queue) => queue.enqueue(record).map(|_| ()),
                None => dispatcher.merge(record).map(|_| {
                    counters.merged.fetch_add(1, Ordering::Relaxed);
                }),
            };
            match outcome {
                Ok(()) => {}
                Err(PipelineError::ContextClosed) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("Presentation context closed, halting direct dispatch for this cycle");
                    cancel.cancel();
                    if let Some(feed) = feed.upgrade() {
                        let _ = feed.stop();
                    }
                }
                Err(e) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("Dropped update for {}: {}", event.symbol, e);
                }
            }
        })
    }

    /// Join finished workers so panics surface in the log.
    fn reap_finished(&mut self) {
        let (finished, pending): (Vec<_>, Vec<_>) =
            self.retired.drain(..).partition(|h| h.is_finished());
        self.retired = pending;
        for handle in finished {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!("Pipeline worker {} panicked", name);
            }
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_producer(feed: Arc<dyn PriceFeed>, cancel: CancellationSignal) {
    info!("Producer started (Thread ID: {:?})", thread::current().id());
    // A quick stop/start can overlap with the previous cycle's feed run.
    while feed.is_running() {
        if cancel.is_cancelled() {
            info!("Producer cancelled before the feed started");
            return;
        }
        thread::sleep(PRODUCER_RESTART_BACKOFF);
    }
    match feed.start() {
        Ok(()) => info!("Producer finished"),
        Err(e) => error!("Feed terminated with error: {}", e),
    }
}

fn run_consumer(
    queue: Arc<TransferQueue>,
    dispatcher: Dispatcher,
    cancel: CancellationSignal,
    counters: Arc<Counters>,
    poll_interval: Duration,
) {
    info!("Consumer started (Thread ID: {:?})", thread::current().id());
    let mut merged = 0u64;
    loop {
        if queue.is_drained() || (cancel.is_cancelled() && queue.is_empty()) {
            break;
        }
        let Some(record) = queue.dequeue_timeout(poll_interval) else {
            continue;
        };
        match dispatcher.merge(record) {
            Ok(_) => {
                merged += 1;
                counters.merged.fetch_add(1, Ordering::Relaxed);
            }
            Err(PipelineError::EmptySymbol) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Skipped buffered update without a symbol");
            }
            Err(PipelineError::ContextClosed) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Presentation context closed, consumer abandons {} buffered updates",
                    queue.len()
                );
                break;
            }
            Err(e) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                error!("Consumer stopped on merge failure: {}", e);
                break;
            }
        }
    }
    info!("Consumer finished after {} merges", merged);
}
