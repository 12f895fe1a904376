//! Live price pipeline.
//!
//! Keeps a deduplicated "latest price per instrument" view fed by an external
//! price feed and owned by a presentation thread. The building blocks:
//!
//! - `feed` — the `PriceFeed` contract plus a simulated and a replay feed.
//! - `model` — `LiveView` with its merge, the `TransferQueue` buffer and the
//!   cooperative `CancellationSignal`.
//! - `presentation` — the thread that owns the view and the `Dispatcher`
//!   workers use to hand merges over to it.
//! - `controller` — `PipelineController`, spawning and cancelling the producer
//!   and (in buffered mode) consumer workers.
//! - `shell` — Start/Stop/Exit and deferred close on top of the controller.
//! - `config` — options read from the settings provider.
//!
//! Threads and channels come from `std::thread` and `crossbeam_channel`;
//! failures never escape a worker, they are logged and end that worker's
//! cycle.
#![warn(missing_docs)]
pub mod config;
pub mod controller;
pub mod feed;
pub mod model;
pub mod presentation;
pub mod shell;

pub use config::{DispatchMode, FeedConfig, PipelineConfig};
pub use controller::{PipelineController, PipelineState, PipelineStats};
pub use feed::{PriceFeed, ReplayFeed, SimulatedFeed};
pub use model::live_view::{LiveView, MergeOutcome, merge};
pub use model::transfer_queue::{QueueCapacity, TransferQueue};
pub use presentation::{Dispatcher, PresentationContext};
pub use shell::{LifecycleCommand, Shell, ShellFlow};
