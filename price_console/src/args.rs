//! Command-line arguments for the price console.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;

use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Settings file with `key=value` lines (e.g. `UseMessageQueue=true`).
    #[clap(long)]
    pub settings: Option<PathBuf>,

    /// Override the `UseMessageQueue` setting.
    #[clap(long)]
    pub use_message_queue: Option<bool>,

    /// Replay recorded `SYMBOL,bid,ask,bidQty,askQty` lines instead of simulating prices.
    #[clap(long)]
    pub replay: Option<PathBuf>,

    /// Start the replay over when it reaches the end.
    #[clap(long, requires = "replay")]
    pub repeat: bool,

    /// Start streaming right away instead of waiting for `start`.
    #[clap(long)]
    pub autostart: bool,
}
