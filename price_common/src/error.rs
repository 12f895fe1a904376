//! Error types shared by the pipeline and the console.
//!
//! The `PipelineError` enum unifies I/O and parsing failures, queue and channel
//! failures, and the handoff errors raised when a merge cannot reach the
//! presentation context, so every crate can propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by every crate of the workspace.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// I/O error originating from the standard library (files, stdin, threads).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error while parsing recorded price lines into updates.
    #[error("Parse prices error at line {line}: {reason}")]
    ParsePrices {
        /// 1-based line number of the offending input.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },

    /// Error while reading a settings source.
    #[error("Parse settings error: {0}")]
    ParseSettings(String),

    /// An update arrived without an instrument symbol.
    #[error("Price update rejected: empty symbol")]
    EmptySymbol,

    /// The transfer queue no longer accepts items.
    #[error("Transfer queue is completed")]
    QueueCompleted,

    /// A bounded transfer queue stayed full for the whole enqueue timeout.
    #[error("Transfer queue is full, dropped update for {0}")]
    QueueFull(String),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Crossbeam/channel receive failed (e.g., sender closed); contains a short context string.
    #[error("Channel receive failed: {0}")]
    ChannelRecv(String),

    /// The presentation context that owns the live view has been torn down.
    #[error("Presentation context closed")]
    ContextClosed,

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),

    /// The price feed failed while starting, running or stopping.
    #[error("Feed error: {0}")]
    Feed(String),
}

impl<T> From<PoisonError<T>> for PipelineError {
    fn from(err: PoisonError<T>) -> Self {
        PipelineError::MutexLock(err.to_string())
    }
}
