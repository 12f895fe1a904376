//!
//! Common types and utilities shared by the price pipeline and its console.
//!
//! This crate aggregates:
//! - `error` — unified error type `PipelineError` used across the workspace.
//! - `result` — handy `Result<T, PipelineError>` alias.
//! - `record` — `PriceRecord`, the `PriceChanged` notification and line parsing.
//! - `settings` — the key-value settings provider with default fallback.
#![warn(missing_docs)]
pub mod error;
pub mod record;
pub mod result;
pub mod settings;

pub use error::PipelineError;
pub use record::{PriceChanged, PriceRecord};
pub use result::Result;
pub use settings::{Settings, SettingsProvider};
