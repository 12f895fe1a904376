//! Domain models of the price pipeline.
//!
//! - `live_view` — the ordered, per-symbol view and the merge operation.
//! - `transfer_queue` — the optional buffer between feed and merge.
//! - `cancellation` — the cooperative stop flag shared by pipeline workers.

pub mod cancellation;
pub mod live_view;
pub mod transfer_queue;
