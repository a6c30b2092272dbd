//! Wait engine and interaction primitives.
//!
//! This crate provides the building blocks the scenario sequencer composes:
//! - a polling wait engine that never spins faster than its poll interval
//! - total primitives (navigate, set value, invoke, scroll, hover, capture,
//!   explicit waits) that turn "element absent" into a `Skipped` outcome
//! - the outcome and report types shared with the sequencer

pub mod errors;
mod primitives;
pub mod types;
pub mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
