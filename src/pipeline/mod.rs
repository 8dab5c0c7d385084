//! Collector-side batch processing.
//!
//! Applies a domain's rules to a batch of captured signals and gathers the
//! emitted events with batch counters.

pub mod collector;
pub mod context;

pub use collector::*;
pub use context::*;
