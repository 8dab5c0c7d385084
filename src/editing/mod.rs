//! Mapping edit state machine.
//!
//! Pure reducers that keep an in-progress payload mapping list consistent
//! while an author edits it in the dashboard.

pub mod reducer;

pub use reducer::*;
