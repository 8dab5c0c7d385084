//! Security module.
//!
//! Hygiene for values extracted from third-party pages before they enter an
//! event.

pub mod sanitizer;

pub use sanitizer::*;
