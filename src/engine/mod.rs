//! Rule match engine.
//!
//! Stateless per signal: a rule fires when the signal's event type matches,
//! its tracking target matches and every condition matches. Rules are
//! independent of each other.

pub mod evaluator;
pub mod matcher;

pub use evaluator::*;
pub use matcher::*;
