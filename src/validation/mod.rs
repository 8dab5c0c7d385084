//! Save-time validation.
//!
//! Everything here runs before any write; a failure aborts the whole write
//! with a `BadRequest` naming the offending key, or `NotFound` for a dangling
//! registry reference.

pub mod customizing;
pub mod return_method;
pub mod rule;

pub use customizing::*;
pub use return_method::*;
pub use rule::*;
