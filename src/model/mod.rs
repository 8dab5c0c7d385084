//! Configuration data model.
//!
//! Domains own tracking rules and return methods. Events are the canonical
//! output of applying a rule to a captured signal.

pub mod domain;
pub mod event;
pub mod mapping;
pub mod return_method;
pub mod rule;

pub use domain::*;
pub use event::*;
pub use mapping::*;
pub use return_method::*;
pub use rule::*;
