//! Storage module.
//!
//! Persisted row shapes, SQL query builders for the host's relational store,
//! and the in-process [`MemoryStore`].

pub mod memory;
pub mod models;
pub mod queries;

pub use memory::*;
pub use models::*;
pub use queries::*;
