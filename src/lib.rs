//! RecSys Tracker Core - declarative tracking rules and widget configuration
//!
//! This crate holds the configuration model a recommendation tracker is
//! driven by: which raw browser signal (DOM element, outgoing HTTP request,
//! URL, cookie or storage) produces each canonical event field, and how a
//! recommendation widget lays out its fields. The implementation prioritizes:
//!
//! 1. **Consistency** - Mappings stay valid for their source through every edit
//! 2. **Validation** - Nothing malformed is persisted; errors name the offending key
//! 3. **Logging** - Every decision point logged with domain/rule/batch context
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `registry` - Operators, patterns and event types (DB-loadable)
//! - `model` - Domains, rules, payload mappings, return methods, events
//! - `extraction` - Payload source resolver over captured signals
//! - `editing` - Mapping edit state machine (pure reducer)
//! - `engine` - Rule match engine with identity fallback
//! - `validation` - Rule, return method and customizing-field validation
//! - `storage` - Row models, SQL query builders, in-memory store
//! - `cache` - Per-domain read-through list cache
//! - `service` - Dashboard and collector operations
//! - `pipeline` - Batch signal collection
//! - `logging` - Structured logging with domain/batch context
//!
//! Python bindings are available behind the `python` feature.

pub mod cache;
pub mod config;
pub mod editing;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod security;
pub mod service;
pub mod storage;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use config::CoreConfig;
pub use error::{CoreError, EntityKind, Result};
pub use logging::init_logger;
