//! Structured logging with domain/rule context.
//!
//! Provides logging macros and utilities that include the domain key and
//! rule id in every log message for easy correlation.

pub mod structured;

pub use structured::*;

/// Initialize the process-wide logger. Safe to call repeatedly.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
