//! Payload source resolver.
//!
//! Per-source extraction of raw payload values from captured signals:
//! request bodies (JSON path), request URLs (path segment or query
//! parameter), DOM elements (selector), cookies and browser storage.

pub mod json_path;
pub mod resolver;
pub mod selector;
pub mod signal;
pub mod url_pattern;

pub use json_path::*;
pub use resolver::*;
pub use selector::{selector_path, Selector, SelectorError};
pub use signal::*;
pub use url_pattern::*;
