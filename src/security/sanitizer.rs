//! Extracted value sanitization.
//!
//! Values come from pages the collector does not control. Before a value is
//! placed in an event it is trimmed and size-checked. With `reject_markup`
//! enabled it is also scanned for control characters and script payloads.
//! A value that fails is an extraction failure, never a hard error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CoreConfig;
use crate::extraction::ExtractionFailure;
use crate::logging::structured::LogContext;

lazy_static! {
    /// Script/markup injection patterns
    static ref INJECTION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)<script[^>]*>").unwrap(),
        Regex::new(r"(?i)javascript:").unwrap(),
        Regex::new(r"(?i)<iframe[^>]*>").unwrap(),
        Regex::new(r"(?i)<object[^>]*>").unwrap(),
        Regex::new(r"(?i)<embed[^>]*>").unwrap(),
        Regex::new(r"(?i)<[a-z][^>]*\son\w+\s*=").unwrap(),
    ];

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse internal whitespace runs, as DOM text content carries layout
/// whitespace.
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

fn reject_markup(value: &str, ctx: &LogContext) -> Result<(), ExtractionFailure> {
    if value.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        log::warn!("{} VALUE_REJECTED reason=control_characters", ctx);
        return Err(ExtractionFailure::Rejected("control characters".to_string()));
    }

    for pattern in INJECTION_PATTERNS.iter() {
        if pattern.is_match(value) {
            log::warn!(
                "{} PATTERN_DETECTED type=injection pattern={}",
                ctx,
                pattern.as_str()
            );
            return Err(ExtractionFailure::Rejected(format!(
                "matched injection pattern {}",
                pattern.as_str()
            )));
        }
    }
    Ok(())
}

/// Check an extracted value and return the cleaned string.
pub fn sanitize_value(
    raw: &str,
    config: &CoreConfig,
    ctx: &LogContext,
) -> Result<String, ExtractionFailure> {
    let value = if config.trim_values { raw.trim() } else { raw };

    if value.is_empty() {
        return Err(ExtractionFailure::EmptyValue);
    }

    if value.len() > config.max_value_len {
        log::warn!(
            "{} SIZE_LIMIT_EXCEEDED size={} limit={}",
            ctx,
            value.len(),
            config.max_value_len
        );
        return Err(ExtractionFailure::ValueTooLong {
            len: value.len(),
            limit: config.max_value_len,
        });
    }

    if config.reject_markup {
        reject_markup(value, ctx)?;
    }

    Ok(value.to_string())
}
