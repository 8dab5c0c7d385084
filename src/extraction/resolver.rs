//! Payload source resolver.
//!
//! Given a payload mapping and a captured signal, produce the raw string
//! value or an [`ExtractionFailure`]. Failures never escape as errors; the
//! engine decides whether to omit the field or fall back.

use serde_json::Value;
use thiserror::Error;

use crate::config::CoreConfig;
use crate::logging::structured::LogContext;
use crate::model::{ExtractionRecipe, PayloadMapping, UrlPart};
use crate::security::sanitizer::{collapse_whitespace, sanitize_value};

use super::json_path::{resolve_json_path, value_to_string};
use super::selector::Selector;
use super::signal::{CapturedSignal, HttpExchange};
use super::url_pattern::{method_matches, path_segments, query_param, url_matches};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("mapping incomplete: {0}")]
    IncompleteMapping(String),

    #[error("signal carries no HTTP exchange")]
    NoExchange,

    #[error("exchange {method} {url} does not match the mapping")]
    RequestMismatch { url: String, method: String },

    #[error("exchange has no JSON body")]
    MissingBody,

    #[error("path {0:?} not found in body")]
    PathNotFound(String),

    #[error("path index {index} out of range ({len} segments)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("query parameter {0:?} absent")]
    QueryParamMissing(String),

    #[error("{0}")]
    InvalidSelector(String),

    #[error("selector {0:?} matched no element")]
    NoMatchingElement(String),

    #[error("element {selector:?} has no attribute {attribute:?}")]
    MissingAttribute { selector: String, attribute: String },

    #[error("key {key:?} absent from {store}")]
    KeyAbsent { store: &'static str, key: String },

    #[error("extracted value is empty")]
    EmptyValue,

    #[error("extracted value is {len} bytes, limit {limit}")]
    ValueTooLong { len: usize, limit: usize },

    #[error("extracted value rejected: {0}")]
    Rejected(String),
}

/// Resolve one mapping against one signal.
pub fn resolve_mapping(
    mapping: &PayloadMapping,
    signal: &CapturedSignal,
    config: &CoreConfig,
    ctx: &LogContext,
) -> Result<String, ExtractionFailure> {
    let recipe = mapping
        .recipe()
        .map_err(|e| ExtractionFailure::IncompleteMapping(e.to_string()))?;

    let raw = match recipe {
        ExtractionRecipe::RequestBody {
            url_pattern,
            method,
            body_path,
        } => {
            let exchange = matching_exchange(signal, url_pattern, method)?;
            read_body_path(exchange, body_path)?
        }
        ExtractionRecipe::RequestUrl {
            url_pattern,
            method,
            part,
        } => {
            let exchange = matching_exchange(signal, url_pattern, method)?;
            read_url_part(&exchange.url, part)?
        }
        ExtractionRecipe::Element {
            selector,
            attribute,
        } => read_element(signal, selector, attribute)?,
        ExtractionRecipe::Cookie { key } => lookup(&signal.page.cookies, "cookie", key)?,
        ExtractionRecipe::LocalStorage { key } => {
            lookup(&signal.page.local_storage, "local_storage", key)?
        }
        ExtractionRecipe::SessionStorage { key } => {
            lookup(&signal.page.session_storage, "session_storage", key)?
        }
    };

    sanitize_value(&raw, config, ctx)
}

fn matching_exchange<'a>(
    signal: &'a CapturedSignal,
    url_pattern: &str,
    method: &str,
) -> Result<&'a HttpExchange, ExtractionFailure> {
    let exchange = signal.exchange.as_ref().ok_or(ExtractionFailure::NoExchange)?;
    if url_matches(url_pattern, &exchange.url) && method_matches(method, &exchange.method) {
        Ok(exchange)
    } else {
        Err(ExtractionFailure::RequestMismatch {
            url: exchange.url.clone(),
            method: exchange.method.clone(),
        })
    }
}

fn read_body_path(exchange: &HttpExchange, body_path: &str) -> Result<String, ExtractionFailure> {
    let body = exchange.body.as_ref().ok_or(ExtractionFailure::MissingBody)?;

    // Collectors may hand over the body as the raw request text.
    let parsed;
    let body = match body {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|_| ExtractionFailure::MissingBody)?;
            &parsed
        }
        other => other,
    };

    resolve_json_path(body, body_path)
        .and_then(value_to_string)
        .ok_or_else(|| ExtractionFailure::PathNotFound(body_path.to_string()))
}

fn read_url_part(url: &str, part: UrlPart<'_>) -> Result<String, ExtractionFailure> {
    match part {
        UrlPart::PathIndex(index) => {
            let segments = path_segments(url);
            segments
                .get(index)
                .cloned()
                .ok_or(ExtractionFailure::IndexOutOfRange {
                    index,
                    len: segments.len(),
                })
        }
        UrlPart::Query(name) => query_param(url, name)
            .ok_or_else(|| ExtractionFailure::QueryParamMissing(name.to_string())),
    }
}

/// The originating element, or its closest ancestor, wins when it matches;
/// otherwise the first match in document order.
fn read_element(
    signal: &CapturedSignal,
    selector: &str,
    attribute: Option<&str>,
) -> Result<String, ExtractionFailure> {
    let parsed = Selector::parse(selector)
        .map_err(|e| ExtractionFailure::InvalidSelector(e.to_string()))?;
    let dom = &signal.page.dom;

    let mut chosen = None;
    let mut cursor = signal.element.filter(|i| *i < dom.nodes.len());
    while let Some(i) = cursor {
        if parsed.matches(dom, i) {
            chosen = Some(i);
            break;
        }
        cursor = dom.parent(i).filter(|p| *p < i);
    }
    let index = chosen
        .or_else(|| parsed.select(dom).into_iter().next())
        .ok_or_else(|| ExtractionFailure::NoMatchingElement(selector.to_string()))?;

    let node = dom
        .get(index)
        .ok_or_else(|| ExtractionFailure::NoMatchingElement(selector.to_string()))?;

    match attribute {
        Some(name) => node
            .attribute(name)
            .map(str::to_string)
            .ok_or_else(|| ExtractionFailure::MissingAttribute {
                selector: selector.to_string(),
                attribute: name.to_string(),
            }),
        None => Ok(collapse_whitespace(&node.text)),
    }
}

fn lookup(
    store: &std::collections::BTreeMap<String, String>,
    name: &'static str,
    key: &str,
) -> Result<String, ExtractionFailure> {
    store.get(key).cloned().ok_or_else(|| ExtractionFailure::KeyAbsent {
        store: name,
        key: key.to_string(),
    })
}
