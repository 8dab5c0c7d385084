//! Request URL patterns.
//!
//! A pattern is either an absolute URL or a path. Within a pattern `*`
//! matches inside one path segment, `**` matches any suffix, and `{name}` or
//! `:name` match exactly one segment. Query strings and fragments of the
//! captured URL are ignored; a trailing slash is optional.

use std::collections::HashMap;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"^(\{[A-Za-z_][\w]*\}|:[A-Za-z_][\w]*)$").unwrap();
    static ref COMPILED: Mutex<HashMap<String, Option<Regex>>> = Mutex::new(HashMap::new());
}

/// Upper bound on cached compiled patterns.
const MAX_COMPILED: usize = 1024;

/// Compile a pattern into an anchored regex.
pub fn compile_url_pattern(pattern: &str) -> Option<Regex> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }

    let (prefix, path) = match Url::parse(pattern) {
        Ok(url) if url.has_host() => {
            let origin = url.origin().ascii_serialization();
            (regex::escape(&origin), raw_path(pattern).to_string())
        }
        _ => (String::new(), strip_query(pattern).to_string()),
    };

    let mut body = String::new();
    for (i, segment) in path.trim_end_matches('/').split('/').enumerate() {
        if i > 0 {
            body.push('/');
        }
        if segment == "**" {
            body.push_str(".*");
        } else if PLACEHOLDER.is_match(segment) {
            body.push_str("[^/]+");
        } else {
            let escaped: Vec<String> = segment.split('*').map(regex::escape).collect();
            body.push_str(&escaped.join("[^/]*"));
        }
    }

    Regex::new(&format!("^{}{}/?$", prefix, body)).ok()
}

fn strip_query(raw: &str) -> &str {
    let end = raw.find(|c| c == '?' || c == '#').unwrap_or(raw.len());
    &raw[..end]
}

/// Path of an absolute pattern, taken from the raw text so placeholders are
/// not percent-encoded.
fn raw_path(pattern: &str) -> &str {
    let after_scheme = pattern.find("://").map_or(0, |i| i + 3);
    let rest = strip_query(&pattern[after_scheme..]);
    match rest.find('/') {
        Some(i) => &rest[i..],
        None => "",
    }
}

fn cached_pattern(pattern: &str) -> Option<Regex> {
    let mut compiled = COMPILED.lock();
    if let Some(hit) = compiled.get(pattern) {
        return hit.clone();
    }
    let regex = compile_url_pattern(pattern);
    if compiled.len() >= MAX_COMPILED {
        compiled.clear();
    }
    compiled.insert(pattern.to_string(), regex.clone());
    regex
}

/// Whether `captured_url` matches `pattern`.
///
/// Absolute patterns compare against `origin + path`; path patterns compare
/// against the path only.
pub fn url_matches(pattern: &str, captured_url: &str) -> bool {
    let Some(regex) = cached_pattern(pattern) else {
        return false;
    };

    let absolute = Url::parse(pattern.trim()).map(|u| u.has_host()).unwrap_or(false);
    let subject = match Url::parse(captured_url) {
        Ok(url) if absolute => format!("{}{}", url.origin().ascii_serialization(), url.path()),
        Ok(url) => url.path().to_string(),
        Err(_) => strip_query(captured_url).to_string(),
    };

    regex.is_match(&subject)
}

/// Case-insensitive HTTP method comparison; `*` and `ANY` match every method.
pub fn method_matches(expected: &str, actual: &str) -> bool {
    let expected = expected.trim();
    expected == "*"
        || expected.eq_ignore_ascii_case("any")
        || expected.eq_ignore_ascii_case(actual.trim())
}

/// Non-empty path segments of a URL (or bare path), query ignored.
pub fn path_segments(captured_url: &str) -> Vec<String> {
    let path = match Url::parse(captured_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => strip_query(captured_url).to_string(),
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First value of query parameter `name`.
pub fn query_param(captured_url: &str, name: &str) -> Option<String> {
    let url = Url::parse(captured_url)
        .or_else(|_| {
            Url::parse("http://placeholder.invalid").and_then(|base| base.join(captured_url))
        })
        .ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
