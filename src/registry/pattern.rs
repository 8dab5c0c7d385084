//! Named patterns.
//!
//! A pattern decides which string of a captured signal a TrackingTarget or
//! Condition is compared against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Current page URL.
    Url,
    /// Selector path of the element the signal originated from.
    CssSelector,
    /// URL of the intercepted HTTP exchange.
    RequestUrl,
    /// Text content of the element the signal originated from.
    ElementText,
    /// Document title.
    PageTitle,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Url => "url",
            PatternKind::CssSelector => "css_selector",
            PatternKind::RequestUrl => "request_url",
            PatternKind::ElementText => "element_text",
            PatternKind::PageTitle => "page_title",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "url" | "page_url" => Some(PatternKind::Url),
            "css_selector" | "selector" => Some(PatternKind::CssSelector),
            "request_url" => Some(PatternKind::RequestUrl),
            "element_text" | "text" => Some(PatternKind::ElementText),
            "page_title" | "title" => Some(PatternKind::PageTitle),
            _ => None,
        }
    }
}

/// A row of the pattern reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: i64,
    pub name: String,
    pub kind: PatternKind,
}

/// Administrative seed: `1 url`, `2 css_selector`, `3 request_url`,
/// `4 element_text`, `5 page_title`.
pub fn seeded_patterns() -> Vec<Pattern> {
    [
        (1, PatternKind::Url),
        (2, PatternKind::CssSelector),
        (3, PatternKind::RequestUrl),
        (4, PatternKind::ElementText),
        (5, PatternKind::PageTitle),
    ]
    .into_iter()
    .map(|(id, kind)| Pattern {
        id,
        name: kind.as_str().to_string(),
        kind,
    })
    .collect()
}
