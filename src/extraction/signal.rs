//! Captured signals.
//!
//! What the browser collector hands the engine for one interaction: the page
//! it happened on, an optional intercepted HTTP exchange and an optional
//! originating DOM element.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::PatternKind;

use super::selector::selector_path;

/// An intercepted HTTP exchange. `body` is the outgoing request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpExchange {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub body: Option<Value>,
}

impl HttpExchange {
    pub fn new(url: &str, method: &str) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_string(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// One element of a DOM snapshot. `parent` indexes into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub parent: Option<usize>,
}

impl DomNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            _ => None,
        }
        .or_else(|| self.attributes.get(name).map(String::as_str))
    }
}

/// Flattened DOM in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub nodes: Vec<DomNode>,
}

impl DomSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` and return its index.
    pub fn push(&mut self, mut node: DomNode, parent: Option<usize>) -> usize {
        node.parent = parent.filter(|p| *p < self.nodes.len());
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&DomNode> {
        self.nodes.get(index)
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.parent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
    #[serde(default)]
    pub session_storage: BTreeMap<String, String>,
    #[serde(default)]
    pub dom: DomSnapshot,
}

impl PageContext {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }
}

/// One raw signal observed by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedSignal {
    /// Event type the collector attributes to the interaction.
    pub event_type_id: i64,
    pub page: PageContext,
    #[serde(default)]
    pub exchange: Option<HttpExchange>,
    /// Index of the originating element in `page.dom`.
    #[serde(default)]
    pub element: Option<usize>,
}

impl CapturedSignal {
    pub fn new(event_type_id: i64, page: PageContext) -> Self {
        Self {
            event_type_id,
            page,
            exchange: None,
            element: None,
        }
    }

    pub fn with_exchange(mut self, exchange: HttpExchange) -> Self {
        self.exchange = Some(exchange);
        self
    }

    pub fn with_element(mut self, index: usize) -> Self {
        self.element = Some(index);
        self
    }

    /// The string a pattern of `kind` compares against, if the signal has one.
    pub fn subject(&self, kind: PatternKind) -> Option<String> {
        match kind {
            PatternKind::Url => Some(self.page.url.clone()),
            PatternKind::PageTitle => Some(self.page.title.clone()),
            PatternKind::RequestUrl => self.exchange.as_ref().map(|e| e.url.clone()),
            PatternKind::CssSelector => self
                .element
                .filter(|i| *i < self.page.dom.nodes.len())
                .map(|i| selector_path(&self.page.dom, i)),
            PatternKind::ElementText => self
                .element
                .and_then(|i| self.page.dom.get(i))
                .map(|n| n.text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_by_pattern_kind() {
        let mut page = PageContext::new("https://shop.example.com/p/1");
        page.title = "Blue Shoe".to_string();
        let body = page.dom.push(DomNode::new("body"), None);
        let button = page.dom.push(
            DomNode::new("button").with_class("add-to-cart").with_text("Add"),
            Some(body),
        );

        let signal = CapturedSignal::new(1, page).with_element(button);
        assert_eq!(
            signal.subject(PatternKind::Url).as_deref(),
            Some("https://shop.example.com/p/1")
        );
        assert_eq!(signal.subject(PatternKind::PageTitle).as_deref(), Some("Blue Shoe"));
        assert_eq!(signal.subject(PatternKind::ElementText).as_deref(), Some("Add"));
        assert_eq!(
            signal.subject(PatternKind::CssSelector).as_deref(),
            Some("body > button.add-to-cart")
        );
        assert_eq!(signal.subject(PatternKind::RequestUrl), None);
    }

    #[test]
    fn test_push_ignores_dangling_parent() {
        let mut dom = DomSnapshot::new();
        let idx = dom.push(DomNode::new("div"), Some(5));
        assert_eq!(dom.parent(idx), None);
    }
}
