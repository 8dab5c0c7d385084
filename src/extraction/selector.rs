//! Minimal CSS selector engine over a [`DomSnapshot`].
//!
//! Supported: type and `*`, `#id`, `.class`, `[attr]`, `[attr=v]`,
//! `[attr^=v]`, `[attr$=v]`, `[attr*=v]`, compounds of those, descendant and
//! child (`>`) combinators, and `,` selector lists.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::signal::{DomNode, DomSnapshot};

lazy_static! {
    static ref TAG_PART: Regex = Regex::new(r"^(\*|[A-Za-z][\w-]*)").unwrap();
    static ref ID_PART: Regex = Regex::new(r"^#([\w-]+)").unwrap();
    static ref CLASS_PART: Regex = Regex::new(r"^\.([\w-]+)").unwrap();
    static ref ATTR_PART: Regex = Regex::new(
        r#"^\[\s*([\w-]+)\s*(?:([*^$]?=)\s*(?:"([^"]*)"|'([^']*)'|([^\]\s"']+))\s*)?\]"#
    ).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector {selector:?}: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Each chain is read left to right; the combinator relates a compound to
    /// the one before it.
    chains: Vec<Vec<(Combinator, Compound)>>,
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let fail = |reason: &str| SelectorError {
            selector: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut chains = Vec::new();
        for alternative in split_top_level(raw, ',') {
            let alternative = alternative.trim();
            if alternative.is_empty() {
                return Err(fail("empty selector"));
            }
            chains.push(parse_chain(alternative).map_err(|reason| fail(&reason))?);
        }

        if chains.is_empty() {
            return Err(fail("empty selector"));
        }
        Ok(Self { chains })
    }

    pub fn matches(&self, dom: &DomSnapshot, index: usize) -> bool {
        self.chains.iter().any(|chain| matches_chain(dom, index, chain))
    }

    /// Matching node indices in document order.
    pub fn select(&self, dom: &DomSnapshot) -> Vec<usize> {
        (0..dom.nodes.len())
            .filter(|i| self.matches(dom, *i))
            .collect()
    }
}

/// Split on `sep` outside of brackets and quotes.
fn split_top_level(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in raw.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn parse_chain(raw: &str) -> Result<Vec<(Combinator, Compound)>, String> {
    let mut chain = Vec::new();
    let mut pending = Combinator::Descendant;
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let mut flush = |current: &mut String, pending: &mut Combinator| -> Result<(), String> {
        if !current.is_empty() {
            chain.push((*pending, parse_compound(current)?));
            current.clear();
            *pending = Combinator::Descendant;
        }
        Ok(())
    };

    for ch in raw.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => flush(&mut current, &mut pending)?,
            '>' if depth == 0 => {
                flush(&mut current, &mut pending)?;
                pending = Combinator::Child;
            }
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut pending)?;

    if chain.is_empty() {
        return Err("empty selector".to_string());
    }
    Ok(chain)
}

fn parse_compound(raw: &str) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let mut rest = raw;

    if let Some(m) = TAG_PART.captures(rest) {
        let tag = &m[1];
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[m[0].len()..];
    }

    while !rest.is_empty() {
        if let Some(m) = ID_PART.captures(rest) {
            compound.id = Some(m[1].to_string());
            rest = &rest[m[0].len()..];
        } else if let Some(m) = CLASS_PART.captures(rest) {
            compound.classes.push(m[1].to_string());
            rest = &rest[m[0].len()..];
        } else if let Some(m) = ATTR_PART.captures(rest) {
            let name = m[1].to_string();
            let value = m
                .get(3)
                .or_else(|| m.get(4))
                .or_else(|| m.get(5))
                .map(|v| v.as_str().to_string())
                .unwrap_or_default();
            let op = match m.get(2).map(|o| o.as_str()) {
                None => AttrOp::Exists,
                Some("=") => AttrOp::Equals(value),
                Some("^=") => AttrOp::Prefix(value),
                Some("$=") => AttrOp::Suffix(value),
                Some(_) => AttrOp::Contains(value),
            };
            compound.attrs.push(AttrTest { name, op });
            rest = &rest[m[0].len()..];
        } else {
            return Err(format!("unsupported syntax at {:?}", rest));
        }
    }

    Ok(compound)
}

fn matches_compound(node: &DomNode, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag {
        if !node.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if node.id.as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| node.classes.contains(c)) {
        return false;
    }
    compound.attrs.iter().all(|test| {
        let Some(actual) = node.attribute(&test.name) else {
            return false;
        };
        match &test.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => actual == v,
            AttrOp::Prefix(v) => actual.starts_with(v.as_str()),
            AttrOp::Suffix(v) => actual.ends_with(v.as_str()),
            AttrOp::Contains(v) => actual.contains(v.as_str()),
        }
    })
}

/// Parent index, only if it precedes the node in document order.
fn safe_parent(dom: &DomSnapshot, index: usize) -> Option<usize> {
    dom.parent(index).filter(|p| *p < index)
}

fn matches_chain(dom: &DomSnapshot, index: usize, chain: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = chain.split_last() else {
        return true;
    };
    let Some(node) = dom.get(index) else {
        return false;
    };
    if !matches_compound(node, compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match combinator {
        Combinator::Child => safe_parent(dom, index).map_or(false, |p| matches_chain(dom, p, rest)),
        Combinator::Descendant => {
            let mut ancestor = safe_parent(dom, index);
            while let Some(a) = ancestor {
                if matches_chain(dom, a, rest) {
                    return true;
                }
                ancestor = safe_parent(dom, a);
            }
            false
        }
    }
}

/// Root-to-node path like `body > div#main > button.buy`.
pub fn selector_path(dom: &DomSnapshot, index: usize) -> String {
    let mut segments = Vec::new();
    let mut current = Some(index);
    while let Some(i) = current {
        let Some(node) = dom.get(i) else { break };
        let mut segment = node.tag.clone();
        if let Some(id) = &node.id {
            segment.push('#');
            segment.push_str(id);
        }
        for class in &node.classes {
            segment.push('.');
            segment.push_str(class);
        }
        segments.push(segment);
        current = safe_parent(dom, i);
    }
    segments.reverse();
    segments.join(" > ")
}
