//! Payload mappings.
//!
//! A mapping binds a canonical payload field to a source-specific extraction
//! recipe. Which optional attributes may be populated is decided entirely by
//! the mapping's [`Source`].

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Canonical payload field names.
pub mod fields {
    pub const ANONYMOUS_ID: &str = "anonymousId";
    pub const USER_ID: &str = "userId";
    pub const ITEM_ID: &str = "itemId";
    pub const ITEM_TITLE: &str = "itemTitle";
    pub const RATING: &str = "rating";
    pub const REVIEW: &str = "review";

    pub fn is_identity(field: &str) -> bool {
        field == ANONYMOUS_ID || field == USER_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    RequestBody,
    RequestUrl,
    Element,
    Cookie,
    LocalStorage,
    SessionStorage,
}

/// Optional attributes of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingAttribute {
    Value,
    RequestUrlPattern,
    RequestMethod,
    RequestBodyPath,
}

impl MappingAttribute {
    pub const ALL: [MappingAttribute; 4] = [
        MappingAttribute::Value,
        MappingAttribute::RequestUrlPattern,
        MappingAttribute::RequestMethod,
        MappingAttribute::RequestBodyPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingAttribute::Value => "value",
            MappingAttribute::RequestUrlPattern => "requestUrlPattern",
            MappingAttribute::RequestMethod => "requestMethod",
            MappingAttribute::RequestBodyPath => "requestBodyPath",
        }
    }
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::RequestBody,
        Source::RequestUrl,
        Source::Element,
        Source::Cookie,
        Source::LocalStorage,
        Source::SessionStorage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::RequestBody => "request_body",
            Source::RequestUrl => "request_url",
            Source::Element => "element",
            Source::Cookie => "cookie",
            Source::LocalStorage => "local_storage",
            Source::SessionStorage => "session_storage",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Source::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Attributes a complete mapping with this source carries, and the only
    /// ones it may carry.
    pub fn attributes(&self) -> &'static [MappingAttribute] {
        use MappingAttribute::*;
        match self {
            Source::RequestBody => &[RequestUrlPattern, RequestMethod, RequestBodyPath],
            Source::RequestUrl => &[RequestUrlPattern, RequestMethod, Value],
            Source::Element | Source::Cookie | Source::LocalStorage | Source::SessionStorage => {
                &[Value]
            }
        }
    }

    pub fn allows(&self, attribute: MappingAttribute) -> bool {
        self.attributes().contains(&attribute)
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Source::RequestBody | Source::RequestUrl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadMapping {
    pub field: String,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_path: Option<String>,
}

/// Which part of a request URL a `request_url` mapping reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPart<'a> {
    /// 0-based path segment index.
    PathIndex(usize),
    Query(&'a str),
}

impl<'a> UrlPart<'a> {
    /// `"3"` is a path index, `"?id"` or `"id"` a query parameter name.
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if let Some(name) = raw.strip_prefix('?') {
            return UrlPart::Query(name);
        }
        match raw.parse::<usize>() {
            Ok(index) => UrlPart::PathIndex(index),
            Err(_) => UrlPart::Query(raw),
        }
    }
}

/// Typed view of a complete mapping, one variant per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRecipe<'a> {
    RequestBody {
        url_pattern: &'a str,
        method: &'a str,
        body_path: &'a str,
    },
    RequestUrl {
        url_pattern: &'a str,
        method: &'a str,
        part: UrlPart<'a>,
    },
    Element {
        selector: &'a str,
        attribute: Option<&'a str>,
    },
    Cookie { key: &'a str },
    LocalStorage { key: &'a str },
    SessionStorage { key: &'a str },
}

impl PayloadMapping {
    pub fn new(field: &str, source: Source) -> Self {
        Self {
            field: field.to_string(),
            source,
            value: None,
            request_url_pattern: None,
            request_method: None,
            request_body_path: None,
        }
    }

    /// The pinned anonymous-id mapping.
    pub fn anonymous_id(storage_key: &str) -> Self {
        Self::new(fields::ANONYMOUS_ID, Source::LocalStorage).with_value(storage_key)
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_request(mut self, url_pattern: &str, method: &str) -> Self {
        self.request_url_pattern = Some(url_pattern.to_string());
        self.request_method = Some(method.to_string());
        self
    }

    pub fn with_body_path(mut self, path: &str) -> Self {
        self.request_body_path = Some(path.to_string());
        self
    }

    pub fn attribute(&self, attribute: MappingAttribute) -> Option<&str> {
        match attribute {
            MappingAttribute::Value => self.value.as_deref(),
            MappingAttribute::RequestUrlPattern => self.request_url_pattern.as_deref(),
            MappingAttribute::RequestMethod => self.request_method.as_deref(),
            MappingAttribute::RequestBodyPath => self.request_body_path.as_deref(),
        }
    }

    pub fn populated_attributes(&self) -> Vec<MappingAttribute> {
        MappingAttribute::ALL
            .into_iter()
            .filter(|a| self.attribute(*a).is_some())
            .collect()
    }

    /// No attribute outside the source's set is populated. Holds for every
    /// in-progress mapping, complete or not.
    pub fn is_consistent(&self) -> bool {
        self.populated_attributes()
            .iter()
            .all(|a| self.source.allows(*a))
    }

    fn required_attribute(&self, attribute: MappingAttribute) -> Result<&str> {
        match self.attribute(attribute).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CoreError::bad_key(
                self.field.clone(),
                format!(
                    "source {} requires attribute {}",
                    self.source.as_str(),
                    attribute.as_str()
                ),
            )),
        }
    }

    pub fn is_identity(&self) -> bool {
        fields::is_identity(&self.field)
    }

    /// Check the mapping is complete for its source and return the typed
    /// recipe.
    pub fn recipe(&self) -> Result<ExtractionRecipe<'_>> {
        if self.field.trim().is_empty() {
            return Err(CoreError::bad_request("payload mapping field must not be empty"));
        }

        for attribute in self.populated_attributes() {
            if !self.source.allows(attribute) {
                return Err(CoreError::bad_key(
                    self.field.clone(),
                    format!(
                        "attribute {} is not allowed for source {}",
                        attribute.as_str(),
                        self.source.as_str()
                    ),
                ));
            }
        }

        let recipe = match self.source {
            Source::RequestBody => ExtractionRecipe::RequestBody {
                url_pattern: self.required_attribute(MappingAttribute::RequestUrlPattern)?,
                method: self.required_attribute(MappingAttribute::RequestMethod)?,
                body_path: self.required_attribute(MappingAttribute::RequestBodyPath)?,
            },
            Source::RequestUrl => ExtractionRecipe::RequestUrl {
                url_pattern: self.required_attribute(MappingAttribute::RequestUrlPattern)?,
                method: self.required_attribute(MappingAttribute::RequestMethod)?,
                part: UrlPart::parse(self.required_attribute(MappingAttribute::Value)?),
            },
            Source::Element => {
                let raw = self.required_attribute(MappingAttribute::Value)?;
                let (selector, attribute) = split_element_value(raw);
                if selector.is_empty() {
                    return Err(CoreError::bad_key(
                        self.field.clone(),
                        "element source requires a selector",
                    ));
                }
                ExtractionRecipe::Element { selector, attribute }
            }
            Source::Cookie => ExtractionRecipe::Cookie {
                key: self.required_attribute(MappingAttribute::Value)?,
            },
            Source::LocalStorage => ExtractionRecipe::LocalStorage {
                key: self.required_attribute(MappingAttribute::Value)?,
            },
            Source::SessionStorage => ExtractionRecipe::SessionStorage {
                key: self.required_attribute(MappingAttribute::Value)?,
            },
        };

        Ok(recipe)
    }
}

/// Split `selector@attribute` at the last `@` outside of `[...]`.
pub fn split_element_value(raw: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    let mut split_at = None;
    for (i, ch) in raw.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '@' if depth == 0 => split_at = Some(i),
            _ => {}
        }
    }

    match split_at {
        Some(i) => {
            let attribute = raw[i + 1..].trim();
            let selector = raw[..i].trim();
            if attribute.is_empty() {
                (selector, None)
            } else {
                (selector, Some(attribute))
            }
        }
        None => (raw.trim(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_recipe() {
        let mapping = PayloadMapping::new(fields::USER_ID, Source::RequestBody)
            .with_request("/api/v1/user/profile", "POST")
            .with_body_path("userId");
        assert_eq!(
            mapping.recipe().unwrap(),
            ExtractionRecipe::RequestBody {
                url_pattern: "/api/v1/user/profile",
                method: "POST",
                body_path: "userId",
            }
        );
    }

    #[test]
    fn test_element_with_value_and_request_attrs_is_rejected() {
        let mapping = PayloadMapping::new(fields::ITEM_ID, Source::Element)
            .with_value(".product")
            .with_request("/api", "GET");
        assert!(!mapping.is_consistent());
        let err = mapping.recipe().unwrap_err();
        assert_eq!(err.offending_key(), Some("itemId"));
    }

    #[test]
    fn test_missing_required_attribute() {
        let mapping = PayloadMapping::new(fields::ITEM_ID, Source::Cookie);
        assert!(mapping.is_consistent());
        assert!(mapping.recipe().is_err());

        let blank = PayloadMapping::new(fields::ITEM_ID, Source::Cookie).with_value("  ");
        assert!(blank.recipe().is_err());
    }

    #[test]
    fn test_url_part_parse() {
        assert_eq!(UrlPart::parse("3"), UrlPart::PathIndex(3));
        assert_eq!(UrlPart::parse("?productId"), UrlPart::Query("productId"));
        assert_eq!(UrlPart::parse("sku"), UrlPart::Query("sku"));
    }

    #[test]
    fn test_split_element_value() {
        assert_eq!(split_element_value(".title"), (".title", None));
        assert_eq!(
            split_element_value("a.product@data-id"),
            ("a.product", Some("data-id"))
        );
        assert_eq!(
            split_element_value("a[title='x@y']"),
            ("a[title='x@y']", None)
        );
        assert_eq!(split_element_value("span@"), ("span", None));
    }

    #[test]
    fn test_serde_shape() {
        let mapping = PayloadMapping::anonymous_id("recsys_anon_id");
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "field": "anonymousId",
                "source": "local_storage",
                "value": "recsys_anon_id"
            })
        );
        let back: PayloadMapping = serde_json::from_value(json).unwrap();
        assert_eq!(back, mapping);
    }
}
