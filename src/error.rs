//! Error types shared by validation, storage and the service layer.
//!
//! Extraction failures at evaluation time are deliberately not part of this
//! enum; see [`crate::extraction::ExtractionFailure`].

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Kind of entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Domain,
    EventType,
    Operator,
    Pattern,
    ReturnMethod,
    Rule,
    SearchKeywordConfig,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Domain => "domain",
            EntityKind::EventType => "event_type",
            EntityKind::Operator => "operator",
            EntityKind::Pattern => "pattern",
            EntityKind::ReturnMethod => "return_method",
            EntityKind::Rule => "rule",
            EntityKind::SearchKeywordConfig => "search_keyword_config",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        /// Offending key or field, surfaced to the dashboard.
        key: Option<String>,
    },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            key: None,
        }
    }

    /// BadRequest that names the offending key.
    pub fn bad_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        let key = key.into();
        Self::BadRequest {
            message: format!("{} (key={})", message.into(), key),
            key: Some(key),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// HTTP-like status class so a host can map errors without string matching.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::BadRequest { .. } | Self::Json(_) => 400,
            Self::Conflict { .. } => 409,
        }
    }

    pub fn offending_key(&self) -> Option<&str> {
        match self {
            Self::BadRequest { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}
