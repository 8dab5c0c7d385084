//! Canonical event records emitted by applying a rule to a live signal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable once written; only appended and queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type_id: i64,
    /// `userId` or `anonymousId`.
    pub user_field: String,
    pub user_value: String,
    /// `None` when the item mapping is absent or failed extraction.
    pub item_field: Option<String>,
    pub item_value: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub rating_value: Option<f64>,
    pub review_value: Option<String>,
    pub tracking_rule_id: i64,
    /// Domain-specific fields extracted by the rule.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}
