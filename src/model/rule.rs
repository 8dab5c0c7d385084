//! Tracking rules.

use serde::{Deserialize, Serialize};

use super::mapping::{fields, PayloadMapping};

/// Pattern/operator/value triple identifying which UI element or URL a rule
/// watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingTarget {
    pub value: String,
    pub pattern_id: i64,
    pub operator_id: i64,
}

/// Additional constraint; every condition of a rule must hold for it to fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub pattern_id: i64,
    pub operator_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRule {
    /// `0` until persisted.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub domain_id: i64,
    pub event_type_id: i64,
    pub tracking_target: TrackingTarget,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub payload_mappings: Vec<PayloadMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
}

impl TrackingRule {
    pub fn mapping(&self, field: &str) -> Option<&PayloadMapping> {
        self.payload_mappings.iter().find(|m| m.field == field)
    }

    pub fn user_id_mapping(&self) -> Option<&PayloadMapping> {
        self.mapping(fields::USER_ID)
    }

    pub fn anonymous_id_mapping(&self) -> Option<&PayloadMapping> {
        self.mapping(fields::ANONYMOUS_ID)
    }

    /// Mappings for every field other than the two identity fields.
    pub fn payload_mappings_without_identity(&self) -> impl Iterator<Item = &PayloadMapping> {
        self.payload_mappings.iter().filter(|m| !m.is_identity())
    }
}
