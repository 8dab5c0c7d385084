//! Persisted row shapes.
//!
//! A tracking rule is stored as one rule row plus its condition and mapping
//! rows; a return method as one row with its documents serialized as JSON
//! text. Conversions in both directions let a host persist aggregates and
//! hand loaded rows back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::{
    Condition, Event, PayloadMapping, ReturnMethod, ReturnType, Source, TrackingRule,
    TrackingTarget,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRuleRow {
    pub id: i64,
    pub name: String,
    pub domain_id: i64,
    pub event_type_id: i64,
    pub target_value: String,
    pub target_pattern_id: i64,
    pub target_operator_id: i64,
    pub action_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub tracking_rule_id: i64,
    pub pattern_id: i64,
    pub operator_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadMappingRow {
    pub tracking_rule_id: i64,
    pub field: String,
    pub source: String,
    pub value: Option<String>,
    pub request_url_pattern: Option<String>,
    pub request_method: Option<String>,
    pub request_body_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnMethodRow {
    pub id: i64,
    pub domain_id: i64,
    pub configuration_name: String,
    pub return_type: String,
    pub value: String,
    pub operator_id: i64,
    /// JSON text, stored verbatim.
    pub customizing: String,
    pub layout: String,
    pub style: String,
    pub delay: i64,
    pub search_keyword_config_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub domain_id: i64,
    pub event_type_id: i64,
    pub user_field: String,
    pub user_value: String,
    pub item_field: Option<String>,
    pub item_value: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub rating_value: Option<f64>,
    pub review_value: Option<String>,
    pub tracking_rule_id: i64,
    /// JSON object text; `None` when the event has no extras.
    pub extras: Option<String>,
}

/// Split a rule into its persisted rows.
pub fn rule_to_rows(
    rule: &TrackingRule,
) -> (TrackingRuleRow, Vec<ConditionRow>, Vec<PayloadMappingRow>) {
    let row = TrackingRuleRow {
        id: rule.id,
        name: rule.name.clone(),
        domain_id: rule.domain_id,
        event_type_id: rule.event_type_id,
        target_value: rule.tracking_target.value.clone(),
        target_pattern_id: rule.tracking_target.pattern_id,
        target_operator_id: rule.tracking_target.operator_id,
        action_type: rule.action_type.clone(),
    };

    let conditions = rule
        .conditions
        .iter()
        .map(|c| ConditionRow {
            tracking_rule_id: rule.id,
            pattern_id: c.pattern_id,
            operator_id: c.operator_id,
            value: c.value.clone(),
        })
        .collect();

    let mappings = rule
        .payload_mappings
        .iter()
        .map(|m| PayloadMappingRow {
            tracking_rule_id: rule.id,
            field: m.field.clone(),
            source: m.source.as_str().to_string(),
            value: m.value.clone(),
            request_url_pattern: m.request_url_pattern.clone(),
            request_method: m.request_method.clone(),
            request_body_path: m.request_body_path.clone(),
        })
        .collect();

    (row, conditions, mappings)
}

/// Reassemble a rule from host-loaded rows. Child rows belonging to other
/// rules are ignored.
pub fn rule_from_rows(
    row: TrackingRuleRow,
    conditions: &[ConditionRow],
    mappings: &[PayloadMappingRow],
) -> Result<TrackingRule> {
    let payload_mappings = mappings
        .iter()
        .filter(|m| m.tracking_rule_id == row.id)
        .map(|m| {
            let source = Source::parse(&m.source).ok_or_else(|| {
                CoreError::bad_key(m.field.clone(), format!("unknown source {:?}", m.source))
            })?;
            Ok(PayloadMapping {
                field: m.field.clone(),
                source,
                value: m.value.clone(),
                request_url_pattern: m.request_url_pattern.clone(),
                request_method: m.request_method.clone(),
                request_body_path: m.request_body_path.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let conditions = conditions
        .iter()
        .filter(|c| c.tracking_rule_id == row.id)
        .map(|c| Condition {
            pattern_id: c.pattern_id,
            operator_id: c.operator_id,
            value: c.value.clone(),
        })
        .collect();

    Ok(TrackingRule {
        id: row.id,
        name: row.name,
        domain_id: row.domain_id,
        event_type_id: row.event_type_id,
        tracking_target: TrackingTarget {
            value: row.target_value,
            pattern_id: row.target_pattern_id,
            operator_id: row.target_operator_id,
        },
        conditions,
        payload_mappings,
        action_type: row.action_type,
    })
}

impl ReturnMethodRow {
    pub fn from_method(method: &ReturnMethod) -> Result<Self> {
        Ok(Self {
            id: method.id,
            domain_id: method.domain_id,
            configuration_name: method.configuration_name.clone(),
            return_type: method.return_type.as_str().to_string(),
            value: method.value.clone(),
            operator_id: method.operator_id,
            customizing: serde_json::to_string(&method.customizing)?,
            layout: serde_json::to_string(&method.layout)?,
            style: serde_json::to_string(&method.style)?,
            delay: method.delay,
            search_keyword_config_id: method.search_keyword_config_id,
        })
    }

    pub fn into_method(self) -> Result<ReturnMethod> {
        let return_type: ReturnType =
            serde_json::from_value(serde_json::Value::String(self.return_type))?;
        Ok(ReturnMethod {
            id: self.id,
            domain_id: self.domain_id,
            configuration_name: self.configuration_name,
            return_type,
            value: self.value,
            operator_id: self.operator_id,
            customizing: serde_json::from_str(&self.customizing)?,
            layout: serde_json::from_str(&self.layout)?,
            style: serde_json::from_str(&self.style)?,
            delay: self.delay,
            search_keyword_config_id: self.search_keyword_config_id,
        })
    }
}

impl EventRow {
    pub fn from_event(domain_id: i64, event: &Event) -> Result<Self> {
        let extras = if event.extras.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&event.extras)?)
        };
        Ok(Self {
            domain_id,
            event_type_id: event.event_type_id,
            user_field: event.user_field.clone(),
            user_value: event.user_value.clone(),
            item_field: event.item_field.clone(),
            item_value: event.item_value.clone(),
            timestamp: event.timestamp,
            rating_value: event.rating_value,
            review_value: event.review_value.clone(),
            tracking_rule_id: event.tracking_rule_id,
            extras,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fields, ReturnMethodDraft};
    use serde_json::json;

    fn rule() -> TrackingRule {
        TrackingRule {
            id: 11,
            name: "Review".to_string(),
            domain_id: 2,
            event_type_id: 3,
            tracking_target: TrackingTarget {
                value: "/api/reviews".to_string(),
                pattern_id: 3,
                operator_id: 3,
            },
            conditions: vec![Condition {
                pattern_id: 5,
                operator_id: 1,
                value: "Product".to_string(),
            }],
            payload_mappings: vec![
                PayloadMapping::anonymous_id("recsys_anon_id"),
                PayloadMapping::new(fields::REVIEW, Source::RequestBody)
                    .with_request("/api/reviews", "POST")
                    .with_body_path("review.text"),
            ],
            action_type: Some("submit".to_string()),
        }
    }

    #[test]
    fn test_rule_rows_round_trip() {
        let original = rule();
        let (row, conditions, mut mappings) = rule_to_rows(&original);
        assert_eq!(row.target_pattern_id, 3);
        assert_eq!(mappings[1].source, "request_body");

        mappings.push(PayloadMappingRow {
            tracking_rule_id: 99,
            field: "other".to_string(),
            source: "cookie".to_string(),
            value: Some("x".to_string()),
            request_url_pattern: None,
            request_method: None,
            request_body_path: None,
        });
        assert_eq!(rule_from_rows(row, &conditions, &mappings).unwrap(), original);
    }

    #[test]
    fn test_unknown_source_row() {
        let (row, conditions, mut mappings) = rule_to_rows(&rule());
        mappings[0].source = "indexed_db".to_string();
        let err = rule_from_rows(row, &conditions, &mappings).unwrap_err();
        assert_eq!(err.offending_key(), Some(fields::ANONYMOUS_ID));
    }

    #[test]
    fn test_return_method_row_keeps_document_text() {
        let draft: ReturnMethodDraft = serde_json::from_value(json!({
            "configurationName": "Inline",
            "returnType": "INLINE_INJECTION",
            "value": "#reco",
            "operatorId": 2,
            "customizing": [{"key": "title", "position": 0, "isEnabled": true}],
            "layout": {"placement": "after", "zeta": 1, "alpha": 2},
            "style": {}
        }))
        .unwrap();
        let method = ReturnMethod::from_draft(4, 2, draft);
        let row = ReturnMethodRow::from_method(&method).unwrap();
        assert_eq!(row.layout, r#"{"placement":"after","zeta":1,"alpha":2}"#);
        assert_eq!(row.return_type, "INLINE_INJECTION");
        assert_eq!(row.into_method().unwrap(), method);
    }
}
