//! Structural validation of a tracking rule before it is persisted.

use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::extraction::Selector;
use crate::model::{fields, ExtractionRecipe, PayloadMapping, Source, TrackingRule};
use crate::registry::Registry;

fn check_clause(registry: &Registry, pattern_id: i64, operator_id: i64) -> Result<()> {
    registry.pattern(pattern_id)?;
    registry.operator(operator_id)?;
    Ok(())
}

fn check_mapping(mapping: &PayloadMapping, anon_key: &str) -> Result<()> {
    if let ExtractionRecipe::Element { selector, .. } = mapping.recipe()? {
        Selector::parse(selector)
            .map_err(|e| CoreError::bad_key(mapping.field.clone(), e.to_string()))?;
    }

    if mapping.field == fields::ANONYMOUS_ID {
        if mapping.source != Source::LocalStorage {
            return Err(CoreError::bad_key(
                fields::ANONYMOUS_ID,
                "anonymousId must be read from local_storage",
            ));
        }
        if mapping.value.as_deref() != Some(anon_key) {
            return Err(CoreError::bad_key(
                fields::ANONYMOUS_ID,
                format!("anonymousId must read local_storage key {:?}", anon_key),
            ));
        }
    }
    Ok(())
}

/// Validate `rule` against `registry`.
///
/// Checks, in order: non-empty name, event type exists, target pattern and
/// operator exist with a non-empty value, every condition references an
/// existing pattern and operator, every mapping is complete for its source
/// with no duplicate field, and any anonymousId mapping reads `anon_key`.
pub fn validate_rule(rule: &TrackingRule, registry: &Registry, anon_key: &str) -> Result<()> {
    if rule.name.trim().is_empty() {
        return Err(CoreError::bad_key("name", "rule name must not be empty"));
    }

    registry.event_type(rule.event_type_id)?;

    let target = &rule.tracking_target;
    check_clause(registry, target.pattern_id, target.operator_id)?;
    if target.value.trim().is_empty() {
        return Err(CoreError::bad_key(
            "trackingTarget.value",
            "tracking target value must not be empty",
        ));
    }

    for condition in &rule.conditions {
        check_clause(registry, condition.pattern_id, condition.operator_id)?;
    }

    let mut seen = HashSet::new();
    for mapping in &rule.payload_mappings {
        if !seen.insert(mapping.field.as_str()) {
            return Err(CoreError::bad_key(
                mapping.field.clone(),
                "duplicate payload mapping field",
            ));
        }
        check_mapping(mapping, anon_key)?;
    }

    log::debug!(
        "RULE_VALID name={} conditions={} mappings={}",
        rule.name,
        rule.conditions.len(),
        rule.payload_mappings.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, TrackingTarget};

    const ANON_KEY: &str = "recsys_anon_id";

    fn rule() -> TrackingRule {
        TrackingRule {
            id: 0,
            name: "Add to cart".to_string(),
            domain_id: 1,
            event_type_id: 5,
            tracking_target: TrackingTarget {
                value: "button.add-to-cart".to_string(),
                pattern_id: 2,
                operator_id: 4,
            },
            conditions: vec![Condition {
                pattern_id: 1,
                operator_id: 1,
                value: "/products/".to_string(),
            }],
            payload_mappings: vec![
                PayloadMapping::anonymous_id(ANON_KEY),
                PayloadMapping::new(fields::ITEM_ID, Source::Element)
                    .with_value("article.product@data-id"),
            ],
            action_type: None,
        }
    }

    #[test]
    fn test_valid_rule() {
        assert!(validate_rule(&rule(), &Registry::seeded(), ANON_KEY).is_ok());
    }

    #[test]
    fn test_dangling_references() {
        let registry = Registry::seeded();

        let mut r = rule();
        r.event_type_id = 99;
        assert_eq!(validate_rule(&r, &registry, ANON_KEY).unwrap_err().status(), 404);

        let mut r = rule();
        r.conditions[0].operator_id = 99;
        assert_eq!(validate_rule(&r, &registry, ANON_KEY).unwrap_err().status(), 404);

        let mut r = rule();
        r.tracking_target.pattern_id = 99;
        assert_eq!(validate_rule(&r, &registry, ANON_KEY).unwrap_err().status(), 404);
    }

    #[test]
    fn test_element_mapping_with_request_attrs() {
        let mut r = rule();
        r.payload_mappings[1] = r.payload_mappings[1]
            .clone()
            .with_request("/api/cart", "POST");
        let err = validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err();
        assert_eq!(err.offending_key(), Some(fields::ITEM_ID));
    }

    #[test]
    fn test_incomplete_request_body_mapping() {
        let mut r = rule();
        r.payload_mappings
            .push(PayloadMapping::new(fields::USER_ID, Source::RequestBody)
                .with_request("/api/me", "GET"));
        let err = validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err();
        assert_eq!(err.offending_key(), Some(fields::USER_ID));
    }

    #[test]
    fn test_duplicate_field_and_bad_selector() {
        let mut r = rule();
        r.payload_mappings
            .push(PayloadMapping::new(fields::ITEM_ID, Source::Cookie).with_value("sku"));
        assert_eq!(
            validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err().offending_key(),
            Some(fields::ITEM_ID)
        );

        let mut r = rule();
        r.payload_mappings[1].value = Some("div:hover".to_string());
        assert_eq!(
            validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err().offending_key(),
            Some(fields::ITEM_ID)
        );
    }

    #[test]
    fn test_anonymous_id_must_use_local_storage() {
        let mut r = rule();
        r.payload_mappings[0].source = Source::Cookie;
        assert_eq!(
            validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err().offending_key(),
            Some(fields::ANONYMOUS_ID)
        );
    }

    #[test]
    fn test_anonymous_id_key_is_pinned() {
        let mut r = rule();
        r.payload_mappings[0] = PayloadMapping::new(fields::ANONYMOUS_ID, Source::LocalStorage)
            .with_value("some_other_key");
        let err = validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.offending_key(), Some(fields::ANONYMOUS_ID));

        let r = rule();
        assert!(validate_rule(&r, &Registry::seeded(), "custom_anon").is_err());
    }

    #[test]
    fn test_blank_name_and_target() {
        let mut r = rule();
        r.name = "  ".to_string();
        assert_eq!(
            validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err().offending_key(),
            Some("name")
        );
        let mut r = rule();
        r.tracking_target.value.clear();
        assert_eq!(
            validate_rule(&r, &Registry::seeded(), ANON_KEY).unwrap_err().offending_key(),
            Some("trackingTarget.value")
        );
    }
}
