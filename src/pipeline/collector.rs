//! Signal collection.
//!
//! Evaluates every captured signal of a batch against every rule of the
//! domain:
//! 1. Parse (JSON entry point only; unparseable signals count as malformed)
//! 2. Target + condition matching
//! 3. Payload extraction with identity fallback
//! 4. Event emission

use crate::engine::{evaluate_rules, RuleOutcome};
use crate::extraction::CapturedSignal;
use crate::model::{Event, TrackingRule};
use crate::registry::get_registry;

use super::context::BatchContext;

/// Result of processing a batch.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub received_count: usize,
    /// Events emitted; one signal can fire several rules.
    pub fired_count: usize,
    /// Signals that fired no rule.
    pub skipped_count: usize,
    pub malformed_count: usize,
    pub events: Vec<Event>,
}

/// Process a batch of captured signals.
pub fn process_signals(
    ctx: &BatchContext,
    rules: &[TrackingRule],
    signals: &[CapturedSignal],
) -> BatchResult {
    let registry = get_registry();
    let log_ctx = ctx.log_context();
    let mut result = BatchResult {
        received_count: signals.len(),
        ..BatchResult::default()
    };

    for signal in signals {
        let before = result.events.len();
        result.events.extend(
            evaluate_rules(rules, signal, &registry, &ctx.config, &log_ctx)
                .into_iter()
                .filter_map(RuleOutcome::into_event),
        );
        if result.events.len() == before {
            result.skipped_count += 1;
        }
    }
    result.fired_count = result.events.len();

    log::info!(
        "{} BATCH_COMPLETE domain={} received={} fired={} skipped={}",
        log_ctx,
        ctx.domain_key,
        result.received_count,
        result.fired_count,
        result.skipped_count
    );

    result
}

/// Process a batch of JSON-encoded signals.
pub fn process_signal_json(
    ctx: &BatchContext,
    rules: &[TrackingRule],
    raw_signals: &[String],
) -> BatchResult {
    let log_ctx = ctx.log_context();
    let mut signals = Vec::with_capacity(raw_signals.len());
    let mut malformed = 0;

    for raw in raw_signals {
        match serde_json::from_str::<CapturedSignal>(raw) {
            Ok(signal) => signals.push(signal),
            Err(e) => {
                log::warn!("{} SIGNAL_PARSE_FAILED error={}", log_ctx, e);
                malformed += 1;
            }
        }
    }

    let mut result = process_signals(ctx, rules, &signals);
    result.received_count = raw_signals.len();
    result.malformed_count = malformed;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::extraction::PageContext;
    use crate::model::{Condition, PayloadMapping, TrackingTarget};
    use serde_json::json;

    fn checkout_rule() -> TrackingRule {
        TrackingRule {
            id: 1,
            name: "Checkout".to_string(),
            domain_id: 1,
            event_type_id: 4,
            tracking_target: TrackingTarget {
                value: "https://shop.example.com/".to_string(),
                pattern_id: 1,
                operator_id: 3,
            },
            conditions: vec![Condition {
                pattern_id: 1,
                operator_id: 1,
                value: "/checkout".to_string(),
            }],
            payload_mappings: vec![PayloadMapping::anonymous_id("recsys_anon_id")],
            action_type: None,
        }
    }

    fn signal(url: &str) -> CapturedSignal {
        let mut page = PageContext::new(url);
        page.local_storage
            .insert("recsys_anon_id".to_string(), "anon-7".to_string());
        CapturedSignal::new(4, page)
    }

    #[test]
    fn test_process_signals_counts() {
        let ctx = BatchContext::new("k", CoreConfig::default());
        let signals = vec![
            signal("https://shop.example.com/checkout/step2"),
            signal("https://shop.example.com/cart"),
        ];
        let result = process_signals(&ctx, &[checkout_rule()], &signals);
        assert_eq!(result.received_count, 2);
        assert_eq!(result.fired_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.events[0].user_value, "anon-7");
    }

    #[test]
    fn test_process_empty_batch() {
        let ctx = BatchContext::new("k", CoreConfig::default());
        let result = process_signals(&ctx, &[checkout_rule()], &[]);
        assert_eq!(result.received_count, 0);
        assert!(result.events.is_empty());
    }

    #[test]
    fn test_process_invalid_json() {
        let ctx = BatchContext::new("k", CoreConfig::default());
        let valid = serde_json::to_string(&json!({
            "eventTypeId": 4,
            "page": {
                "url": "https://shop.example.com/checkout",
                "localStorage": {"recsys_anon_id": "anon-1"}
            }
        }))
        .unwrap();
        let raw = vec!["not json".to_string(), valid];
        let result = process_signal_json(&ctx, &[checkout_rule()], &raw);
        assert_eq!(result.received_count, 2);
        assert_eq!(result.malformed_count, 1);
        assert_eq!(result.fired_count, 1);
    }
}
