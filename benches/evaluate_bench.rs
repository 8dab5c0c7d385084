use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use recsys_tracker_core::engine::evaluate_rules;
use recsys_tracker_core::extraction::{CapturedSignal, DomNode, HttpExchange, PageContext};
use recsys_tracker_core::logging::LogContext;
use recsys_tracker_core::model::{
    fields, Condition, PayloadMapping, Source, TrackingRule, TrackingTarget,
};
use recsys_tracker_core::registry::Registry;
use recsys_tracker_core::CoreConfig;

fn rules() -> Vec<TrackingRule> {
    (0..20)
        .map(|i| TrackingRule {
            id: i,
            name: format!("rule-{}", i),
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
                value: if i % 2 == 0 { "/products/" } else { "/blog/" }.to_string(),
            }],
            payload_mappings: vec![
                PayloadMapping::new(fields::USER_ID, Source::RequestBody)
                    .with_request("/api/cart", "POST")
                    .with_body_path("user.id"),
                PayloadMapping::anonymous_id("recsys_anon_id"),
                PayloadMapping::new(fields::ITEM_ID, Source::Element)
                    .with_value("article.product@data-id"),
            ],
            action_type: None,
        })
        .collect()
}

fn signal() -> CapturedSignal {
    let mut page = PageContext::new("https://shop.example.com/products/42");
    page.local_storage
        .insert("recsys_anon_id".to_string(), "anon".to_string());
    let body = page.dom.push(DomNode::new("body"), None);
    let card = page.dom.push(
        DomNode::new("article")
            .with_class("product")
            .with_attr("data-id", "sku-42"),
        Some(body),
    );
    let button = page
        .dom
        .push(DomNode::new("button").with_class("add-to-cart"), Some(card));
    CapturedSignal::new(5, page)
        .with_exchange(
            HttpExchange::new("https://shop.example.com/api/cart", "POST")
                .with_body(json!({"user": {"id": "u-1"}, "qty": 1})),
        )
        .with_element(button)
}

fn bench_evaluate(c: &mut Criterion) {
    let rules = rules();
    let signal = signal();
    let registry = Registry::seeded();
    let config = CoreConfig::default();
    let ctx = LogContext::new("bench");

    c.bench_function("evaluate_20_rules", |b| {
        b.iter(|| evaluate_rules(black_box(&rules), black_box(&signal), &registry, &config, &ctx))
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
