//! Fire/no-fire decision and event emission.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::CoreConfig;
use crate::extraction::{parse_float, resolve_mapping, CapturedSignal, ExtractionFailure};
use crate::logging::structured::LogContext;
use crate::model::{fields, Event, PayloadMapping, TrackingRule};
use crate::registry::Registry;
use crate::log_debug;

use super::matcher::{clause_matches, Clause};

/// Why a rule did not fire for a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    EventTypeMismatch,
    TargetMismatch,
    /// Index of the first condition that failed.
    ConditionMismatch(usize),
    /// The rule references a pattern or operator the registry does not know.
    UnknownReference(String),
    /// Neither the user id nor the anonymous id could be extracted.
    IdentityUnresolved(ExtractionFailure),
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            SkipReason::EventTypeMismatch => "event_type_mismatch",
            SkipReason::TargetMismatch => "target_mismatch",
            SkipReason::ConditionMismatch(_) => "condition_mismatch",
            SkipReason::UnknownReference(_) => "unknown_reference",
            SkipReason::IdentityUnresolved(_) => "identity_unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Fired(Event),
    Skipped(SkipReason),
}

impl RuleOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, RuleOutcome::Fired(_))
    }

    pub fn into_event(self) -> Option<Event> {
        match self {
            RuleOutcome::Fired(event) => Some(event),
            RuleOutcome::Skipped(_) => None,
        }
    }
}

/// Target and every condition, in that order. Stops at the first miss.
pub fn rule_matches(
    rule: &TrackingRule,
    signal: &CapturedSignal,
    registry: &Registry,
) -> Result<(), SkipReason> {
    if signal.event_type_id != rule.event_type_id {
        return Err(SkipReason::EventTypeMismatch);
    }

    let unknown = |e: crate::error::CoreError| SkipReason::UnknownReference(e.to_string());

    if !clause_matches(registry, Clause::from(&rule.tracking_target), signal).map_err(unknown)? {
        return Err(SkipReason::TargetMismatch);
    }

    for (index, condition) in rule.conditions.iter().enumerate() {
        if !clause_matches(registry, Clause::from(condition), signal).map_err(unknown)? {
            return Err(SkipReason::ConditionMismatch(index));
        }
    }

    Ok(())
}

/// Resolve the event's identity: `userId` first, then the rule's
/// `anonymousId` mapping, or the pinned default when the rule has none.
fn resolve_identity(
    rule: &TrackingRule,
    signal: &CapturedSignal,
    config: &CoreConfig,
    ctx: &LogContext,
) -> Result<(String, String), ExtractionFailure> {
    if let Some(mapping) = rule.user_id_mapping() {
        match resolve_mapping(mapping, signal, config, ctx) {
            Ok(value) => return Ok((fields::USER_ID.to_string(), value)),
            Err(failure) => {
                log::info!("{} IDENTITY_FALLBACK from=userId reason={}", ctx, failure);
            }
        }
    }

    let pinned;
    let anonymous = match rule.anonymous_id_mapping() {
        Some(mapping) => mapping,
        None => {
            pinned = PayloadMapping::anonymous_id(&config.anon_id_storage_key);
            &pinned
        }
    };
    let value = resolve_mapping(anonymous, signal, config, ctx)?;
    Ok((fields::ANONYMOUS_ID.to_string(), value))
}

/// Resolve a non-identity field; failures omit the field.
fn resolve_optional(
    mapping: &PayloadMapping,
    signal: &CapturedSignal,
    config: &CoreConfig,
    ctx: &LogContext,
) -> Option<String> {
    match resolve_mapping(mapping, signal, config, ctx) {
        Ok(value) => Some(value),
        Err(failure) => {
            log::debug!(
                "{} FIELD_EXTRACTION_FAILED field={} source={} reason={}",
                ctx,
                mapping.field,
                mapping.source.as_str(),
                failure
            );
            None
        }
    }
}

/// Evaluate one rule against one signal.
pub fn evaluate_rule(
    rule: &TrackingRule,
    signal: &CapturedSignal,
    registry: &Registry,
    config: &CoreConfig,
    ctx: &LogContext,
    timestamp: DateTime<Utc>,
) -> RuleOutcome {
    let ctx = ctx.with_rule(rule.id);

    if let Err(reason) = rule_matches(rule, signal, registry) {
        match &reason {
            SkipReason::UnknownReference(detail) => {
                log::warn!("{} RULE_SKIPPED reason={} detail={}", ctx, reason.as_str(), detail)
            }
            _ => log::debug!("{} RULE_SKIPPED reason={}", ctx, reason.as_str()),
        }
        return RuleOutcome::Skipped(reason);
    }

    let (user_field, user_value) = match resolve_identity(rule, signal, config, &ctx) {
        Ok(identity) => identity,
        Err(failure) => {
            log::warn!(
                "{} RULE_SKIPPED reason=identity_unresolved detail={}",
                ctx,
                failure
            );
            return RuleOutcome::Skipped(SkipReason::IdentityUnresolved(failure));
        }
    };
    log_debug!(ctx, "IDENTITY_RESOLVED", field = user_field, value = user_value);

    let mut item: Option<(String, String)> = None;
    let mut item_title: Option<(String, String)> = None;
    let mut rating_value = None;
    let mut review_value = None;
    let mut extras = BTreeMap::new();

    for mapping in rule.payload_mappings_without_identity() {
        let Some(value) = resolve_optional(mapping, signal, config, &ctx) else {
            continue;
        };
        match mapping.field.as_str() {
            fields::ITEM_ID => item = Some((mapping.field.clone(), value)),
            fields::ITEM_TITLE => item_title = Some((mapping.field.clone(), value)),
            fields::RATING => match parse_float(&value) {
                Some(rating) => rating_value = Some(rating),
                None => log::debug!(
                    "{} FIELD_EXTRACTION_FAILED field=rating reason=not_a_number",
                    ctx
                ),
            },
            fields::REVIEW => review_value = Some(value),
            _ => {
                extras.insert(mapping.field.clone(), value);
            }
        }
    }

    let (item_field, item_value) = match item.or(item_title) {
        Some((field, value)) => (Some(field), Some(value)),
        None => (None, None),
    };

    log::info!(
        "{} RULE_FIRED event_type_id={} user_field={} item_field={}",
        ctx,
        rule.event_type_id,
        user_field,
        item_field.as_deref().unwrap_or("-")
    );

    RuleOutcome::Fired(Event {
        event_type_id: rule.event_type_id,
        user_field,
        user_value,
        item_field,
        item_value,
        timestamp,
        rating_value,
        review_value,
        tracking_rule_id: rule.id,
        extras,
    })
}

/// Every event `signal` produces across `rules`. No precedence between rules.
pub fn evaluate_rules(
    rules: &[TrackingRule],
    signal: &CapturedSignal,
    registry: &Registry,
    config: &CoreConfig,
    ctx: &LogContext,
) -> Vec<RuleOutcome> {
    let now = Utc::now();
    rules
        .iter()
        .map(|rule| evaluate_rule(rule, signal, registry, config, ctx, now))
        .collect()
}
