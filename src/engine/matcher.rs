//! Pattern/operator comparison against a captured signal.

use crate::error::Result;
use crate::extraction::CapturedSignal;
use crate::model::{Condition, TrackingTarget};
use crate::registry::Registry;

/// One pattern/operator/value triple, borrowed from a target or condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause<'a> {
    pub pattern_id: i64,
    pub operator_id: i64,
    pub value: &'a str,
}

impl<'a> From<&'a TrackingTarget> for Clause<'a> {
    fn from(target: &'a TrackingTarget) -> Self {
        Self {
            pattern_id: target.pattern_id,
            operator_id: target.operator_id,
            value: &target.value,
        }
    }
}

impl<'a> From<&'a Condition> for Clause<'a> {
    fn from(condition: &'a Condition) -> Self {
        Self {
            pattern_id: condition.pattern_id,
            operator_id: condition.operator_id,
            value: &condition.value,
        }
    }
}

/// Whether the clause holds for `signal`.
///
/// Unknown pattern or operator ids are `NotFound`. A signal that carries no
/// subject for the pattern's kind (no exchange, no element) never matches.
pub fn clause_matches(
    registry: &Registry,
    clause: Clause<'_>,
    signal: &CapturedSignal,
) -> Result<bool> {
    let pattern = registry.pattern(clause.pattern_id)?;
    let operator = registry.operator(clause.operator_id)?;

    Ok(signal
        .subject(pattern.kind)
        .map_or(false, |subject| operator.compare(&subject, clause.value)))
}
