//! Customizing-field list validation.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;

use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::CustomizingField;

/// Create tolerates a missing `isEnabled`; update requires it on every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Create => "create",
            ValidationMode::Update => "update",
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> CoreError {
    let reason = reason.into();
    log::warn!("CUSTOMIZING_INVALID key={} reason={}", key, reason);
    CoreError::bad_key(key, reason)
}

fn parse_position(key: &str, raw: Option<&Value>) -> Result<Option<NonZeroU32>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let position = raw
        .as_u64()
        .ok_or_else(|| invalid(key, format!("position must be an integer >= 0, got {}", raw)))?;
    let position = u32::try_from(position)
        .map_err(|_| invalid(key, format!("position {} is out of range", position)))?;
    Ok(NonZeroU32::new(position))
}

fn parse_enabled(key: &str, raw: Option<&Value>, mode: ValidationMode) -> Result<bool> {
    match (raw, mode) {
        (Some(Value::Bool(enabled)), _) => Ok(*enabled),
        (Some(other), _) => Err(invalid(
            key,
            format!("isEnabled must be a boolean, got {}", other),
        )),
        (None, ValidationMode::Create) => Ok(true),
        (None, ValidationMode::Update) => Err(invalid(key, "isEnabled is required on update")),
    }
}

/// Validate a customizing document and return its typed fields.
///
/// Rules:
/// - the document is an array of objects, each with a non-empty string `key`
/// - keys are pairwise unique
/// - `position` is an integer >= 0; absent means 0
/// - non-zero positions are pairwise unique, 0 is exempt
/// - `isEnabled` is a boolean, required on every entry in update mode
pub fn validate_customizing(doc: &Value, mode: ValidationMode) -> Result<Vec<CustomizingField>> {
    let entries = doc
        .as_array()
        .ok_or_else(|| invalid("customizing", "customizing must be an array"))?;

    let mut keys: HashSet<&str> = HashSet::new();
    let mut positions: HashMap<NonZeroU32, &str> = HashMap::new();
    let mut fields = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let slot = format!("customizing[{}]", index);
        let object = entry
            .as_object()
            .ok_or_else(|| invalid(&slot, "entry must be an object"))?;

        let key = match object.get("key") {
            Some(Value::String(key)) if !key.trim().is_empty() => key.as_str(),
            Some(Value::String(_)) | None => {
                return Err(invalid(&slot, "key must be a non-empty string"))
            }
            Some(other) => {
                return Err(invalid(&slot, format!("key must be a string, got {}", other)))
            }
        };

        if !keys.insert(key) {
            return Err(invalid(key, "duplicate key"));
        }

        let position = parse_position(key, object.get("position"))?;
        if let Some(position) = position {
            if let Some(holder) = positions.insert(position, key) {
                return Err(invalid(
                    key,
                    format!("position {} already used by {}", position, holder),
                ));
            }
        }

        let is_enabled = parse_enabled(key, object.get("isEnabled"), mode)?;

        fields.push(CustomizingField {
            key: key.to_string(),
            position,
            is_enabled,
        });
    }

    log::debug!(
        "CUSTOMIZING_VALID mode={} fields={}",
        mode.as_str(),
        fields.len()
    );
    Ok(fields)
}
