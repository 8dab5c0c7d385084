//! Return method validation.

use crate::error::{CoreError, Result};
use crate::model::{CustomizingField, LayoutView, ReturnMethodDraft, StyleView};
use crate::registry::Registry;

use super::customizing::{validate_customizing, ValidationMode};

/// Validate a draft and return its typed customizing fields.
///
/// The layout and style documents must parse into the typed views for the
/// draft's return type; extra keys are allowed and kept.
pub fn validate_return_method(
    draft: &ReturnMethodDraft,
    registry: &Registry,
    mode: ValidationMode,
) -> Result<Vec<CustomizingField>> {
    if draft.configuration_name.trim().is_empty() {
        return Err(CoreError::bad_key(
            "configurationName",
            "configuration name must not be empty",
        ));
    }
    if draft.delay < 0 {
        return Err(CoreError::bad_key(
            "delay",
            format!("delay must be >= 0, got {}", draft.delay),
        ));
    }

    registry.operator(draft.operator_id)?;
    LayoutView::parse(draft.return_type, &draft.layout)?;
    StyleView::parse(&draft.style)?;

    validate_customizing(&draft.customizing, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReturnType;
    use serde_json::json;

    fn draft() -> ReturnMethodDraft {
        serde_json::from_value(json!({
            "configurationName": "Homepage popup",
            "returnType": "POPUP",
            "value": "/",
            "operatorId": 2,
            "customizing": [
                {"key": "image", "position": 1, "isEnabled": true},
                {"key": "title", "position": 2, "isEnabled": true}
            ],
            "layout": {"contentMode": "grid", "position": "bottom-right"},
            "style": {"theme": "dark"},
            "delay": 3
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_draft() {
        let fields =
            validate_return_method(&draft(), &Registry::seeded(), ValidationMode::Update).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_negative_delay() {
        let mut d = draft();
        d.delay = -1;
        let err =
            validate_return_method(&d, &Registry::seeded(), ValidationMode::Create).unwrap_err();
        assert_eq!(err.offending_key(), Some("delay"));
    }

    #[test]
    fn test_unknown_operator() {
        let mut d = draft();
        d.operator_id = 77;
        let err =
            validate_return_method(&d, &Registry::seeded(), ValidationMode::Create).unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_layout_must_fit_return_type() {
        let mut d = draft();
        d.return_type = ReturnType::InlineInjection;
        d.layout = json!({"placement": "sideways"});
        let err =
            validate_return_method(&d, &Registry::seeded(), ValidationMode::Create).unwrap_err();
        assert_eq!(err.offending_key(), Some("layout"));

        let mut d = draft();
        d.style = json!("dark");
        let err =
            validate_return_method(&d, &Registry::seeded(), ValidationMode::Create).unwrap_err();
        assert_eq!(err.offending_key(), Some("style"));
    }

    #[test]
    fn test_blank_name() {
        let mut d = draft();
        d.configuration_name = String::new();
        let err =
            validate_return_method(&d, &Registry::seeded(), ValidationMode::Create).unwrap_err();
        assert_eq!(err.offending_key(), Some("configurationName"));
    }
}
