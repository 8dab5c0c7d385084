//! Return methods (recommendation widgets).
//!
//! `layout`, `style` and `customizing` are kept as the documents the author
//! submitted so a fetch returns them unchanged. Typed views are parsed on
//! demand; unknown keys are preserved in `extra` and otherwise ignored.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    #[serde(rename = "POPUP", alias = "popup")]
    Popup,
    #[serde(rename = "INLINE_INJECTION", alias = "inline-injection")]
    InlineInjection,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Popup => "POPUP",
            ReturnType::InlineInjection => "INLINE_INJECTION",
        }
    }
}

/// One field of a widget's rendered field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizingField {
    pub key: String,
    /// `None` is the unpositioned sentinel, `0` on the wire.
    #[serde(default, with = "position_serde")]
    pub position: Option<NonZeroU32>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

mod position_serde {
    use super::*;

    pub fn serialize<S: Serializer>(
        position: &Option<NonZeroU32>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(position.map_or(0, NonZeroU32::get))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<NonZeroU32>, D::Error> {
        Ok(NonZeroU32::new(u32::deserialize(deserializer)?))
    }
}

impl CustomizingField {
    pub fn new(key: &str, position: u32, is_enabled: bool) -> Self {
        Self {
            key: key.to_string(),
            position: NonZeroU32::new(position),
            is_enabled,
        }
    }
}

/// Position ascending with unpositioned (`0`) lowest, ties by key.
fn render_cmp(a: &CustomizingField, b: &CustomizingField) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.key.cmp(&b.key))
}

/// Enabled fields in render order.
pub fn render_order(fields: &[CustomizingField]) -> Vec<&CustomizingField> {
    let mut enabled: Vec<&CustomizingField> = fields.iter().filter(|f| f.is_enabled).collect();
    enabled.sort_by(|a, b| render_cmp(a, b));
    enabled
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    #[default]
    Grid,
    List,
    Carousel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopupPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlinePlacement {
    Before,
    After,
    Prepend,
    #[default]
    Append,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupLayout {
    #[serde(default)]
    pub content_mode: ContentMode,
    #[serde(default)]
    pub position: PopupPosition,
    #[serde(default)]
    pub max_items: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineLayout {
    #[serde(default)]
    pub content_mode: ContentMode,
    #[serde(default)]
    pub placement: InlinePlacement,
    #[serde(default)]
    pub max_items: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Layout document, shape decided by the return type.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutView {
    Popup(PopupLayout),
    Inline(InlineLayout),
}

impl LayoutView {
    pub fn parse(return_type: ReturnType, layout: &Value) -> Result<Self> {
        require_object("layout", layout)?;
        let view = match return_type {
            ReturnType::Popup => LayoutView::Popup(
                serde_json::from_value(layout.clone())
                    .map_err(|e| CoreError::bad_key("layout", e.to_string()))?,
            ),
            ReturnType::InlineInjection => LayoutView::Inline(
                serde_json::from_value(layout.clone())
                    .map_err(|e| CoreError::bad_key("layout", e.to_string()))?,
            ),
        };
        Ok(view)
    }

    pub fn content_mode(&self) -> ContentMode {
        match self {
            LayoutView::Popup(l) => l.content_mode,
            LayoutView::Inline(l) => l.content_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleView {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StyleView {
    pub fn parse(style: &Value) -> Result<Self> {
        require_object("style", style)?;
        serde_json::from_value(style.clone())
            .map_err(|e| CoreError::bad_key("style", e.to_string()))
    }
}

fn require_object(name: &str, doc: &Value) -> Result<()> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(CoreError::bad_key(name, "document must be a JSON object"))
    }
}

/// Author-submitted return method, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnMethodDraft {
    pub configuration_name: String,
    pub return_type: ReturnType,
    #[serde(default)]
    pub value: String,
    pub operator_id: i64,
    #[serde(default = "empty_array")]
    pub customizing: Value,
    #[serde(default = "empty_object")]
    pub layout: Value,
    #[serde(default = "empty_object")]
    pub style: Value,
    #[serde(default)]
    pub delay: i64,
    #[serde(default)]
    pub search_keyword_config_id: Option<i64>,
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnMethod {
    pub id: i64,
    pub domain_id: i64,
    pub configuration_name: String,
    pub return_type: ReturnType,
    pub value: String,
    pub operator_id: i64,
    pub customizing: Value,
    pub layout: Value,
    pub style: Value,
    pub delay: i64,
    #[serde(default)]
    pub search_keyword_config_id: Option<i64>,
}

impl ReturnMethod {
    pub fn from_draft(id: i64, domain_id: i64, draft: ReturnMethodDraft) -> Self {
        Self {
            id,
            domain_id,
            configuration_name: draft.configuration_name,
            return_type: draft.return_type,
            value: draft.value,
            operator_id: draft.operator_id,
            customizing: draft.customizing,
            layout: draft.layout,
            style: draft.style,
            delay: draft.delay,
            search_keyword_config_id: draft.search_keyword_config_id,
        }
    }

    pub fn customizing_fields(&self) -> Result<Vec<CustomizingField>> {
        Ok(serde_json::from_value(self.customizing.clone())?)
    }

    pub fn layout_view(&self) -> Result<LayoutView> {
        LayoutView::parse(self.return_type, &self.layout)
    }

    pub fn style_view(&self) -> Result<StyleView> {
        StyleView::parse(&self.style)
    }

    /// Enabled fields in the order a renderer must draw them.
    pub fn render_fields(&self) -> Result<Vec<CustomizingField>> {
        let fields = self.customizing_fields()?;
        Ok(render_order(&fields).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_zero_is_unset() {
        let field: CustomizingField =
            serde_json::from_value(json!({"key": "price", "position": 0, "isEnabled": true}))
                .unwrap();
        assert_eq!(field.position, None);
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({"key": "price", "position": 0, "isEnabled": true})
        );
    }

    #[test]
    fn test_render_order() {
        let fields = vec![
            CustomizingField::new("rating", 0, true),
            CustomizingField::new("title", 2, true),
            CustomizingField::new("image", 1, true),
            CustomizingField::new("brand", 0, true),
            CustomizingField::new("price", 3, false),
        ];
        let keys: Vec<&str> = render_order(&fields).iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["brand", "rating", "image", "title"]);

        let fields = vec![
            CustomizingField::new("b", 2, true),
            CustomizingField::new("a", 0, true),
            CustomizingField::new("c", 1, true),
        ];
        let keys: Vec<&str> = render_order(&fields).iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_layout_view_preserves_extra_keys() {
        let layout = json!({"contentMode": "carousel", "maxItems": 8, "arrows": true});
        let view = LayoutView::parse(ReturnType::Popup, &layout).unwrap();
        match view {
            LayoutView::Popup(popup) => {
                assert_eq!(popup.content_mode, ContentMode::Carousel);
                assert_eq!(popup.position, PopupPosition::Center);
                assert_eq!(popup.max_items, Some(8));
                assert_eq!(popup.extra.get("arrows"), Some(&json!(true)));
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_layout_view_rejects_unknown_mode() {
        let layout = json!({"contentMode": "masonry"});
        let err = LayoutView::parse(ReturnType::InlineInjection, &layout).unwrap_err();
        assert_eq!(err.offending_key(), Some("layout"));
        assert!(LayoutView::parse(ReturnType::Popup, &json!([])).is_err());
    }

    #[test]
    fn test_return_type_aliases() {
        let t: ReturnType = serde_json::from_value(json!("inline-injection")).unwrap();
        assert_eq!(t, ReturnType::InlineInjection);
        assert_eq!(serde_json::to_value(ReturnType::Popup).unwrap(), json!("POPUP"));
    }

    #[test]
    fn test_style_view_defaults() {
        let style = StyleView::parse(&json!({"colors": {"primary": "#111"}, "radius": 4})).unwrap();
        assert_eq!(style.theme, Theme::Light);
        assert_eq!(style.colors.get("primary").map(String::as_str), Some("#111"));
        assert_eq!(style.extra.get("radius"), Some(&json!(4)));
    }
}
