//! `(prior mapping, edit) -> new mapping`.
//!
//! Invariant after every transition: the populated optional attributes are a
//! subset of those the mapping's current source allows. Completeness is
//! checked at save time, not here.

use serde::{Deserialize, Serialize};

use crate::model::{fields, MappingAttribute, PayloadMapping, Source};

/// One author edit to a single mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MappingEdit {
    SetField(String),
    SetSource(Source),
    SetValue(Option<String>),
    SetRequestUrlPattern(Option<String>),
    SetRequestMethod(Option<String>),
    SetRequestBodyPath(Option<String>),
}

/// One author edit to a mapping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListEdit {
    Add { field: String },
    Remove { index: usize },
    Edit { index: usize, edit: MappingEdit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Anonymous,
    User,
    Other,
}

impl FieldKind {
    fn of(field: &str) -> Self {
        match field {
            fields::ANONYMOUS_ID => FieldKind::Anonymous,
            fields::USER_ID => FieldKind::User,
            _ => FieldKind::Other,
        }
    }
}

/// Identity fields restart from local storage with every detail dropped.
fn reset(field: &str) -> PayloadMapping {
    PayloadMapping::new(field, Source::LocalStorage)
}

/// Clear the attributes `source` does not use.
fn clear_for_source(mut mapping: PayloadMapping, source: Source) -> PayloadMapping {
    mapping.source = source;
    match source {
        Source::RequestUrl => {
            mapping.value = None;
            mapping.request_body_path = None;
        }
        Source::RequestBody => {
            mapping.value = None;
        }
        Source::Element | Source::Cookie | Source::LocalStorage | Source::SessionStorage => {
            mapping.value = None;
            mapping.request_url_pattern = None;
            mapping.request_method = None;
            mapping.request_body_path = None;
        }
    }
    mapping
}

fn normalize(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn set_attribute(
    prior: &PayloadMapping,
    attribute: MappingAttribute,
    value: &Option<String>,
) -> PayloadMapping {
    if !prior.source.allows(attribute) {
        log::debug!(
            "MAPPING_EDIT_IGNORED field={} source={} attribute={}",
            prior.field,
            prior.source.as_str(),
            attribute.as_str()
        );
        return prior.clone();
    }

    let mut next = prior.clone();
    let value = normalize(value);
    match attribute {
        MappingAttribute::Value => next.value = value,
        MappingAttribute::RequestUrlPattern => next.request_url_pattern = value,
        MappingAttribute::RequestMethod => next.request_method = value,
        MappingAttribute::RequestBodyPath => next.request_body_path = value,
    }
    next
}

/// Apply one edit. `anon_key` is the pinned anonymous-id storage key.
pub fn apply_edit(prior: &PayloadMapping, edit: &MappingEdit, anon_key: &str) -> PayloadMapping {
    match (FieldKind::of(&prior.field), edit) {
        // Anonymous id is pinned whatever it was before.
        (_, MappingEdit::SetField(field)) if field == fields::ANONYMOUS_ID => {
            PayloadMapping::anonymous_id(anon_key)
        }
        (FieldKind::Anonymous, MappingEdit::SetField(field)) => reset(field),
        (FieldKind::User | FieldKind::Other, MappingEdit::SetField(field)) => {
            let mut next = prior.clone();
            next.field = field.clone();
            next
        }

        // Nothing but the field itself is editable on the pinned mapping.
        (FieldKind::Anonymous, _) => {
            log::debug!("MAPPING_EDIT_IGNORED field=anonymousId reason=pinned");
            PayloadMapping::anonymous_id(anon_key)
        }

        (FieldKind::User | FieldKind::Other, MappingEdit::SetSource(source)) => {
            if *source == prior.source {
                prior.clone()
            } else {
                clear_for_source(prior.clone(), *source)
            }
        }
        (FieldKind::User | FieldKind::Other, MappingEdit::SetValue(v)) => {
            set_attribute(prior, MappingAttribute::Value, v)
        }
        (FieldKind::User | FieldKind::Other, MappingEdit::SetRequestUrlPattern(v)) => {
            set_attribute(prior, MappingAttribute::RequestUrlPattern, v)
        }
        (FieldKind::User | FieldKind::Other, MappingEdit::SetRequestMethod(v)) => {
            set_attribute(prior, MappingAttribute::RequestMethod, v)
        }
        (FieldKind::User | FieldKind::Other, MappingEdit::SetRequestBodyPath(v)) => {
            set_attribute(prior, MappingAttribute::RequestBodyPath, v)
        }
    }
}

/// Apply edits in order.
pub fn apply_edits<'a, I>(prior: &PayloadMapping, edits: I, anon_key: &str) -> PayloadMapping
where
    I: IntoIterator<Item = &'a MappingEdit>,
{
    edits
        .into_iter()
        .fold(prior.clone(), |mapping, edit| apply_edit(&mapping, edit, anon_key))
}

/// A fresh mapping for `field`: pinned for anonymous id, local storage for
/// user id, element otherwise.
pub fn new_mapping(field: &str, anon_key: &str) -> PayloadMapping {
    match FieldKind::of(field) {
        FieldKind::Anonymous => PayloadMapping::anonymous_id(anon_key),
        FieldKind::User => reset(field),
        FieldKind::Other => PayloadMapping::new(field, Source::Element),
    }
}

/// Apply one list edit. Out-of-range indices leave the list unchanged.
pub fn apply_list_edit(
    prior: &[PayloadMapping],
    edit: &ListEdit,
    anon_key: &str,
) -> Vec<PayloadMapping> {
    let mut next = prior.to_vec();
    match edit {
        ListEdit::Add { field } => next.push(new_mapping(field, anon_key)),
        ListEdit::Remove { index } => {
            if *index < next.len() {
                next.remove(*index);
            }
        }
        ListEdit::Edit { index, edit } => {
            if let Some(slot) = next.get_mut(*index) {
                *slot = apply_edit(slot, edit, anon_key);
            }
        }
    }
    next
}
