//! Field codec: converts live field state to stored strings and back.
//!
//! One save pass runs [`capture`] per field, serializes the outcome with
//! [`FieldValue::to_stored`] and writes it; a restore pass reads the stored
//! string, decodes it with [`FieldValue::from_stored`] for the field's kind
//! and puts it back with [`apply`]. Round-tripping is lossless within a
//! field kind.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::form::{FieldKind, Form, FormField};

/// Value of a single field (or field group) at capture time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text boxes, text areas, hidden inputs, single selects.
    Text(String),
    /// A standalone checkbox.
    Toggle(bool),
    /// Checkbox group or multi-select: the checked/selected values in field
    /// order.
    Many(Vec<String>),
    /// The checked member's value of a radio group. A group with nothing
    /// checked is not a `FieldValue` at all; capture yields
    /// [`Captured::Clear`] so absence is encoded as a missing key.
    Choice(String),
}

impl FieldValue {
    /// Stored string encoding: text and choice verbatim, toggles as the
    /// literal strings `true`/`false`, lists comma-joined.
    ///
    /// The comma join is ambiguous when an individual value itself contains
    /// a comma. Known limitation, kept for compatibility with previously
    /// stored data.
    pub fn to_stored(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Toggle(on) => {
                if *on {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            FieldValue::Many(values) => values.join(","),
            FieldValue::Choice(value) => value.clone(),
        }
    }

    /// Decode a stored string for a field of the given kind.
    pub fn from_stored(kind: FieldKind, raw: &str) -> FieldValue {
        match kind {
            FieldKind::Text | FieldKind::Select => FieldValue::Text(raw.to_string()),
            FieldKind::Checkbox => FieldValue::Toggle(raw == "true"),
            FieldKind::CheckboxGroup | FieldKind::MultiSelect => {
                if raw.is_empty() {
                    FieldValue::Many(Vec::new())
                } else {
                    FieldValue::Many(raw.split(',').map(str::to_string).collect())
                }
            }
            FieldKind::Radio => FieldValue::Choice(raw.to_string()),
        }
    }
}

/// Outcome of capturing one field during a save pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Captured {
    /// Persist this value under the field's key.
    Store(FieldValue),
    /// Remove the field's key: a radio group with no member checked.
    Clear,
}

/// Read the current value of `field`. Returns `None` when the field is part
/// of a checkbox group already captured in this pass (`seen_groups` is the
/// per-form, per-pass dedup cache keyed by group name).
pub fn capture(
    form: &dyn Form,
    field: &dyn FormField,
    kind: FieldKind,
    seen_groups: &mut HashSet<String>,
) -> Option<Captured> {
    match kind {
        FieldKind::Text | FieldKind::Select => {
            Some(Captured::Store(FieldValue::Text(field.value())))
        }
        FieldKind::Checkbox => Some(Captured::Store(FieldValue::Toggle(field.checked()))),
        FieldKind::CheckboxGroup => {
            let name = field.name()?;
            if !seen_groups.insert(name.clone()) {
                return None;
            }
            let values = same_name(form, &name)
                .into_iter()
                .filter(|member| member.checked())
                .map(|member| member.value())
                .collect();
            Some(Captured::Store(FieldValue::Many(values)))
        }
        FieldKind::MultiSelect => Some(Captured::Store(FieldValue::Many(field.selected()))),
        FieldKind::Radio => {
            if field.checked() {
                Some(Captured::Store(FieldValue::Choice(field.value())))
            } else {
                Some(Captured::Clear)
            }
        }
    }
}

/// Put a stored value back onto a live field. Group kinds set exactly the
/// stored members: listed siblings are checked/selected, the rest cleared.
/// A kind/value mismatch (stale entry from an older layout) is ignored.
pub fn apply(form: &dyn Form, field: &dyn FormField, kind: FieldKind, value: &FieldValue) {
    match (kind, value) {
        (FieldKind::Text | FieldKind::Select, FieldValue::Text(text)) => field.set_value(text),
        (FieldKind::Checkbox, FieldValue::Toggle(on)) => field.set_checked(*on),
        (FieldKind::CheckboxGroup, FieldValue::Many(values)) => {
            if let Some(name) = field.name() {
                for member in same_name(form, &name) {
                    member.set_checked(values.contains(&member.value()));
                }
            }
        }
        (FieldKind::MultiSelect, FieldValue::Many(values)) => field.set_selected(values),
        (FieldKind::Radio, FieldValue::Choice(choice)) => {
            if let Some(name) = field.name() {
                for member in same_name(form, &name) {
                    member.set_checked(member.value() == *choice);
                }
            } else if field.value() == *choice {
                field.set_checked(true);
            }
        }
        _ => {}
    }
}

fn same_name(form: &dyn Form, name: &str) -> Vec<Arc<dyn FormField>> {
    form.fields()
        .into_iter()
        .filter(|field| field.name().as_deref() == Some(name))
        .collect()
}
