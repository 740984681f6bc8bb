//! Form and field abstraction.
//!
//! The engine never touches a widget toolkit directly: hosts expose their
//! forms through the [`Form`] and [`FormField`] traits and forward input /
//! change / submit / reset notifications to the session. An in-memory
//! implementation lives in [`memory`] for tests and non-DOM embedders.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// In-memory form/field implementation.
pub mod memory;

/// Raw control type of a field, as reported by the host toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    Text,
    TextArea,
    Hidden,
    Checkbox,
    Radio,
    Select { multiple: bool },
    Password,
    File,
    Submit,
    Reset,
    Button,
}

impl ControlKind {
    /// Whether fields of this control type are candidates for persistence.
    /// Action buttons, file pickers and passwords never are.
    pub fn protectable(self) -> bool {
        !matches!(
            self,
            ControlKind::Password
                | ControlKind::File
                | ControlKind::Submit
                | ControlKind::Reset
                | ControlKind::Button
        )
    }
}

/// A single live form control.
///
/// `value`/`set_value` carry the textual value (text boxes, the value
/// attribute of checkboxes and radios, single selects); `checked` applies to
/// checkboxes and radios; `selected` to multi-selects.
pub trait FormField: Send + Sync {
    fn id(&self) -> Option<String>;
    fn name(&self) -> Option<String>;
    fn control(&self) -> ControlKind;

    fn value(&self) -> String;
    fn set_value(&self, value: &str);

    fn checked(&self) -> bool {
        false
    }
    fn set_checked(&self, _on: bool) {}

    fn selected(&self) -> Vec<String> {
        Vec::new()
    }
    fn set_selected(&self, _values: &[String]) {}

    fn disabled(&self) -> bool {
        false
    }
    fn read_only(&self) -> bool {
        false
    }
}

/// A live form: an identified container of fields.
pub trait Form: Send + Sync {
    fn id(&self) -> Option<String>;
    fn name(&self) -> Option<String>;
    fn fields(&self) -> Vec<Arc<dyn FormField>>;
}

/// Persistence kind of a field, determined once and dispatched exhaustively
/// by the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Text boxes, text areas and hidden inputs.
    Text,
    /// A standalone checkbox (no bracket-style name).
    Checkbox,
    /// A checkbox whose name is bracket-style (e.g. `tags[]`), persisted as
    /// one value list per group.
    CheckboxGroup,
    Radio,
    /// Single-value select; persists its value string.
    Select,
    /// Multi-value select; persists the selected values as a list.
    MultiSelect,
}

impl FieldKind {
    pub fn of(field: &dyn FormField) -> FieldKind {
        match field.control() {
            ControlKind::Checkbox => {
                if field.name().is_some_and(|name| name.contains('[')) {
                    FieldKind::CheckboxGroup
                } else {
                    FieldKind::Checkbox
                }
            }
            ControlKind::Radio => FieldKind::Radio,
            ControlKind::Select { multiple: false } => FieldKind::Select,
            ControlKind::Select { multiple: true } => FieldKind::MultiSelect,
            _ => FieldKind::Text,
        }
    }
}

/// All fields of `form` that are candidates for persistence: protectable
/// control types that are neither disabled nor read-only.
pub fn protectable_fields(form: &dyn Form) -> Vec<Arc<dyn FormField>> {
    form.fields()
        .into_iter()
        .filter(|field| field.control().protectable() && !field.disabled() && !field.read_only())
        .collect()
}

/// A field with neither id nor name cannot be keyed and is skipped in every
/// pass.
pub fn identified(field: &dyn FormField) -> bool {
    field.id().is_some() || field.name().is_some()
}
