use std::sync::{Arc, Mutex};

use crate::form::{ControlKind, Form, FormField};

/// In-memory form field (no toolkit). Used by tests and embedders that keep
/// form state in application memory rather than a DOM.
pub struct MemoryField {
    id: Option<String>,
    name: Option<String>,
    control: ControlKind,
    state: Mutex<FieldState>,
}

#[derive(Default)]
struct FieldState {
    value: String,
    checked: bool,
    selected: Vec<String>,
    disabled: bool,
    read_only: bool,
}

impl MemoryField {
    pub fn new(control: ControlKind) -> Self {
        Self {
            id: None,
            name: None,
            control,
            state: Mutex::new(FieldState::default()),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_value(self, value: &str) -> Self {
        self.state.lock().unwrap().value = value.to_string();
        self
    }

    pub fn with_checked(self, on: bool) -> Self {
        self.state.lock().unwrap().checked = on;
        self
    }

    pub fn with_selected(self, values: &[&str]) -> Self {
        self.state.lock().unwrap().selected = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_disabled(self, disabled: bool) -> Self {
        self.state.lock().unwrap().disabled = disabled;
        self
    }

    pub fn with_read_only(self, read_only: bool) -> Self {
        self.state.lock().unwrap().read_only = read_only;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl FormField for MemoryField {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn control(&self) -> ControlKind {
        self.control
    }

    fn value(&self) -> String {
        self.state.lock().unwrap().value.clone()
    }

    fn set_value(&self, value: &str) {
        self.state.lock().unwrap().value = value.to_string();
    }

    fn checked(&self) -> bool {
        self.state.lock().unwrap().checked
    }

    fn set_checked(&self, on: bool) {
        self.state.lock().unwrap().checked = on;
    }

    fn selected(&self) -> Vec<String> {
        self.state.lock().unwrap().selected.clone()
    }

    fn set_selected(&self, values: &[String]) {
        self.state.lock().unwrap().selected = values.to_vec();
    }

    fn disabled(&self) -> bool {
        self.state.lock().unwrap().disabled
    }

    fn read_only(&self) -> bool {
        self.state.lock().unwrap().read_only
    }
}

/// In-memory form: an identified, fixed list of [`MemoryField`]s.
pub struct MemoryForm {
    id: Option<String>,
    name: Option<String>,
    fields: Vec<Arc<MemoryField>>,
}

impl MemoryForm {
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            fields: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn field(mut self, field: Arc<MemoryField>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for MemoryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl Form for MemoryForm {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn fields(&self) -> Vec<Arc<dyn FormField>> {
        self.fields
            .iter()
            .map(|field| field.clone() as Arc<dyn FormField>)
            .collect()
    }
}
