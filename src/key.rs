//! Storage key derivation.
//!
//! Keys are pure functions of form identity, field identity and session
//! configuration. The persisted layout is fixed for backward compatibility:
//!
//! ```text
//! <scope-if-location-based><form-identity><field-identity><custom-suffix>
//! ```
//!
//! where both identities use the bracket format `[id=<id>][name=<name>]`
//! with absent attributes rendered as empty strings. Two fields sharing id
//! and name within a form intentionally collide: that is how grouped inputs
//! (checkbox/radio groups sharing a name) share one entry.

use std::sync::Arc;

use url::Url;

use crate::config::SessionConfig;
use crate::form::{Form, FormField};

fn bracket_identity(id: Option<&str>, name: Option<&str>) -> String {
    format!("[id={}][name={}]", id.unwrap_or(""), name.unwrap_or(""))
}

pub fn form_identity(form: &dyn Form) -> String {
    bracket_identity(form.id().as_deref(), form.name().as_deref())
}

pub fn field_identity(field: &dyn FormField) -> String {
    bracket_identity(field.id().as_deref(), field.name().as_deref())
}

/// Page location signature: hostname, path, query and fragment concatenated.
pub fn location_signature(url: &Url) -> String {
    let mut out = String::new();
    out.push_str(url.host_str().unwrap_or(""));
    out.push_str(url.path());
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// The scope prefix used when `location_based` is enabled: the configured
/// logical name when set (stable across pages), else the location signature.
pub fn session_scope(config: &SessionConfig, location: Option<&Url>) -> String {
    match &config.name {
        Some(name) => name.clone(),
        None => location.map(location_signature).unwrap_or_default(),
    }
}

/// Fixed-order key concatenation. The scope participates only when
/// `location_based` is enabled.
pub fn storage_key(
    scope: &str,
    form_identity: &str,
    field_identity: &str,
    location_based: bool,
    custom_suffix: &str,
) -> String {
    let mut key = String::new();
    if location_based {
        key.push_str(scope);
    }
    key.push_str(form_identity);
    key.push_str(field_identity);
    key.push_str(custom_suffix);
    key
}

/// Registry identifier for a set of target forms: their identities, sorted
/// and deduplicated, joined with `,`. Order of the input set is irrelevant.
pub fn session_identifier(targets: &[Arc<dyn Form>]) -> String {
    let mut identities: Vec<String> = targets
        .iter()
        .map(|form| form_identity(form.as_ref()))
        .collect();
    identities.sort();
    identities.dedup();
    identities.join(",")
}
