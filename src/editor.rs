//! Rich-text editor integration seam.
//!
//! Embedded rich-text editors keep the live text in an internal buffer and
//! only mirror it into the backing field on demand. Sessions
//! treat such fields as opaque text: [`EditorIntegration::flush`] is called
//! right before a field is read, and save triggers are armed only once the
//! integration's readiness signal resolves, so nothing is saved against a
//! half-initialized editor.

use tokio::sync::watch;

use crate::form::FormField;

/// Host-provided bridge to an embedded rich-text editor.
pub trait EditorIntegration: Send + Sync {
    /// True when the given field is backed by an editor instance.
    fn has_editor(&self, field: &dyn FormField) -> bool;

    /// Flush the editor's internal buffer into the backing field so that
    /// `field.value()` reflects what the user typed.
    fn flush(&self, field: &dyn FormField);

    /// Readiness signal. Receivers observe `true` once every editor
    /// instance finished initializing; the value never goes back to
    /// `false`.
    fn ready(&self) -> watch::Receiver<bool>;
}

/// Readiness handle for integrations that initialize asynchronously: the
/// host keeps the [`watch::Sender`] and flips it to `true` when its editors
/// report ready.
pub fn readiness() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_starts_unset_and_latches() {
        let (tx, rx) = readiness();
        assert!(!*rx.borrow());
        tx.send(true).unwrap();
        assert!(*rx.borrow());
    }
}
