use serde::{Deserialize, Serialize};

/// Notification published on the engine's broadcast bus after a persistence
/// pass completed. Complements the synchronous session hooks for hosts that
/// render passive indicators ("draft saved").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistEvent {
    /// A save pass wrote `fields` field values for the session.
    Saved { session: String, fields: usize },
    /// A restore pass put `fields` stored values back into live fields.
    Restored { session: String, fields: usize },
    /// A release removed `keys` stored entries for one form.
    Released { session: String, keys: usize },
}
