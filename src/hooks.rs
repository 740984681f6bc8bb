//! Lifecycle callback contract for persistence sessions.
//!
//! Gate hooks run before an action and may veto it by returning `false`;
//! notify hooks run after an action completed. Within one batch all fields
//! are processed before the notify hook fires (batch-then-notify), so a
//! callback always observes a consistent snapshot in storage.

use std::fmt::Debug;
use std::sync::Arc;

/// Callback invoked before an action; returning `false` vetoes it.
pub type GateHook = Arc<dyn Fn() -> bool + Send + Sync>;

/// Callback invoked after an action completed.
pub type NotifyHook = Arc<dyn Fn() + Send + Sync>;

/// The five lifecycle callbacks a session can carry.
///
/// All are optional; an absent gate hook allows the action.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_save: Option<GateHook>,
    pub after_save: Option<NotifyHook>,
    pub before_restore: Option<GateHook>,
    pub after_restore: Option<NotifyHook>,
    pub after_release: Option<NotifyHook>,
}

impl Hooks {
    /// Evaluate a gate hook; absent hooks allow the action.
    pub(crate) fn allows(hook: &Option<GateHook>) -> bool {
        hook.as_ref().map_or(true, |h| h())
    }

    /// Fire a notify hook if present.
    pub(crate) fn notify(hook: &Option<NotifyHook>) {
        if let Some(h) = hook {
            h();
        }
    }
}

impl Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
