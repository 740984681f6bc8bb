use std::time::Duration;
use url::Url;

use crate::hooks::{GateHook, Hooks, NotifyHook};

/// Engine-wide configuration. Also carries the page location that sessions
/// use for location-scoped storage keys.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Location of the page the engine runs on; `None` for hosts without a
    /// URL (native embedders, tests).
    pub location: Option<Url>,
    /// Capacity of the persistence event bus.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            location: None,
            channel_capacity: 64,
        }
    }
}

/// Resolved per-session configuration.
///
/// The first `protect()` call establishes it from [`SessionConfig::default`]
/// plus the supplied options; subsequent calls shallow-merge on top.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fields never persisted or restored, matched by field id or name.
    pub exclude_fields: Vec<String>,
    /// Suffix appended to every storage key (multi-instance disambiguation).
    pub custom_key_suffix: String,
    /// Scope storage keys to the current page location.
    pub location_based: bool,
    /// Periodic save interval; `Duration::ZERO` disables the periodic task
    /// and enables immediate per-input saves for text fields instead.
    pub timeout: Duration,
    /// Release stored data when a form is submitted or reset.
    pub auto_release: bool,
    /// Logical form-set name overriding location-based key scoping, stable
    /// across different pages.
    pub name: Option<String>,
    /// Lifecycle callbacks.
    pub hooks: Hooks,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exclude_fields: Vec::new(),
            custom_key_suffix: String::new(),
            location_based: false,
            timeout: Duration::ZERO,
            auto_release: true,
            name: None,
            hooks: Hooks::default(),
        }
    }
}

impl SessionConfig {
    /// Shallow-merge `options` into this configuration: fields present in
    /// the options overwrite, absent fields keep their current value.
    pub fn apply(&mut self, options: SessionOptions) {
        if let Some(exclude) = options.exclude_fields {
            self.exclude_fields = exclude;
        }
        if let Some(suffix) = options.custom_key_suffix {
            self.custom_key_suffix = suffix;
        }
        if let Some(location_based) = options.location_based {
            self.location_based = location_based;
        }
        if let Some(timeout) = options.timeout {
            self.timeout = timeout;
        }
        if let Some(auto_release) = options.auto_release {
            self.auto_release = auto_release;
        }
        if let Some(name) = options.name {
            self.name = Some(name);
        }
        if let Some(hook) = options.before_save {
            self.hooks.before_save = Some(hook);
        }
        if let Some(hook) = options.after_save {
            self.hooks.after_save = Some(hook);
        }
        if let Some(hook) = options.before_restore {
            self.hooks.before_restore = Some(hook);
        }
        if let Some(hook) = options.after_restore {
            self.hooks.after_restore = Some(hook);
        }
        if let Some(hook) = options.after_release {
            self.hooks.after_release = Some(hook);
        }
    }
}

/// Partial session options passed to `protect()`; every field is optional.
#[derive(Default)]
pub struct SessionOptions {
    pub exclude_fields: Option<Vec<String>>,
    pub custom_key_suffix: Option<String>,
    pub location_based: Option<bool>,
    pub timeout: Option<Duration>,
    pub auto_release: Option<bool>,
    pub name: Option<String>,
    pub before_save: Option<GateHook>,
    pub after_save: Option<NotifyHook>,
    pub before_restore: Option<GateHook>,
    pub after_restore: Option<NotifyHook>,
    pub after_release: Option<NotifyHook>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn defaults_match_contract() {
        let cfg = SessionConfig::default();
        assert!(cfg.exclude_fields.is_empty());
        assert_eq!(cfg.custom_key_suffix, "");
        assert!(!cfg.location_based);
        assert!(cfg.timeout.is_zero());
        assert!(cfg.auto_release);
        assert!(cfg.name.is_none());
    }

    #[test]
    fn apply_overwrites_only_present_fields() {
        let mut cfg = SessionConfig::default();
        cfg.apply(SessionOptions {
            custom_key_suffix: Some("v2".into()),
            timeout: Some(Duration::from_secs(5)),
            ..SessionOptions::default()
        });
        assert_eq!(cfg.custom_key_suffix, "v2");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.auto_release); // untouched

        // second merge keeps the earlier suffix
        cfg.apply(SessionOptions {
            auto_release: Some(false),
            ..SessionOptions::default()
        });
        assert_eq!(cfg.custom_key_suffix, "v2");
        assert!(!cfg.auto_release);
    }

    #[test]
    fn apply_merges_hooks_individually() {
        let mut cfg = SessionConfig::default();
        cfg.apply(SessionOptions {
            before_save: Some(Arc::new(|| false)),
            ..SessionOptions::default()
        });
        cfg.apply(SessionOptions {
            after_save: Some(Arc::new(|| {})),
            ..SessionOptions::default()
        });
        assert!(cfg.hooks.before_save.is_some());
        assert!(cfg.hooks.after_save.is_some());
        assert!(cfg.hooks.after_release.is_none());
    }
}
