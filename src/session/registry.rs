use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::session::session::Session;

/// Process-wide map of session identifier to live session.
///
/// Owned by the engine; sessions are created lazily on first request for an
/// identifier and live until [`SessionRegistry::free`] resets the map.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `identifier`, creating it with `create` on
    /// first request. Re-entrant calls for the same identifier always yield
    /// the same session.
    pub fn obtain(
        &self,
        identifier: &str,
        create: impl FnOnce() -> Arc<Session>,
    ) -> Arc<Session> {
        self.sessions
            .lock()
            .unwrap()
            .entry(identifier.to_string())
            .or_insert_with(create)
            .clone()
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(identifier).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every session. Periodic save tasks die with their sessions.
    pub fn free(&self) {
        self.sessions.lock().unwrap().clear();
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session::test_support::bare_session;

    #[test]
    fn obtain_creates_once_and_reuses() {
        let registry = SessionRegistry::new();
        let first = registry.obtain("[id=f][name=]", || bare_session("[id=f][name=]"));
        let second = registry.obtain("[id=f][name=]", || bare_session("[id=f][name=]"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_identifiers_get_distinct_sessions() {
        let registry = SessionRegistry::new();
        let a = registry.obtain("[id=a][name=]", || bare_session("[id=a][name=]"));
        let b = registry.obtain("[id=b][name=]", || bare_session("[id=b][name=]"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn free_resets_the_map() {
        let registry = SessionRegistry::new();
        let before = registry.obtain("[id=f][name=]", || bare_session("[id=f][name=]"));
        registry.free();
        assert!(registry.is_empty());

        let after = registry.obtain("[id=f][name=]", || bare_session("[id=f][name=]"));
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
