//! Storage backends for persisted form data.
//!
//! This module defines the trait and implementations behind the engine's
//! key/value persistence. The engine only ever sees [`StorageBackend`]: a
//! flat string-keyed store with best-effort writes.
//!
//! # Contract
//!
//! - `get` returns `None` for an absent key, never an error.
//! - `set` and `remove` may fail (quota, I/O); the session layer absorbs
//!   such failures and logs them. Losing one save is preferable to failing
//!   the caller, and the next trigger writes again anyway.
//! - `is_available` lets a backend report that it cannot serve at all
//!   (disabled browser storage, unreachable file); `protect()` then degrades
//!   to a no-op.
//!
//! # Available types
//!
//! - [`StorageBackend`] — trait for any backend.
//! - [`InMemoryBackend`] — `HashMap`-backed, no persistence. Default for
//!   tests and incognito-style embedders.
//! - [`SqliteBackend`] — pooled SQLite store (`sqlite_backend` feature).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use formvault::storage::{InMemoryBackend, StorageBackend};
//!
//! let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
//! backend.set("draft", "hello").unwrap();
//! assert_eq!(backend.get("draft").as_deref(), Some("hello"));
//! ```

use anyhow::Result;

/// In-memory backend.
pub mod in_memory;
/// SQLite-backed persistent backend.
#[cfg(feature = "sqlite_backend")]
pub mod sqlite;

pub use in_memory::InMemoryBackend;
#[cfg(feature = "sqlite_backend")]
pub use sqlite::SqliteBackend;

/// Object-safe key/value store for persisted field data.
pub trait StorageBackend: Send + Sync {
    /// Whether the backend can serve reads and writes at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Retrieves the value for the given key, or `None` if not found.
    fn get(&self, key: &str) -> Option<String>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the entry with the given key. Removing an absent key is not
    /// an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Returns all stored keys, sorted for deterministic inspection.
    fn keys(&self) -> Vec<String>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
