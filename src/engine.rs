//! The [`FormVault`] engine: entry point owning the session registry,
//! storage backend, optional editor integration and the persistence event
//! bus.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::broadcast;

use crate::config::{EngineConfig, SessionOptions};
use crate::editor::EditorIntegration;
use crate::errors::VaultError;
use crate::event::PersistEvent;
use crate::form::Form;
use crate::key;
use crate::session::{Session, SessionRegistry};
use crate::storage::StorageBackend;

/// Top-level persistence engine.
///
/// One engine per embedding host. `protect()` hands out sessions keyed by
/// the joined identity of the targeted forms; repeated calls for the same
/// identity return the same session and never bind save triggers twice.
pub struct FormVault {
    config: EngineConfig,
    backend: Arc<dyn StorageBackend>,
    editor: Option<Arc<dyn EditorIntegration>>,
    registry: SessionRegistry,
    events: broadcast::Sender<PersistEvent>,
    /// Runtime driving periodic save tasks and editor readiness waits. All
    /// sessions share it.
    runtime: Arc<Runtime>,
}

impl FormVault {
    /// Create a new engine over the given backend.
    ///
    /// If `config` is `None`, [`EngineConfig::default`] is used.
    pub fn new(config: Option<EngineConfig>, backend: Arc<dyn StorageBackend>) -> Self {
        let config = config.unwrap_or_default();
        let (events, _first_rx) = broadcast::channel(config.channel_capacity);
        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_time()
                .build()
                .expect("Failed to create Tokio runtime"),
        );

        Self {
            config,
            backend,
            editor: None,
            registry: SessionRegistry::new(),
            events,
            runtime,
        }
    }

    /// Attach a rich-text editor integration. Sessions defer arming save
    /// triggers until its readiness signal resolves.
    pub fn with_editor(mut self, editor: Arc<dyn EditorIntegration>) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Protect `targets`: restore their stored data now and persist future
    /// edits per `options`.
    ///
    /// Returns the session handle, or `Err(StorageUnavailable)` when the
    /// backend cannot serve; nothing is bound in that case.
    /// Calling again with the same target identity reuses the session
    /// (options shallow-merge into its configuration).
    pub fn protect(
        &self,
        targets: &[Arc<dyn Form>],
        options: SessionOptions,
    ) -> Result<Arc<Session>, VaultError> {
        let identifier = key::session_identifier(targets);
        let session = self.registry.obtain(&identifier, || {
            Session::new(
                identifier.clone(),
                self.backend.clone(),
                self.editor.clone(),
                self.runtime.clone(),
                self.events.clone(),
                self.config.location.clone(),
            )
        });
        session.protect(targets, options)?;
        Ok(session)
    }

    /// Look up a live session by its identifier.
    pub fn session(&self, identifier: &str) -> Option<Arc<Session>> {
        self.registry.get(identifier)
    }

    /// Drop every session. Mainly for test isolation.
    pub fn free(&self) {
        self.registry.free();
    }

    /// Subscribe to persistence notifications (saved/restored/released).
    pub fn subscribe(&self) -> broadcast::Receiver<PersistEvent> {
        self.events.subscribe()
    }
}
