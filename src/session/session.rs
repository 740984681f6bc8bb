use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, warn};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use url::Url;

use crate::codec::{self, Captured, FieldValue};
use crate::config::{SessionConfig, SessionOptions};
use crate::editor::EditorIntegration;
use crate::errors::VaultError;
use crate::event::PersistEvent;
use crate::form::{self, ControlKind, FieldKind, Form, FormField};
use crate::hooks::Hooks;
use crate::key;
use crate::session::scheduler::Scheduler;
use crate::storage::StorageBackend;

/// Persistence session for one set of target forms.
///
/// Created lazily by the engine's registry and kept for the identity's
/// lifetime. The host forwards field input, field change, submit and reset
/// notifications; the session decides what to persist and when, based on
/// its configuration.
pub struct Session {
    identifier: String,
    backend: Arc<dyn StorageBackend>,
    editor: Option<Arc<dyn EditorIntegration>>,
    runtime: Arc<Runtime>,
    events: broadcast::Sender<PersistEvent>,
    location: Option<Url>,
    config: Mutex<SessionConfig>,
    targets: Mutex<Vec<Arc<dyn Form>>>,
    /// Save triggers were requested for this identity. Survives repeated
    /// `protect()` calls; reset on release so re-rendered forms re-bind.
    started: AtomicBool,
    /// Save triggers are live. Lags `started` while an editor integration
    /// has not reported ready yet.
    armed: AtomicBool,
    scheduler: Scheduler,
    weak: Weak<Session>,
}

impl Session {
    pub(crate) fn new(
        identifier: String,
        backend: Arc<dyn StorageBackend>,
        editor: Option<Arc<dyn EditorIntegration>>,
        runtime: Arc<Runtime>,
        events: broadcast::Sender<PersistEvent>,
        location: Option<Url>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            identifier,
            backend,
            editor,
            runtime,
            events,
            location,
            config: Mutex::new(SessionConfig::default()),
            targets: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            scheduler: Scheduler::new(),
            weak: weak.clone(),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Save triggers were bound for this identity.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Save triggers are live (started, and any editor reported ready).
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Merge options and targets, restore stored data, and bind save
    /// triggers once per identity.
    pub(crate) fn protect(
        &self,
        targets: &[Arc<dyn Form>],
        options: SessionOptions,
    ) -> Result<(), VaultError> {
        self.config.lock().unwrap().apply(options);
        self.merge_targets(targets);

        if !self.backend.is_available() {
            debug!("Session[{}]: storage unavailable, protect is a no-op", self.identifier);
            return Err(VaultError::StorageUnavailable);
        }

        let hooks = self.snapshot_config().hooks;
        if Hooks::allows(&hooks.before_restore) {
            self.restore_all_data();
        }

        if !self.started.swap(true, Ordering::SeqCst) {
            match self.editor.clone() {
                Some(editor) => self.arm_when_editor_ready(editor),
                None => self.arm_save_triggers(),
            }
        }
        Ok(())
    }

    /// A text field received input. Persists just that field right away,
    /// unless a periodic interval is configured, which owns text saves
    /// instead.
    pub fn on_input(&self, form: &dyn Form, field: &dyn FormField) {
        if !self.armed.load(Ordering::SeqCst) {
            return;
        }
        let cfg = self.snapshot_config();
        if !Scheduler::immediate_saves(cfg.timeout) {
            return;
        }
        if !matches!(field.control(), ControlKind::Text | ControlKind::TextArea) {
            return;
        }
        if !form::identified(field) || self.excluded(&cfg, field) {
            return;
        }
        if !Hooks::allows(&cfg.hooks.before_save) {
            return;
        }

        if let Some(editor) = &self.editor {
            if editor.has_editor(field) {
                editor.flush(field);
            }
        }

        let scope = key::session_scope(&cfg, self.location.as_ref());
        let storage_key = key::storage_key(
            &scope,
            &key::form_identity(form),
            &key::field_identity(field),
            cfg.location_based,
            &cfg.custom_key_suffix,
        );
        let value = field.value();
        self.store(&storage_key, &value);
        if !value.is_empty() {
            Hooks::notify(&cfg.hooks.after_save);
            self.publish(PersistEvent::Saved {
                session: self.identifier.clone(),
                fields: 1,
            });
        }
    }

    /// A field's committed value changed (checkbox toggled, select picked,
    /// text blurred). Runs a full save pass: a changed checkbox can affect
    /// grouped-sibling state that only a full pass captures.
    pub fn on_change(&self) {
        if !self.armed.load(Ordering::SeqCst) {
            return;
        }
        self.save_all_data();
    }

    /// A form was submitted; releases its data when `auto_release` is set.
    pub fn on_submit(&self, form: &dyn Form) {
        if self.snapshot_config().auto_release {
            self.release_data(form);
        }
    }

    /// A form was reset; releases its data when `auto_release` is set.
    pub fn on_reset(&self, form: &dyn Form) {
        if self.snapshot_config().auto_release {
            self.release_data(form);
        }
    }

    /// Persist every protectable field of every target form in one batch.
    /// The after-save hook fires once per batch, after all fields.
    pub fn save_all_data(&self) {
        let cfg = self.snapshot_config();
        if !Hooks::allows(&cfg.hooks.before_save) {
            return;
        }

        let scope = key::session_scope(&cfg, self.location.as_ref());
        let mut saved = 0usize;
        for target in self.snapshot_targets() {
            let form_identity = key::form_identity(target.as_ref());
            let mut seen_groups = HashSet::new();
            for field in form::protectable_fields(target.as_ref()) {
                if !form::identified(field.as_ref()) || self.excluded(&cfg, field.as_ref()) {
                    continue;
                }
                let kind = FieldKind::of(field.as_ref());
                if kind == FieldKind::Text {
                    if let Some(editor) = &self.editor {
                        if editor.has_editor(field.as_ref()) {
                            editor.flush(field.as_ref());
                        }
                    }
                }
                let storage_key = key::storage_key(
                    &scope,
                    &form_identity,
                    &key::field_identity(field.as_ref()),
                    cfg.location_based,
                    &cfg.custom_key_suffix,
                );
                match codec::capture(target.as_ref(), field.as_ref(), kind, &mut seen_groups) {
                    Some(Captured::Store(value)) => {
                        self.store(&storage_key, &value.to_stored());
                        saved += 1;
                    }
                    Some(Captured::Clear) => self.discard(&storage_key),
                    None => {}
                }
            }
        }

        Hooks::notify(&cfg.hooks.after_save);
        self.publish(PersistEvent::Saved {
            session: self.identifier.clone(),
            fields: saved,
        });
    }

    /// Put stored data back into every protectable field. The after-restore
    /// hook fires once, and only if at least one field had stored data.
    pub fn restore_all_data(&self) {
        let cfg = self.snapshot_config();
        let scope = key::session_scope(&cfg, self.location.as_ref());
        let mut restored = 0usize;
        for target in self.snapshot_targets() {
            let form_identity = key::form_identity(target.as_ref());
            for field in form::protectable_fields(target.as_ref()) {
                if !form::identified(field.as_ref()) || self.excluded(&cfg, field.as_ref()) {
                    continue;
                }
                let storage_key = key::storage_key(
                    &scope,
                    &form_identity,
                    &key::field_identity(field.as_ref()),
                    cfg.location_based,
                    &cfg.custom_key_suffix,
                );
                if let Some(raw) = self.backend.get(&storage_key) {
                    let kind = FieldKind::of(field.as_ref());
                    let value = FieldValue::from_stored(kind, &raw);
                    codec::apply(target.as_ref(), field.as_ref(), kind, &value);
                    restored += 1;
                }
            }
        }

        if restored > 0 {
            Hooks::notify(&cfg.hooks.after_restore);
            self.publish(PersistEvent::Restored {
                session: self.identifier.clone(),
                fields: restored,
            });
        }
    }

    /// Remove every stored entry of one form and stop the save triggers so
    /// a later `protect()` on this identity re-binds them (dynamically
    /// reloaded forms).
    pub fn release_data(&self, target: &dyn Form) {
        self.scheduler.stop();
        self.started.store(false, Ordering::SeqCst);
        self.armed.store(false, Ordering::SeqCst);

        let cfg = self.snapshot_config();
        let scope = key::session_scope(&cfg, self.location.as_ref());
        let form_identity = key::form_identity(target);
        let mut released = 0usize;
        for field in form::protectable_fields(target) {
            if !form::identified(field.as_ref()) || self.excluded(&cfg, field.as_ref()) {
                continue;
            }
            let storage_key = key::storage_key(
                &scope,
                &form_identity,
                &key::field_identity(field.as_ref()),
                cfg.location_based,
                &cfg.custom_key_suffix,
            );
            self.discard(&storage_key);
            released += 1;
        }

        if released > 0 {
            Hooks::notify(&cfg.hooks.after_release);
            self.publish(PersistEvent::Released {
                session: self.identifier.clone(),
                keys: released,
            });
        }
    }

    /// Release every target form's stored data.
    pub fn manually_release_data(&self) {
        for target in self.snapshot_targets() {
            self.release_data(target.as_ref());
        }
    }

    fn arm_when_editor_ready(&self, editor: Arc<dyn EditorIntegration>) {
        let weak = self.weak.clone();
        self.runtime.spawn(async move {
            let mut ready = editor.ready();
            while !*ready.borrow() {
                if ready.changed().await.is_err() {
                    return; // host dropped the readiness sender before signalling
                }
            }
            if let Some(session) = weak.upgrade() {
                session.arm_save_triggers();
            }
        });
    }

    fn arm_save_triggers(&self) {
        let timeout = self.snapshot_config().timeout;
        if !timeout.is_zero() {
            self.scheduler
                .start_periodic(&self.runtime, timeout, self.weak.clone());
        }
        self.armed.store(true, Ordering::SeqCst);
        debug!("Session[{}]: save triggers armed", self.identifier);
    }

    fn merge_targets(&self, incoming: &[Arc<dyn Form>]) {
        let mut targets = self.targets.lock().unwrap();
        for form in incoming {
            let identity = key::form_identity(form.as_ref());
            let known = targets
                .iter()
                .any(|existing| key::form_identity(existing.as_ref()) == identity);
            if !known {
                targets.push(form.clone());
            }
        }
    }

    fn excluded(&self, cfg: &SessionConfig, field: &dyn FormField) -> bool {
        if cfg.exclude_fields.is_empty() {
            return false;
        }
        let id = field.id();
        let name = field.name();
        cfg.exclude_fields.iter().any(|entry| {
            id.as_deref() == Some(entry.as_str()) || name.as_deref() == Some(entry.as_str())
        })
    }

    // Best-effort writes: a failed set/remove is logged and absorbed, the
    // next trigger writes again.
    fn store(&self, storage_key: &str, value: &str) {
        if let Err(err) = self.backend.set(storage_key, value) {
            warn!("Session[{}]: dropped write for key {}: {}", self.identifier, storage_key, err);
        }
    }

    fn discard(&self, storage_key: &str) {
        if let Err(err) = self.backend.remove(storage_key) {
            warn!("Session[{}]: cannot remove key {}: {}", self.identifier, storage_key, err);
        }
    }

    fn publish(&self, event: PersistEvent) {
        // send() fails only when nobody subscribed; that is fine.
        let _ = self.events.send(event);
    }

    fn snapshot_config(&self) -> SessionConfig {
        self.config.lock().unwrap().clone()
    }

    fn snapshot_targets(&self) -> Vec<Arc<dyn Form>> {
        self.targets.lock().unwrap().clone()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::session_over;
    use super::*;
    use crate::form::memory::{MemoryField, MemoryForm};
    use crate::storage::InMemoryBackend;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::watch;

    fn text_form(id: &str, field_name: &str, value: &str) -> (Arc<MemoryForm>, Arc<MemoryField>) {
        let field = MemoryField::new(ControlKind::Text)
            .with_name(field_name)
            .with_value(value)
            .shared();
        let form = MemoryForm::new().with_id(id).field(field.clone()).shared();
        (form, field)
    }

    fn targets(form: &Arc<MemoryForm>) -> Vec<Arc<dyn Form>> {
        vec![form.clone() as Arc<dyn Form>]
    }

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn Fn() + Send + Sync>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = hits.clone();
        let hook: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        (hits, hook)
    }

    #[test]
    fn change_event_persists_and_reload_restores() {
        init_logs();
        let backend = Arc::new(InMemoryBackend::new());

        // form id="f", one text input name="q" containing "hello"
        let (form, _field) = text_form("f", "q", "hello");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session.protect(&targets(&form), SessionOptions::default()).unwrap();
        session.on_change();
        assert_eq!(
            backend.get("[id=f][name=][id=][name=q]").as_deref(),
            Some("hello")
        );

        // reload: a fresh, empty rendering of the same form
        let (reloaded, field) = text_form("f", "q", "");
        let (restores, after_restore) = counter();
        let session = session_over("[id=f][name=]", backend, None);
        session
            .protect(
                &targets(&reloaded),
                SessionOptions {
                    after_restore: Some(after_restore),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        assert_eq!(field.value(), "hello");
        assert_eq!(restores.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn save_pass_notifies_once_for_many_fields() {
        let backend = Arc::new(InMemoryBackend::new());
        let form = MemoryForm::new()
            .with_id("f")
            .field(MemoryField::new(ControlKind::Text).with_name("a").with_value("1").shared())
            .field(MemoryField::new(ControlKind::Text).with_name("b").with_value("2").shared())
            .field(MemoryField::new(ControlKind::Text).with_name("c").with_value("3").shared())
            .shared();

        let (saves, after_save) = counter();
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    after_save: Some(after_save),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        session.save_all_data();
        assert_eq!(saves.load(Ordering::SeqCst), 1);
        assert_eq!(backend.len(), 3);
    }

    #[test]
    fn before_save_veto_blocks_the_pass() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "draft");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    before_save: Some(Arc::new(|| false)),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        session.save_all_data();
        assert!(backend.is_empty());
    }

    #[test]
    fn before_restore_veto_skips_restore() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set("[id=f][name=][id=][name=q]", "stored").unwrap();

        let (form, field) = text_form("f", "q", "");
        let session = session_over("[id=f][name=]", backend, None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    before_restore: Some(Arc::new(|| false)),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        assert_eq!(field.value(), "");
    }

    #[test]
    fn after_restore_requires_stored_data() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "");
        let (restores, after_restore) = counter();
        let session = session_over("[id=f][name=]", backend, None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    after_restore: Some(after_restore),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        assert_eq!(restores.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn excluded_fields_never_touch_storage() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .set("[id=f][name=][id=][name=secret]", "stored")
            .unwrap();

        let kept = MemoryField::new(ControlKind::Text).with_name("q").with_value("keep").shared();
        let skipped = MemoryField::new(ControlKind::Text)
            .with_name("secret")
            .with_value("fresh")
            .shared();
        let form = MemoryForm::new()
            .with_id("f")
            .field(kept.clone())
            .field(skipped.clone())
            .shared();

        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    exclude_fields: Some(vec!["secret".into()]),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        // not restored
        assert_eq!(skipped.value(), "fresh");

        // not saved
        session.save_all_data();
        assert_eq!(backend.get("[id=f][name=][id=][name=q]").as_deref(), Some("keep"));
        assert_eq!(
            backend.get("[id=f][name=][id=][name=secret]").as_deref(),
            Some("stored") // untouched seed, not overwritten
        );
    }

    #[test]
    fn unidentified_fields_are_skipped() {
        let backend = Arc::new(InMemoryBackend::new());
        let anonymous = MemoryField::new(ControlKind::Text).with_value("lost").shared();
        let form = MemoryForm::new().with_id("f").field(anonymous).shared();

        let session = session_over("[id=f][name=]", backend.clone(), None);
        session.protect(&targets(&form), SessionOptions::default()).unwrap();
        session.save_all_data();
        assert!(backend.is_empty());
    }

    #[test]
    fn unchecked_radio_group_leaves_no_key() {
        let backend = Arc::new(InMemoryBackend::new());
        // stale entry from an earlier save
        backend.set("[id=f][name=][id=][name=plan]", "basic").unwrap();

        let basic = MemoryField::new(ControlKind::Radio)
            .with_name("plan")
            .with_value("basic")
            .shared();
        let pro = MemoryField::new(ControlKind::Radio)
            .with_name("plan")
            .with_value("pro")
            .shared();
        let form = MemoryForm::new().with_id("f").field(basic).field(pro).shared();

        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    // keep the stale entry from being restored first
                    before_restore: Some(Arc::new(|| false)),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.save_all_data();
        assert!(backend.get("[id=f][name=][id=][name=plan]").is_none());
    }

    #[test]
    fn checkbox_group_saves_one_entry_per_group() {
        let backend = Arc::new(InMemoryBackend::new());
        let form = MemoryForm::new()
            .with_id("f")
            .field(
                MemoryField::new(ControlKind::Checkbox)
                    .with_name("tags[]")
                    .with_value("x")
                    .with_checked(true)
                    .shared(),
            )
            .field(
                MemoryField::new(ControlKind::Checkbox)
                    .with_name("tags[]")
                    .with_value("y")
                    .with_checked(true)
                    .shared(),
            )
            .shared();

        let session = session_over("[id=f][name=]", backend.clone(), None);
        session.protect(&targets(&form), SessionOptions::default()).unwrap();
        session.save_all_data();

        assert_eq!(backend.len(), 1);
        assert_eq!(
            backend.get("[id=f][name=][id=][name=tags[]]").as_deref(),
            Some("x,y")
        );
    }

    #[test]
    fn release_clears_keys_and_resets_started() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "draft");
        let (releases, after_release) = counter();
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    after_release: Some(after_release),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.save_all_data();
        assert_eq!(backend.len(), 1);
        assert!(session.is_started());

        session.manually_release_data();
        assert!(backend.is_empty());
        assert!(!session.is_started());
        assert!(!session.is_armed());
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // a re-rendered form re-binds on the next protect
        session.protect(&targets(&form), SessionOptions::default()).unwrap();
        assert!(session.is_started());
        assert!(session.is_armed());
    }

    #[test]
    fn submit_releases_only_with_auto_release() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "draft");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    auto_release: Some(false),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.save_all_data();

        session.on_submit(form.as_ref() as &dyn Form);
        assert_eq!(backend.len(), 1); // auto-release off: data stays

        session
            .protect(
                &targets(&form),
                SessionOptions {
                    auto_release: Some(true),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.on_submit(form.as_ref() as &dyn Form);
        assert!(backend.is_empty());
    }

    #[test]
    fn repeated_protect_reuses_binding() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "draft");
        let (saves, after_save) = counter();
        let session = session_over("[id=f][name=]", backend, None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    after_save: Some(after_save),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.protect(&targets(&form), SessionOptions::default()).unwrap();
        assert!(session.is_started());

        // one change event still yields exactly one save notification
        session.on_change();
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn later_options_shallow_merge() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "draft");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session.protect(&targets(&form), SessionOptions::default()).unwrap();
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    custom_key_suffix: Some("#2".into()),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        session.save_all_data();
        assert_eq!(
            backend.get("[id=f][name=][id=][name=q]#2").as_deref(),
            Some("draft")
        );
    }

    #[test]
    fn input_saves_immediately_without_timeout() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, field) = text_form("f", "q", "h");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session.protect(&targets(&form), SessionOptions::default()).unwrap();

        session.on_input(form.as_ref() as &dyn Form, field.as_ref() as &dyn FormField);
        assert_eq!(backend.get("[id=f][name=][id=][name=q]").as_deref(), Some("h"));
    }

    #[test]
    fn empty_value_immediate_save_skips_after_save() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, field) = text_form("f", "q", "");
        let (saves, after_save) = counter();
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    after_save: Some(after_save),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        session.on_input(form.as_ref() as &dyn Form, field.as_ref() as &dyn FormField);
        assert_eq!(backend.get("[id=f][name=][id=][name=q]").as_deref(), Some(""));
        assert_eq!(saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn configured_timeout_suppresses_immediate_saves() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, field) = text_form("f", "q", "h");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    timeout: Some(Duration::from_secs(3600)),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        session.on_input(form.as_ref() as &dyn Form, field.as_ref() as &dyn FormField);
        assert!(backend.is_empty());
        assert!(session.scheduler.is_running());
    }

    #[test]
    fn periodic_snapshot_writes_and_release_stops_it() {
        let backend = Arc::new(InMemoryBackend::new());
        let (form, _field) = text_form("f", "q", "tick");
        let session = session_over("[id=f][name=]", backend.clone(), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    timeout: Some(Duration::from_millis(50)),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        // several ticks in, the snapshot must have been written; 380ms also
        // lands well clear of a tick boundary before releasing below
        std::thread::sleep(Duration::from_millis(380));
        assert_eq!(
            backend.get("[id=f][name=][id=][name=q]").as_deref(),
            Some("tick")
        );

        session.manually_release_data();
        assert!(!session.scheduler.is_running());
        assert!(backend.is_empty());

        // no further writes once released
        std::thread::sleep(Duration::from_millis(180));
        assert!(backend.is_empty());
    }

    #[test]
    fn write_failures_are_absorbed() {
        init_logs();
        struct BrokenBackend;
        impl StorageBackend for BrokenBackend {
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
                anyhow::bail!("quota exceeded")
            }
            fn remove(&self, _key: &str) -> anyhow::Result<()> {
                anyhow::bail!("backend gone")
            }
            fn len(&self) -> usize {
                0
            }
            fn keys(&self) -> Vec<String> {
                Vec::new()
            }
        }

        let (form, _field) = text_form("f", "q", "draft");
        let (saves, after_save) = counter();
        let session = session_over("[id=f][name=]", Arc::new(BrokenBackend), None);
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    after_save: Some(after_save),
                    ..SessionOptions::default()
                },
            )
            .unwrap();

        // the pass completes and still notifies once
        session.save_all_data();
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn protect_fails_when_backend_unavailable() {
        struct DisabledBackend;
        impl StorageBackend for DisabledBackend {
            fn is_available(&self) -> bool {
                false
            }
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
                Ok(())
            }
            fn remove(&self, _key: &str) -> anyhow::Result<()> {
                Ok(())
            }
            fn len(&self) -> usize {
                0
            }
            fn keys(&self) -> Vec<String> {
                Vec::new()
            }
        }

        let (form, _field) = text_form("f", "q", "draft");
        let session = session_over("[id=f][name=]", Arc::new(DisabledBackend), None);
        let outcome = session.protect(&targets(&form), SessionOptions::default());
        assert!(matches!(outcome, Err(VaultError::StorageUnavailable)));
        assert!(!session.is_started());
    }

    #[test]
    fn location_scoping_prefixes_keys() {
        let backend = Arc::new(InMemoryBackend::new());
        let (events, _unused) = broadcast::channel(16);
        let (form, _field) = text_form("f", "q", "hi");
        let session = Session::new(
            "[id=f][name=]".into(),
            backend.clone(),
            None,
            super::test_support::test_runtime(),
            events,
            Some(Url::parse("https://app.test/checkout?step=2").unwrap()),
        );

        session
            .protect(
                &targets(&form),
                SessionOptions {
                    location_based: Some(true),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.save_all_data();
        assert_eq!(
            backend
                .get("app.test/checkout?step=2[id=f][name=][id=][name=q]")
                .as_deref(),
            Some("hi")
        );

        // a logical name overrides the location-derived scope
        session
            .protect(
                &targets(&form),
                SessionOptions {
                    name: Some("wizard".into()),
                    ..SessionOptions::default()
                },
            )
            .unwrap();
        session.save_all_data();
        assert_eq!(
            backend.get("wizard[id=f][name=][id=][name=q]").as_deref(),
            Some("hi")
        );
    }

    struct FakeEditor {
        ready_tx: watch::Sender<bool>,
    }

    impl EditorIntegration for FakeEditor {
        fn has_editor(&self, field: &dyn FormField) -> bool {
            field.name().as_deref() == Some("body")
        }
        fn flush(&self, field: &dyn FormField) {
            field.set_value("flushed text");
        }
        fn ready(&self) -> watch::Receiver<bool> {
            self.ready_tx.subscribe()
        }
    }

    #[test]
    fn editor_defers_arming_until_ready() {
        let backend = Arc::new(InMemoryBackend::new());
        let (ready_tx, _ready_rx) = watch::channel(false);
        let editor = Arc::new(FakeEditor { ready_tx });

        let (form, _field) = text_form("f", "body", "typed");
        let session = session_over("[id=f][name=]", backend.clone(), Some(editor.clone()));
        session.protect(&targets(&form), SessionOptions::default()).unwrap();

        // not armed yet: change events are ignored
        session.on_change();
        assert!(backend.is_empty());
        assert!(session.is_started());
        assert!(!session.is_armed());

        editor.ready_tx.send(true).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert!(session.is_armed());

        // the editor buffer is flushed into the field before reading
        session.on_change();
        assert_eq!(
            backend.get("[id=f][name=][id=][name=body]").as_deref(),
            Some("flushed text")
        );
    }
}
