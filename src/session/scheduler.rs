use std::sync::{Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::session::session::Session;

/// Decides which save triggers are active for a configuration and owns the
/// periodic snapshot task of one session.
///
/// The task is cancellable: release and teardown abort it instead of
/// leaking a timer across protect/release cycles.
pub struct Scheduler {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }

    /// Immediate per-input saves and the periodic snapshot are mutually
    /// exclusive: a configured interval suppresses per-keystroke writes.
    pub fn immediate_saves(timeout: Duration) -> bool {
        timeout.is_zero()
    }

    /// Start the recurring snapshot task, replacing a running one. The task
    /// runs a full save pass every `period` and ends on its own once the
    /// session is gone.
    pub(crate) fn start_periodic(
        &self,
        runtime: &Runtime,
        period: Duration,
        session: Weak<Session>,
    ) {
        self.stop();
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // the first tick resolves immediately
            loop {
                ticker.tick().await;
                match session.upgrade() {
                    Some(session) => session.save_all_data(),
                    None => break,
                }
            }
        });
        *self.task.lock().unwrap() = Some(handle);
    }

    /// Abort the recurring task, if one was started.
    pub(crate) fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }

    /// True when a periodic task has been started and not stopped.
    pub fn is_running(&self) -> bool {
        self.task.lock().unwrap().is_some()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
