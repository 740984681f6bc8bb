//! Session system: [`SessionRegistry`], [`Session`], and the save-trigger
//! [`Scheduler`].
//!
//! One session exists per distinct set of target forms (keyed by their
//! joined identities) and owns that set's configuration, save/restore
//! passes, release handling and periodic snapshot task. The registry is an
//! explicit object owned by the engine, not hidden module state, so tests
//! can reset it.

pub mod registry;
pub mod scheduler;
#[allow(clippy::module_inception)]
pub mod session;

pub use registry::SessionRegistry;
pub use scheduler::Scheduler;
pub use session::Session;
