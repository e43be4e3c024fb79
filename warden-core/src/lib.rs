//! The sandboxed tool server's security policy engine and tool
//! implementations: policy loading, sandbox path confinement, an
//! append-only audit log, argument denial, danger classification, the
//! two-stage confirmation state machine, a never-through-a-shell process
//! runner, and the user-facing tools built on top of them.

pub mod audit;
pub mod confirm;
pub mod danger;
pub mod guard;
pub mod path_resolver;
pub mod policy;
pub mod procrunner;
pub mod tools;

pub use audit::AuditSink;
pub use confirm::ConfirmationStore;
pub use policy::Policy;

pub use warden_protocol::{WardenError, Result};
