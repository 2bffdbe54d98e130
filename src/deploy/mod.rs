// ABOUTME: Release lifecycle orchestration using the type state pattern.
// ABOUTME: Exports the switcher, lock, state markers, and the deploy/rollback orchestrator.

mod deployment;
mod error;
mod lifecycle;
mod lock;
mod rollback;
mod source;
mod state;
mod switch;
mod transitions;

pub use deployment::{Deployment, Rollback, RollbackOutcome, StepContext};
pub use error::{DeployError, DeployErrorKind, LifecycleError, StageSnafu};
pub use lifecycle::ReleaseLifecycle;
pub use lock::{DeployLock, LockError, LockInfo};
pub use source::{DirectorySource, GitSource, ReleaseSource};
pub use state::{
    Completed, Linked, Located, PermissionsFinalized, PermissionsPrepared, Prepared, RolledBack,
    Stage, Switched, SwitchedBack,
};
pub use switch::{LinkError, SymlinkSwitcher};
