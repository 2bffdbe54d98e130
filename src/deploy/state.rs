// ABOUTME: Lifecycle stages and the type state markers for deploy and rollback.
// ABOUTME: Zero-sized markers enforce valid transition order at compile time.

use std::fmt;

use crate::config::PermissionPhase;

/// A step of the deploy or rollback state machine, as reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preparing,
    Linking,
    FixingPermissions(PermissionPhase),
    Switching,
    Cleaning,
    LocatingReleases,
    SwitchingBack,
    Deleting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Preparing => write!(f, "preparing release"),
            Stage::Linking => write!(f, "linking shared paths"),
            Stage::FixingPermissions(phase) => write!(f, "fixing permissions ({phase})"),
            Stage::Switching => write!(f, "switching current release"),
            Stage::Cleaning => write!(f, "cleaning old releases"),
            Stage::LocatingReleases => write!(f, "locating releases"),
            Stage::SwitchingBack => write!(f, "switching back to previous release"),
            Stage::Deleting => write!(f, "deleting rolled-back release"),
            Stage::Done => write!(f, "done"),
        }
    }
}

// Deploy markers

/// Release directory created and populated.
/// Available actions: `link_shared()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Prepared;

/// Shared paths linked into the release.
/// Available actions: `fix_permissions_pre()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Linked;

/// Pre-switch permission rules applied.
/// Available actions: `switch()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionsPrepared;

/// `current` points at the new release.
/// Available actions: `fix_permissions_post()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Switched;

/// Post-switch permission rules applied.
/// Available actions: `clean()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionsFinalized;

/// Old releases and configured removals deleted.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;

// Rollback markers

/// Doomed and target releases identified.
/// Available actions: `switch_back()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Located;

/// `current` points at the rollback target.
/// Available actions: `delete_doomed()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchedBack;

/// Rolled-back release deleted.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct RolledBack;
