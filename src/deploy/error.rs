// ABOUTME: Error types for deploy and rollback steps.
// ABOUTME: Step errors are wrapped with the stage they occurred in using snafu.

use snafu::Snafu;
use std::path::PathBuf;

use crate::exec::ExecError;
use crate::release::StoreError;

use super::state::Stage;
use super::switch::LinkError;

/// Errors raised by a single lifecycle step.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Missing or invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Config,
    Io,
    Execution,
    Timeout,
    NonZeroExit,
    NoRelease,
    NoPreviousRelease,
    Collision,
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Config(_) => DeployErrorKind::Config,
            DeployError::Io { .. } | DeployError::Link(_) => DeployErrorKind::Io,
            DeployError::Store(e) => match e {
                StoreError::Io { .. } => DeployErrorKind::Io,
                StoreError::NoRelease { .. } => DeployErrorKind::NoRelease,
                StoreError::NoPreviousRelease { .. } => DeployErrorKind::NoPreviousRelease,
                StoreError::Collision { .. } => DeployErrorKind::Collision,
            },
            DeployError::Exec(e) => match e {
                ExecError::Spawn { .. } | ExecError::Wait { .. } => DeployErrorKind::Execution,
                ExecError::Timeout { .. } => DeployErrorKind::Timeout,
                ExecError::NonZeroExit { .. } => DeployErrorKind::NonZeroExit,
            },
        }
    }
}

/// A lifecycle run that stopped at `stage`.
///
/// Nothing done before the failed stage is undone.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LifecycleError {
    #[snafu(display("{stage} failed: {source}"))]
    Stage { stage: Stage, source: DeployError },
}

impl LifecycleError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            LifecycleError::Stage { stage, .. } => *stage,
        }
    }

    /// The underlying step error.
    pub fn cause(&self) -> &DeployError {
        match self {
            LifecycleError::Stage { source, .. } => source,
        }
    }

    pub fn kind(&self) -> DeployErrorKind {
        self.cause().kind()
    }
}
