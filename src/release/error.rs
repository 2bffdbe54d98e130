// ABOUTME: Error types for release directory operations.
// ABOUTME: Covers filesystem failures and release-count preconditions.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ReleaseName;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no release found in {}", root.display())]
    NoRelease { root: PathBuf },

    #[error("no previous release to roll back to ({count} release(s) present)")]
    NoPreviousRelease { count: usize },

    #[error("release {name} already exists")]
    Collision { name: ReleaseName },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
