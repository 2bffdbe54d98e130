// ABOUTME: Atomic replacement of the `current` release symlink.
// ABOUTME: Creates a temporary link and renames it over the old one; never remove-then-create.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::CURRENT_LINK;
use crate::release::Release;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link target is missing or not a directory: {}", .0.display())]
    TargetMissing(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LinkError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LinkError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Owns the `current` symlink of one deployment root.
#[derive(Debug, Clone)]
pub struct SymlinkSwitcher {
    link: PathBuf,
}

impl SymlinkSwitcher {
    /// Switcher for `<root>/current`.
    pub fn new(root: &Path) -> Self {
        Self {
            link: root.join(CURRENT_LINK),
        }
    }

    pub fn link_path(&self) -> &Path {
        &self.link
    }

    /// Where `current` points, or `None` before the first deploy.
    pub async fn target(&self) -> Result<Option<PathBuf>, LinkError> {
        match tokio::fs::read_link(&self.link).await {
            Ok(target) => Ok(Some(target)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LinkError::io(&self.link, e)),
        }
    }

    /// Point `current` at `release`.
    ///
    /// Observers see either the old target or the new one, never a missing
    /// link. On failure the existing link is left as it was.
    pub async fn point_to(&self, release: &Release) -> Result<(), LinkError> {
        let target = release.path();

        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(LinkError::TargetMissing(target.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LinkError::TargetMissing(target.to_path_buf()));
            }
            Err(e) => return Err(LinkError::io(target, e)),
        }

        let staging = self.staging_path();
        tokio::fs::symlink(target, &staging)
            .await
            .map_err(|e| LinkError::io(&staging, e))?;

        if let Err(e) = tokio::fs::rename(&staging, &self.link).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                tracing::warn!(
                    path = %staging.display(),
                    error = %cleanup,
                    "failed to remove staging link"
                );
            }
            return Err(LinkError::io(&self.link, e));
        }

        tracing::info!(
            link = %self.link.display(),
            target = %target.display(),
            "switched current release"
        );
        Ok(())
    }

    /// Sibling of the link, unique per process and call.
    fn staging_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let name = format!(".{}.{}.{}.tmp", CURRENT_LINK, std::process::id(), nanos);
        match self.link.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}
