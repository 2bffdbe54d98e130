// ABOUTME: Filesystem-backed release store: list, create, delete.
// ABOUTME: Ordering relies on release names increasing with creation time.

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::types::ReleaseName;

use super::error::StoreError;
use super::set::{Release, ReleaseSet};

/// Release directories under a single releases root.
#[derive(Debug, Clone)]
pub struct ReleaseStore {
    root: PathBuf,
}

impl ReleaseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List release directories, newest first.
    ///
    /// Dot-entries, plain files, and symlinks are skipped. Listing has no side
    /// effects, so it is safe to repeat after an interrupted run.
    pub async fn list(&self) -> Result<ReleaseSet, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;

        let mut releases = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            let file_name = entry.file_name();
            let Some(raw) = file_name.to_str() else {
                tracing::debug!(entry = ?file_name, "skipping non-UTF-8 entry");
                continue;
            };
            if raw.starts_with('.') {
                continue;
            }

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io(entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }

            let name = match ReleaseName::new(raw) {
                Ok(name) => name,
                Err(e) => {
                    tracing::debug!(
                        entry = raw,
                        error = %e,
                        "skipping entry with invalid release name"
                    );
                    continue;
                }
            };

            let created_at = match name.timestamp() {
                Some(at) => Some(at),
                None => modified_at(&entry).await,
            };

            releases.push(Release::new(name, entry.path(), created_at));
        }

        Ok(ReleaseSet::new(&self.root, releases))
    }

    /// The newest release.
    pub async fn current(&self) -> Result<Release, StoreError> {
        self.list().await?.current().cloned()
    }

    /// The second-newest release.
    pub async fn previous(&self) -> Result<Release, StoreError> {
        self.list().await?.previous().cloned()
    }

    /// Create a release directory named after the current time.
    pub async fn create(&self) -> Result<Release, StoreError> {
        self.create_at(Utc::now()).await
    }

    /// Create a release directory named after `at`.
    ///
    /// Fails with [`StoreError::Collision`] when a directory with that name
    /// already exists; callers may retry with a later timestamp.
    pub async fn create_at(&self, at: DateTime<Utc>) -> Result<Release, StoreError> {
        let name = ReleaseName::from_timestamp(at);
        self.create_named(name, Some(at)).await
    }

    async fn create_named(
        &self,
        name: ReleaseName,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Release, StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;

        let path = self.root.join(name.as_str());
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                tracing::info!(
                    release = %name,
                    path = %path.display(),
                    "created release directory"
                );
                Ok(Release::new(name, path, created_at))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Collision { name }),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Recursively delete a release directory.
    ///
    /// A directory that is already gone counts as deleted. Anything else that
    /// stops the removal, permissions included, is an error and may leave a
    /// partially deleted directory behind.
    pub async fn delete(&self, release: &Release) -> Result<(), StoreError> {
        match tokio::fs::remove_dir_all(release.path()).await {
            Ok(()) => {
                tracing::info!(release = %release.name(), "deleted release");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(release = %release.name(), "release already removed");
                Ok(())
            }
            Err(e) => Err(StoreError::io(release.path(), e)),
        }
    }
}

async fn modified_at(entry: &tokio::fs::DirEntry) -> Option<DateTime<Utc>> {
    let metadata = entry.metadata().await.ok()?;
    let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(DateTime::<Utc>::from(time))
}
