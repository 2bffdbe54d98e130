// ABOUTME: Release and ReleaseSet value types.
// ABOUTME: A set is ordered newest first by release name.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::types::ReleaseName;

use super::error::StoreError;

/// One deployed snapshot: a directory under the releases root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    name: ReleaseName,
    path: PathBuf,
    created_at: Option<DateTime<Utc>>,
}

impl Release {
    pub fn new(name: ReleaseName, path: PathBuf, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            name,
            path,
            created_at,
        }
    }

    pub fn name(&self) -> &ReleaseName {
        &self.name
    }

    /// Absolute directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creation time from the name, or from filesystem metadata as a fallback.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Releases ordered descending by name. Index 0 is the newest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSet {
    releases: Vec<Release>,
    root: PathBuf,
}

impl ReleaseSet {
    /// Build a set, sorting newest first.
    pub fn new(root: impl Into<PathBuf>, mut releases: Vec<Release>) -> Self {
        releases.sort_by(|a, b| b.name.cmp(&a.name));
        Self {
            releases,
            root: root.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Release> {
        self.releases.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Release> {
        self.releases.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.releases.iter().map(|r| r.name.as_str()).collect()
    }

    /// Look up a release by its directory path.
    pub fn find_by_path(&self, path: &Path) -> Option<&Release> {
        self.releases.iter().find(|r| r.path == path)
    }

    /// The newest release.
    ///
    /// This is what `current` points at once a deploy has switched; during a
    /// deploy the newest release may not be linked yet.
    pub fn current(&self) -> Result<&Release, StoreError> {
        self.releases.first().ok_or_else(|| StoreError::NoRelease {
            root: self.root.clone(),
        })
    }

    /// The second-newest release, the rollback target.
    pub fn previous(&self) -> Result<&Release, StoreError> {
        self.releases
            .get(1)
            .ok_or(StoreError::NoPreviousRelease {
                count: self.releases.len(),
            })
    }

    /// Releases past the `keep` newest ones, oldest last.
    pub fn beyond(&self, keep: usize) -> &[Release] {
        self.releases.get(keep..).unwrap_or(&[])
    }
}

impl<'a> IntoIterator for &'a ReleaseSet {
    type Item = &'a Release;
    type IntoIter = std::slice::Iter<'a, Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.releases.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(name: &str) -> Release {
        let name = ReleaseName::new(name).unwrap();
        let path = PathBuf::from("/srv/app/releases").join(name.as_str());
        let created_at = name.timestamp();
        Release::new(name, path, created_at)
    }

    #[test]
    fn sorts_newest_first() {
        let set = ReleaseSet::new(
            "/srv/app/releases",
            vec![
                release("20240102000000"),
                release("20240103000000"),
                release("20240101000000"),
            ],
        );
        assert_eq!(
            set.names(),
            vec!["20240103000000", "20240102000000", "20240101000000"]
        );
        assert_eq!(set.current().unwrap().name().as_str(), "20240103000000");
        assert_eq!(set.previous().unwrap().name().as_str(), "20240102000000");
    }

    #[test]
    fn empty_set_has_no_current() {
        let set = ReleaseSet::new("/srv/app/releases", vec![]);
        assert!(matches!(set.current(), Err(StoreError::NoRelease { .. })));
    }

    #[test]
    fn single_release_has_no_previous() {
        let set = ReleaseSet::new("/srv/app/releases", vec![release("20240101000000")]);
        assert!(matches!(
            set.previous(),
            Err(StoreError::NoPreviousRelease { count: 1 })
        ));
    }

    #[test]
    fn beyond_returns_expired_tail() {
        let set = ReleaseSet::new(
            "/srv/app/releases",
            vec![
                release("20240101000000"),
                release("20240102000000"),
                release("20240103000000"),
            ],
        );
        let names: Vec<_> = set.beyond(2).iter().map(|r| r.name().as_str()).collect();
        assert_eq!(names, vec!["20240101000000"]);
        assert!(set.beyond(5).is_empty());
    }
}
