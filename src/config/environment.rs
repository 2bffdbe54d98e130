// ABOUTME: Environment-scoped settings (Root, Releases, ProcessTimeout, ...).
// ABOUTME: Top-level values act as defaults that named environments override.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::GroupName;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<PathBuf>,

    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub process_timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sudo: Option<bool>,

    /// Group of the service process that owns runtime files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions_process: Option<GroupName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_releases: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_fixup_paths: Option<Vec<PathBuf>>,
}

impl EnvironmentConfig {
    /// Overlay `other` on top of `self`; set values in `other` win.
    pub fn merged_with(&self, other: &EnvironmentConfig) -> EnvironmentConfig {
        EnvironmentConfig {
            root: other.root.clone().or_else(|| self.root.clone()),
            releases: other.releases.clone().or_else(|| self.releases.clone()),
            process_timeout: other.process_timeout.or(self.process_timeout),
            use_sudo: other.use_sudo.or(self.use_sudo),
            permissions_process: other
                .permissions_process
                .clone()
                .or_else(|| self.permissions_process.clone()),
            keep_releases: other.keep_releases.or(self.keep_releases),
            rollback_fixup_paths: other
                .rollback_fixup_paths
                .clone()
                .or_else(|| self.rollback_fixup_paths.clone()),
        }
    }
}
