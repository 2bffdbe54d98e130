// ABOUTME: Immutable per-invocation deploy configuration.
// ABOUTME: Produced by resolving an environment; every component reads from this snapshot.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::GroupName;

use super::permissions::{ChmodRule, ChownRule, PermissionPhase, Phased};

pub const DEFAULT_KEEP_RELEASES: usize = 5;
pub const MIN_KEEP_RELEASES: usize = 2;
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(300);
pub const CURRENT_LINK: &str = "current";
pub const SHARED_DIR: &str = "shared";
pub const RELEASES_DIR: &str = "releases";
pub const LOCK_FILE: &str = ".releasectl.lock";

/// Framework subpaths chowned in an abandoned release before it is deleted.
pub const DEFAULT_ROLLBACK_FIXUP_PATHS: [&str; 3] = ["var/cache", "var/logs", "var/sessions"];

/// Read-only snapshot of everything the lifecycle needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub namespace: Option<String>,
    pub repo: Option<String>,
    pub root: PathBuf,
    pub releases: PathBuf,
    pub shared: Vec<PathBuf>,
    pub remove: Vec<PathBuf>,
    pub chown: Phased<ChownRule>,
    pub chmod: Phased<ChmodRule>,
    pub process_timeout: Duration,
    pub use_sudo: bool,
    pub permissions_process: Option<GroupName>,
    pub keep_releases: usize,
    pub rollback_fixup_paths: Vec<PathBuf>,
}

impl DeployConfig {
    /// A configuration with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            namespace: None,
            repo: None,
            releases: root.join(RELEASES_DIR),
            root,
            shared: Vec::new(),
            remove: Vec::new(),
            chown: Phased::default(),
            chmod: Phased::default(),
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            use_sudo: false,
            permissions_process: None,
            keep_releases: DEFAULT_KEEP_RELEASES,
            rollback_fixup_paths: DEFAULT_ROLLBACK_FIXUP_PATHS
                .iter()
                .map(PathBuf::from)
                .collect(),
        }
    }

    /// `<Root>/current`
    pub fn current_link(&self) -> PathBuf {
        self.root.join(CURRENT_LINK)
    }

    /// `<Root>/shared`
    pub fn shared_root(&self) -> PathBuf {
        self.root.join(SHARED_DIR)
    }

    /// Lock file guarding this root.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn chown_rule(&self, phase: PermissionPhase) -> &ChownRule {
        self.chown.get(phase)
    }

    pub fn chmod_rule(&self, phase: PermissionPhase) -> &ChmodRule {
        self.chmod.get(phase)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        require_absolute("Root", &self.root)?;
        require_absolute("Releases", &self.releases)?;

        if self.keep_releases < MIN_KEEP_RELEASES {
            return Err(Error::InvalidConfig(format!(
                "KeepReleases must be at least {MIN_KEEP_RELEASES} to allow rollback, got {}",
                self.keep_releases
            )));
        }

        if self.process_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "ProcessTimeout must be greater than zero".to_string(),
            ));
        }

        for path in &self.shared {
            require_relative("Shared", path)?;
        }
        for path in &self.remove {
            require_relative("Remove", path)?;
        }
        for path in self.chown.pre.paths.iter().chain(&self.chown.post.paths) {
            require_relative("Chown.Paths", path)?;
        }
        for path in self.chmod.pre.paths.iter().chain(&self.chmod.post.paths) {
            require_relative("Chmod.Paths", path)?;
        }
        for path in &self.rollback_fixup_paths {
            require_relative("RollbackFixupPaths", path)?;
        }

        Ok(())
    }
}

fn require_absolute(key: &str, path: &Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{key} must be an absolute path: {}",
            path.display()
        )))
    }
}

/// Relative, non-empty, and never escaping the directory it is joined to.
fn require_relative(key: &str, path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if path.as_os_str().is_empty() || escapes {
        return Err(Error::InvalidConfig(format!(
            "{key} entries must be relative paths inside the release: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let config = DeployConfig::new("/srv/app");
        assert_eq!(config.releases, PathBuf::from("/srv/app/releases"));
        assert_eq!(config.current_link(), PathBuf::from("/srv/app/current"));
        assert_eq!(config.shared_root(), PathBuf::from("/srv/app/shared"));
        assert_eq!(config.lock_path(), PathBuf::from("/srv/app/.releasectl.lock"));
    }

    #[test]
    fn rejects_escaping_paths() {
        let mut config = DeployConfig::new("/srv/app");
        config.shared = vec![PathBuf::from("../etc")];
        assert!(config.validate().is_err());

        config.shared = vec![PathBuf::from("/etc/passwd")];
        assert!(config.validate().is_err());

        config.shared = vec![PathBuf::from("var/logs")];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn keep_releases_must_allow_rollback() {
        let mut config = DeployConfig::new("/srv/app");
        config.keep_releases = 1;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn relative_root_is_rejected() {
        let config = DeployConfig::new("srv/app");
        assert!(config.validate().is_err());
    }
}
