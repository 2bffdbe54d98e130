// ABOUTME: Configuration types and parsing for releasectl.yml.
// ABOUTME: Handles YAML load/save, environment merging, and resolution to DeployConfig.

mod environment;
mod init;
mod permissions;
mod resolved;

pub use environment::EnvironmentConfig;
pub use init::init_config;
pub use permissions::{ChmodRule, ChownRule, PermissionPhase, Phased};
pub use resolved::{
    CURRENT_LINK, DEFAULT_KEEP_RELEASES, DEFAULT_PROCESS_TIMEOUT, DEFAULT_ROLLBACK_FIXUP_PATHS,
    DeployConfig, LOCK_FILE, MIN_KEEP_RELEASES, RELEASES_DIR, SHARED_DIR,
};

use crate::error::{Error, Result};
use crate::types::{GroupName, Permission};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "releasectl.yml";
pub const CONFIG_FILENAME_ALT: &str = "releasectl.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".releasectl/config.yml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default, rename = "GitHub")]
    pub github: GitHubConfig,

    #[serde(default)]
    pub shared: Vec<PathBuf>,

    #[serde(default)]
    pub remove: Vec<PathBuf>,

    #[serde(default)]
    pub chown: Phased<ChownRule>,

    #[serde(default)]
    pub chmod: Phased<ChmodRule>,

    /// Environment-scoped values given at the top level.
    #[serde(flatten)]
    pub defaults: EnvironmentConfig,

    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GitHubConfig {
    #[serde(default)]
    pub repo: Option<String>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Write the configuration back. Empty lists are written as `[]`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Locate the configuration file in `dir`.
    pub fn find(dir: &Path) -> Result<PathBuf> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        candidates
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        Self::load(&Self::find(dir)?)
    }

    /// Settings for one environment, or the top-level ones when `None`.
    pub fn environment(&self, name: Option<&str>) -> Result<EnvironmentConfig> {
        match name {
            None => Ok(self.defaults.clone()),
            Some(name) => {
                let env = self
                    .environments
                    .get(name)
                    .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;
                Ok(self.defaults.merged_with(env))
            }
        }
    }

    /// Produce the validated, immutable snapshot the lifecycle runs on.
    pub fn resolve(&self, environment: Option<&str>) -> Result<DeployConfig> {
        let env = self.environment(environment)?;

        let root = env
            .root
            .ok_or_else(|| Error::InvalidConfig("Root is required".to_string()))?;

        let mut resolved = DeployConfig::new(root);
        resolved.namespace = self.namespace.clone();
        resolved.repo = self.github.repo.clone();
        resolved.shared = self.shared.clone();
        resolved.remove = self.remove.clone();
        resolved.chown = self.chown.clone();
        resolved.chmod = self.chmod.clone();
        if let Some(releases) = env.releases {
            resolved.releases = releases;
        }
        if let Some(timeout) = env.process_timeout {
            resolved.process_timeout = timeout;
        }
        if let Some(use_sudo) = env.use_sudo {
            resolved.use_sudo = use_sudo;
        }
        resolved.permissions_process = env.permissions_process;
        if let Some(keep) = env.keep_releases {
            resolved.keep_releases = keep;
        }
        if let Some(paths) = env.rollback_fixup_paths {
            resolved.rollback_fixup_paths = paths;
        }

        resolved.validate()?;
        Ok(resolved)
    }

    pub fn template() -> Self {
        Config {
            namespace: Some("my-app".to_string()),
            defaults: EnvironmentConfig {
                root: Some(PathBuf::from("/var/www/my-app")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    // Mutation helpers for the `config` subcommands. Adding is idempotent.

    pub fn add_shared(&mut self, path: impl Into<PathBuf>) -> bool {
        push_unique(&mut self.shared, path.into())
    }

    pub fn remove_shared(&mut self, path: &Path) -> bool {
        remove_entry(&mut self.shared, path)
    }

    pub fn add_remove(&mut self, path: impl Into<PathBuf>) -> bool {
        push_unique(&mut self.remove, path.into())
    }

    pub fn remove_remove(&mut self, path: &Path) -> bool {
        remove_entry(&mut self.remove, path)
    }

    pub fn set_chown_group(&mut self, phase: PermissionPhase, group: Option<GroupName>) {
        self.chown.get_mut(phase).group = group;
    }

    pub fn add_chown_path(&mut self, phase: PermissionPhase, path: impl Into<PathBuf>) -> bool {
        push_unique(&mut self.chown.get_mut(phase).paths, path.into())
    }

    pub fn remove_chown_path(&mut self, phase: PermissionPhase, path: &Path) -> bool {
        remove_entry(&mut self.chown.get_mut(phase).paths, path)
    }

    pub fn set_chmod_permission(&mut self, phase: PermissionPhase, permission: Option<Permission>) {
        self.chmod.get_mut(phase).permission = permission;
    }

    pub fn add_chmod_path(&mut self, phase: PermissionPhase, path: impl Into<PathBuf>) -> bool {
        push_unique(&mut self.chmod.get_mut(phase).paths, path.into())
    }

    pub fn remove_chmod_path(&mut self, phase: PermissionPhase, path: &Path) -> bool {
        remove_entry(&mut self.chmod.get_mut(phase).paths, path)
    }

    pub fn set_repo(&mut self, repo: Option<String>) {
        self.github.repo = repo;
    }
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) -> bool {
    if list.contains(&path) {
        return false;
    }
    list.push(path);
    true
}

fn remove_entry(list: &mut Vec<PathBuf>, path: &Path) -> bool {
    let before = list.len();
    list.retain(|p| p != path);
    list.len() != before
}
