// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates releasectl.yml template files.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(
    dir: &Path,
    namespace: Option<&str>,
    root: Option<&Path>,
    force: bool,
) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(namespace) = namespace {
        config.namespace = Some(namespace.to_string());
    }

    if let Some(root) = root {
        if !root.is_absolute() {
            return Err(Error::InvalidConfig(format!(
                "Root must be an absolute path: {}",
                root.display()
            )));
        }
        config.defaults.root = Some(root.to_path_buf());
    }

    std::fs::write(&config_path, generate_template_yaml(&config)?)?;

    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> Result<String> {
    let body = config.to_yaml()?;
    Ok(format!(
        "# releasectl configuration\n\
         # Shared paths live in <Root>/shared and are linked into every release.\n\
         # Named environments go under Environments and override Root, Releases,\n\
         # ProcessTimeout, UseSudo, PermissionsProcess, and KeepReleases.\n\
         {body}"
    ))
}
