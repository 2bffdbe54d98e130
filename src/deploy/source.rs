// ABOUTME: Release sources fill a freshly created release directory.
// ABOUTME: Local directory copy and git clone, both run through the CommandRunner.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::release::Release;

use super::deployment::StepContext;
use super::error::DeployError;

/// Produces the contents of a new release.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Human-readable origin, for progress output.
    fn describe(&self) -> String;

    /// Fill `release` with application files.
    async fn populate(&self, release: &Release, ctx: &StepContext<'_>) -> Result<(), DeployError>;
}

/// Copies an already built directory into the release.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReleaseSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }

    async fn populate(&self, release: &Release, ctx: &StepContext<'_>) -> Result<(), DeployError> {
        let meta = tokio::fs::metadata(&self.dir).await.ok();
        if !meta.is_some_and(|m| m.is_dir()) {
            return Err(DeployError::Config(format!(
                "source directory does not exist: {}",
                self.dir.display()
            )));
        }

        let spec = ctx
            .command("cp")
            .elevated(false)
            .args(["-a".to_string(), format!("{}/.", self.dir.display()), ".".to_string()])
            .working_dir(release.path());
        ctx.runner.run(&spec, ctx.sink).await?;
        Ok(())
    }
}

/// Shallow-clones a git repository into the release.
#[derive(Debug, Clone)]
pub struct GitSource {
    url: String,
    reference: Option<String>,
}

impl GitSource {
    pub fn new(url: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            url: url.into(),
            reference,
        }
    }

    /// Accepts `owner/name` shorthand for GitHub, or any git URL.
    pub fn from_repo(repo: &str, reference: Option<String>) -> Self {
        Self::new(expand_repo(repo), reference)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn expand_repo(repo: &str) -> String {
    let is_shorthand = !repo.contains("://")
        && !repo.contains('@')
        && !repo.starts_with('/')
        && repo.split('/').count() == 2;

    if is_shorthand {
        format!("https://github.com/{}.git", repo.trim_end_matches(".git"))
    } else {
        repo.to_string()
    }
}

#[async_trait]
impl ReleaseSource for GitSource {
    fn describe(&self) -> String {
        match &self.reference {
            Some(reference) => format!("{} at {}", self.url, reference),
            None => self.url.clone(),
        }
    }

    async fn populate(&self, release: &Release, ctx: &StepContext<'_>) -> Result<(), DeployError> {
        let mut spec = ctx
            .command("git")
            .elevated(false)
            .args(["clone", "--depth", "1"]);
        if let Some(reference) = &self.reference {
            spec = spec.args(["--branch", reference.as_str()]);
        }
        let spec = spec
            .args([self.url.as_str(), "."])
            .working_dir(release.path());

        ctx.runner.run(&spec, ctx.sink).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_github_shorthand() {
        assert_eq!(expand_repo("acme/shop"), "https://github.com/acme/shop.git");
        assert_eq!(
            expand_repo("acme/shop.git"),
            "https://github.com/acme/shop.git"
        );
    }

    #[test]
    fn keeps_full_urls() {
        assert_eq!(
            expand_repo("git@github.com:acme/shop.git"),
            "git@github.com:acme/shop.git"
        );
        assert_eq!(
            expand_repo("https://git.example.com/acme/shop.git"),
            "https://git.example.com/acme/shop.git"
        );
        assert_eq!(expand_repo("/srv/git/shop.git"), "/srv/git/shop.git");
    }

    #[test]
    fn describes_reference() {
        let source = GitSource::from_repo("acme/shop", Some("v1.2.0".to_string()));
        assert_eq!(
            source.describe(),
            "https://github.com/acme/shop.git at v1.2.0"
        );
    }
}
