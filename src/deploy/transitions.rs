// ABOUTME: Deploy state transitions, from a prepared release to a completed deploy.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::config::PermissionPhase;
use crate::release::Release;

use super::deployment::{Deployment, StepContext};
use super::error::DeployError;
use super::source::ReleaseSource;
use super::state::{
    Completed, Linked, PermissionsFinalized, PermissionsPrepared, Prepared, Switched,
};

// =============================================================================
// Shared helpers
// =============================================================================

/// Run the chown then chmod rule of `phase` inside `dir`.
pub(crate) async fn apply_permission_rules(
    ctx: &StepContext<'_>,
    phase: PermissionPhase,
    dir: &Path,
) -> Result<(), DeployError> {
    let chown = ctx.config.chown_rule(phase);
    if chown.is_active()
        && let Some(group) = &chown.group
    {
        let spec = ctx
            .command("chown")
            .args(["-R".to_string(), format!(":{group}")])
            .args(chown.paths.iter().map(|p| p.to_string_lossy().into_owned()))
            .working_dir(dir);
        ctx.runner.run(&spec, ctx.sink).await?;
    }

    let chmod = ctx.config.chmod_rule(phase);
    if chmod.is_active()
        && let Some(permission) = &chmod.permission
    {
        let spec = ctx
            .command("chmod")
            .args(["-R", permission.as_str()])
            .args(chmod.paths.iter().map(|p| p.to_string_lossy().into_owned()))
            .working_dir(dir);
        ctx.runner.run(&spec, ctx.sink).await?;
    }

    Ok(())
}

/// Remove whatever sits at `path`: file, symlink, or directory tree.
pub(crate) async fn remove_path(path: &Path) -> Result<bool, DeployError> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DeployError::io(path, e)),
    };

    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DeployError::io(path, e)),
    }
}

// =============================================================================
// Idle -> Prepared
// =============================================================================

impl Deployment<Prepared> {
    /// Create a new release directory and fill it from `source`.
    ///
    /// # Errors
    ///
    /// Fails on a name collision, a filesystem error, or a source command failure.
    /// A partially populated directory is left in place for inspection.
    pub async fn prepare(
        ctx: &StepContext<'_>,
        source: &dyn ReleaseSource,
    ) -> Result<Self, DeployError> {
        let release = ctx.store.create().await?;

        tracing::info!(
            release = %release.name(),
            source = %source.describe(),
            "populating release"
        );
        source.populate(&release, ctx).await?;

        Ok(Deployment {
            release,
            state: PhantomData,
        })
    }

    /// Link every configured shared path into the release.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if a shared path is missing from the
    /// shared store. All paths are checked before anything is linked.
    #[must_use = "deployment state must be used"]
    pub async fn link_shared(
        self,
        ctx: &StepContext<'_>,
    ) -> Result<Deployment<Linked>, DeployError> {
        let shared_root = ctx.config.shared_root();

        let mut links: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(ctx.config.shared.len());
        for relative in &ctx.config.shared {
            let source = shared_root.join(relative);
            if tokio::fs::symlink_metadata(&source).await.is_err() {
                return Err(DeployError::Config(format!(
                    "shared path does not exist: {}",
                    source.display()
                )));
            }
            links.push((source, self.release.path().join(relative)));
        }

        for (source, dest) in links {
            if remove_path(&dest).await? {
                tracing::debug!(
                    path = %dest.display(),
                    "replaced release content with shared link"
                );
            }
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DeployError::io(parent, e))?;
            }
            tokio::fs::symlink(&source, &dest)
                .await
                .map_err(|e| DeployError::io(&dest, e))?;
            tracing::debug!(
                link = %dest.display(),
                target = %source.display(),
                "linked shared path"
            );
        }

        Ok(self.transition())
    }
}

// =============================================================================
// Linked -> PermissionsPrepared -> Switched
// =============================================================================

impl Deployment<Linked> {
    /// Apply pre-switch chown/chmod rules inside the new release.
    #[must_use = "deployment state must be used"]
    pub async fn fix_permissions_pre(
        self,
        ctx: &StepContext<'_>,
    ) -> Result<Deployment<PermissionsPrepared>, DeployError> {
        apply_permission_rules(ctx, PermissionPhase::Pre, self.release.path()).await?;
        Ok(self.transition())
    }
}

impl Deployment<PermissionsPrepared> {
    /// Atomically point `current` at the new release.
    #[must_use = "deployment state must be used"]
    pub async fn switch(self, ctx: &StepContext<'_>) -> Result<Deployment<Switched>, DeployError> {
        ctx.switcher.point_to(&self.release).await?;
        Ok(self.transition())
    }
}

// =============================================================================
// Switched -> PermissionsFinalized -> Completed
// =============================================================================

impl Deployment<Switched> {
    /// Apply post-switch chown/chmod rules through the `current` link.
    ///
    /// A failure here does not undo the switch.
    #[must_use = "deployment state must be used"]
    pub async fn fix_permissions_post(
        self,
        ctx: &StepContext<'_>,
    ) -> Result<Deployment<PermissionsFinalized>, DeployError> {
        let current = ctx.config.current_link();
        apply_permission_rules(ctx, PermissionPhase::Post, &current).await?;
        Ok(self.transition())
    }
}

impl Deployment<PermissionsFinalized> {
    /// Delete releases beyond the retention count, then configured removals.
    ///
    /// The release just deployed is never deleted, even if its name sorts
    /// below the retention window.
    #[must_use = "deployment state must be used"]
    pub async fn clean(self, ctx: &StepContext<'_>) -> Result<Deployment<Completed>, DeployError> {
        let releases = ctx.store.list().await?;
        for expired in releases.beyond(ctx.config.keep_releases) {
            if expired.path() == self.release.path() {
                tracing::warn!(
                    release = %expired.name(),
                    "new release sorts outside retention window; keeping it"
                );
                continue;
            }
            ctx.store.delete(expired).await?;
        }

        for relative in &ctx.config.remove {
            let path = self.release.path().join(relative);
            if remove_path(&path).await? {
                tracing::debug!(path = %path.display(), "removed configured path");
            }
        }

        Ok(self.transition())
    }
}

impl Deployment<Completed> {
    /// Finish the deploy, returning the live release.
    pub fn finish(self) -> Release {
        self.release
    }
}
