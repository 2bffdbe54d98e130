// ABOUTME: Rollback state transitions: locate, switch back, delete the abandoned release.
// ABOUTME: Never touches the filesystem unless at least two releases exist.

use std::marker::PhantomData;
use std::path::PathBuf;

use crate::release::StoreError;

use super::deployment::{Rollback, RollbackOutcome, StepContext};
use super::error::DeployError;
use super::state::{Located, RolledBack, SwitchedBack};

impl Rollback<Located> {
    /// Identify the newest release (to abandon) and the one before it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoPreviousRelease` when fewer than two releases
    /// exist. Nothing has been modified at that point.
    pub async fn locate(ctx: &StepContext<'_>) -> Result<Self, DeployError> {
        let releases = ctx.store.list().await?;
        if releases.len() < 2 {
            return Err(StoreError::NoPreviousRelease {
                count: releases.len(),
            }
            .into());
        }

        let doomed = releases.current()?.clone();
        let target = releases.previous()?.clone();

        match ctx.switcher.target().await? {
            Some(linked) if linked == doomed.path() => {}
            Some(linked) => tracing::warn!(
                current = %linked.display(),
                newest = %doomed.name(),
                "current does not point at the newest release; rolling back anyway"
            ),
            None => tracing::warn!("current link is missing; rolling back anyway"),
        }

        Ok(Rollback {
            doomed,
            target,
            state: PhantomData,
        })
    }

    /// Point `current` at the previous release.
    #[must_use = "rollback state must be used"]
    pub async fn switch_back(
        self,
        ctx: &StepContext<'_>,
    ) -> Result<Rollback<SwitchedBack>, DeployError> {
        ctx.switcher.point_to(&self.target).await?;
        Ok(self.transition())
    }
}

impl Rollback<SwitchedBack> {
    /// Hand runtime directories back to the service group, then delete the
    /// abandoned release.
    ///
    /// On failure `current` stays on the rollback target and the abandoned
    /// directory may remain on disk.
    #[must_use = "rollback state must be used"]
    pub async fn delete_doomed(
        self,
        ctx: &StepContext<'_>,
    ) -> Result<Rollback<RolledBack>, DeployError> {
        if let Some(group) = &ctx.config.permissions_process {
            let mut existing: Vec<PathBuf> = Vec::new();
            for relative in &ctx.config.rollback_fixup_paths {
                if tokio::fs::symlink_metadata(self.doomed.path().join(relative))
                    .await
                    .is_ok()
                {
                    existing.push(relative.clone());
                }
            }

            if !existing.is_empty() {
                let spec = ctx
                    .command("chown")
                    .args(["-R".to_string(), format!(":{group}")])
                    .args(existing.iter().map(|p| p.to_string_lossy().into_owned()))
                    .working_dir(self.doomed.path());
                ctx.runner.run(&spec, ctx.sink).await?;
            }
        }

        ctx.store.delete(&self.doomed).await?;
        Ok(self.transition())
    }
}

impl Rollback<RolledBack> {
    pub fn finish(self) -> RollbackOutcome {
        RollbackOutcome {
            restored: self.target,
            removed: self.doomed,
        }
    }
}
