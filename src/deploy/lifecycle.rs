// ABOUTME: Release lifecycle orchestrator for deploy and rollback.
// ABOUTME: Runs each stage strictly in order and stops at the first failure.

use snafu::ResultExt;

use crate::config::{DeployConfig, PermissionPhase};
use crate::exec::CommandRunner;
use crate::output::OutputSink;
use crate::release::{Release, ReleaseStore};

use super::deployment::{Deployment, Rollback, RollbackOutcome, StepContext};
use super::error::{LifecycleError, StageSnafu};
use super::source::ReleaseSource;
use super::state::{Located, Prepared, Stage};
use super::switch::SymlinkSwitcher;

/// Sequences deploys and rollbacks for one deployment root.
///
/// Holds no lock itself; callers take a [`DeployLock`](super::DeployLock)
/// for the duration of a run. There are no retries: the first failing
/// stage ends the run and completed stages are not undone.
pub struct ReleaseLifecycle<R> {
    config: DeployConfig,
    runner: R,
    store: ReleaseStore,
    switcher: SymlinkSwitcher,
}

impl<R: CommandRunner> ReleaseLifecycle<R> {
    /// Build a lifecycle with the store and switcher implied by `config`.
    pub fn new(config: DeployConfig, runner: R) -> Self {
        let store = ReleaseStore::new(&config.releases);
        let switcher = SymlinkSwitcher::new(&config.root);
        Self::with_parts(config, runner, store, switcher)
    }

    pub fn with_parts(
        config: DeployConfig,
        runner: R,
        store: ReleaseStore,
        switcher: SymlinkSwitcher,
    ) -> Self {
        Self {
            config,
            runner,
            store,
            switcher,
        }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn store(&self) -> &ReleaseStore {
        &self.store
    }

    pub fn switcher(&self) -> &SymlinkSwitcher {
        &self.switcher
    }

    fn context<'a>(&'a self, sink: &'a dyn OutputSink) -> StepContext<'a> {
        StepContext {
            config: &self.config,
            runner: &self.runner,
            store: &self.store,
            switcher: &self.switcher,
            sink,
        }
    }

    fn enter(&self, sink: &dyn OutputSink, stage: Stage) {
        tracing::info!(%stage, root = %self.config.root.display(), "entering stage");
        sink.stage(stage);
    }

    /// Deploy a new release built by `source` and make it current.
    ///
    /// Stages: preparing, linking, pre-switch permissions, switching,
    /// post-switch permissions, cleaning.
    pub async fn deploy(
        &self,
        source: &dyn ReleaseSource,
        sink: &dyn OutputSink,
    ) -> Result<Release, LifecycleError> {
        let ctx = self.context(sink);

        self.enter(sink, Stage::Preparing);
        let deployment = Deployment::<Prepared>::prepare(&ctx, source)
            .await
            .context(StageSnafu {
                stage: Stage::Preparing,
            })?;
        tracing::info!(release = %deployment.release().name(), "release prepared");

        self.enter(sink, Stage::Linking);
        let deployment = deployment
            .link_shared(&ctx)
            .await
            .context(StageSnafu {
                stage: Stage::Linking,
            })?;

        let pre = Stage::FixingPermissions(PermissionPhase::Pre);
        self.enter(sink, pre);
        let deployment = deployment
            .fix_permissions_pre(&ctx)
            .await
            .context(StageSnafu { stage: pre })?;

        self.enter(sink, Stage::Switching);
        let deployment = deployment.switch(&ctx).await.context(StageSnafu {
            stage: Stage::Switching,
        })?;

        let post = Stage::FixingPermissions(PermissionPhase::Post);
        self.enter(sink, post);
        let deployment = deployment
            .fix_permissions_post(&ctx)
            .await
            .context(StageSnafu { stage: post })?;

        self.enter(sink, Stage::Cleaning);
        let deployment = deployment.clean(&ctx).await.context(StageSnafu {
            stage: Stage::Cleaning,
        })?;

        self.enter(sink, Stage::Done);
        Ok(deployment.finish())
    }

    /// Switch `current` back to the previous release and delete the newest.
    ///
    /// With fewer than two releases this fails before touching anything.
    pub async fn rollback(&self, sink: &dyn OutputSink) -> Result<RollbackOutcome, LifecycleError> {
        let ctx = self.context(sink);

        self.enter(sink, Stage::LocatingReleases);
        let rollback = Rollback::<Located>::locate(&ctx).await.context(StageSnafu {
            stage: Stage::LocatingReleases,
        })?;
        tracing::info!(
            doomed = %rollback.doomed().name(),
            target = %rollback.target().name(),
            "rollback located"
        );

        self.enter(sink, Stage::SwitchingBack);
        let rollback = rollback.switch_back(&ctx).await.context(StageSnafu {
            stage: Stage::SwitchingBack,
        })?;

        self.enter(sink, Stage::Deleting);
        let rollback = rollback.delete_doomed(&ctx).await.context(StageSnafu {
            stage: Stage::Deleting,
        })?;

        self.enter(sink, Stage::Done);
        Ok(rollback.finish())
    }
}
