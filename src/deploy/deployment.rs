// ABOUTME: Deployment and Rollback structs parameterized by state marker.
// ABOUTME: StepContext bundles the collaborators every transition needs.

use std::marker::PhantomData;

use crate::config::DeployConfig;
use crate::exec::{CommandRunner, CommandSpec};
use crate::output::OutputSink;
use crate::release::{Release, ReleaseStore};

use super::switch::SymlinkSwitcher;

/// Collaborators shared by all steps of one lifecycle run.
pub struct StepContext<'a> {
    pub config: &'a DeployConfig,
    pub runner: &'a dyn CommandRunner,
    pub store: &'a ReleaseStore,
    pub switcher: &'a SymlinkSwitcher,
    pub sink: &'a dyn OutputSink,
}

impl StepContext<'_> {
    /// A command with the configured timeout and elevation.
    pub fn command(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program)
            .timeout(self.config.process_timeout)
            .elevated(self.config.use_sudo)
    }
}

/// A deploy in progress, parameterized by its current state.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) release: Release,
    pub(crate) state: PhantomData<S>,
}

impl<S> Deployment<S> {
    /// The release being deployed.
    pub fn release(&self) -> &Release {
        &self.release
    }

    pub(crate) fn transition<T>(self) -> Deployment<T> {
        Deployment {
            release: self.release,
            state: PhantomData,
        }
    }
}

/// A rollback in progress, parameterized by its current state.
#[derive(Debug)]
pub struct Rollback<S> {
    /// Newest release, to be abandoned.
    pub(crate) doomed: Release,
    /// Second-newest release, to become current.
    pub(crate) target: Release,
    pub(crate) state: PhantomData<S>,
}

impl<S> Rollback<S> {
    pub fn doomed(&self) -> &Release {
        &self.doomed
    }

    pub fn target(&self) -> &Release {
        &self.target
    }

    pub(crate) fn transition<T>(self) -> Rollback<T> {
        Rollback {
            doomed: self.doomed,
            target: self.target,
            state: PhantomData,
        }
    }
}

/// What a successful rollback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    /// The release `current` now points at.
    pub restored: Release,
    /// The release that was deleted.
    pub removed: Release,
}
