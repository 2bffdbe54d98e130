// ABOUTME: Test support utilities.
// ABOUTME: Provides a recording command runner and a deployment root builder.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use releasectl::config::DeployConfig;
use releasectl::exec::{CommandResult, CommandRunner, CommandSpec, ExecError, ShellRunner};
use releasectl::output::OutputSink;
use releasectl::types::ReleaseName;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("releasectl=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Records every command. Programs listed in `execute` are really run
/// through a `ShellRunner`; everything else succeeds without running.
#[allow(dead_code)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    execute: Vec<&'static str>,
    fail_on: Option<&'static str>,
    shell: ShellRunner,
}

#[allow(dead_code)]
impl RecordingRunner {
    /// Record only; never runs anything.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            execute: Vec::new(),
            fail_on: None,
            shell: ShellRunner::new(),
        }
    }

    /// Really run copies so directory sources populate releases.
    pub fn copying() -> Self {
        Self {
            execute: vec!["cp"],
            ..Self::new()
        }
    }

    /// Fail every command whose program is `program` with exit status 1.
    pub fn failing_on(mut self, program: &'static str) -> Self {
        self.fail_on = Some(program);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|spec| spec.program().to_string())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        sink: &dyn OutputSink,
    ) -> Result<CommandResult, ExecError> {
        self.calls.lock().push(spec.clone());

        if self.fail_on == Some(spec.program()) {
            return Err(ExecError::NonZeroExit {
                command: spec.to_string(),
                code: 1,
            });
        }

        if self.execute.iter().any(|program| *program == spec.program()) {
            return self.shell.run(spec, sink).await;
        }

        Ok(CommandResult::default())
    }
}

/// A deployment root in a temporary directory.
#[allow(dead_code)]
pub struct TestRoot {
    dir: TempDir,
}

#[allow(dead_code)]
impl TestRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn releases(&self) -> PathBuf {
        self.path().join("releases")
    }

    pub fn current(&self) -> PathBuf {
        self.path().join("current")
    }

    pub fn shared(&self) -> PathBuf {
        self.path().join("shared")
    }

    pub fn config(&self) -> DeployConfig {
        DeployConfig::new(self.path())
    }

    /// Create a release directory named for 2024-01-01 00:00:00 plus `minutes`.
    pub fn add_release(&self, minutes: u32) -> PathBuf {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::minutes(i64::from(minutes));
        let name = ReleaseName::from_timestamp(at);
        let path = self.releases().join(name.as_str());
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    /// Point `current` at `target` the way a deploy would.
    pub fn link_current(&self, target: &Path) {
        let _ = std::fs::remove_file(self.current());
        std::os::unix::fs::symlink(target, self.current()).unwrap();
    }

    pub fn current_target(&self) -> Option<PathBuf> {
        std::fs::read_link(self.current()).ok()
    }

    pub fn release_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.releases())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// A build directory to deploy from.
#[allow(dead_code)]
pub fn build_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }
    dir
}
