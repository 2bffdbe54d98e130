// ABOUTME: Command runner trait and the local shell implementation.
// ABOUTME: Streams output lines to a sink as they arrive and enforces timeouts.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::output::{OutputLine, OutputSink, OutputSource};

use super::command::CommandSpec;
use super::error::ExecError;

/// Exit code and captured output of a command that succeeded.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub exit_code: i32,
    pub lines: Vec<OutputLine>,
}

impl CommandResult {
    /// Stdout lines joined with newlines.
    pub fn stdout(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.source == OutputSource::Stdout)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Executes one command at a time on behalf of the lifecycle.
///
/// Every line the command writes is pushed to `sink` before `run` returns.
/// A non-zero exit is reported as [`ExecError::NonZeroExit`]; whether that
/// is fatal is up to the caller.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        spec: &CommandSpec,
        sink: &dyn OutputSink,
    ) -> Result<CommandResult, ExecError>;
}

/// Runs commands through a local POSIX shell.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
        }
    }

    /// Use a different shell binary.
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        sink: &dyn OutputSink,
    ) -> Result<CommandResult, ExecError> {
        let line = spec.shell_line();
        let timeout = spec.time_limit();
        tracing::debug!(command = %line, ?timeout, "spawning command");

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Own process group, so a timeout takes down grandchildren too.
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: line.clone(),
                source,
            })?;

        let mut lines = stream::select(
            line_stream(child.stdout.take(), OutputSource::Stdout),
            line_stream(child.stderr.take(), OutputSource::Stderr),
        );

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut captured = Vec::new();
        loop {
            tokio::select! {
                next = lines.next() => match next {
                    Some(output) => {
                        sink.line(&output);
                        captured.push(output);
                    }
                    None => break,
                },
                () = &mut deadline => {
                    tracing::warn!(
                        command = %line,
                        ?timeout,
                        "command timed out, killing process group"
                    );
                    terminate(&mut child).await;
                    return Err(ExecError::Timeout { command: line, timeout });
                }
            }
        }

        let status = tokio::select! {
            status = child.wait() => status.map_err(|source| ExecError::Wait {
                command: line.clone(),
                source,
            })?,
            () = &mut deadline => {
                tracing::warn!(
                    command = %line,
                    ?timeout,
                    "command timed out, killing process group"
                );
                terminate(&mut child).await;
                return Err(ExecError::Timeout { command: line, timeout });
            }
        };

        let exit_code = exit_code(status);
        tracing::debug!(command = %line, exit_code, "command exited");

        if !status.success() {
            return Err(ExecError::NonZeroExit {
                command: line,
                code: exit_code,
            });
        }

        Ok(CommandResult {
            exit_code,
            lines: captured,
        })
    }
}

/// Kill the child's whole process group and reap the child.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: the child was spawned as leader of its own process group,
        // so its pid is the group id. killpg has no memory-safety preconditions.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            tracing::debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "kill after killpg failed");
    }
}

/// Shell-style exit code; signals map to 128 + signal number.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Lazily read one pipe line by line. Finite and not restartable.
fn line_stream<R>(pipe: Option<R>, source: OutputSource) -> BoxStream<'static, OutputLine>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(pipe) = pipe else {
        return stream::empty().boxed();
    };

    stream::unfold(BufReader::new(pipe), move |mut reader| async move {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => None,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                Some((OutputLine { source, text }, reader))
            }
            Err(e) => {
                tracing::warn!(error = %e, ?source, "failed reading command output");
                None
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_exit_maps_to_shell_convention() {
        // Raw wait status for "killed by SIGKILL".
        let status = ExitStatus::from_raw(libc::SIGKILL);
        assert_eq!(exit_code(status), 128 + libc::SIGKILL);
    }

    #[test]
    fn normal_exit_code_passes_through() {
        let status = ExitStatus::from_raw(3 << 8);
        assert_eq!(exit_code(status), 3);
    }

    #[test]
    fn stdout_joins_only_stdout_lines() {
        let result = CommandResult {
            exit_code: 0,
            lines: vec![
                OutputLine::stdout("a"),
                OutputLine::stderr("warn"),
                OutputLine::stdout("b"),
            ],
        };
        assert_eq!(result.stdout(), "a\nb");
    }
}
