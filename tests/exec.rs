// ABOUTME: Integration tests for the local shell command runner.
// ABOUTME: Covers line streaming, exit codes, timeouts, and spawn failures.

mod support;

use parking_lot::Mutex;
use releasectl::deploy::Stage;
use releasectl::exec::{CommandRunner, CommandSpec, ExecError, ShellRunner};
use releasectl::output::{MemorySink, OutputLine, OutputSink, OutputSource};
use std::time::{Duration, Instant};

/// Records when each line reached the sink.
#[derive(Default)]
struct TimedSink {
    lines: Mutex<Vec<(Instant, String)>>,
}

impl OutputSink for TimedSink {
    fn stage(&self, _stage: Stage) {}

    fn line(&self, line: &OutputLine) {
        self.lines.lock().push((Instant::now(), line.text.clone()));
    }
}

#[tokio::test]
async fn streams_every_line_in_order() {
    support::init_tracing();
    let sink = MemorySink::new();
    let spec = CommandSpec::new("sh").args(["-c", "for i in 1 2 3 4 5; do echo line$i; done"]);

    let result = ShellRunner::new().run(&spec, &sink).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(
        sink.texts(),
        vec!["line1", "line2", "line3", "line4", "line5"]
    );
    assert_eq!(result.stdout(), "line1\nline2\nline3\nline4\nline5");
}

#[tokio::test]
async fn lines_reach_the_sink_before_the_command_exits() {
    let sink = TimedSink::default();
    let spec = CommandSpec::new("sh").args(["-c", "echo a; sleep 1; echo b"]);

    let started = Instant::now();
    ShellRunner::new().run(&spec, &sink).await.unwrap();
    let finished = Instant::now();

    let lines = sink.lines.lock();
    let texts: Vec<&str> = lines.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b"]);

    let first = lines[0].0;
    assert!(first.duration_since(started) < Duration::from_millis(500));
    assert!(finished.duration_since(first) >= Duration::from_millis(800));
}

#[tokio::test]
async fn tags_stderr_lines() {
    let sink = MemorySink::new();
    let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2"]);

    ShellRunner::new().run(&spec, &sink).await.unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(
        lines
            .iter()
            .any(|l| l.source == OutputSource::Stdout && l.text == "out")
    );
    assert!(
        lines
            .iter()
            .any(|l| l.source == OutputSource::Stderr && l.text == "err")
    );
}

#[tokio::test]
async fn runs_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let sink = MemorySink::new();
    let spec = CommandSpec::new("pwd").working_dir(dir.path());

    let result = ShellRunner::new().run(&spec, &sink).await.unwrap();

    let reported = std::fs::canonicalize(result.stdout()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

#[tokio::test]
async fn arguments_are_not_reinterpreted_by_the_shell() {
    let sink = MemorySink::new();
    let spec = CommandSpec::new("echo").args(["$HOME", "a b", "it's"]);

    ShellRunner::new().run(&spec, &sink).await.unwrap();

    assert_eq!(sink.texts(), vec!["$HOME a b it's"]);
}

#[tokio::test]
async fn non_zero_exit_is_an_error_with_output_delivered() {
    let sink = MemorySink::new();
    let spec = CommandSpec::new("sh").args(["-c", "echo before; exit 3"]);

    let err = ShellRunner::new().run(&spec, &sink).await.unwrap_err();

    assert!(matches!(err, ExecError::NonZeroExit { code: 3, .. }));
    assert_eq!(err.exit_code(), Some(3));
    assert_eq!(sink.texts(), vec!["before"]);
}

#[tokio::test]
async fn timeout_fails_promptly() {
    let sink = MemorySink::new();
    let spec = CommandSpec::new("sleep")
        .arg("30")
        .timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = ShellRunner::new().run(&spec, &sink).await.unwrap_err();

    assert!(matches!(err, ExecError::Timeout { .. }), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_kills_grandchildren() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let sink = MemorySink::new();
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let spec = CommandSpec::new("sh")
        .args(["-c", script.as_str()])
        .timeout(Duration::from_millis(500));

    let err = ShellRunner::new().run(&spec, &sink).await.unwrap_err();
    assert!(matches!(err, ExecError::Timeout { .. }));

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let proc_dir = std::path::PathBuf::from(format!("/proc/{}", pid.trim()));

    // The kernel may take a moment to reap the killed sleep.
    let mut alive = true;
    for _ in 0..50 {
        let status = std::fs::read_to_string(proc_dir.join("status")).unwrap_or_default();
        if status.is_empty() || status.contains("State:\tZ") {
            alive = false;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!alive, "grandchild {} survived the timeout", pid.trim());
}

#[tokio::test]
async fn missing_shell_is_a_spawn_error() {
    let sink = MemorySink::new();
    let spec = CommandSpec::new("true");

    let err = ShellRunner::with_shell("/nonexistent/shell")
        .run(&spec, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Spawn { .. }));
    assert_eq!(err.exit_code(), None);
}

#[tokio::test]
async fn missing_program_reports_shell_exit_code() {
    let sink = MemorySink::new();
    let spec = CommandSpec::new("releasectl-no-such-program");

    let err = ShellRunner::new().run(&spec, &sink).await.unwrap_err();

    assert_eq!(err.exit_code(), Some(127));
}
