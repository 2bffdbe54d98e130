// ABOUTME: Output sinks for lifecycle progress and subprocess output.
// ABOUTME: Console rendering supports normal, quiet (CI), and JSON modes.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;

use crate::deploy::Stage;

/// Which pipe a subprocess line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One line of subprocess output, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub source: OutputSource,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            source: OutputSource::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            source: OutputSource::Stderr,
            text: text.into(),
        }
    }
}

/// Receives progress from the lifecycle and runner as it happens.
///
/// Implementations must not block for long: lines are pushed from the
/// runner's read loop.
pub trait OutputSink: Send + Sync {
    /// A lifecycle stage has been entered.
    fn stage(&self, stage: Stage);

    /// A subprocess produced a line.
    fn line(&self, line: &OutputLine);
}

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("  ✓ {message} ({:.1}s)", elapsed);
                } else {
                    println!("  ✓ {message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => emit_json(
                &JsonEvent::Success {
                    message,
                    duration_secs: self.duration(),
                },
                false,
            ),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => emit_json(
                &JsonEvent::Error {
                    message,
                    duration_secs: self.duration(),
                },
                true,
            ),
        }
    }
}

impl OutputSink for Output {
    fn stage(&self, stage: Stage) {
        match self.mode {
            OutputMode::Normal => println!("  → {stage}"),
            OutputMode::Quiet => {}
            OutputMode::Json => emit_json(
                &JsonEvent::Stage {
                    stage: stage.to_string(),
                },
                false,
            ),
        }
    }

    fn line(&self, line: &OutputLine) {
        match self.mode {
            OutputMode::Normal => match line.source {
                OutputSource::Stdout => println!("    {}", line.text),
                OutputSource::Stderr => eprintln!("    ! {}", line.text),
            },
            OutputMode::Quiet => {}
            OutputMode::Json => emit_json(&JsonEvent::Line { line }, false),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum JsonEvent<'a> {
    Stage {
        stage: String,
    },
    Line {
        #[serde(flatten)]
        line: &'a OutputLine,
    },
    Success {
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
    Error {
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
}

fn emit_json(event: &JsonEvent<'_>, to_stderr: bool) {
    if let Ok(json) = serde_json::to_string(event) {
        if to_stderr {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }
}

/// Collects everything it receives, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    stages: Mutex<Vec<Stage>>,
    lines: Mutex<Vec<OutputLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().clone()
    }

    pub fn lines(&self) -> Vec<OutputLine> {
        self.lines.lock().clone()
    }

    /// Text of every collected line, regardless of source.
    pub fn texts(&self) -> Vec<String> {
        self.lines.lock().iter().map(|l| l.text.clone()).collect()
    }
}

impl OutputSink for MemorySink {
    fn stage(&self, stage: Stage) {
        self.stages.lock().push(stage);
    }

    fn line(&self, line: &OutputLine) {
        self.lines.lock().push(line.clone());
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn stage(&self, _stage: Stage) {}

    fn line(&self, _line: &OutputLine) {}
}
