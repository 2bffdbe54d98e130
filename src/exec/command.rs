// ABOUTME: Structured command descriptor for shell execution.
// ABOUTME: Composes `cd <dir> && <elevation> <program> <args>` with quoting applied once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix used when a command needs elevated privileges.
pub const ELEVATION_PROGRAM: &str = "sudo";

/// Default time a single command may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A command to run: program, arguments, and how to run it.
///
/// The shell line is derived from this descriptor and never assembled by
/// callers, so every argument is quoted exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    elevated: bool,
    timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            elevated: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn time_limit(&self) -> Duration {
        self.timeout
    }

    /// Render the line handed to `sh -c`.
    pub fn shell_line(&self) -> String {
        let mut line = String::new();

        if let Some(dir) = &self.working_dir {
            line.push_str("cd ");
            line.push_str(&shell_quote(&dir.to_string_lossy()));
            line.push_str(" && ");
        }

        if self.elevated {
            line.push_str(ELEVATION_PROGRAM);
            line.push(' ');
        }

        line.push_str(&shell_quote(&self.program));
        for arg in &self.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }

        line
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shell_line())
    }
}

/// Quote a word for POSIX sh. Plain words pass through untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));

    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
