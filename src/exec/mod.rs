// ABOUTME: Subprocess execution for lifecycle steps.
// ABOUTME: Exports the command descriptor, runner trait, and shell runner.

mod command;
mod error;
mod runner;

pub use command::{CommandSpec, DEFAULT_TIMEOUT, ELEVATION_PROGRAM, shell_quote};
pub use error::ExecError;
pub use runner::{CommandResult, CommandRunner, ShellRunner};
