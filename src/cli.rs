// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use releasectl::config::PermissionPhase;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "releasectl")]
#[command(about = "Atomic symlink-based releases with deploy and rollback")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discovered in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Environment whose Root, Releases, and process settings apply
    #[arg(short, long = "env", global = true)]
    pub environment: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new releasectl.yml configuration file
    Init {
        /// Namespace of the application
        #[arg(long)]
        namespace: Option<String>,

        /// Deployment root (absolute path)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Create a new release and make it current
    Deploy {
        /// Copy the release from a local build directory
        #[arg(long, conflicts_with = "reference")]
        from: Option<PathBuf>,

        /// Git branch or tag to clone from the configured repository
        #[arg(long = "ref")]
        reference: Option<String>,
    },

    /// Point current back at the previous release and delete the newest one
    Rollback,

    /// List releases, newest first
    Releases,

    /// Show deployment status
    Status,

    /// Edit the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file
    Show,

    /// Manage paths linked from the shared store
    Shared {
        #[command(subcommand)]
        action: PathAction,
    },

    /// Manage paths deleted from each new release
    Remove {
        #[command(subcommand)]
        action: PathAction,
    },

    /// Manage the chown rule of a phase
    Chown {
        #[arg(value_enum)]
        phase: Phase,

        #[command(subcommand)]
        action: ChownAction,
    },

    /// Manage the chmod rule of a phase
    Chmod {
        #[arg(value_enum)]
        phase: Phase,

        #[command(subcommand)]
        action: ChmodAction,
    },

    /// Set the GitHub repository (owner/name or git URL); omit to clear
    Repo { repo: Option<String> },
}

#[derive(Subcommand)]
pub enum PathAction {
    /// Add a path
    Add { path: PathBuf },
    /// Remove a path
    Remove { path: PathBuf },
}

#[derive(Subcommand)]
pub enum ChownAction {
    /// Set the group; omit to clear
    Group { group: Option<String> },
    /// Add a path
    Add { path: PathBuf },
    /// Remove a path
    Remove { path: PathBuf },
}

#[derive(Subcommand)]
pub enum ChmodAction {
    /// Set the permission; omit to clear
    Permission { permission: Option<String> },
    /// Add a path
    Add { path: PathBuf },
    /// Remove a path
    Remove { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Phase {
    Pre,
    Post,
}

impl From<Phase> for PermissionPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Pre => PermissionPhase::Pre,
            Phase::Post => PermissionPhase::Post,
        }
    }
}
