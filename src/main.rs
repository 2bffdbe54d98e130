// ABOUTME: Entry point for the releasectl CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{ChmodAction, ChownAction, Cli, Commands, ConfigCommand, PathAction};
use releasectl::config::{self, Config, DeployConfig, PermissionPhase};
use releasectl::deploy::{
    DeployLock, DirectorySource, GitSource, ReleaseLifecycle, ReleaseSource, SymlinkSwitcher,
};
use releasectl::error::{Error, Result};
use releasectl::exec::ShellRunner;
use releasectl::output::{Output, OutputMode};
use releasectl::release::ReleaseStore;
use releasectl::types::{GroupName, Permission};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let environment = cli.environment.as_deref();

    match cli.command {
        Commands::Init {
            namespace,
            root,
            force,
        } => {
            let path = config::init_config(&cwd, namespace.as_deref(), root.as_deref(), force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Deploy { from, reference } => {
            let config = load_config(cli.config.as_deref(), &cwd)?.resolve(environment)?;
            let source = release_source(&config, from, reference)?;
            deploy(config, &*source, output).await
        }
        Commands::Rollback => {
            let config = load_config(cli.config.as_deref(), &cwd)?.resolve(environment)?;
            rollback(config, output).await
        }
        Commands::Releases => {
            let config = load_config(cli.config.as_deref(), &cwd)?.resolve(environment)?;
            releases(&config, output).await
        }
        Commands::Status => {
            let config = load_config(cli.config.as_deref(), &cwd)?.resolve(environment)?;
            status(&config, output).await
        }
        Commands::Config { action } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::find(&cwd)?,
            };
            edit_config(&path, action, output)
        }
    }
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config> {
    match explicit {
        Some(path) if !path.exists() => Err(Error::ConfigNotFound(path.to_path_buf())),
        Some(path) => Config::load(path),
        None => Config::discover(cwd),
    }
}

fn release_source(
    config: &DeployConfig,
    from: Option<PathBuf>,
    reference: Option<String>,
) -> Result<Box<dyn ReleaseSource>> {
    if let Some(dir) = from {
        let dir = if dir.is_absolute() {
            dir
        } else {
            env::current_dir()?.join(dir)
        };
        return Ok(Box::new(DirectorySource::new(dir)));
    }

    match &config.repo {
        Some(repo) => Ok(Box::new(GitSource::from_repo(repo, reference))),
        None => Err(Error::InvalidConfig(
            "no release source: pass --from or set GitHub.Repo".to_string(),
        )),
    }
}

async fn deploy(
    config: DeployConfig,
    source: &dyn ReleaseSource,
    output: &mut Output,
) -> Result<()> {
    let lock = DeployLock::acquire(&config.lock_path(), "deploy")?;

    output.progress(&format!(
        "Deploying {} to {} from {}",
        config.namespace.as_deref().unwrap_or("release"),
        config.root.display(),
        source.describe()
    ));
    output.start_timer();

    let lifecycle = ReleaseLifecycle::new(config, ShellRunner::new());
    let result = lifecycle.deploy(source, &*output).await;
    lock.release();

    let release = result?;
    output.success(&format!("Deployed release {}", release.name()));
    Ok(())
}

async fn rollback(config: DeployConfig, output: &mut Output) -> Result<()> {
    let lock = DeployLock::acquire(&config.lock_path(), "rollback")?;

    output.progress(&format!("Rolling back {}", config.root.display()));
    output.start_timer();

    let lifecycle = ReleaseLifecycle::new(config, ShellRunner::new());
    let result = lifecycle.rollback(&*output).await;
    lock.release();

    let outcome = result?;
    output.success(&format!(
        "Rolled back to {} (removed {})",
        outcome.restored.name(),
        outcome.removed.name()
    ));
    Ok(())
}

async fn releases(config: &DeployConfig, output: &Output) -> Result<()> {
    let store = ReleaseStore::new(&config.releases);
    let set = store.list().await?;
    let current = SymlinkSwitcher::new(&config.root).target().await?;

    if set.is_empty() {
        output.success("No releases");
        return Ok(());
    }

    for release in &set {
        let marker = if current.as_deref() == Some(release.path()) {
            "*"
        } else {
            " "
        };
        match output.mode() {
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({
                    "event": "release",
                    "name": release.name().as_str(),
                    "path": release.path(),
                    "current": marker == "*",
                })
            ),
            _ => println!("{marker} {}", release.name()),
        }
    }

    Ok(())
}

async fn status(config: &DeployConfig, output: &Output) -> Result<()> {
    let store = ReleaseStore::new(&config.releases);
    let set = store.list().await?;
    let current = SymlinkSwitcher::new(&config.root).target().await?;
    let current_name = current
        .as_deref()
        .and_then(|target| set.find_by_path(target))
        .map(|release| release.name().to_string());

    if output.mode() == OutputMode::Json {
        println!(
            "{}",
            serde_json::json!({
                "event": "status",
                "namespace": config.namespace,
                "root": config.root,
                "releases": set.len(),
                "current": current,
            })
        );
        return Ok(());
    }

    println!("Namespace: {}", config.namespace.as_deref().unwrap_or("-"));
    println!("Root:      {}", config.root.display());
    println!("Releases:  {}", set.len());
    match (current, current_name) {
        (Some(_), Some(name)) => println!("Current:   {name}"),
        (Some(target), None) => println!("Current:   {} (not a known release)", target.display()),
        (None, _) => println!("Current:   none"),
    }

    Ok(())
}

fn edit_config(path: &Path, action: ConfigCommand, output: &Output) -> Result<()> {
    let mut config = Config::load(path)?;

    match action {
        ConfigCommand::Show => {
            print!("{}", config.to_yaml()?);
            return Ok(());
        }
        ConfigCommand::Shared { action } => match action {
            PathAction::Add { path } => report(config.add_shared(path), "Shared", output),
            PathAction::Remove { path } => report(config.remove_shared(&path), "Shared", output),
        },
        ConfigCommand::Remove { action } => match action {
            PathAction::Add { path } => report(config.add_remove(path), "Remove", output),
            PathAction::Remove { path } => report(config.remove_remove(&path), "Remove", output),
        },
        ConfigCommand::Chown { phase, action } => {
            let phase = PermissionPhase::from(phase);
            match action {
                ChownAction::Group { group } => {
                    let group = group
                        .map(|g| GroupName::new(&g))
                        .transpose()
                        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
                    config.set_chown_group(phase, group);
                }
                ChownAction::Add { path } => {
                    report(config.add_chown_path(phase, path), "Chown", output)
                }
                ChownAction::Remove { path } => {
                    report(config.remove_chown_path(phase, &path), "Chown", output)
                }
            }
        }
        ConfigCommand::Chmod { phase, action } => {
            let phase = PermissionPhase::from(phase);
            match action {
                ChmodAction::Permission { permission } => {
                    let permission = permission
                        .map(|p| Permission::new(&p))
                        .transpose()
                        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
                    config.set_chmod_permission(phase, permission);
                }
                ChmodAction::Add { path } => {
                    report(config.add_chmod_path(phase, path), "Chmod", output)
                }
                ChmodAction::Remove { path } => {
                    report(config.remove_chmod_path(phase, &path), "Chmod", output)
                }
            }
        }
        ConfigCommand::Repo { repo } => config.set_repo(repo),
    }

    config.save(path)?;
    output.success(&format!("Updated {}", path.display()));
    Ok(())
}

fn report(changed: bool, key: &str, output: &Output) {
    if !changed {
        output.progress(&format!("{key} unchanged"));
    }
}
