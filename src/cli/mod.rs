use crate::shell::{self, Shell};
use crate::{Config, EnvConfig, Result};
use clap::Parser;
use colored::Colorize;
use std::collections::{BTreeSet, HashSet};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Main CLI structure for the env-config application.
///
/// Everything written to stdout is shell code for the calling shell to
/// source; reports and logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "env-config")]
#[command(about = "Activate named profiles of environment variables", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Profile and group names to activate
    pub names: Vec<String>,
    /// Configuration file, or directory to search upwards from for env-config.yaml
    #[arg(short, long, env = "ENV_CONFIG_CONFIG")]
    pub config: Option<PathBuf>,
    /// Shell dialect to emit (detected from $SHELL when omitted)
    #[arg(short, long, env = "ENV_CONFIG_SHELL", value_enum)]
    pub shell: Option<Shell>,
    /// List configured profiles and groups
    #[arg(short, long)]
    pub list: bool,
    /// Keep variables that are already set instead of clearing them first
    #[arg(short, long)]
    pub update: bool,
    /// Clear every configured variable that is set, then stop
    #[arg(long, conflicts_with = "update")]
    pub clear: bool,
    /// Report what would change without resolving secrets or emitting shell code
    #[arg(long)]
    pub debug: bool,
    /// Currently active selection, maintained by the emitted shell code
    #[arg(long, env = "_ENV_CONFIG_PROFILES", hide = true)]
    pub active: Option<String>,
}

/// CLI for printing the shell integration.
#[derive(Parser, Debug)]
#[command(name = "env-config-shell")]
#[command(about = "Print the env-config shell function for your shell", long_about = None)]
#[command(version)]
pub struct ShellCli {
    /// Shell to print the function for (detected from $SHELL when omitted)
    #[arg(value_enum)]
    pub shell: Option<Shell>,
}

/// Initialize the tracing subscriber.
///
/// Logs always go to stderr. `--debug` sets the level to DEBUG, otherwise
/// `RUST_LOG` applies, defaulting to WARN.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("env_config=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("env_config=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Entry point of the `env-config` binary.
pub fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("env-config starting with args: {:?}", cli);
    run(&cli, &mut io::stdout(), &mut io::stderr())?;
    Ok(())
}

/// Entry point of the `env-config-shell` binary.
pub fn shell_main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = ShellCli::parse();
    let shell = cli.shell.unwrap_or_else(Shell::detect);
    print!("{}", shell.init_script());
    Ok(())
}

/// Execute `cli`, writing shell code to `out` and the report to `err`.
///
/// Nothing is written to `out` until every secret has been resolved, so a
/// failure never leaves a half-applied activation behind.
pub fn run(cli: &Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<()> {
    let start = match &cli.config {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let config = Config::load(&start)?;
    if let Some(path) = &config.path {
        tracing::debug!("using configuration {}", path.display());
    }

    let env_config = EnvConfig::new(config);
    let shell = cli.shell.unwrap_or_else(Shell::detect);

    if cli.list {
        return list(&env_config, err);
    }

    if cli.clear {
        let present = env_config.present_env_vars();
        report_clearing(err, &present)?;
        if !cli.debug {
            if let Some(block) = shell::clear_block(shell, &present) {
                write!(out, "{}", block)?;
            }
        }
        return Ok(());
    }

    if cli.names.is_empty() {
        return show_active(&env_config, cli.active.as_deref(), err);
    }

    let names = dedup(&cli.names);
    let present = (!cli.update).then(|| env_config.present_env_vars());
    let selected = env_config.select(&names)?;
    let resolved = if cli.debug {
        None
    } else {
        Some(env_config.resolve(&names)?)
    };

    if let Some(present) = &present {
        report_clearing(err, present)?;
    }
    writeln!(err, "{} {}", "Profiles active:".bold(), names.join(" "))?;
    writeln!(err, "{}", "Setting:".bold())?;
    for (name, value) in &selected {
        writeln!(err, "    {}: {}", name, value)?;
    }

    if let Some(resolved) = resolved {
        if let Some(block) = present
            .as_ref()
            .and_then(|present| shell::clear_block(shell, present))
        {
            write!(out, "{}", block)?;
        }
        write!(out, "{}", shell::set_block(shell, &names, &resolved))?;
    }

    Ok(())
}

fn list(env_config: &EnvConfig, err: &mut dyn Write) -> Result<()> {
    writeln!(err, "{}", "Profiles:".bold())?;
    for name in env_config.config().profile_names() {
        writeln!(err, "    {}", name)?;
    }
    writeln!(err, "{}", "Groups:".bold())?;
    for name in env_config.config().group_names() {
        writeln!(err, "    {}", name)?;
    }
    Ok(())
}

fn show_active(env_config: &EnvConfig, active: Option<&str>, err: &mut dyn Write) -> Result<()> {
    let names: Vec<&str> = active.unwrap_or_default().split_whitespace().collect();
    if names.is_empty() {
        writeln!(err, "No env-config profiles currently in use.")?;
        return Ok(());
    }

    writeln!(err, "{} {}", "Profiles active:".bold(), names.join(" "))?;
    writeln!(err, "{}", "Active profile(s) configuration:".bold())?;
    for (name, value) in env_config.select(&names)? {
        writeln!(err, "    {}: {}", name, value)?;
    }
    Ok(())
}

fn report_clearing(err: &mut dyn Write, present: &BTreeSet<String>) -> Result<()> {
    writeln!(err, "{}", "Clearing:".bold())?;
    if present.is_empty() {
        writeln!(err, "    No configured vars present to clear.")?;
    } else {
        let names: Vec<&str> = present.iter().map(String::as_str).collect();
        writeln!(err, "    {}", names.join(", "))?;
    }
    Ok(())
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}
