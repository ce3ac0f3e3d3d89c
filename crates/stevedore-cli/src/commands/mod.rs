//! CLI command definitions and dispatch.

pub mod inspect;
pub mod rm;
pub mod sweep;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stevedore_common::config::StevedoreConfig;
use stevedore_common::constants::{BIN_NAME, DATA_DIR_ENV};

/// Stevedore — container teardown coordinator.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory; overrides the configuration file.
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    /// Resolves the runtime configuration from flags, environment, and file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn resolve_config(&self) -> anyhow::Result<StevedoreConfig> {
        if let Some(dir) = &self.data_dir {
            return Ok(StevedoreConfig::with_data_dir(dir));
        }
        match &self.config {
            Some(path) => StevedoreConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display())),
            None => Ok(StevedoreConfig::default()),
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove one or more containers.
    Rm(rm::RmArgs),
    /// Show a container's lifecycle timestamps.
    Inspect(inspect::InspectArgs),
    /// Release cleanup leftovers from previous runs.
    Sweep(sweep::SweepArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration resolved");
    match cli.command {
        Command::Rm(args) => rm::execute(args, &config),
        Command::Inspect(args) => inspect::execute(args, &config),
        Command::Sweep(args) => sweep::execute(args, &config),
    }
}
