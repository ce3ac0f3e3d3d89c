//! `stvd sweep` — Release cleanup leftovers from previous runs.

use clap::Args;
use stevedore_common::config::StevedoreConfig;
use stevedore_runtime::teardown::TeardownService;

/// Arguments for the `sweep` command.
#[derive(Args, Debug)]
pub struct SweepArgs {}

/// Executes the `sweep` command.
///
/// Errors found during the sweep are logged, never returned.
///
/// # Errors
///
/// This command does not fail.
pub fn execute(_args: SweepArgs, config: &StevedoreConfig) -> anyhow::Result<()> {
    TeardownService::from_config(config).startup_sweep();
    Ok(())
}
