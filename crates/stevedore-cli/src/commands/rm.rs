//! `stvd rm` — Remove containers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use stevedore_common::config::StevedoreConfig;
use stevedore_common::types::ContainerId;
use stevedore_runtime::cleanup::CleanupInfo;
use stevedore_runtime::teardown::TeardownService;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container IDs to remove.
    #[arg(required = true)]
    pub containers: Vec<String>,

    /// JSON file mapping container IDs to the cleanup info recorded at creation.
    #[arg(long)]
    pub cleanup_file: Option<PathBuf>,

    /// Skip the sweep of leftovers from previous runs.
    #[arg(long)]
    pub no_sweep: bool,
}

/// Executes the `rm` command.
///
/// Every container is attempted; the command fails if any removal failed.
///
/// # Errors
///
/// Returns an error if an ID is invalid, the cleanup file cannot be read,
/// or any removal fails.
pub fn execute(args: RmArgs, config: &StevedoreConfig) -> anyhow::Result<()> {
    let ids = args
        .containers
        .iter()
        .map(|c| ContainerId::parse(c.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let service = TeardownService::from_config(config);
    if !args.no_sweep {
        service.startup_sweep();
    }
    if let Some(path) = &args.cleanup_file {
        for (id, info) in load_cleanup_file(path)? {
            service.register_cleanup(id, info);
        }
    }

    let mut failed = 0usize;
    for id in &ids {
        match service.remove_container(id) {
            Ok(_) => println!("{id}"),
            Err(e) => {
                failed += 1;
                eprintln!("Error: {e}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} container(s) could not be removed", ids.len());
    }
    Ok(())
}

fn load_cleanup_file(path: &Path) -> anyhow::Result<Vec<(ContainerId, CleanupInfo)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading cleanup file {}", path.display()))?;
    let infos: HashMap<String, CleanupInfo> = serde_json::from_str(&content)
        .with_context(|| format!("parsing cleanup file {}", path.display()))?;
    infos
        .into_iter()
        .map(|(id, info)| -> anyhow::Result<_> { Ok((ContainerId::parse(id)?, info)) })
        .collect()
}
