//! `stvd inspect` — Show a container's lifecycle timestamps.

use clap::Args;
use stevedore_common::config::StevedoreConfig;
use stevedore_common::types::ContainerId;
use stevedore_runtime::teardown::TeardownService;

use crate::output::format_timestamp;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Container ID.
    pub container: String,

    /// Print RFC 3339 timestamps as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `inspect` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or its timestamps are malformed.
pub fn execute(args: InspectArgs, config: &StevedoreConfig) -> anyhow::Result<()> {
    let id = ContainerId::parse(args.container)?;
    let service = TeardownService::from_config(config);
    let ts = service
        .container_timestamps(&id)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if args.json {
        let value = serde_json::json!({
            "id": id.as_str(),
            "created": ts.created.to_rfc3339(),
            "started": ts.started.to_rfc3339(),
            "finished": ts.finished.to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{:<10} {id}", "ID");
    println!("{:<10} {}", "CREATED", format_timestamp(&ts.created));
    println!("{:<10} {}", "STARTED", format_timestamp(&ts.started));
    println!("{:<10} {}", "FINISHED", format_timestamp(&ts.finished));
    Ok(())
}
