//! Status command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::load_project;

/// Execute the status command
pub fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let status = sg_schema::inspect(&project.config, &project.root)
        .context("Failed to read database status")?;

    if args.json {
        let json = serde_json::to_string_pretty(&status).context("Failed to serialize status")?;
        println!("{}", json);
        return Ok(());
    }

    println!("Database: {}", status.connection);
    if !status.database_exists {
        println!("  Not created yet");
    }
    println!("  Current version:  {}", status.current_version);
    println!("  Required version: {}", status.required_version);
    println!("  Pending commands: {}", status.pending);
    if status.newer_than_supported {
        println!(
            "  The database is newer than this release supports (version {} > {})",
            status.current_version, status.required_version
        );
    }
    Ok(())
}
