//! Backup command implementation

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::{load_project, SpinnerStatus};

/// Execute the backup command
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let status = SpinnerStatus::new(global.verbose);

    let result = sg_schema::backup_now(&project.config, &project.root, &status);
    status.finish();
    let path = result.context("Backup failed")?;

    println!("Backup written to {}", path.display());
    Ok(())
}
