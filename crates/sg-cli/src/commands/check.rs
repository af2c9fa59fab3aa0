//! Check command implementation

use anyhow::{bail, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::load_project;

/// Execute the check command; unreachable exits non-zero
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let db = &project.config.database;

    if !sg_schema::check(&project.config, &project.root) {
        bail!("{} database is unreachable", db.db_type);
    }
    println!("{} database is reachable", db.db_type);
    Ok(())
}
