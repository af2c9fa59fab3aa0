//! Migrate command implementation

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::{load_project, SpinnerStatus};

/// Execute the migrate command
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let status = SpinnerStatus::new(global.verbose);

    let result = sg_schema::initialize(&project.config, &project.root, &status);
    status.finish();
    let (report, session) = result.context("Database startup failed")?;

    println!(
        "Database ({}) ready: {}",
        session.db_type(),
        session.connection_string()
    );
    if report.created {
        println!("  Created new database");
    }
    if report.previous_version == report.final_version {
        println!("  Schema version {} (up to date)", report.final_version);
    } else {
        println!(
            "  Schema version {} -> {}",
            report.previous_version, report.final_version
        );
    }
    println!(
        "  {} applied, {} skipped, {} fixes run",
        report.applied, report.skipped, report.fixes_run
    );
    if report.backfilled > 0 {
        println!("  Backfilled {} ledger entries", report.backfilled);
    }
    if let Some(path) = &report.backup {
        println!("  Backup written to {}", path.display());
    }
    Ok(())
}
