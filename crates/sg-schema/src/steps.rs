//! Coded steps and deferred fixes shared by every catalog.
//!
//! Each builder returns a command whose callback introspects the live
//! catalog through the backend's [`Namespace`], so the same step works on
//! every engine and stays idempotent on installs that already changed.

use sg_core::{MigrationCommand, StepOutcome};
use sg_db::{DbResult, Namespace, SqlConnection};

/// Presets every install must have, with the description they carry
pub(crate) const LOCKED_PRESETS: &[(&str, &str)] = &[
    ("All", "Every series in the collection"),
    ("Continue Watching", "Series with an episode in progress"),
];

fn exists<C: SqlConnection>(conn: &mut C, sql: &str) -> DbResult<bool> {
    Ok(conn.query_count(sql)? > 0)
}

/// Drop each of `columns` that still exists on `table`
pub(crate) fn drop_columns_if_present<C: SqlConnection + 'static>(
    version: i32,
    revision: i32,
    ns: &Namespace,
    table: &'static str,
    columns: &'static [&'static str],
) -> MigrationCommand<C> {
    let ns = ns.clone();
    let name = format!("DropColumns {}({})", table, columns.join(", "));
    MigrationCommand::coded(version, revision, name, move |conn: &mut C| {
        StepOutcome::from_result(drop_columns(conn, &ns, table, columns))
    })
}

fn drop_columns<C: SqlConnection>(
    conn: &mut C,
    ns: &Namespace,
    table: &str,
    columns: &[&str],
) -> DbResult<StepOutcome> {
    let mut dropped = 0;
    for column in columns {
        if exists(conn, &ns.column_exists_sql(table, column))? {
            conn.execute_sql(&ns.drop_column_sql(table, column))?;
            dropped += 1;
        }
    }
    if dropped == 0 {
        return Ok(StepOutcome::NotApplicable(format!(
            "{} columns already removed",
            table
        )));
    }
    Ok(StepOutcome::Done)
}

/// Drop `index` from `table` when it exists
pub(crate) fn drop_index_if_present<C: SqlConnection + 'static>(
    version: i32,
    revision: i32,
    ns: &Namespace,
    table: &'static str,
    index: &'static str,
) -> MigrationCommand<C> {
    let ns = ns.clone();
    let name = format!("DropIndex {}.{}", table, index);
    MigrationCommand::coded(version, revision, name, move |conn: &mut C| {
        StepOutcome::from_result(drop_index(conn, &ns, table, index))
    })
}

fn drop_index<C: SqlConnection>(
    conn: &mut C,
    ns: &Namespace,
    table: &str,
    index: &str,
) -> DbResult<StepOutcome> {
    if !exists(conn, &ns.index_exists_sql(table, index))? {
        return Ok(StepOutcome::NotApplicable(format!("{} not present", index)));
    }
    conn.execute_sql(&ns.drop_index_sql(&ns.table(table), index))?;
    Ok(StepOutcome::Done)
}

/// Import folder locations end with exactly one separator and carry no
/// surrounding whitespace
pub(crate) fn normalize_location(location: &str) -> String {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let separator = if trimmed.contains('\\') && !trimmed.contains('/') {
        '\\'
    } else {
        '/'
    };
    format!("{}{}", trimmed.trim_end_matches(['/', '\\']), separator)
}

/// Rewrite import folder locations into their normalized form
pub(crate) fn normalize_import_folders<C: SqlConnection + 'static>(
    version: i32,
    revision: i32,
    ns: &Namespace,
) -> MigrationCommand<C> {
    let ns = ns.clone();
    MigrationCommand::fix(
        version,
        revision,
        "NormalizeImportFolderLocations",
        move |conn: &mut C| StepOutcome::from_result(normalize_folders(conn, &ns)),
    )
}

fn normalize_folders<C: SqlConnection>(conn: &mut C, ns: &Namespace) -> DbResult<StepOutcome> {
    let table = ns.table("ImportFolder");
    let rows = conn.query_rows(&format!(
        "SELECT ImportFolderID, ImportFolderLocation FROM {}",
        table
    ))?;

    let mut changed = 0;
    for row in rows {
        let id = row.first().and_then(|v| v.as_i64());
        let location = row.get(1).and_then(|v| v.as_text());
        let (Some(id), Some(location)) = (id, location) else {
            continue;
        };
        let normalized = normalize_location(&location);
        if normalized != location {
            conn.execute_sql(&format!(
                "UPDATE {} SET ImportFolderLocation = {} WHERE ImportFolderID = {}",
                table,
                ns.literal(&normalized),
                id
            ))?;
            changed += 1;
        }
    }
    log::debug!("Normalized {} import folder locations", changed);
    Ok(StepOutcome::Done)
}

/// Give the locked presets their descriptions where none is set
pub(crate) fn describe_locked_presets<C: SqlConnection + 'static>(
    version: i32,
    revision: i32,
    ns: &Namespace,
) -> MigrationCommand<C> {
    let ns = ns.clone();
    MigrationCommand::fix(
        version,
        revision,
        "DescribeLockedFilterPresets",
        move |conn: &mut C| StepOutcome::from_result(describe_presets(conn, &ns)),
    )
}

fn describe_presets<C: SqlConnection>(conn: &mut C, ns: &Namespace) -> DbResult<StepOutcome> {
    for (name, description) in LOCKED_PRESETS {
        conn.execute_sql(&format!(
            "UPDATE {} SET Description = {} WHERE Name = {} AND Locked = 1 AND Description IS NULL",
            ns.table("FilterPreset"),
            ns.literal(description),
            ns.literal(name)
        ))?;
    }
    Ok(StepOutcome::Done)
}

#[cfg(test)]
#[path = "steps_test.rs"]
mod tests;
