//! MySQL catalog.
//!
//! Installs from older releases may carry lower-cased table names on
//! case-sensitive servers. A lower-cased `versions` table marks such an
//! install: it is renamed before the ledger is read, and the remaining
//! tables are renamed once on that same start. The collation sweep reads the live catalog, so it is a
//! coded step.

use crate::catalog::{RETIRED_MEDIA_COLUMNS, TABLES};
use crate::steps;
use mysql::Conn;
use sg_core::{MigrationCommand, StepOutcome};
use sg_db::{Backend, DbResult, MySqlBackend, Namespace, Row, SqlConnection, VERSION_TABLE};
use sg_engine::{EngineResult, SchemaCatalog};

type Cmd = MigrationCommand<Conn>;

const CHARSET: &str = "utf8mb4";
const COLLATION: &str = "utf8mb4_unicode_ci";

pub struct MySqlCatalog {
    namespace: Namespace,
}

impl MySqlCatalog {
    pub fn new(backend: &MySqlBackend) -> Self {
        Self {
            namespace: backend.namespace().clone(),
        }
    }
}

/// Rename `lower` to `proper` when only the lower-cased table exists
fn rename_lowercase_table(revision: i32, ns: &Namespace, proper: &'static str) -> Cmd {
    let ns = ns.clone();
    Cmd::coded(0, revision, format!("RenameLegacyTable {}", proper), move |conn| {
        StepOutcome::from_result(rename_table(conn, &ns, proper))
    })
}

fn rename_table(conn: &mut Conn, ns: &Namespace, proper: &str) -> DbResult<StepOutcome> {
    let lower = proper.to_lowercase();
    if lower == proper
        || conn.query_count(&ns.table_exists_sql(proper))? > 0
        || conn.query_count(&ns.table_exists_sql(&lower))? == 0
    {
        return Ok(StepOutcome::NotApplicable(format!("{} already named", proper)));
    }
    conn.execute_sql(&format!("RENAME TABLE `{}` TO `{}`", lower, proper))?;
    Ok(StepOutcome::Done)
}

/// One `ALTER TABLE ... MODIFY` per column whose collation differs.
///
/// Rows are `(table, column, column type, is nullable)` from
/// `information_schema.COLUMNS`.
pub(crate) fn collation_fixes(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| {
            let cell = |i: usize| row.get(i).and_then(|v| v.as_text());
            let (table, column, column_type) = (cell(0)?, cell(1)?, cell(2)?);
            let nullable = cell(3).map(|n| n.eq_ignore_ascii_case("YES")).unwrap_or(true);
            Some(format!(
                "ALTER TABLE `{}` MODIFY `{}` {} CHARACTER SET {} COLLATE {} {}",
                table,
                column,
                column_type,
                CHARSET,
                COLLATION,
                if nullable { "NULL" } else { "NOT NULL" }
            ))
        })
        .collect()
}

fn fix_collations(conn: &mut Conn) -> DbResult<StepOutcome> {
    let rows = conn.query_rows(&format!(
        "SELECT TABLE_NAME, COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND COLLATION_NAME IS NOT NULL AND COLLATION_NAME <> '{}'",
        COLLATION
    ))?;
    let fixes = collation_fixes(&rows);
    if fixes.is_empty() {
        return Ok(StepOutcome::NotApplicable("all columns use the default collation".into()));
    }
    log::info!("Repairing collation on {} columns", fixes.len());
    for sql in &fixes {
        conn.execute_sql(sql)?;
    }
    Ok(StepOutcome::Done)
}

impl SchemaCatalog<MySqlBackend> for MySqlCatalog {
    fn version_table(&self) -> Vec<Cmd> {
        vec![Cmd::raw(
            0,
            1,
            "CREATE TABLE `Versions` ( `VersionsID` INT NOT NULL AUTO_INCREMENT, `VersionType` VARCHAR(100) NOT NULL, `VersionValue` VARCHAR(100) NOT NULL, PRIMARY KEY (`VersionsID`) ) ENGINE=InnoDB",
        )]
    }

    fn ledger_upgrade(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(0, 2, "ALTER TABLE `Versions` ADD `VersionRevision` VARCHAR(100) NULL"),
            Cmd::raw(0, 3, "ALTER TABLE `Versions` ADD `VersionCommand` TEXT NULL"),
            Cmd::raw(0, 4, "ALTER TABLE `Versions` ADD `VersionProgram` VARCHAR(100) NULL"),
            Cmd::raw(0, 5, "ALTER TABLE `Versions` ADD INDEX `IX_Versions_VersionType` (`VersionType`,`VersionValue`,`VersionRevision`)"),
        ]
    }

    fn create_tables(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(1, 1, "CREATE TABLE `Users` ( `UserID` INT NOT NULL AUTO_INCREMENT, `Username` VARCHAR(100), `Password` VARCHAR(150), `IsAdmin` INT NOT NULL, `IsAniDBUser` INT NOT NULL, `IsTraktUser` INT NOT NULL, `HideCategories` TEXT, `CanEditServerSettings` INT, PRIMARY KEY (`UserID`) ) ENGINE=InnoDB"),
            Cmd::raw(1, 2, "CREATE TABLE `CustomTag` ( `CustomTagID` INT NOT NULL AUTO_INCREMENT, `TagName` VARCHAR(500), `TagDescription` TEXT, PRIMARY KEY (`CustomTagID`) ) ENGINE=InnoDB"),
            Cmd::raw(1, 3, "ALTER TABLE `CustomTag` ADD UNIQUE INDEX `UIX_CustomTag_TagName` (`TagName`)"),
            Cmd::raw(1, 4, "CREATE TABLE `FilterPreset` ( `FilterPresetID` INT NOT NULL AUTO_INCREMENT, `Name` VARCHAR(250) NOT NULL, `Locked` INT NOT NULL, `ApplyAtSeriesLevel` INT NOT NULL, `FilterType` INT NOT NULL, `Hidden` INT NOT NULL, PRIMARY KEY (`FilterPresetID`) ) ENGINE=InnoDB"),
            Cmd::raw(1, 5, "CREATE TABLE `ImportFolder` ( `ImportFolderID` INT NOT NULL AUTO_INCREMENT, `ImportFolderName` VARCHAR(500) NOT NULL, `ImportFolderLocation` VARCHAR(500) NOT NULL, `IsDropSource` INT NOT NULL, `IsDropDestination` INT NOT NULL, `IsWatched` INT NOT NULL, PRIMARY KEY (`ImportFolderID`) ) ENGINE=InnoDB"),
            Cmd::raw(1, 6, "ALTER TABLE `ImportFolder` ADD INDEX `IX_ImportFolder_Location` (`ImportFolderLocation`)"),
            Cmd::raw(1, 7, "CREATE TABLE `VideoLocal` ( `VideoLocalID` INT NOT NULL AUTO_INCREMENT, `Hash` VARCHAR(50) NOT NULL, `FileSize` BIGINT NOT NULL, `DateTimeCreated` DATETIME NOT NULL, `MediaBlob` LONGBLOB NULL, `MediaVersion` INT NOT NULL DEFAULT 0, PRIMARY KEY (`VideoLocalID`) ) ENGINE=InnoDB"),
        ]
    }

    fn patches(&self) -> Vec<Cmd> {
        let ns = &self.namespace;
        vec![
            Cmd::raw(2, 1, "ALTER TABLE `Users` ADD `PlexToken` TEXT NULL"),
            Cmd::raw(2, 2, "CREATE TABLE `RenamerConfig` ( `RenamerConfigID` INT NOT NULL AUTO_INCREMENT, `Name` VARCHAR(250) NOT NULL, `Type` VARCHAR(250) NOT NULL, `Settings` TEXT NULL, PRIMARY KEY (`RenamerConfigID`) ) ENGINE=InnoDB"),
            Cmd::raw(2, 3, "ALTER TABLE `RenamerConfig` ADD UNIQUE INDEX `UIX_RenamerConfig_Name` (`Name`)"),
            steps::drop_columns_if_present(3, 1, ns, "VideoLocal", RETIRED_MEDIA_COLUMNS),
            steps::normalize_import_folders(3, 2, ns),
            Cmd::raw(4, 1, "ALTER TABLE `VideoLocal` ADD INDEX `IX_VideoLocal_Hash` (`Hash`)"),
            Cmd::coded(4, 2, "FixCollations", |conn: &mut Conn| {
                StepOutcome::from_result(fix_collations(conn))
            }),
            steps::drop_index_if_present(4, 3, ns, "ImportFolder", "IX_ImportFolder_Location"),
            Cmd::raw(5, 1, "ALTER TABLE `FilterPreset` ADD `Description` TEXT NULL"),
            steps::describe_locked_presets(5, 2, ns),
        ]
    }

    fn repair_ledger_table(&self, _backend: &MySqlBackend, conn: &mut Conn) -> EngineResult<bool> {
        let outcome = rename_table(conn, &self.namespace, VERSION_TABLE)?;
        Ok(outcome == StepOutcome::Done)
    }

    fn legacy_table_repairs(&self) -> Vec<Cmd> {
        TABLES
            .iter()
            .zip(1..)
            .map(|(table, revision)| rename_lowercase_table(revision, &self.namespace, *table))
            .collect()
    }
}

#[cfg(test)]
#[path = "mysql_test.rs"]
mod tests;
