//! SQL Server catalog.
//!
//! A column with a default carries a named constraint that must go before
//! the column can be dropped, so the media column removal is preceded by a
//! coded step that finds and drops it.

use crate::catalog::RETIRED_MEDIA_COLUMNS;
use crate::steps;
use sg_core::{MigrationCommand, StepOutcome};
use sg_db::{Backend, DbResult, MssqlBackend, MssqlConnection, Namespace, SqlConnection};
use sg_engine::SchemaCatalog;

type Cmd = MigrationCommand<MssqlConnection>;

pub struct MssqlCatalog {
    namespace: Namespace,
}

impl MssqlCatalog {
    pub fn new(backend: &MssqlBackend) -> Self {
        Self {
            namespace: backend.namespace().clone(),
        }
    }
}

/// Lookup of the default constraint bound to `table.column`
pub(crate) fn default_constraint_sql(ns: &Namespace, table: &str, column: &str) -> String {
    format!(
        "SELECT d.name FROM sys.default_constraints d \
         INNER JOIN sys.columns c ON d.parent_object_id = c.object_id AND d.parent_column_id = c.column_id \
         WHERE d.parent_object_id = OBJECT_ID({}) AND c.name = {}",
        ns.literal(table),
        ns.literal(column)
    )
}

/// Drop the default constraint on `table.column` if one exists
fn drop_default_constraint(
    version: i32,
    revision: i32,
    ns: &Namespace,
    table: &'static str,
    column: &'static str,
) -> Cmd {
    let ns = ns.clone();
    let name = format!("DropDefaultConstraint {}.{}", table, column);
    Cmd::coded(version, revision, name, move |conn: &mut MssqlConnection| {
        StepOutcome::from_result(drop_constraint(conn, &ns, table, column))
    })
}

fn drop_constraint(
    conn: &mut MssqlConnection,
    ns: &Namespace,
    table: &str,
    column: &str,
) -> DbResult<StepOutcome> {
    let rows = conn.query_rows(&default_constraint_sql(ns, table, column))?;
    let Some(constraint) = rows.first().and_then(|r| r.first()).and_then(|v| v.as_text()) else {
        return Ok(StepOutcome::NotApplicable(format!("{}.{} has no default", table, column)));
    };
    conn.execute_sql(&format!(
        "ALTER TABLE {} DROP CONSTRAINT [{}]",
        table,
        constraint.replace(']', "]]")
    ))?;
    Ok(StepOutcome::Done)
}

impl SchemaCatalog<MssqlBackend> for MssqlCatalog {
    fn version_table(&self) -> Vec<Cmd> {
        vec![Cmd::raw(
            0,
            1,
            "CREATE TABLE [Versions]( [VersionsID] [int] IDENTITY(1,1) NOT NULL, [VersionType] [varchar](100) NOT NULL, [VersionValue] [varchar](100) NOT NULL, CONSTRAINT [PK_Versions] PRIMARY KEY CLUSTERED ( [VersionsID] ASC ) )",
        )]
    }

    fn ledger_upgrade(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(0, 2, "ALTER TABLE Versions ADD VersionRevision varchar(100) NULL"),
            Cmd::raw(0, 3, "ALTER TABLE Versions ADD VersionCommand nvarchar(max) NULL"),
            Cmd::raw(0, 4, "ALTER TABLE Versions ADD VersionProgram varchar(100) NULL"),
            Cmd::raw(0, 5, "CREATE INDEX IX_Versions_VersionType ON Versions(VersionType,VersionValue,VersionRevision)"),
        ]
    }

    fn create_tables(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(1, 1, "CREATE TABLE Users( UserID int IDENTITY(1,1) NOT NULL, Username nvarchar(100) NULL, Password nvarchar(150) NULL, IsAdmin int NOT NULL, IsAniDBUser int NOT NULL, IsTraktUser int NOT NULL, HideCategories nvarchar(max) NULL, CanEditServerSettings int NULL, CONSTRAINT [PK_Users] PRIMARY KEY CLUSTERED ( UserID ASC ) )"),
            Cmd::raw(1, 2, "CREATE TABLE CustomTag( CustomTagID int IDENTITY(1,1) NOT NULL, TagName nvarchar(500) NULL, TagDescription nvarchar(max) NULL, CONSTRAINT [PK_CustomTag] PRIMARY KEY CLUSTERED ( CustomTagID ASC ) )"),
            Cmd::raw(1, 3, "CREATE UNIQUE INDEX UIX_CustomTag_TagName ON CustomTag(TagName)"),
            Cmd::raw(1, 4, "CREATE TABLE FilterPreset( FilterPresetID int IDENTITY(1,1) NOT NULL, Name nvarchar(250) NOT NULL, Locked int NOT NULL, ApplyAtSeriesLevel int NOT NULL, FilterType int NOT NULL, Hidden int NOT NULL, CONSTRAINT [PK_FilterPreset] PRIMARY KEY CLUSTERED ( FilterPresetID ASC ) )"),
            Cmd::raw(1, 5, "CREATE TABLE ImportFolder( ImportFolderID int IDENTITY(1,1) NOT NULL, ImportFolderName nvarchar(500) NOT NULL, ImportFolderLocation nvarchar(500) NOT NULL, IsDropSource int NOT NULL, IsDropDestination int NOT NULL, IsWatched int NOT NULL, CONSTRAINT [PK_ImportFolder] PRIMARY KEY CLUSTERED ( ImportFolderID ASC ) )"),
            Cmd::raw(1, 6, "CREATE INDEX IX_ImportFolder_Location ON ImportFolder(ImportFolderLocation)"),
            Cmd::raw(1, 7, "CREATE TABLE VideoLocal( VideoLocalID int IDENTITY(1,1) NOT NULL, Hash nvarchar(50) NOT NULL, FileSize bigint NOT NULL, DateTimeCreated datetime NOT NULL, MediaBlob varbinary(max) NULL, MediaVersion int NOT NULL DEFAULT 0, CONSTRAINT [PK_VideoLocal] PRIMARY KEY CLUSTERED ( VideoLocalID ASC ) )"),
        ]
    }

    fn patches(&self) -> Vec<Cmd> {
        let ns = &self.namespace;
        vec![
            Cmd::raw(2, 1, "ALTER TABLE Users ADD PlexToken nvarchar(max) NULL"),
            Cmd::raw(2, 2, "CREATE TABLE RenamerConfig( RenamerConfigID int IDENTITY(1,1) NOT NULL, Name nvarchar(250) NOT NULL, Type nvarchar(250) NOT NULL, Settings nvarchar(max) NULL, CONSTRAINT [PK_RenamerConfig] PRIMARY KEY CLUSTERED ( RenamerConfigID ASC ) )"),
            Cmd::raw(2, 3, "CREATE UNIQUE INDEX UIX_RenamerConfig_Name ON RenamerConfig(Name)"),
            drop_default_constraint(3, 1, ns, "VideoLocal", "MediaVersion"),
            steps::drop_columns_if_present(3, 2, ns, "VideoLocal", RETIRED_MEDIA_COLUMNS),
            steps::normalize_import_folders(3, 3, ns),
            Cmd::raw(4, 1, "CREATE INDEX IX_VideoLocal_Hash ON VideoLocal(Hash)"),
            Cmd::no_op(4, 2),
            steps::drop_index_if_present(4, 3, ns, "ImportFolder", "IX_ImportFolder_Location"),
            Cmd::raw(5, 1, "ALTER TABLE FilterPreset ADD Description nvarchar(max) NULL"),
            steps::describe_locked_presets(5, 2, ns),
        ]
    }
}

#[cfg(test)]
#[path = "mssql_test.rs"]
mod tests;
