//! DuckDB catalog.
//!
//! DuckDB refuses to alter a table that carries an index, so identity
//! columns come from sequences without key constraints and every index is
//! created after the last ALTER of its table.

use crate::catalog::RETIRED_MEDIA_COLUMNS;
use crate::steps;
use duckdb::Connection;
use sg_core::MigrationCommand;
use sg_db::{Backend, DuckDbBackend, Namespace};
use sg_engine::SchemaCatalog;

type Cmd = MigrationCommand<Connection>;

pub struct DuckDbCatalog {
    namespace: Namespace,
}

impl DuckDbCatalog {
    pub fn new(backend: &DuckDbBackend) -> Self {
        Self {
            namespace: backend.namespace().clone(),
        }
    }
}

impl SchemaCatalog<DuckDbBackend> for DuckDbCatalog {
    fn version_table(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(
                0,
                1,
                "CREATE SEQUENCE IF NOT EXISTS seq_versions START 1; CREATE TABLE Versions ( VersionsID INTEGER NOT NULL DEFAULT nextval('seq_versions'), VersionType VARCHAR(100) NOT NULL, VersionValue VARCHAR(100) NOT NULL )",
            ),
        ]
    }

    fn ledger_upgrade(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(0, 2, "ALTER TABLE Versions ADD COLUMN VersionRevision VARCHAR(100)"),
            Cmd::raw(0, 3, "ALTER TABLE Versions ADD COLUMN VersionCommand VARCHAR"),
            Cmd::raw(0, 4, "ALTER TABLE Versions ADD COLUMN VersionProgram VARCHAR(100)"),
            Cmd::raw(
                0,
                5,
                "CREATE INDEX IX_Versions_VersionType ON Versions(VersionType, VersionValue, VersionRevision)",
            ),
        ]
    }

    fn create_tables(&self) -> Vec<Cmd> {
        vec![
            Cmd::raw(1, 1, "CREATE SEQUENCE IF NOT EXISTS seq_users START 1; CREATE SEQUENCE IF NOT EXISTS seq_customtag START 1; CREATE SEQUENCE IF NOT EXISTS seq_filterpreset START 1; CREATE SEQUENCE IF NOT EXISTS seq_importfolder START 1; CREATE SEQUENCE IF NOT EXISTS seq_videolocal START 1"),
            Cmd::raw(1, 2, "CREATE TABLE Users ( UserID INTEGER NOT NULL DEFAULT nextval('seq_users'), Username VARCHAR(100), Password VARCHAR(150), IsAdmin INTEGER NOT NULL, IsAniDBUser INTEGER NOT NULL, IsTraktUser INTEGER NOT NULL, HideCategories VARCHAR, CanEditServerSettings INTEGER )"),
            Cmd::raw(1, 3, "CREATE TABLE CustomTag ( CustomTagID INTEGER NOT NULL DEFAULT nextval('seq_customtag'), TagName VARCHAR(500), TagDescription VARCHAR )"),
            Cmd::raw(1, 4, "CREATE UNIQUE INDEX UIX_CustomTag_TagName ON CustomTag(TagName)"),
            Cmd::raw(1, 5, "CREATE TABLE FilterPreset ( FilterPresetID INTEGER NOT NULL DEFAULT nextval('seq_filterpreset'), Name VARCHAR(250) NOT NULL, Locked INTEGER NOT NULL, ApplyAtSeriesLevel INTEGER NOT NULL, FilterType INTEGER NOT NULL, Hidden INTEGER NOT NULL )"),
            Cmd::raw(1, 6, "CREATE TABLE ImportFolder ( ImportFolderID INTEGER NOT NULL DEFAULT nextval('seq_importfolder'), ImportFolderName VARCHAR(500) NOT NULL, ImportFolderLocation VARCHAR(500) NOT NULL, IsDropSource INTEGER NOT NULL, IsDropDestination INTEGER NOT NULL, IsWatched INTEGER NOT NULL )"),
            Cmd::raw(1, 7, "CREATE INDEX IX_ImportFolder_Location ON ImportFolder(ImportFolderLocation)"),
            Cmd::raw(1, 8, "CREATE TABLE VideoLocal ( VideoLocalID INTEGER NOT NULL DEFAULT nextval('seq_videolocal'), Hash VARCHAR(50) NOT NULL, FileSize BIGINT NOT NULL, DateTimeCreated TIMESTAMP NOT NULL, MediaBlob BLOB, MediaVersion INTEGER NOT NULL DEFAULT 0 )"),
        ]
    }

    fn patches(&self) -> Vec<Cmd> {
        let ns = &self.namespace;
        vec![
            Cmd::raw(2, 1, "ALTER TABLE Users ADD COLUMN PlexToken VARCHAR"),
            Cmd::raw(2, 2, "CREATE SEQUENCE IF NOT EXISTS seq_renamerconfig START 1"),
            Cmd::raw(2, 3, "CREATE TABLE RenamerConfig ( RenamerConfigID INTEGER NOT NULL DEFAULT nextval('seq_renamerconfig'), Name VARCHAR(250) NOT NULL, Type VARCHAR(250) NOT NULL, Settings VARCHAR )"),
            Cmd::raw(2, 4, "CREATE UNIQUE INDEX UIX_RenamerConfig_Name ON RenamerConfig(Name)"),
            steps::drop_columns_if_present(3, 1, ns, "VideoLocal", RETIRED_MEDIA_COLUMNS),
            steps::normalize_import_folders(3, 2, ns),
            Cmd::raw(4, 1, "CREATE INDEX IX_VideoLocal_Hash ON VideoLocal(Hash)"),
            Cmd::no_op(4, 2),
            steps::drop_index_if_present(4, 3, ns, "ImportFolder", "IX_ImportFolder_Location"),
            Cmd::raw(5, 1, "ALTER TABLE FilterPreset ADD COLUMN Description VARCHAR"),
            steps::describe_locked_presets(5, 2, ns),
        ]
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
