//! PostgreSQL catalog.
//!
//! Statements are templates over `{{ schema }}` and `{{ owner }}`; every
//! object is created in the configured schema and handed to the owning
//! role. Most commands take their revision from the running counter.

use crate::catalog::RETIRED_MEDIA_COLUMNS;
use crate::steps;
use postgres::Client;
use sg_core::{render_commands, CoreResult, MigrationCommand, TemplateContext, AUTO_REVISION};
use sg_db::{Backend, PostgresBackend};
use sg_engine::SchemaCatalog;

type Cmd = MigrationCommand<Client>;

/// Session settings sent ahead of every statement
const PREAMBLE: &str = "SET statement_timeout = 0; SET lock_timeout = 0; SET client_encoding = 'UTF8'; SET client_min_messages = warning;\n";

const AUTO: i32 = AUTO_REVISION;

pub struct PostgresCatalog {
    version_table: Vec<Cmd>,
    ledger_upgrade: Vec<Cmd>,
    create_tables: Vec<Cmd>,
    patches: Vec<Cmd>,
}

impl PostgresCatalog {
    /// Render every command for the backend's schema and owner
    pub fn new(backend: &PostgresBackend) -> CoreResult<Self> {
        let ctx = TemplateContext::new(backend.schema(), backend.owner()).with_preamble(PREAMBLE);
        let ns = backend.namespace();

        Ok(Self {
            version_table: render_commands(&ctx, version_table(), true)?,
            ledger_upgrade: render_commands(&ctx, ledger_upgrade(), true)?,
            create_tables: render_commands(&ctx, create_tables(), true)?,
            patches: render_commands(
                &ctx,
                vec![
                    Cmd::raw(2, AUTO, "ALTER TABLE {{ schema }}.Users ADD COLUMN PlexToken TEXT;"),
                    Cmd::raw(2, AUTO, "CREATE TABLE {{ schema }}.RenamerConfig ( RenamerConfigID SERIAL PRIMARY KEY, Name VARCHAR(250) NOT NULL, Type VARCHAR(250) NOT NULL, Settings TEXT ); ALTER TABLE {{ schema }}.RenamerConfig OWNER TO {{ owner }};"),
                    Cmd::raw(2, AUTO, "CREATE UNIQUE INDEX UIX_RenamerConfig_Name ON {{ schema }}.RenamerConfig(Name);"),
                    steps::drop_columns_if_present(3, AUTO, ns, "VideoLocal", RETIRED_MEDIA_COLUMNS),
                    steps::normalize_import_folders(3, AUTO, ns),
                    Cmd::raw(4, AUTO, "CREATE INDEX IX_VideoLocal_Hash ON {{ schema }}.VideoLocal(Hash);"),
                    Cmd::no_op(4, AUTO),
                    steps::drop_index_if_present(4, AUTO, ns, "ImportFolder", "IX_ImportFolder_Location"),
                    Cmd::raw(5, AUTO, "ALTER TABLE {{ schema }}.FilterPreset ADD COLUMN Description TEXT;"),
                    steps::describe_locked_presets(5, AUTO, ns),
                ],
                true,
            )?,
        })
    }
}

fn version_table() -> Vec<Cmd> {
    vec![Cmd::raw(
        0,
        1,
        "CREATE TABLE IF NOT EXISTS {{ schema }}.Versions ( VersionsID SERIAL PRIMARY KEY, VersionType VARCHAR(100) NOT NULL, VersionValue VARCHAR(100) NOT NULL ); ALTER TABLE {{ schema }}.Versions OWNER TO {{ owner }};",
    )]
}

fn ledger_upgrade() -> Vec<Cmd> {
    vec![
        Cmd::raw(0, 2, "ALTER TABLE {{ schema }}.Versions ADD COLUMN IF NOT EXISTS VersionRevision VARCHAR(100);"),
        Cmd::raw(0, 3, "ALTER TABLE {{ schema }}.Versions ADD COLUMN IF NOT EXISTS VersionCommand TEXT;"),
        Cmd::raw(0, 4, "ALTER TABLE {{ schema }}.Versions ADD COLUMN IF NOT EXISTS VersionProgram VARCHAR(100);"),
        Cmd::raw(0, 5, "CREATE INDEX IF NOT EXISTS IX_Versions_VersionType ON {{ schema }}.Versions(VersionType, VersionValue, VersionRevision);"),
    ]
}

fn create_tables() -> Vec<Cmd> {
    vec![
        Cmd::raw(1, AUTO, "CREATE TABLE {{ schema }}.Users ( UserID SERIAL PRIMARY KEY, Username VARCHAR(100), Password VARCHAR(150), IsAdmin INT NOT NULL, IsAniDBUser INT NOT NULL, IsTraktUser INT NOT NULL, HideCategories TEXT, CanEditServerSettings INT ); ALTER TABLE {{ schema }}.Users OWNER TO {{ owner }};"),
        Cmd::raw(1, AUTO, "CREATE TABLE {{ schema }}.CustomTag ( CustomTagID SERIAL PRIMARY KEY, TagName VARCHAR(500), TagDescription TEXT ); ALTER TABLE {{ schema }}.CustomTag OWNER TO {{ owner }};"),
        Cmd::raw(1, AUTO, "CREATE UNIQUE INDEX UIX_CustomTag_TagName ON {{ schema }}.CustomTag(TagName);"),
        Cmd::raw(1, AUTO, "CREATE TABLE {{ schema }}.FilterPreset ( FilterPresetID SERIAL PRIMARY KEY, Name VARCHAR(250) NOT NULL, Locked INT NOT NULL, ApplyAtSeriesLevel INT NOT NULL, FilterType INT NOT NULL, Hidden INT NOT NULL ); ALTER TABLE {{ schema }}.FilterPreset OWNER TO {{ owner }};"),
        Cmd::raw(1, AUTO, "CREATE TABLE {{ schema }}.ImportFolder ( ImportFolderID SERIAL PRIMARY KEY, ImportFolderName VARCHAR(500) NOT NULL, ImportFolderLocation VARCHAR(500) NOT NULL, IsDropSource INT NOT NULL, IsDropDestination INT NOT NULL, IsWatched INT NOT NULL ); ALTER TABLE {{ schema }}.ImportFolder OWNER TO {{ owner }};"),
        Cmd::raw(1, AUTO, "CREATE INDEX IX_ImportFolder_Location ON {{ schema }}.ImportFolder(ImportFolderLocation);"),
        Cmd::raw(1, AUTO, "CREATE TABLE {{ schema }}.VideoLocal ( VideoLocalID SERIAL PRIMARY KEY, Hash VARCHAR(50) NOT NULL, FileSize BIGINT NOT NULL, DateTimeCreated TIMESTAMP NOT NULL, MediaBlob BYTEA, MediaVersion INT NOT NULL DEFAULT 0 ); ALTER TABLE {{ schema }}.VideoLocal OWNER TO {{ owner }};"),
    ]
}

impl SchemaCatalog<PostgresBackend> for PostgresCatalog {
    fn version_table(&self) -> Vec<Cmd> {
        self.version_table.clone()
    }

    fn ledger_upgrade(&self) -> Vec<Cmd> {
        self.ledger_upgrade.clone()
    }

    fn create_tables(&self) -> Vec<Cmd> {
        self.create_tables.clone()
    }

    fn patches(&self) -> Vec<Cmd> {
        self.patches.clone()
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
