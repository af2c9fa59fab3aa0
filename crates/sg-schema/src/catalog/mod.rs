//! Per-backend command catalogs.
//!
//! Every catalog walks the same schema history; only the DDL dialect and
//! the engine-specific repairs differ. Version 5 is the current schema.

mod duckdb;
mod mssql;
mod mysql;
mod postgres;

pub use self::duckdb::DuckDbCatalog;
pub use self::mssql::MssqlCatalog;
pub use self::mysql::MySqlCatalog;
pub use self::postgres::PostgresCatalog;

/// Tables the schema owns, in creation order
pub const TABLES: &[&str] = &[
    "Users",
    "CustomTag",
    "FilterPreset",
    "ImportFolder",
    "VideoLocal",
    "RenamerConfig",
];

/// Columns removed from `VideoLocal` in version 3
pub(crate) const RETIRED_MEDIA_COLUMNS: &[&str] = &["MediaBlob", "MediaVersion"];
