//! sg-db - Backend adapters for schemagate
//!
//! This crate provides the `Backend` trait the migration engine drives and
//! one adapter per engine: embedded DuckDB, PostgreSQL, MySQL, and SQL
//! Server. Adapters own connection handling, existence checks, and backup;
//! they carry no migration policy.

pub mod dialect;
pub mod duckdb;
pub mod error;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod traits;
pub mod value;

pub use dialect::{Dialect, Namespace};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use mssql::{MssqlBackend, MssqlConnection};
pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;
pub use traits::{append_extension, Backend, SessionFactory, SqlConnection, VERSION_TABLE};
pub use value::{Row, Value};
