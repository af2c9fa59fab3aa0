//! sg-schema - Schema history and startup entry points for schemagate
//!
//! This crate holds the per-engine command catalogs, the coded steps and
//! deferred fixes they share, the baseline seed data, and the functions that
//! pick a backend from configuration and run the bootstrap against it.

pub mod catalog;
pub mod seed;
pub mod startup;
pub(crate) mod steps;

pub use catalog::{DuckDbCatalog, MssqlCatalog, MySqlCatalog, PostgresCatalog, TABLES};
pub use seed::{BaselineSeed, FAMILY_HIDDEN_CATEGORIES};
pub use startup::{backup_now, check, duckdb_backend, initialize, inspect, Session};
