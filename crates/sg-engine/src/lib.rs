//! sg-engine - Migration engine for schemagate
//!
//! This crate applies versioned command lists through a [`sg_db::Backend`]:
//! ledger loading, idempotent dispatch, deferred fixes, legacy ledger
//! backfill, pre-upgrade backups, and the startup state machine that ties
//! them together.

pub(crate) mod backup;
pub(crate) mod bootstrap;
pub(crate) mod catalog;
pub(crate) mod engine;
pub(crate) mod error;
pub(crate) mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use backup::{backup_file_stem, BackupInvoker};
pub use bootstrap::{Bootstrap, BootstrapOptions, SchemaStatus, StartupReport, StartupState};
pub use catalog::{InitialData, SchemaCatalog};
pub use engine::{ApplyReport, MigrationEngine};
pub use error::{EngineResult, MigrationError};
pub use store::{SqlVersionStore, VersionStore};
