//! What a backend's schema consists of.
//!
//! A [`SchemaCatalog`] is static per-backend data: the ledger table, its
//! upgrade, the initial tables, and the ordered patch list. [`InitialData`]
//! seeds baseline rows once the schema is current.

use crate::error::EngineResult;
use sg_core::{MigrationCommand, StatusReporter};
use sg_db::{Backend, SqlConnection, VERSION_TABLE};

/// Per-backend command lists
pub trait SchemaCatalog<B: Backend> {
    /// Version-0 commands creating the ledger table
    fn version_table(&self) -> Vec<MigrationCommand<B::Conn>>;

    /// Version-0 commands adding the revision, command and program columns
    fn ledger_upgrade(&self) -> Vec<MigrationCommand<B::Conn>>;

    /// Whether the ledger table still lacks its revision column
    fn ledger_needs_upgrade(&self, backend: &B, conn: &mut B::Conn) -> EngineResult<bool> {
        let sql = backend
            .namespace()
            .column_exists_sql(VERSION_TABLE, "VersionRevision");
        Ok(conn.query_count(&sql)? == 0)
    }

    /// Tables of a fresh install
    fn create_tables(&self) -> Vec<MigrationCommand<B::Conn>>;

    /// Upgrades applied on every start
    fn patches(&self) -> Vec<MigrationCommand<B::Conn>>;

    /// Move a legacy ledger table into place before it is read.
    ///
    /// Returns true when a rename happened, which marks an install whose
    /// other tables also need [`Self::legacy_table_repairs`].
    fn repair_ledger_table(&self, _backend: &B, _conn: &mut B::Conn) -> EngineResult<bool> {
        Ok(false)
    }

    /// Version-0 commands run after table creation, only on the start where
    /// [`Self::repair_ledger_table`] renamed the ledger
    fn legacy_table_repairs(&self) -> Vec<MigrationCommand<B::Conn>> {
        Vec::new()
    }

    /// Highest version any command brings the schema to
    fn required_version(&self) -> i32 {
        self.create_tables()
            .iter()
            .chain(self.patches().iter())
            .map(|c| c.version)
            .max()
            .unwrap_or(0)
    }
}

/// Baseline rows written after migration; each section checks for
/// existing rows itself
pub trait InitialData<B: Backend> {
    fn seed(&self, backend: &B, conn: &mut B::Conn, status: &dyn StatusReporter) -> EngineResult<()>;
}

/// No seed data
impl<B: Backend> InitialData<B> for () {
    fn seed(&self, _backend: &B, _conn: &mut B::Conn, _status: &dyn StatusReporter) -> EngineResult<()> {
        Ok(())
    }
}
