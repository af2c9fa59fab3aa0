//! Persistence of the version ledger.

use crate::error::{EngineResult, MigrationError};
use sg_core::{LedgerEntry, VersionKey, DATABASE_VERSION_TYPE};
use sg_db::{Namespace, SqlConnection, VERSION_TABLE};

/// Reads and writes ledger rows on a live connection
pub trait VersionStore<C> {
    /// Every `Database` row, in insertion order
    fn load(&mut self, conn: &mut C) -> EngineResult<Vec<LedgerEntry>>;

    fn insert(&mut self, conn: &mut C, entry: &LedgerEntry) -> EngineResult<()>;

    /// Delete one row; an empty revision matches rows whose revision is NULL
    fn delete(&mut self, conn: &mut C, key: &VersionKey) -> EngineResult<()>;
}

/// Ledger store backed by the `Versions` table
#[derive(Debug, Clone)]
pub struct SqlVersionStore {
    namespace: Namespace,
}

impl SqlVersionStore {
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace }
    }

    fn table(&self) -> String {
        self.namespace.table(VERSION_TABLE)
    }

    fn type_filter(&self) -> String {
        format!("VersionType = {}", self.namespace.literal(DATABASE_VERSION_TYPE))
    }

    fn load_full<C: SqlConnection>(&self, conn: &mut C) -> sg_db::DbResult<Vec<LedgerEntry>> {
        let rows = conn.query_rows(&format!(
            "SELECT VersionValue, VersionRevision, VersionCommand, VersionProgram FROM {} WHERE {} ORDER BY VersionsID",
            self.table(),
            self.type_filter()
        ))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter().map(|v| v.as_text());
                let value = cells.next().flatten().unwrap_or_default();
                let revision = cells.next().flatten().unwrap_or_default();
                LedgerEntry {
                    version_type: DATABASE_VERSION_TYPE.to_string(),
                    key: VersionKey::new(value, revision),
                    command: cells.next().flatten(),
                    program: cells.next().flatten(),
                }
            })
            .collect())
    }

    /// Projection for ledgers that predate the revision columns
    fn load_coarse<C: SqlConnection>(&self, conn: &mut C) -> sg_db::DbResult<Vec<LedgerEntry>> {
        let rows = conn.query_rows(&format!(
            "SELECT VersionValue FROM {} WHERE {} ORDER BY VersionsID",
            self.table(),
            self.type_filter()
        ))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|v| LedgerEntry::legacy(v.as_text().unwrap_or_default()))
            .collect())
    }
}

impl<C: SqlConnection> VersionStore<C> for SqlVersionStore {
    /// Reads the coarse projection only when the revision column is missing;
    /// any other read failure is a ledger error
    fn load(&mut self, conn: &mut C) -> EngineResult<Vec<LedgerEntry>> {
        let revisions = conn
            .query_count(&self.namespace.column_exists_sql(VERSION_TABLE, "VersionRevision"))
            .map_err(|e| MigrationError::Ledger(format!("could not inspect ledger: {}", e)))?;
        let entries = if revisions > 0 {
            self.load_full(conn)
        } else {
            log::debug!("Ledger has no revision column, reading coarse ledger");
            self.load_coarse(conn)
        };
        entries.map_err(|e| MigrationError::Ledger(format!("could not read ledger: {}", e)))
    }

    fn insert(&mut self, conn: &mut C, entry: &LedgerEntry) -> EngineResult<()> {
        let text = |v: &Option<String>| match v {
            Some(s) => self.namespace.literal(s),
            None => "NULL".to_string(),
        };
        let sql = format!(
            "INSERT INTO {} (VersionType, VersionValue, VersionRevision, VersionCommand, VersionProgram) VALUES ({}, {}, {}, {}, {})",
            self.table(),
            self.namespace.literal(&entry.version_type),
            self.namespace.literal(&entry.key.value),
            self.namespace.literal(&entry.key.revision),
            text(&entry.command),
            text(&entry.program)
        );
        conn.execute_sql(&sql)
            .map_err(|e| MigrationError::Ledger(format!("could not record {}: {}", entry.key, e)))
    }

    fn delete(&mut self, conn: &mut C, key: &VersionKey) -> EngineResult<()> {
        let revision = if key.revision.is_empty() {
            "(VersionRevision IS NULL OR VersionRevision = '')".to_string()
        } else {
            format!("VersionRevision = {}", self.namespace.literal(&key.revision))
        };
        let sql = format!(
            "DELETE FROM {} WHERE {} AND VersionValue = {} AND {}",
            self.table(),
            self.type_filter(),
            self.namespace.literal(&key.value),
            revision
        );
        conn.execute_sql(&sql)
            .map_err(|e| MigrationError::Ledger(format!("could not delete {}: {}", key, e)))
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
