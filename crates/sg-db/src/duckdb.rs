//! Embedded DuckDB backend

use crate::dialect::{Dialect, Namespace};
use crate::error::{DbError, DbResult};
use crate::traits::{append_extension, Backend, SessionFactory, SqlConnection, VERSION_TABLE};
use crate::value::{Row, Value};
use duckdb::Connection;
use sg_core::{DatabaseConfig, DbType};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const MEMORY_PATH: &str = ":memory:";

/// One open database per backend; every connection handed out is a clone of
/// the root so the file is never opened twice in the same process
struct SharedDatabase {
    path: String,
    root: Mutex<Option<Connection>>,
}

impl SharedDatabase {
    fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    fn is_open(&self) -> bool {
        self.root.lock().map(|root| root.is_some()).unwrap_or(false)
    }

    fn connect(&self) -> DbResult<Connection> {
        let mut root = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;

        let conn = match root.take() {
            Some(conn) => conn,
            None if self.is_memory() => Connection::open_in_memory()
                .map_err(|e| DbError::ConnectionError(e.to_string()))?,
            None => Connection::open(&self.path)
                .map_err(|e| DbError::ConnectionError(format!("{}: {}", self.path, e)))?,
        };
        let clone = conn.try_clone();
        *root = Some(conn);
        clone.map_err(|e| DbError::ConnectionError(e.to_string()))
    }
}

/// DuckDB database backend
pub struct DuckDbBackend {
    db: Arc<SharedDatabase>,
    namespace: Namespace,
}

impl DuckDbBackend {
    /// Backend for the configured file, or the override descriptor
    pub fn new(config: &DatabaseConfig) -> Self {
        let path = config
            .override_connection_string
            .clone()
            .unwrap_or_else(|| config.effective_path());
        Self::from_path(path)
    }

    /// Backend over a private in-memory database
    pub fn in_memory() -> Self {
        Self::from_path(MEMORY_PATH)
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            db: Arc::new(SharedDatabase {
                path: path.into(),
                root: Mutex::new(None),
            }),
            namespace: Namespace::new(Dialect::DuckDb, None),
        }
    }

    pub fn path(&self) -> &str {
        &self.db.path
    }

    fn parent_dir(&self) -> Option<&Path> {
        Path::new(&self.db.path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

impl Backend for DuckDbBackend {
    type Conn = Connection;

    fn db_type(&self) -> DbType {
        DbType::DuckDb
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn connection_string(&self) -> String {
        self.db.path.clone()
    }

    fn test_connection_string(&self) -> String {
        self.db.path.clone()
    }

    fn test_connection(&self) -> bool {
        if self.db.is_memory() || self.db.is_open() {
            return true;
        }
        self.parent_dir().map(Path::is_dir).unwrap_or(true)
    }

    fn database_exists(&self) -> bool {
        self.db.is_memory() || Path::new(&self.db.path).exists()
    }

    fn create_database(&self) -> DbResult<()> {
        if self.database_exists() {
            return Ok(());
        }
        if let Some(parent) = self.parent_dir() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::ConnectionError(format!("{}: {}", parent.display(), e))
            })?;
        }
        self.db.connect().map(|_| ())
    }

    fn has_version_table(&self) -> DbResult<bool> {
        let mut conn = self.db.connect()?;
        Ok(conn.query_count(&self.namespace.table_exists_sql(VERSION_TABLE))? > 0)
    }

    fn connect(&self) -> DbResult<Connection> {
        self.db.connect()
    }

    fn backup(&self, target: &Path) -> DbResult<PathBuf> {
        if self.db.is_memory() {
            return Err(DbError::NotImplemented {
                backend: "duckdb".to_string(),
                feature: "backup of an in-memory database".to_string(),
            });
        }

        // Flush the write-ahead log so the copied file is complete
        self.db.connect()?.execute_batch("CHECKPOINT")?;

        let dest = append_extension(target, "duckdb");
        std::fs::copy(&self.db.path, &dest)
            .map_err(|e| DbError::BackupFailed(format!("{}: {}", dest.display(), e)))?;
        Ok(dest)
    }

    fn session_factory(&self) -> SessionFactory<Connection> {
        let db = Arc::clone(&self.db);
        SessionFactory::new(self.connection_string(), move || db.connect())
    }
}

impl SqlConnection for Connection {
    fn execute_sql(&mut self, sql: &str) -> DbResult<()> {
        self.execute_batch(sql).map_err(DbError::from)
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        // DuckDB panics on `stmt.column_count()` before execution, so the
        // count is read from each row's statement instead.
        let rows = stmt.query_map([], |row| {
            let col_count = row.as_ref().column_count();
            Ok((0..col_count).map(|i| read_value(row, i)).collect::<Row>())
        })?;
        let collected = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(collected)
    }
}

/// Read a cell by trying the common storage types in turn
fn read_value(row: &duckdb::Row<'_>, idx: usize) -> Value {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return Value::Text(s);
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return Value::Int(n);
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return Value::Float(f);
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return Value::Bool(b);
    }
    Value::Null
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
