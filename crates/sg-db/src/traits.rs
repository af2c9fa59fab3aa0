//! Backend adapter traits

use crate::dialect::Namespace;
use crate::error::{DbError, DbResult};
use crate::value::{Row, Value};
use sg_core::DbType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the version ledger table on every engine
pub const VERSION_TABLE: &str = "Versions";

/// Synchronous execution primitives on a native connection.
///
/// All DDL and DML issued during migration goes through these three shapes.
pub trait SqlConnection {
    /// Execute one or more statements, discarding any results
    fn execute_sql(&mut self, sql: &str) -> DbResult<()>;

    /// Execute a query and return every row
    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>>;

    /// First column of the first row, or NULL when there are no rows
    fn query_scalar(&mut self, sql: &str) -> DbResult<Value> {
        Ok(self
            .query_rows(sql)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(Value::Null))
    }

    /// Scalar query that must yield an integer, such as `SELECT COUNT(*)`
    fn query_count(&mut self, sql: &str) -> DbResult<i64> {
        let value = self.query_scalar(sql)?;
        value.as_i64().ok_or_else(|| {
            DbError::UnexpectedResult(format!("expected a number, got {}: {}", value, sql))
        })
    }
}

/// Per-engine adapter the migration engine drives.
///
/// Adapters build connection descriptors, answer existence questions, and
/// take backups. They hold no migration policy.
pub trait Backend {
    type Conn: SqlConnection;

    fn db_type(&self) -> DbType;

    /// How migrated tables are addressed on this engine
    fn namespace(&self) -> &Namespace;

    /// Descriptor for the target database
    fn connection_string(&self) -> String;

    /// Descriptor usable before the target database exists
    fn test_connection_string(&self) -> String;

    /// Best-effort reachability probe; false on any failure
    fn test_connection(&self) -> bool;

    /// Whether the target database exists; false on any failure
    fn database_exists(&self) -> bool;

    /// Create the target database; a no-op when it already exists
    fn create_database(&self) -> DbResult<()>;

    /// Whether the version ledger table exists in the target database
    fn has_version_table(&self) -> DbResult<bool>;

    /// Open a raw connection to the target database
    fn connect(&self) -> DbResult<Self::Conn>;

    fn execute(&self, conn: &mut Self::Conn, sql: &str) -> DbResult<()> {
        conn.execute_sql(sql)
    }

    fn execute_scalar(&self, conn: &mut Self::Conn, sql: &str) -> DbResult<Value> {
        conn.query_scalar(sql)
    }

    fn execute_query(&self, conn: &mut Self::Conn, sql: &str) -> DbResult<Vec<Row>> {
        conn.query_rows(sql)
    }

    /// Write a backup to `target` plus an engine-specific extension and
    /// return the written path
    fn backup(&self, target: &Path) -> DbResult<PathBuf>;

    /// Connection factory handed to the application once migration completes
    fn session_factory(&self) -> SessionFactory<Self::Conn>;
}

type Opener<C> = Arc<dyn Fn() -> DbResult<C> + Send + Sync>;

/// Opens new native connections to the migrated database
pub struct SessionFactory<C> {
    connection_string: String,
    opener: Opener<C>,
}

impl<C> SessionFactory<C> {
    pub fn new(
        connection_string: impl Into<String>,
        opener: impl Fn() -> DbResult<C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            opener: Arc::new(opener),
        }
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn open(&self) -> DbResult<C> {
        (self.opener)()
    }
}

impl<C> Clone for SessionFactory<C> {
    fn clone(&self) -> Self {
        Self {
            connection_string: self.connection_string.clone(),
            opener: Arc::clone(&self.opener),
        }
    }
}

impl<C> std::fmt::Debug for SessionFactory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("connection_string", &self.connection_string)
            .finish()
    }
}

/// `path` with `.ext` appended, keeping any dots already in the file name
pub fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_extension_keeps_existing_dots() {
        assert_eq!(
            append_extension(Path::new("/b/shoko_012_202401021304"), "sql"),
            PathBuf::from("/b/shoko_012_202401021304.sql")
        );
        assert_eq!(
            append_extension(Path::new("a.v1"), "bak"),
            PathBuf::from("a.v1.bak")
        );
    }

    #[test]
    fn session_factory_opens_through_closure() {
        let factory = SessionFactory::new("memory", || Ok(5_u8));
        let cloned = factory.clone();
        assert_eq!(cloned.connection_string(), "memory");
        assert_eq!(cloned.open().unwrap(), 5);
    }
}
