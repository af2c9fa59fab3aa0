//! PostgreSQL backend

use crate::dialect::{Dialect, Namespace};
use crate::error::{DbError, DbResult};
use crate::traits::{Backend, SessionFactory, SqlConnection, VERSION_TABLE};
use crate::value::{Row, Value};
use postgres::{Client, NoTls, SimpleQueryMessage};
use sg_core::{DatabaseConfig, DbType};
use std::path::{Path, PathBuf};

/// Maintenance database every server has, used before the target exists
const MAINTENANCE_DB: &str = "postgres";

/// PostgreSQL database backend
///
/// Every object lives in an explicit schema named after the configured
/// schema (lower-cased) and is owned by the configured user.
pub struct PostgresBackend {
    config: DatabaseConfig,
    namespace: Namespace,
}

impl PostgresBackend {
    pub fn new(config: &DatabaseConfig) -> Self {
        let schema = config.schema.to_lowercase();
        Self {
            config: config.clone(),
            namespace: Namespace::new(Dialect::Postgres, Some(schema)),
        }
    }

    /// Lower-cased schema name; also the database name
    pub fn schema(&self) -> &str {
        self.namespace.schema().unwrap_or_default()
    }

    /// Role that owns the schema and every object in it
    pub fn owner(&self) -> &str {
        &self.config.username
    }

    fn descriptor(&self, dbname: &str) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} connect_timeout=10",
            quote_conninfo(&self.config.host),
            self.config.effective_port(),
            quote_conninfo(&self.config.username),
            quote_conninfo(&self.config.password),
            quote_conninfo(dbname)
        )
    }

    fn open_test(&self) -> DbResult<Client> {
        open(&self.test_connection_string())
    }
}

/// Quote a libpq key/value setting
fn quote_conninfo(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn open(descriptor: &str) -> DbResult<Client> {
    let config: postgres::Config = descriptor
        .parse()
        .map_err(|e: postgres::Error| DbError::ConnectionError(e.to_string()))?;
    config
        .connect(NoTls)
        .map_err(|e| DbError::ConnectionError(e.to_string()))
}

impl Backend for PostgresBackend {
    type Conn = Client;

    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn connection_string(&self) -> String {
        match &self.config.override_connection_string {
            Some(descriptor) => descriptor.clone(),
            None => self.descriptor(self.schema()),
        }
    }

    fn test_connection_string(&self) -> String {
        match &self.config.override_connection_string {
            Some(descriptor) => descriptor.clone(),
            None => self.descriptor(MAINTENANCE_DB),
        }
    }

    fn test_connection(&self) -> bool {
        match self.open_test() {
            Ok(mut client) => client.simple_query("SELECT 1").is_ok(),
            Err(e) => {
                log::debug!("PostgreSQL probe failed: {}", e);
                false
            }
        }
    }

    fn database_exists(&self) -> bool {
        let sql = format!(
            "SELECT COUNT(*) FROM pg_database WHERE datname = {}",
            self.namespace.literal(self.schema())
        );
        match self.open_test().and_then(|mut c| c.query_count(&sql)) {
            Ok(count) => count > 0,
            Err(e) => {
                log::debug!("PostgreSQL database lookup failed: {}", e);
                false
            }
        }
    }

    fn create_database(&self) -> DbResult<()> {
        if self.database_exists() {
            return Ok(());
        }

        // CREATE DATABASE cannot run inside a transaction block, so it goes
        // out as a statement of its own on the maintenance database
        let mut admin = self.open_test()?;
        admin.batch_execute(&format!(
            "CREATE DATABASE {} WITH OWNER = {} ENCODING = 'UTF8'",
            self.schema(),
            self.owner()
        ))?;

        let mut target = self.connect()?;
        target.batch_execute(&format!(
            "CREATE SCHEMA IF NOT EXISTS {schema} AUTHORIZATION {owner}; ALTER SCHEMA {schema} OWNER TO {owner};",
            schema = self.schema(),
            owner = self.owner()
        ))?;
        Ok(())
    }

    fn has_version_table(&self) -> DbResult<bool> {
        let mut client = self.connect()?;
        Ok(client.query_count(&self.namespace.table_exists_sql(VERSION_TABLE))? > 0)
    }

    fn connect(&self) -> DbResult<Client> {
        open(&self.connection_string())
    }

    fn backup(&self, _target: &Path) -> DbResult<PathBuf> {
        Err(DbError::NotImplemented {
            backend: "postgres".to_string(),
            feature: "backup".to_string(),
        })
    }

    fn session_factory(&self) -> SessionFactory<Client> {
        let descriptor = self.connection_string();
        SessionFactory::new(self.connection_string(), move || open(&descriptor))
    }
}

impl SqlConnection for Client {
    fn execute_sql(&mut self, sql: &str) -> DbResult<()> {
        self.batch_execute(sql).map_err(DbError::from)
    }

    /// Rows come back through the simple-query protocol, so every cell is text
    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let messages = self.simple_query(sql)?;
        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                rows.push(
                    (0..row.len())
                        .map(|i| match row.get(i) {
                            Some(text) => Value::Text(text.to_string()),
                            None => Value::Null,
                        })
                        .collect(),
                );
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
