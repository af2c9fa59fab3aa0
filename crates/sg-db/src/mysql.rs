//! MySQL / MariaDB backend

use crate::dialect::{Dialect, Namespace};
use crate::error::{DbError, DbResult};
use crate::traits::{append_extension, Backend, SessionFactory, SqlConnection, VERSION_TABLE};
use crate::value::{Row, Value};
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder};
use sg_core::{DatabaseConfig, DbType};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Database every server exposes, used before the target exists
const CATALOG_DB: &str = "information_schema";

/// MySQL database backend
pub struct MySqlBackend {
    config: DatabaseConfig,
    namespace: Namespace,
}

impl MySqlBackend {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            config: config.clone(),
            namespace: Namespace::new(Dialect::MySql, None),
        }
    }

    pub fn schema(&self) -> &str {
        &self.config.schema
    }

    /// Displayable descriptor; the password is never included
    fn descriptor(&self, database: &str) -> String {
        match &self.config.override_connection_string {
            Some(url) => url.clone(),
            None => format!(
                "mysql://{}@{}:{}/{}",
                self.config.username,
                self.config.host,
                self.config.effective_port(),
                database
            ),
        }
    }

    fn open(&self, database: &str) -> DbResult<Conn> {
        open(&self.config, database)
    }
}

fn open(config: &DatabaseConfig, database: &str) -> DbResult<Conn> {
    let opts: Opts = match &config.override_connection_string {
        Some(url) => Opts::from_url(url).map_err(|e| DbError::ConnectionError(e.to_string()))?,
        None => OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.effective_port())
            .user(Some(config.username.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(database.to_string()))
            .into(),
    };
    Conn::new(opts).map_err(|e| DbError::ConnectionError(e.to_string()))
}

impl Backend for MySqlBackend {
    type Conn = Conn;

    fn db_type(&self) -> DbType {
        DbType::MySql
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn connection_string(&self) -> String {
        self.descriptor(self.schema())
    }

    fn test_connection_string(&self) -> String {
        self.descriptor(CATALOG_DB)
    }

    fn test_connection(&self) -> bool {
        match self.open(CATALOG_DB) {
            Ok(mut conn) => conn.query_drop("select 1").is_ok(),
            Err(e) => {
                log::debug!("MySQL probe failed: {}", e);
                false
            }
        }
    }

    fn database_exists(&self) -> bool {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = {}",
            self.namespace.literal(self.schema())
        );
        match self.open(CATALOG_DB).and_then(|mut c| c.query_count(&sql)) {
            Ok(count) => count > 0,
            Err(e) => {
                log::debug!("MySQL database lookup failed: {}", e);
                false
            }
        }
    }

    fn create_database(&self) -> DbResult<()> {
        if self.database_exists() {
            return Ok(());
        }
        let mut conn = self.open(CATALOG_DB)?;
        conn.query_drop(format!(
            "CREATE DATABASE {} DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
            Dialect::MySql.quote_ident(self.schema())
        ))?;
        Ok(())
    }

    fn has_version_table(&self) -> DbResult<bool> {
        let mut conn = self.connect()?;
        Ok(conn.query_count(&self.namespace.table_exists_sql(VERSION_TABLE))? > 0)
    }

    fn connect(&self) -> DbResult<Conn> {
        self.open(self.schema())
    }

    /// Dump the schema with `mysqldump`; the password travels in the
    /// environment rather than on the command line
    fn backup(&self, target: &Path) -> DbResult<PathBuf> {
        let dest = append_extension(target, "sql");
        let output = Command::new("mysqldump")
            .arg("--host")
            .arg(&self.config.host)
            .arg("--port")
            .arg(self.config.effective_port().to_string())
            .arg("--user")
            .arg(&self.config.username)
            .arg("--single-transaction")
            .arg("--routines")
            .arg("--result-file")
            .arg(&dest)
            .arg(self.schema())
            .env("MYSQL_PWD", &self.config.password)
            .output()
            .map_err(|e| DbError::BackupFailed(format!("could not run mysqldump: {}", e)))?;

        if !output.status.success() {
            return Err(DbError::BackupFailed(format!(
                "mysqldump exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(dest)
    }

    fn session_factory(&self) -> SessionFactory<Conn> {
        let config = self.config.clone();
        SessionFactory::new(self.connection_string(), move || {
            open(&config, &config.schema)
        })
    }
}

impl SqlConnection for Conn {
    fn execute_sql(&mut self, sql: &str) -> DbResult<()> {
        self.query_drop(sql).map_err(DbError::from)
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let rows: Vec<mysql::Row> = self.query(sql)?;
        Ok(rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| row.as_ref(i).map(convert_value).unwrap_or(Value::Null))
                    .collect()
            })
            .collect())
    }
}

fn convert_value(value: &mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        mysql::Value::Int(n) => Value::Int(*n),
        mysql::Value::UInt(n) => match i64::try_from(*n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(n.to_string()),
        },
        mysql::Value::Float(f) => Value::Float(f64::from(*f)),
        mysql::Value::Double(f) => Value::Float(*f),
        mysql::Value::Date(y, mo, d, h, mi, s, _) => Value::Text(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            y, mo, d, h, mi, s
        )),
        mysql::Value::Time(neg, days, h, mi, s, _) => Value::Text(format!(
            "{}{}:{:02}:{:02}",
            if *neg { "-" } else { "" },
            u32::from(*h) + *days * 24,
            mi,
            s
        )),
    }
}

#[cfg(test)]
#[path = "mysql_test.rs"]
mod tests;
