//! SQL Server backend
//!
//! tiberius is async-only; each connection carries its own current-thread
//! runtime so the adapter keeps the same blocking surface as the others.

use crate::dialect::{Dialect, Namespace};
use crate::error::{DbError, DbResult};
use crate::traits::{append_extension, Backend, SessionFactory, SqlConnection, VERSION_TABLE};
use crate::value::{Row, Value};
use sg_core::{DatabaseConfig, DbType};
use std::path::{Path, PathBuf};
use tiberius::{Client, ColumnData, Config};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Database every server has, used before the target exists
const MASTER_DB: &str = "master";

/// A blocking SQL Server connection
pub struct MssqlConnection {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
}

impl MssqlConnection {
    /// Connect using an ADO.NET style connection string
    pub fn open(ado: &str) -> DbResult<Self> {
        let config =
            Config::from_ado_string(ado).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        let client = runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            tcp.set_nodelay(true)
                .map_err(|e| DbError::ConnectionError(e.to_string()))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| DbError::ConnectionError(e.to_string()))
        })?;

        Ok(Self { runtime, client })
    }
}

impl SqlConnection for MssqlConnection {
    fn execute_sql(&mut self, sql: &str) -> DbResult<()> {
        let client = &mut self.client;
        self.runtime.block_on(async move {
            client.simple_query(sql).await?.into_results().await?;
            Ok(())
        })
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let client = &mut self.client;
        let rows = self
            .runtime
            .block_on(async move { client.simple_query(sql).await?.into_first_result().await })?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(convert_value).collect())
            .collect())
    }
}

/// Map a cell to a [`Value`]; temporal columns are never read back by
/// migrations and come through as NULL
fn convert_value(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(Some(n)) => Value::Int(i64::from(n)),
        ColumnData::I16(Some(n)) => Value::Int(i64::from(n)),
        ColumnData::I32(Some(n)) => Value::Int(i64::from(n)),
        ColumnData::I64(Some(n)) => Value::Int(n),
        ColumnData::F32(Some(f)) => Value::Float(f64::from(f)),
        ColumnData::F64(Some(f)) => Value::Float(f),
        ColumnData::Bit(Some(b)) => Value::Bool(b),
        ColumnData::String(Some(s)) => Value::Text(s.into_owned()),
        ColumnData::Guid(Some(g)) => Value::Text(g.to_string()),
        ColumnData::Numeric(Some(n)) => Value::Text(n.to_string()),
        ColumnData::Binary(Some(b)) => Value::Bytes(b.into_owned()),
        _ => Value::Null,
    }
}

/// SQL Server database backend
pub struct MssqlBackend {
    config: DatabaseConfig,
    namespace: Namespace,
}

impl MssqlBackend {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            config: config.clone(),
            namespace: Namespace::new(Dialect::SqlServer, None),
        }
    }

    pub fn schema(&self) -> &str {
        &self.config.schema
    }

    fn descriptor(&self, database: &str) -> String {
        format!(
            "Server=tcp:{},{};Database={};User Id={};Password={};TrustServerCertificate=true",
            self.config.host,
            self.config.effective_port(),
            database,
            quote_ado(&self.config.username),
            quote_ado(&self.config.password)
        )
    }

    fn open_master(&self) -> DbResult<MssqlConnection> {
        MssqlConnection::open(&self.test_connection_string())
    }

    fn backup_sql(&self, dest: &Path) -> String {
        format!(
            "BACKUP DATABASE {} TO DISK = {} WITH INIT",
            Dialect::SqlServer.quote_ident(self.schema()),
            self.namespace.literal(&dest.to_string_lossy())
        )
    }
}

/// Quote a connection-string value when it contains a separator or quote
fn quote_ado(value: &str) -> String {
    if value.contains([';', '\'', '"']) || value.trim() != value {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

impl Backend for MssqlBackend {
    type Conn = MssqlConnection;

    fn db_type(&self) -> DbType {
        DbType::SqlServer
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn connection_string(&self) -> String {
        match &self.config.override_connection_string {
            Some(ado) => ado.clone(),
            None => self.descriptor(self.schema()),
        }
    }

    fn test_connection_string(&self) -> String {
        match &self.config.override_connection_string {
            Some(ado) => ado.clone(),
            None => self.descriptor(MASTER_DB),
        }
    }

    fn test_connection(&self) -> bool {
        match self.open_master() {
            Ok(mut conn) => conn.execute_sql("SELECT 1").is_ok(),
            Err(e) => {
                log::debug!("SQL Server probe failed: {}", e);
                false
            }
        }
    }

    fn database_exists(&self) -> bool {
        let sql = format!(
            "SELECT COUNT(*) FROM sys.databases WHERE name = {}",
            self.namespace.literal(self.schema())
        );
        match self.open_master().and_then(|mut c| c.query_count(&sql)) {
            Ok(count) => count > 0,
            Err(e) => {
                log::debug!("SQL Server database lookup failed: {}", e);
                false
            }
        }
    }

    fn create_database(&self) -> DbResult<()> {
        let mut master = self.open_master()?;
        master.execute_sql(&format!(
            "IF DB_ID({}) IS NULL CREATE DATABASE {}",
            self.namespace.literal(self.schema()),
            Dialect::SqlServer.quote_ident(self.schema())
        ))
    }

    fn has_version_table(&self) -> DbResult<bool> {
        let mut conn = self.connect()?;
        Ok(conn.query_count(&self.namespace.table_exists_sql(VERSION_TABLE))? > 0)
    }

    fn connect(&self) -> DbResult<MssqlConnection> {
        MssqlConnection::open(&self.connection_string())
    }

    /// Native backup; the path is resolved on the database server
    fn backup(&self, target: &Path) -> DbResult<PathBuf> {
        let dest = append_extension(target, "bak");
        let mut master = self.open_master()?;
        master
            .execute_sql(&self.backup_sql(&dest))
            .map_err(|e| DbError::BackupFailed(e.to_string()))?;
        Ok(dest)
    }

    fn session_factory(&self) -> SessionFactory<MssqlConnection> {
        let ado = self.connection_string();
        SessionFactory::new(ado.clone(), move || MssqlConnection::open(&ado))
    }
}

#[cfg(test)]
#[path = "mssql_test.rs"]
mod tests;
