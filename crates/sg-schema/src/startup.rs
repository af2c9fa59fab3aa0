//! Configuration-driven backend selection.
//!
//! Each entry point builds the configured adapter and its catalog, then
//! hands both to the bootstrap.

use crate::catalog::{DuckDbCatalog, MssqlCatalog, MySqlCatalog, PostgresCatalog};
use crate::seed::BaselineSeed;
use sg_core::{Config, DatabaseConfig, DbType, LogStatus, StatusReporter, SystemClock};
use sg_db::{
    Backend, DuckDbBackend, MssqlBackend, MssqlConnection, MySqlBackend, PostgresBackend,
    SessionFactory,
};
use sg_engine::{
    Bootstrap, BootstrapOptions, EngineResult, MigrationError, SchemaCatalog, SchemaStatus,
    StartupReport,
};
use std::path::{Path, PathBuf};

const MEMORY_PATH: &str = ":memory:";

/// Connection factory for whichever engine was configured
#[derive(Debug, Clone)]
pub enum Session {
    DuckDb(SessionFactory<duckdb::Connection>),
    Postgres(SessionFactory<postgres::Client>),
    MySql(SessionFactory<mysql::Conn>),
    SqlServer(SessionFactory<MssqlConnection>),
}

impl Session {
    pub fn db_type(&self) -> DbType {
        match self {
            Session::DuckDb(_) => DbType::DuckDb,
            Session::Postgres(_) => DbType::Postgres,
            Session::MySql(_) => DbType::MySql,
            Session::SqlServer(_) => DbType::SqlServer,
        }
    }

    pub fn connection_string(&self) -> &str {
        match self {
            Session::DuckDb(f) => f.connection_string(),
            Session::Postgres(f) => f.connection_string(),
            Session::MySql(f) => f.connection_string(),
            Session::SqlServer(f) => f.connection_string(),
        }
    }
}

impl From<SessionFactory<duckdb::Connection>> for Session {
    fn from(factory: SessionFactory<duckdb::Connection>) -> Self {
        Session::DuckDb(factory)
    }
}

impl From<SessionFactory<postgres::Client>> for Session {
    fn from(factory: SessionFactory<postgres::Client>) -> Self {
        Session::Postgres(factory)
    }
}

impl From<SessionFactory<mysql::Conn>> for Session {
    fn from(factory: SessionFactory<mysql::Conn>) -> Self {
        Session::MySql(factory)
    }
}

impl From<SessionFactory<MssqlConnection>> for Session {
    fn from(factory: SessionFactory<MssqlConnection>) -> Self {
        Session::SqlServer(factory)
    }
}

/// DuckDB backend with a relative file path resolved against `base_dir`
pub fn duckdb_backend(db: &DatabaseConfig, base_dir: &Path) -> DuckDbBackend {
    if let Some(descriptor) = &db.override_connection_string {
        return DuckDbBackend::from_path(descriptor.clone());
    }
    let path = db.effective_path();
    if path == MEMORY_PATH || Path::new(&path).is_absolute() {
        return DuckDbBackend::from_path(path);
    }
    DuckDbBackend::from_path(base_dir.join(path).to_string_lossy().into_owned())
}

/// Run `$body` with `$backend` and `$catalog` bound to the configured engine
macro_rules! with_backend {
    ($config:expr, $base_dir:expr, |$backend:ident, $catalog:ident| $body:expr) => {{
        let db = &$config.database;
        match db.db_type {
            DbType::DuckDb => {
                let $backend = duckdb_backend(db, $base_dir);
                let $catalog = DuckDbCatalog::new(&$backend);
                $body
            }
            DbType::Postgres => {
                let $backend = PostgresBackend::new(db);
                let $catalog = PostgresCatalog::new(&$backend)
                    .map_err(|e| MigrationError::Setup(e.to_string()))?;
                $body
            }
            DbType::MySql => {
                let $backend = MySqlBackend::new(db);
                let $catalog = MySqlCatalog::new(&$backend);
                $body
            }
            DbType::SqlServer => {
                let $backend = MssqlBackend::new(db);
                let $catalog = MssqlCatalog::new(&$backend);
                $body
            }
        }
    }};
}

fn bootstrap<'a, B: Backend, K: SchemaCatalog<B>>(
    backend: &'a B,
    catalog: &'a K,
    seed: &'a BaselineSeed,
    options: BootstrapOptions,
    status: &'a dyn StatusReporter,
) -> Bootstrap<'a, B, K, BaselineSeed> {
    Bootstrap::new(backend, catalog, seed, options, status, &SystemClock)
}

/// Bring the configured database to the current schema and seed it
pub fn initialize(
    config: &Config,
    base_dir: &Path,
    status: &dyn StatusReporter,
) -> EngineResult<(StartupReport, Session)> {
    let seed = BaselineSeed::new(config.users.clone());
    let options = BootstrapOptions::from_config(config, base_dir);
    log::info!("Starting {} database", config.database.db_type);

    with_backend!(config, base_dir, |backend, catalog| {
        let (report, factory) =
            bootstrap(&backend, &catalog, &seed, options, status).run()?;
        Ok((report, Session::from(factory)))
    })
}

/// Where the configured database stands, without changing it
pub fn inspect(config: &Config, base_dir: &Path) -> EngineResult<SchemaStatus> {
    let seed = BaselineSeed::default();
    let options = BootstrapOptions::from_config(config, base_dir);

    with_backend!(config, base_dir, |backend, catalog| {
        bootstrap(&backend, &catalog, &seed, options, &LogStatus).inspect()
    })
}

/// Back up the configured database at its current version
pub fn backup_now(
    config: &Config,
    base_dir: &Path,
    status: &dyn StatusReporter,
) -> EngineResult<PathBuf> {
    let seed = BaselineSeed::default();
    let options = BootstrapOptions::from_config(config, base_dir);

    with_backend!(config, base_dir, |backend, catalog| {
        bootstrap(&backend, &catalog, &seed, options, status).backup_now()
    })
}

/// One connectivity probe against the configured server
pub fn check(config: &Config, base_dir: &Path) -> bool {
    let db = &config.database;
    let (reachable, descriptor) = match db.db_type {
        DbType::DuckDb => probe(&duckdb_backend(db, base_dir)),
        DbType::Postgres => probe(&PostgresBackend::new(db)),
        DbType::MySql => probe(&MySqlBackend::new(db)),
        DbType::SqlServer => probe(&MssqlBackend::new(db)),
    };
    log::debug!(
        "{} {}",
        descriptor,
        if reachable { "reachable" } else { "unreachable" }
    );
    reachable
}

fn probe<B: Backend>(backend: &B) -> (bool, String) {
    (backend.test_connection(), backend.test_connection_string())
}

#[cfg(test)]
#[path = "startup_test.rs"]
mod tests;
