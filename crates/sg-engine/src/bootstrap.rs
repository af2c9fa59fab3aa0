//! Startup state machine.
//!
//! ```text
//! Uninitialized -> Probing -> Creating -> Migrating -> FixingData -> Ready
//!                      \__________\___________\____________\______-> Failed
//! ```

use crate::backup::BackupInvoker;
use crate::catalog::{InitialData, SchemaCatalog};
use crate::engine::{ApplyReport, MigrationEngine};
use crate::error::{EngineResult, MigrationError};
use crate::store::{SqlVersionStore, VersionStore};
use serde::Serialize;
use sg_core::{Clock, Config, MigrationCommand, StatusReporter, VersionLedger};
use sg_db::{Backend, SessionFactory};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where startup currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartupState {
    Uninitialized,
    Probing,
    Creating,
    Migrating,
    FixingData,
    Ready,
    Failed,
}

impl fmt::Display for StartupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartupState::Uninitialized => "uninitialized",
            StartupState::Probing => "probing",
            StartupState::Creating => "creating",
            StartupState::Migrating => "migrating",
            StartupState::FixingData => "fixing data",
            StartupState::Ready => "ready",
            StartupState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Startup tuning taken from configuration
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub connect_attempts: u32,
    pub connect_backoff: Duration,
    pub create_settle: Duration,
    pub backup_dir: PathBuf,
    /// Schema name used in backup file names
    pub schema_name: String,
    /// Written into every ledger entry
    pub program_version: String,
}

impl BootstrapOptions {
    /// Options for `config`, with relative paths resolved against `base_dir`
    pub fn from_config(config: &Config, base_dir: &Path) -> Self {
        let db = &config.database;
        Self {
            connect_attempts: db.connect_attempts,
            connect_backoff: db.connect_backoff(),
            create_settle: db.create_settle(),
            backup_dir: db.backup_dir_absolute(base_dir),
            schema_name: db.schema.clone(),
            program_version: config.program_version.clone(),
        }
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            connect_attempts: 1,
            connect_backoff: Duration::ZERO,
            create_settle: Duration::ZERO,
            backup_dir: PathBuf::from("backups"),
            schema_name: "shoko".to_string(),
            program_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Outcome of a successful startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartupReport {
    pub previous_version: i32,
    pub final_version: i32,
    pub required_version: i32,
    /// The database did not exist and was created
    pub created: bool,
    pub applied: usize,
    pub skipped: usize,
    pub backfilled: usize,
    pub fixes_run: usize,
    pub backup: Option<PathBuf>,
}

/// Read-only view of where a database stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub connection: String,
    pub database_exists: bool,
    pub current_version: i32,
    pub required_version: i32,
    /// Commands that would run on the next start
    pub pending: usize,
    pub newer_than_supported: bool,
}

/// Drives one startup against a backend
pub struct Bootstrap<'a, B: Backend, K: SchemaCatalog<B>, D: InitialData<B>> {
    backend: &'a B,
    catalog: &'a K,
    seed: &'a D,
    options: BootstrapOptions,
    status: &'a dyn StatusReporter,
    clock: &'a dyn Clock,
    state: StartupState,
}

impl<'a, B: Backend, K: SchemaCatalog<B>, D: InitialData<B>> Bootstrap<'a, B, K, D> {
    pub fn new(
        backend: &'a B,
        catalog: &'a K,
        seed: &'a D,
        options: BootstrapOptions,
        status: &'a dyn StatusReporter,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            backend,
            catalog,
            seed,
            options,
            status,
            clock,
            state: StartupState::Uninitialized,
        }
    }

    pub fn state(&self) -> StartupState {
        self.state
    }

    /// Bring the database to the required version using the `Versions` table
    pub fn run(&mut self) -> EngineResult<(StartupReport, SessionFactory<B::Conn>)> {
        let store = SqlVersionStore::new(self.backend.namespace().clone());
        self.run_with_store(store)
    }

    /// Bring the database to the required version using `store` for the ledger
    pub fn run_with_store<S: VersionStore<B::Conn>>(
        &mut self,
        store: S,
    ) -> EngineResult<(StartupReport, SessionFactory<B::Conn>)> {
        match self.drive(store) {
            Ok(report) => {
                self.transition(StartupState::Ready);
                log::info!(
                    "Database ready at version {} ({} applied, {} skipped, {} fixes)",
                    report.final_version,
                    report.applied,
                    report.skipped,
                    report.fixes_run
                );
                Ok((report, self.backend.session_factory()))
            }
            Err(e) => {
                self.transition(StartupState::Failed);
                log::error!("Database startup failed: {}", e);
                Err(e)
            }
        }
    }

    fn drive<S: VersionStore<B::Conn>>(&mut self, store: S) -> EngineResult<StartupReport> {
        let mut report = StartupReport {
            required_version: self.catalog.required_version(),
            ..Default::default()
        };

        self.transition(StartupState::Probing);
        self.probe()?;

        self.transition(StartupState::Creating);
        if !self.backend.database_exists() {
            log::info!("Creating database at {}", self.backend.test_connection_string());
            self.backend.create_database()?;
            std::thread::sleep(self.options.create_settle);
            report.created = true;
        }

        let mut conn = self.backend.connect()?;
        let mut engine = MigrationEngine::new(
            self.backend,
            store,
            self.options.program_version.clone(),
            self.status,
        );
        let mut applied = ApplyReport::default();

        let legacy_tables = self.catalog.repair_ledger_table(self.backend, &mut conn)?;
        if legacy_tables {
            log::info!("Renamed a legacy ledger table; table names will be repaired");
        }

        let fresh = !self.backend.has_version_table()?;
        report.previous_version = engine.load_ledger(&mut conn)?;
        if report.previous_version > report.required_version {
            return Err(MigrationError::IncompatibleVersion {
                found: report.previous_version,
                required: report.required_version,
            });
        }

        if report.previous_version > 0 && report.previous_version < report.required_version {
            self.status.status("Database - Backing Up...");
            report.backup = self.invoker().run(self.backend, report.previous_version);
        }

        self.transition(StartupState::Migrating);
        if fresh {
            self.status.status("Database - Creating Initial Schema...");
            applied += engine.apply_all(&mut conn, &self.catalog.version_table())?;
        }
        if self.catalog.ledger_needs_upgrade(self.backend, &mut conn)? {
            log::info!("Upgrading the version ledger table");
            applied += engine.apply_all(&mut conn, &self.catalog.ledger_upgrade())?;
            engine.load_ledger(&mut conn)?;
        }

        let create_tables = self.catalog.create_tables();
        let patches = self.catalog.patches();
        if engine.needs_backfill() {
            let known: Vec<MigrationCommand<B::Conn>> =
                create_tables.iter().chain(patches.iter()).cloned().collect();
            report.backfilled = engine.prefill_versions(&mut conn, &known)?;
        }

        // An empty ledger gets every table; a ledger holding part of the
        // table set resumes an interrupted install
        let tables_started = create_tables
            .iter()
            .any(|c| c.is_recorded() && engine.ledger().contains(&c.version_key()));
        if engine.current_version() == 0 || tables_started {
            applied += engine.apply_all(&mut conn, &create_tables)?;
        }
        if legacy_tables {
            applied += engine.apply_all(&mut conn, &self.catalog.legacy_table_repairs())?;
        }
        applied += engine.apply_all(&mut conn, &patches)?;

        self.transition(StartupState::FixingData);
        report.fixes_run = engine.run_deferred_fixes(&mut conn)?;
        self.seed.seed(self.backend, &mut conn, self.status)?;

        report.applied = applied.applied;
        report.skipped = applied.skipped;
        report.final_version = engine.current_version();
        Ok(report)
    }

    /// Poll the connectivity probe with a fixed backoff
    fn probe(&self) -> EngineResult<()> {
        let attempts = self.options.connect_attempts.max(1);
        for attempt in 1..=attempts {
            if self.backend.test_connection() {
                log::debug!("Database reachable on attempt {}", attempt);
                return Ok(());
            }
            log::debug!(
                "Database not reachable ({}/{}): {}",
                attempt,
                attempts,
                self.backend.test_connection_string()
            );
            if attempt < attempts {
                std::thread::sleep(self.options.connect_backoff);
            }
        }
        Err(MigrationError::ConnectivityTimeout {
            backend: self.backend.db_type(),
            attempts,
        })
    }

    /// Where the database stands, without writing anything
    pub fn inspect(&self) -> EngineResult<SchemaStatus> {
        let required = self.catalog.required_version();
        let mut status = SchemaStatus {
            connection: self.backend.connection_string(),
            database_exists: false,
            current_version: 0,
            required_version: required,
            pending: 0,
            newer_than_supported: false,
        };

        if !self.backend.test_connection() {
            return Err(MigrationError::ConnectivityTimeout {
                backend: self.backend.db_type(),
                attempts: 1,
            });
        }

        let ledger = if self.backend.database_exists() {
            status.database_exists = true;
            self.read_ledger()?
        } else {
            VersionLedger::new()
        };

        status.current_version = ledger.current_version();
        status.newer_than_supported = status.current_version > required;
        status.pending = self
            .catalog
            .create_tables()
            .iter()
            .chain(self.catalog.patches().iter())
            .filter(|c| c.is_recorded() && !ledger.contains(&c.version_key()))
            .count();
        Ok(status)
    }

    /// Back up immediately at the current version
    pub fn backup_now(&self) -> EngineResult<PathBuf> {
        if !self.backend.database_exists() {
            return Err(MigrationError::Setup(format!(
                "database {} does not exist",
                self.backend.connection_string()
            )));
        }
        let version = self.read_ledger()?.current_version();
        self.status.status("Database - Backing Up...");
        Ok(self.invoker().try_run(self.backend, version)?)
    }

    fn read_ledger(&self) -> EngineResult<VersionLedger> {
        if !self.backend.has_version_table()? {
            return Ok(VersionLedger::new());
        }
        let mut conn = self.backend.connect()?;
        let mut store = SqlVersionStore::new(self.backend.namespace().clone());
        Ok(VersionLedger::from_entries(store.load(&mut conn)?))
    }

    fn invoker(&self) -> BackupInvoker<'a> {
        BackupInvoker::new(
            self.options.backup_dir.clone(),
            self.options.schema_name.clone(),
            self.clock,
        )
    }

    fn transition(&mut self, next: StartupState) {
        log::info!("Database startup: {} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
