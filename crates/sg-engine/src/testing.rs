//! Test doubles for driving the engine without a database.
//!
//! [`SpyBackend`] records every statement executed through its connections and
//! can be told to fail. [`MemoryVersionStore`] keeps a ledger that survives
//! across engine instances, so a second run sees what the first one wrote.

use crate::catalog::SchemaCatalog;
use crate::error::EngineResult;
use crate::store::VersionStore;
use sg_core::{DbType, LedgerEntry, MigrationCommand, VersionKey};
use sg_db::{
    append_extension, Backend, DbError, DbResult, Dialect, Namespace, Row, SessionFactory,
    SqlConnection, Value,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct SpyState {
    executed: Vec<String>,
    queries: Vec<String>,
    fail_on: Option<String>,
    probes: usize,
    probe_failures: usize,
    exists: bool,
    created: bool,
    has_table: bool,
    backups: Vec<PathBuf>,
    backup_fails: bool,
}

fn lock(state: &Mutex<SpyState>) -> MutexGuard<'_, SpyState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend that records instead of touching a database
#[derive(Debug, Clone)]
pub struct SpyBackend {
    state: Arc<Mutex<SpyState>>,
    namespace: Namespace,
}

impl Default for SpyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpyBackend {
    /// An existing database that already has a ledger table
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SpyState {
                exists: true,
                has_table: true,
                ..Default::default()
            })),
            namespace: Namespace::new(Dialect::DuckDb, None),
        }
    }

    /// A server with no database on it yet
    pub fn missing_database(self) -> Self {
        {
            let mut state = lock(&self.state);
            state.exists = false;
            state.has_table = false;
        }
        self
    }

    /// A database without a ledger table
    pub fn without_version_table(self) -> Self {
        lock(&self.state).has_table = false;
        self
    }

    /// Fail every statement containing `needle`
    pub fn failing_on(self, needle: impl Into<String>) -> Self {
        lock(&self.state).fail_on = Some(needle.into());
        self
    }

    /// Stop failing statements
    pub fn heal(&self) {
        lock(&self.state).fail_on = None;
    }

    /// Let the first `count` probes fail
    pub fn with_probe_failures(self, count: usize) -> Self {
        lock(&self.state).probe_failures = count;
        self
    }

    pub fn with_failing_backup(self) -> Self {
        lock(&self.state).backup_fails = true;
        self
    }

    /// Statements executed so far, failed attempts included
    pub fn executed(&self) -> Vec<String> {
        lock(&self.state).executed.clone()
    }

    pub fn execute_count(&self) -> usize {
        lock(&self.state).executed.len()
    }

    /// How many times `sql` was executed
    pub fn count_of(&self, sql: &str) -> usize {
        lock(&self.state).executed.iter().filter(|s| *s == sql).count()
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.state).queries.clone()
    }

    pub fn probe_count(&self) -> usize {
        lock(&self.state).probes
    }

    pub fn created(&self) -> bool {
        lock(&self.state).created
    }

    /// Backup targets requested so far
    pub fn backups(&self) -> Vec<PathBuf> {
        lock(&self.state).backups.clone()
    }

    /// A connection sharing this backend's log
    pub fn connection(&self) -> SpyConnection {
        SpyConnection {
            state: Arc::clone(&self.state),
        }
    }
}

impl Backend for SpyBackend {
    type Conn = SpyConnection;

    fn db_type(&self) -> DbType {
        DbType::DuckDb
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn connection_string(&self) -> String {
        "spy://target".to_string()
    }

    fn test_connection_string(&self) -> String {
        "spy://server".to_string()
    }

    fn test_connection(&self) -> bool {
        let mut state = lock(&self.state);
        state.probes += 1;
        state.probes > state.probe_failures
    }

    fn database_exists(&self) -> bool {
        lock(&self.state).exists
    }

    fn create_database(&self) -> DbResult<()> {
        let mut state = lock(&self.state);
        state.exists = true;
        state.created = true;
        Ok(())
    }

    fn has_version_table(&self) -> DbResult<bool> {
        Ok(lock(&self.state).has_table)
    }

    fn connect(&self) -> DbResult<SpyConnection> {
        Ok(self.connection())
    }

    fn backup(&self, target: &Path) -> DbResult<PathBuf> {
        let mut state = lock(&self.state);
        state.backups.push(target.to_path_buf());
        if state.backup_fails {
            return Err(DbError::BackupFailed("spy backup refused".to_string()));
        }
        Ok(append_extension(target, "bak"))
    }

    fn session_factory(&self) -> SessionFactory<SpyConnection> {
        let state = Arc::clone(&self.state);
        SessionFactory::new(self.connection_string(), move || {
            Ok(SpyConnection {
                state: Arc::clone(&state),
            })
        })
    }
}

/// Connection handed out by [`SpyBackend`]
#[derive(Debug, Clone)]
pub struct SpyConnection {
    state: Arc<Mutex<SpyState>>,
}

impl SqlConnection for SpyConnection {
    fn execute_sql(&mut self, sql: &str) -> DbResult<()> {
        let mut state = lock(&self.state);
        state.executed.push(sql.to_string());
        let refused = matches!(&state.fail_on, Some(needle) if sql.contains(needle.as_str()));
        if refused {
            return Err(DbError::ExecutionError(format!("spy refused: {}", sql)));
        }
        // the ledger table is visible once created
        if sql.starts_with("CREATE TABLE Versions") {
            state.has_table = true;
        }
        Ok(())
    }

    /// Every query answers a single `1`, so existence checks see everything
    fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        lock(&self.state).queries.push(sql.to_string());
        Ok(vec![vec![Value::Int(1)]])
    }
}

/// Ledger kept in memory and shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryVersionStore {
    entries: Rc<RefCell<Vec<LedgerEntry>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `(value, revision)` entries in the given order
    pub fn with_entries<'k>(keys: impl IntoIterator<Item = (&'k str, &'k str)>) -> Self {
        let store = Self::new();
        store.entries.borrow_mut().extend(
            keys.into_iter()
                .map(|(v, r)| LedgerEntry::new(VersionKey::new(v, r), "seeded", "0.0.0")),
        );
        store
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.borrow().clone()
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        self.entries
            .borrow()
            .iter()
            .map(|e| (e.key.value.clone(), e.key.revision.clone()))
            .collect()
    }

    /// Inserts plus deletes since creation
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl<C> VersionStore<C> for MemoryVersionStore {
    fn load(&mut self, _conn: &mut C) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.entries())
    }

    fn insert(&mut self, _conn: &mut C, entry: &LedgerEntry) -> EngineResult<()> {
        self.entries.borrow_mut().push(entry.clone());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn delete(&mut self, _conn: &mut C, key: &VersionKey) -> EngineResult<()> {
        self.entries.borrow_mut().retain(|e| &e.key != key);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Catalog assembled from fixed command lists
pub struct StaticCatalog<C> {
    pub version_table: Vec<MigrationCommand<C>>,
    pub ledger_upgrade: Vec<MigrationCommand<C>>,
    pub create_tables: Vec<MigrationCommand<C>>,
    pub patches: Vec<MigrationCommand<C>>,
    /// Answer for the ledger upgrade check
    pub needs_upgrade: bool,
    /// Answer for the legacy ledger rename
    pub renames_ledger: bool,
    pub table_repairs: Vec<MigrationCommand<C>>,
}

impl<C> Default for StaticCatalog<C> {
    fn default() -> Self {
        Self {
            version_table: Vec::new(),
            ledger_upgrade: Vec::new(),
            create_tables: Vec::new(),
            patches: Vec::new(),
            needs_upgrade: false,
            renames_ledger: false,
            table_repairs: Vec::new(),
        }
    }
}

impl<B: Backend> SchemaCatalog<B> for StaticCatalog<B::Conn> {
    fn version_table(&self) -> Vec<MigrationCommand<B::Conn>> {
        self.version_table.clone()
    }

    fn ledger_upgrade(&self) -> Vec<MigrationCommand<B::Conn>> {
        self.ledger_upgrade.clone()
    }

    fn ledger_needs_upgrade(&self, _backend: &B, _conn: &mut B::Conn) -> EngineResult<bool> {
        Ok(self.needs_upgrade)
    }

    fn create_tables(&self) -> Vec<MigrationCommand<B::Conn>> {
        self.create_tables.clone()
    }

    fn patches(&self) -> Vec<MigrationCommand<B::Conn>> {
        self.patches.clone()
    }

    fn repair_ledger_table(&self, _backend: &B, _conn: &mut B::Conn) -> EngineResult<bool> {
        Ok(self.renames_ledger)
    }

    fn legacy_table_repairs(&self) -> Vec<MigrationCommand<B::Conn>> {
        self.table_repairs.clone()
    }
}
