//! Full startup against a DuckDB file in a scratch directory.

use sg_core::{CommandKind, Config, LogStatus};
use sg_db::{Backend, DuckDbBackend, SqlConnection};
use sg_engine::{MigrationEngine, MigrationError, SchemaCatalog, SqlVersionStore};
use sg_schema::{backup_now, initialize, inspect, DuckDbCatalog, Session};
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> Config {
    let mut config = Config::default();
    config.database.path = Some("shoko.duckdb".to_string());
    config.database.connect_attempts = 1;
    config.database.connect_backoff_ms = 0;
    config.database.create_settle_ms = 0;
    config
}

fn count(session: &Session, table: &str) -> i64 {
    let Session::DuckDb(factory) = session else {
        panic!("expected a DuckDB session");
    };
    let mut conn = factory.open().unwrap();
    conn.query_count(&format!("SELECT COUNT(*) FROM {}", table))
        .unwrap()
}

/// A database migrated to version 2 by an older release
fn build_stale(path: &Path) {
    let backend = DuckDbBackend::from_path(path.to_string_lossy().into_owned());
    let catalog = DuckDbCatalog::new(&backend);
    let mut conn = backend.connect().unwrap();
    let store = SqlVersionStore::new(backend.namespace().clone());
    let mut engine = MigrationEngine::new(&backend, store, "0.9.0", &LogStatus);

    engine.apply_all(&mut conn, &catalog.version_table()).unwrap();
    engine.apply_all(&mut conn, &catalog.ledger_upgrade()).unwrap();
    engine.apply_all(&mut conn, &catalog.create_tables()).unwrap();
    let early: Vec<_> = catalog
        .patches()
        .into_iter()
        .filter(|c| c.version <= 2)
        .collect();
    engine.apply_all(&mut conn, &early).unwrap();
    assert_eq!(engine.current_version(), 2);
}

/// A version-2 database from a release that kept one ledger row per version,
/// the current version first
fn build_legacy(path: &Path) {
    let backend = DuckDbBackend::from_path(path.to_string_lossy().into_owned());
    let catalog = DuckDbCatalog::new(&backend);
    let mut conn = backend.connect().unwrap();
    let early = catalog
        .version_table()
        .into_iter()
        .chain(catalog.create_tables())
        .chain(catalog.patches().into_iter().filter(|c| c.version <= 2));
    for command in early {
        let CommandKind::RawStatement(sql) = &command.kind else {
            panic!("{} is not a statement", command.name);
        };
        conn.execute_sql(sql).unwrap();
    }
    conn.execute_sql(
        "INSERT INTO Versions (VersionType, VersionValue) VALUES ('Database', '2');
         INSERT INTO Versions (VersionType, VersionValue) VALUES ('Database', '1');",
    )
    .unwrap();
}

// ── Fresh install ───────────────────────────────────────────────────

#[test]
fn fresh_install_creates_and_migrates() {
    let dir = TempDir::new().unwrap();
    let (report, session) = initialize(&config(), dir.path(), &LogStatus).unwrap();

    assert!(report.created);
    assert_eq!(report.previous_version, 0);
    assert_eq!(report.final_version, 5);
    assert_eq!(report.required_version, 5);
    assert_eq!(report.fixes_run, 2);
    assert_eq!(report.backup, None);
    assert!(dir.path().join("shoko.duckdb").exists());

    assert_eq!(count(&session, "Users"), 2);
    assert_eq!(count(&session, "FilterPreset"), 7);
    assert_eq!(count(&session, "RenamerConfig"), 1);
    assert_eq!(count(&session, "CustomTag"), 5);
}

#[test]
fn rerun_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let (_, session) = initialize(&config(), dir.path(), &LogStatus).unwrap();
    let ledger_rows = count(&session, "Versions");
    drop(session);

    let (report, session) = initialize(&config(), dir.path(), &LogStatus).unwrap();

    assert!(!report.created);
    assert_eq!(report.previous_version, 5);
    assert_eq!(report.applied, 0);
    assert_eq!(report.fixes_run, 0);
    let catalog = DuckDbCatalog::new(&DuckDbBackend::in_memory());
    assert_eq!(report.skipped, catalog.create_tables().len() + catalog.patches().len());
    assert_eq!(report.backup, None);
    assert_eq!(count(&session, "Versions"), ledger_rows);
}

#[test]
fn seeding_is_idempotent() {
    let dir = TempDir::new().unwrap();
    drop(initialize(&config(), dir.path(), &LogStatus).unwrap());
    let (_, session) = initialize(&config(), dir.path(), &LogStatus).unwrap();

    assert_eq!(count(&session, "Users"), 2);
    assert_eq!(count(&session, "FilterPreset"), 7);
    assert_eq!(count(&session, "RenamerConfig"), 1);
    assert_eq!(count(&session, "CustomTag"), 5);
}

// ── Upgrade ─────────────────────────────────────────────────────────

#[test]
fn stale_install_is_backed_up_and_upgraded() {
    let dir = TempDir::new().unwrap();
    build_stale(&dir.path().join("shoko.duckdb"));

    let (report, session) = initialize(&config(), dir.path(), &LogStatus).unwrap();

    assert!(!report.created);
    assert_eq!(report.previous_version, 2);
    assert_eq!(report.final_version, 5);
    assert_eq!(report.skipped, 12);
    assert_eq!(report.applied, 5);
    assert_eq!(report.fixes_run, 2);

    let backup = report.backup.expect("a backup before upgrading");
    assert!(backup.exists());
    assert_eq!(backup.parent(), Some(dir.path().join("backups").as_path()));
    let name = backup.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("shoko_002_"), "{}", name);
    assert!(name.ends_with(".duckdb"), "{}", name);

    assert_eq!(count(&session, "Users"), 2);
}

#[test]
fn legacy_ledger_is_backfilled_without_rerunning_ddl() {
    let dir = TempDir::new().unwrap();
    build_legacy(&dir.path().join("shoko.duckdb"));

    let (report, session) = initialize(&config(), dir.path(), &LogStatus).unwrap();

    assert_eq!(report.previous_version, 2);
    assert_eq!(report.backfilled, 12);
    assert_eq!(report.skipped, 12);
    assert_eq!(report.applied, 5);
    assert_eq!(report.fixes_run, 2);
    assert_eq!(report.final_version, 5);
    assert!(report.backup.is_some());

    assert_eq!(
        count(&session, "Versions WHERE VersionValue = '2' AND VersionRevision IS NULL"),
        0
    );
    assert_eq!(
        count(&session, "Versions WHERE VersionValue IN ('1', '2') AND VersionRevision IS NOT NULL"),
        12
    );
    assert_eq!(count(&session, "Users"), 2);
}

#[test]
fn backfilled_ledger_is_stable_on_the_next_start() {
    let dir = TempDir::new().unwrap();
    build_legacy(&dir.path().join("shoko.duckdb"));
    drop(initialize(&config(), dir.path(), &LogStatus).unwrap());

    let (report, _) = initialize(&config(), dir.path(), &LogStatus).unwrap();

    assert_eq!(report.previous_version, 5);
    assert_eq!(report.backfilled, 0);
    assert_eq!(report.applied, 0);
}

// ── Read-only entry points ──────────────────────────────────────────

#[test]
fn inspect_reports_pending_work_without_writing() {
    let dir = TempDir::new().unwrap();
    build_stale(&dir.path().join("shoko.duckdb"));

    let status = inspect(&config(), dir.path()).unwrap();

    assert!(status.database_exists);
    assert_eq!(status.current_version, 2);
    assert_eq!(status.required_version, 5);
    assert_eq!(status.pending, 7);
    assert!(!status.newer_than_supported);
    assert!(!dir.path().join("backups").exists());
}

#[test]
fn inspect_missing_database_creates_nothing() {
    let dir = TempDir::new().unwrap();

    let status = inspect(&config(), dir.path()).unwrap();

    assert!(!status.database_exists);
    assert_eq!(status.current_version, 0);
    assert_eq!(status.pending, 19);
    assert!(!dir.path().join("shoko.duckdb").exists());
}

#[test]
fn backup_now_writes_current_version() {
    let dir = TempDir::new().unwrap();
    build_stale(&dir.path().join("shoko.duckdb"));

    let path = backup_now(&config(), dir.path(), &LogStatus).unwrap();

    assert!(path.exists());
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("shoko_002_"));
}

#[test]
fn backup_now_without_database_fails() {
    let dir = TempDir::new().unwrap();

    let err = backup_now(&config(), dir.path(), &LogStatus).unwrap_err();
    assert!(matches!(err, MigrationError::Setup(_)));
}
