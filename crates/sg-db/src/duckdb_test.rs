use super::*;
use tempfile::TempDir;

// ── Helpers ────────────────────────────────────────────────────────────

fn file_backend(dir: &TempDir) -> DuckDbBackend {
    DuckDbBackend::from_path(dir.path().join("data").join("shoko.duckdb").display().to_string())
}

// ── Connection primitives ──────────────────────────────────────────────

#[test]
fn test_in_memory_connections_share_one_database() {
    let backend = DuckDbBackend::in_memory();
    let mut first = backend.connect().unwrap();
    first
        .execute_sql("CREATE TABLE t (id INTEGER, name VARCHAR); INSERT INTO t VALUES (1, 'a');")
        .unwrap();

    let mut second = backend.connect().unwrap();
    assert_eq!(second.query_count("SELECT COUNT(*) FROM t").unwrap(), 1);
}

#[test]
fn test_query_rows_converts_values() {
    let backend = DuckDbBackend::in_memory();
    let mut conn = backend.connect().unwrap();
    let rows = conn
        .query_rows("SELECT 42 AS n, 'hello' AS s, 1.5::DOUBLE AS f, NULL AS z")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        vec![
            Value::Int(42),
            Value::Text("hello".into()),
            Value::Float(1.5),
            Value::Null,
        ]
    );
}

#[test]
fn test_query_scalar_without_rows_is_null() {
    let backend = DuckDbBackend::in_memory();
    let mut conn = backend.connect().unwrap();
    conn.execute_sql("CREATE TABLE empty (id INTEGER)").unwrap();
    assert_eq!(conn.query_scalar("SELECT id FROM empty").unwrap(), Value::Null);
}

#[test]
fn test_backend_primitives_delegate_to_connection() {
    let backend = DuckDbBackend::in_memory();
    let mut conn = backend.connect().unwrap();
    backend
        .execute(&mut conn, "CREATE TABLE nums AS SELECT * FROM range(10) t(n)")
        .unwrap();
    assert_eq!(
        backend
            .execute_scalar(&mut conn, "SELECT COUNT(*) FROM nums")
            .unwrap(),
        Value::Int(10)
    );
    assert_eq!(
        backend
            .execute_query(&mut conn, "SELECT n FROM nums WHERE n < 3 ORDER BY n")
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn test_missing_table_is_classified() {
    let backend = DuckDbBackend::in_memory();
    let mut conn = backend.connect().unwrap();
    let err = conn.query_rows("SELECT * FROM nope").unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)), "got {err:?}");
}

// ── Existence and creation ─────────────────────────────────────────────

#[test]
fn test_has_version_table() {
    let backend = DuckDbBackend::in_memory();
    assert!(!backend.has_version_table().unwrap());

    let mut conn = backend.connect().unwrap();
    conn.execute_sql("CREATE TABLE Versions (VersionType TEXT, VersionValue TEXT)")
        .unwrap();
    assert!(backend.has_version_table().unwrap());
}

#[test]
fn test_create_database_creates_file_and_parent() {
    let dir = TempDir::new().unwrap();
    let backend = file_backend(&dir);
    assert!(!backend.database_exists());
    assert!(!backend.test_connection());

    backend.create_database().unwrap();
    assert!(backend.database_exists());
    assert!(backend.test_connection());

    // Second call is a no-op
    backend.create_database().unwrap();
}

#[test]
fn test_in_memory_always_exists() {
    let backend = DuckDbBackend::in_memory();
    assert!(backend.database_exists());
    assert!(backend.test_connection());
    assert_eq!(backend.connection_string(), ":memory:");
}

#[test]
fn test_override_connection_string_wins() {
    let config = DatabaseConfig {
        path: Some("ignored.duckdb".to_string()),
        override_connection_string: Some("/data/other.duckdb".to_string()),
        ..Default::default()
    };
    assert_eq!(DuckDbBackend::new(&config).path(), "/data/other.duckdb");

    let config = DatabaseConfig::default();
    assert_eq!(DuckDbBackend::new(&config).path(), "shoko.duckdb");
}

// ── Backup ─────────────────────────────────────────────────────────────

#[test]
fn test_backup_copies_file() {
    let dir = TempDir::new().unwrap();
    let backend = file_backend(&dir);
    backend.create_database().unwrap();
    let mut conn = backend.connect().unwrap();
    conn.execute_sql("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (7);")
        .unwrap();

    let target = dir.path().join("shoko_003_202401011200");
    let written = backend.backup(&target).unwrap();
    assert_eq!(written, dir.path().join("shoko_003_202401011200.duckdb"));
    assert!(written.exists());

    drop(conn);
    let copy = DuckDbBackend::from_path(written.display().to_string());
    let mut copy_conn = copy.connect().unwrap();
    assert_eq!(copy_conn.query_count("SELECT id FROM t").unwrap(), 7);
}

#[test]
fn test_backup_in_memory_is_unsupported() {
    let backend = DuckDbBackend::in_memory();
    let err = backend.backup(Path::new("/tmp/x")).unwrap_err();
    assert!(matches!(err, DbError::NotImplemented { .. }));
}

// ── Session factory ────────────────────────────────────────────────────

#[test]
fn test_session_factory_reaches_migrated_database() {
    let backend = DuckDbBackend::in_memory();
    let mut conn = backend.connect().unwrap();
    conn.execute_sql("CREATE TABLE Users (Username TEXT); INSERT INTO Users VALUES ('Default');")
        .unwrap();

    let factory = backend.session_factory();
    assert_eq!(factory.connection_string(), ":memory:");
    let mut session = factory.open().unwrap();
    assert_eq!(session.query_count("SELECT COUNT(*) FROM Users").unwrap(), 1);
}
