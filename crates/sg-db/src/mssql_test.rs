use super::*;

fn config() -> DatabaseConfig {
    DatabaseConfig {
        db_type: DbType::SqlServer,
        host: "127.0.0.1".to_string(),
        port: Some(1),
        username: "sa".to_string(),
        password: "pass;word".to_string(),
        schema: "Shoko".to_string(),
        ..Default::default()
    }
}

// ── Descriptors ─────────────────────────────────────────────────────

#[test]
fn test_connection_strings() {
    let backend = MssqlBackend::new(&config());
    assert_eq!(
        backend.connection_string(),
        "Server=tcp:127.0.0.1,1;Database=Shoko;User Id=sa;Password='pass;word';TrustServerCertificate=true"
    );
    assert!(backend.test_connection_string().contains("Database=master;"));
}

#[test]
fn test_default_port() {
    let mut cfg = config();
    cfg.port = None;
    let backend = MssqlBackend::new(&cfg);
    assert!(backend.connection_string().starts_with("Server=tcp:127.0.0.1,1433;"));
}

#[test]
fn test_override_used_verbatim() {
    let mut cfg = config();
    cfg.override_connection_string = Some("Server=tcp:db,1433;Database=x".to_string());
    let backend = MssqlBackend::new(&cfg);
    assert_eq!(backend.connection_string(), "Server=tcp:db,1433;Database=x");
    assert_eq!(backend.test_connection_string(), "Server=tcp:db,1433;Database=x");
}

#[test]
fn test_quote_ado() {
    assert_eq!(quote_ado("plain"), "plain");
    assert_eq!(quote_ado("it's"), "'it''s'");
    assert_eq!(quote_ado(" padded"), "' padded'");
}

// ── Backup ──────────────────────────────────────────────────────────

#[test]
fn test_backup_sql_shape() {
    let backend = MssqlBackend::new(&config());
    let sql = backend.backup_sql(Path::new("/var/backups/shoko_004_202401021304.bak"));
    assert_eq!(
        sql,
        "BACKUP DATABASE [Shoko] TO DISK = N'/var/backups/shoko_004_202401021304.bak' WITH INIT"
    );
}

// ── Connectivity ────────────────────────────────────────────────────

#[test]
fn test_unreachable_server_probes_false() {
    let backend = MssqlBackend::new(&config());
    assert!(!backend.test_connection());
    assert!(!backend.database_exists());
    assert!(matches!(backend.connect(), Err(DbError::ConnectionError(_))));
}

#[test]
fn test_convert_value() {
    assert_eq!(convert_value(ColumnData::I32(Some(7))), Value::Int(7));
    assert_eq!(convert_value(ColumnData::I32(None)), Value::Null);
    assert_eq!(convert_value(ColumnData::Bit(Some(true))), Value::Bool(true));
    assert_eq!(
        convert_value(ColumnData::String(Some("Versions".into()))),
        Value::Text("Versions".into())
    );
}
