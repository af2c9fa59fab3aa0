use super::*;

fn pg() -> Namespace {
    Namespace::new(Dialect::Postgres, Some("shoko".to_string()))
}

#[test]
fn quote_ident_per_dialect() {
    assert_eq!(Dialect::DuckDb.quote_ident("Users"), "\"Users\"");
    assert_eq!(Dialect::Postgres.quote_ident("a\"b"), "\"a\"\"b\"");
    assert_eq!(Dialect::MySql.quote_ident("Users"), "`Users`");
    assert_eq!(Dialect::SqlServer.quote_ident("odd]name"), "[odd]]name]");
}

#[test]
fn quote_literal_escapes_quotes() {
    assert_eq!(Dialect::DuckDb.quote_literal("it's"), "'it''s'");
    assert_eq!(Dialect::SqlServer.quote_literal("it's"), "N'it''s'");
}

#[test]
fn mysql_literal_escapes_backslashes() {
    assert_eq!(Dialect::MySql.quote_literal(r"C:\anime"), r"'C:\\anime'");
    assert_eq!(Dialect::Postgres.quote_literal(r"C:\anime"), r"'C:\anime'");
}

#[test]
fn postgres_tables_are_qualified_and_folded() {
    assert_eq!(pg().table("VideoLocal"), "shoko.videolocal");
    let duck = Namespace::new(Dialect::DuckDb, None);
    assert_eq!(duck.table("VideoLocal"), "VideoLocal");
}

#[test]
fn postgres_column_lookup_uses_schema_and_lower_case() {
    let sql = pg().column_exists_sql("Versions", "VersionRevision");
    assert_eq!(
        sql,
        "SELECT COUNT(*) FROM information_schema.columns WHERE table_name = 'versions' AND column_name = 'versionrevision' AND table_schema = 'shoko'"
    );
}

#[test]
fn mysql_lookups_scope_to_current_database() {
    let ns = Namespace::new(Dialect::MySql, None);
    assert!(ns
        .index_exists_sql("VideoLocal", "IX_VideoLocal_Hash")
        .ends_with("AND TABLE_SCHEMA = DATABASE()"));
    assert!(ns.table_exists_sql("Versions").contains("BINARY TABLE_NAME = 'Versions'"));
}

#[test]
fn sql_server_table_lookup_uses_sysobjects() {
    let ns = Namespace::new(Dialect::SqlServer, None);
    assert_eq!(
        ns.table_exists_sql("Versions"),
        "SELECT COUNT(*) FROM sysobjects WHERE name = N'Versions' AND xtype = 'U'"
    );
}

#[test]
fn drop_index_shapes() {
    assert_eq!(
        Namespace::new(Dialect::DuckDb, None).drop_index_sql("T", "IX_T"),
        "DROP INDEX IX_T"
    );
    assert_eq!(pg().drop_index_sql("T", "IX_T"), "DROP INDEX shoko.ix_t");
    assert_eq!(
        Namespace::new(Dialect::MySql, None).drop_index_sql("T", "IX_T"),
        "DROP INDEX IX_T ON T"
    );
}

#[test]
fn drop_column_qualifies_table() {
    assert_eq!(
        pg().drop_column_sql("VideoLocal", "MediaBlob"),
        "ALTER TABLE shoko.videolocal DROP COLUMN MediaBlob"
    );
}
