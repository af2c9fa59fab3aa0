use super::*;
use sg_core::{DatabaseConfig, DbType};
use sg_db::Value;

fn catalog() -> MySqlCatalog {
    let config = DatabaseConfig {
        db_type: DbType::MySql,
        ..Default::default()
    };
    MySqlCatalog::new(&MySqlBackend::new(&config))
}

fn row(cells: &[Option<&str>]) -> Row {
    cells
        .iter()
        .map(|c| match c {
            Some(text) => Value::Bytes(text.as_bytes().to_vec()),
            None => Value::Null,
        })
        .collect()
}

// ── Collation sweep ─────────────────────────────────────────────────

#[test]
fn test_collation_fixes_keep_type_and_nullability() {
    let rows = vec![
        row(&[Some("Users"), Some("Username"), Some("varchar(100)"), Some("YES")]),
        row(&[Some("ImportFolder"), Some("ImportFolderLocation"), Some("varchar(500)"), Some("NO")]),
    ];

    assert_eq!(
        collation_fixes(&rows),
        vec![
            "ALTER TABLE `Users` MODIFY `Username` varchar(100) CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci NULL",
            "ALTER TABLE `ImportFolder` MODIFY `ImportFolderLocation` varchar(500) CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci NOT NULL",
        ]
    );
}

#[test]
fn test_collation_fixes_skip_incomplete_rows() {
    let rows = vec![
        row(&[Some("Users"), None, Some("text"), Some("YES")]),
        row(&[Some("CustomTag"), Some("TagDescription"), Some("text"), None]),
    ];

    assert_eq!(
        collation_fixes(&rows),
        vec!["ALTER TABLE `CustomTag` MODIFY `TagDescription` text CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci NULL"]
    );
}

#[test]
fn test_collation_sweep_is_a_coded_step() {
    let patches = catalog().patches();
    let sweep = patches.iter().find(|c| c.key() == (4, 2)).unwrap();

    assert_eq!(sweep.name, "FixCollations");
    assert!(matches!(sweep.kind, sg_core::CommandKind::CodedStep(_)));
}

// ── Legacy repairs ──────────────────────────────────────────────────

#[test]
fn test_legacy_table_repairs_rename_every_table() {
    let repairs = catalog().legacy_table_repairs();

    let names: Vec<String> = repairs.iter().map(|c| c.name.clone()).collect();
    assert_eq!(
        names,
        TABLES
            .iter()
            .map(|t| format!("RenameLegacyTable {}", t))
            .collect::<Vec<_>>()
    );
    assert!(repairs.iter().all(|c| !c.is_recorded()));
    assert_eq!(sg_core::ordered(&repairs).len(), TABLES.len());
}

#[test]
fn test_required_version() {
    let catalog = catalog();
    assert_eq!(catalog.required_version(), 5);
    assert_eq!(catalog.ledger_upgrade().len(), 4);
}
