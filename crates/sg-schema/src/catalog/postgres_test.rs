use super::*;
use sg_core::{CommandKind, DatabaseConfig, DbType};

fn catalog() -> PostgresCatalog {
    let config = DatabaseConfig {
        db_type: DbType::Postgres,
        username: "shoko_owner".to_string(),
        schema: "Shoko".to_string(),
        ..Default::default()
    };
    PostgresCatalog::new(&PostgresBackend::new(&config)).unwrap()
}

fn sql(command: &Cmd) -> &str {
    match &command.kind {
        CommandKind::RawStatement(sql) => sql,
        _ => panic!("{} is not a raw statement", command.name),
    }
}

fn keys(commands: &[Cmd]) -> Vec<(i32, i32)> {
    commands.iter().map(|c| c.key()).collect()
}

#[test]
fn test_statements_are_rendered_for_schema_and_owner() {
    let catalog = catalog();
    let versions = &catalog.version_table()[0];

    assert!(sql(versions).starts_with(PREAMBLE));
    assert!(sql(versions).contains("CREATE TABLE IF NOT EXISTS shoko.Versions"));
    assert!(sql(versions).contains("ALTER TABLE shoko.Versions OWNER TO shoko_owner;"));
    assert!(!sql(versions).contains("{{"));
}

#[test]
fn test_command_name_leaves_out_preamble() {
    let catalog = catalog();
    let users = &catalog.create_tables()[0];

    assert!(users.name.starts_with("CREATE TABLE shoko.Users"));
    assert_eq!(sql(users), format!("{}{}", PREAMBLE, users.name));
}

#[test]
fn test_auto_revisions_run_across_the_list() {
    let catalog = catalog();

    assert_eq!(
        keys(&catalog.create_tables()),
        (0..7).map(|r| (1, r)).collect::<Vec<_>>()
    );
    assert_eq!(
        keys(&catalog.patches()),
        vec![(2, 0), (2, 1), (2, 2), (3, 3), (3, 4), (4, 5), (4, 6), (4, 7), (5, 8), (5, 9)]
    );
    assert_eq!(keys(&catalog.ledger_upgrade()), vec![(0, 2), (0, 3), (0, 4), (0, 5)]);
}

#[test]
fn test_coded_steps_keep_their_names() {
    let catalog = catalog();
    let patches = catalog.patches();
    let names: Vec<&str> = patches
        .iter()
        .filter(|c| !matches!(c.kind, CommandKind::RawStatement(_)))
        .map(|c| c.name.as_str())
        .collect();

    assert_eq!(
        names,
        vec![
            "DropColumns VideoLocal(MediaBlob, MediaVersion)",
            "NormalizeImportFolderLocations",
            "NoOperation",
            "DropIndex ImportFolder.IX_ImportFolder_Location",
            "DescribeLockedFilterPresets",
        ]
    );
}

#[test]
fn test_required_version() {
    assert_eq!(catalog().required_version(), 5);
}
