//! End-to-end runs of the `sg` binary against a DuckDB project

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("schemagate.yml"),
        "database:\n  type: duckdb\n  schema: shoko\n  connect_attempts: 1\n  create_settle_ms: 0\n",
    )
    .unwrap();
    dir
}

fn sg(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sg"))
        .args(args)
        .arg("--project-dir")
        .arg(dir)
        .env_remove("SG_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn migrate_then_status_reports_current_schema() {
    let dir = project();

    let migrate = sg(dir.path(), &["migrate"]);
    assert!(migrate.status.success(), "{}", String::from_utf8_lossy(&migrate.stderr));
    assert!(stdout(&migrate).contains("Schema version 0 -> 5"));
    assert!(dir.path().join("shoko.duckdb").exists());

    let status = sg(dir.path(), &["status", "--json"]);
    assert!(status.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(json["current_version"], 5);
    assert_eq!(json["required_version"], 5);
    assert_eq!(json["pending"], 0);
    assert_eq!(json["newer_than_supported"], false);
}

#[test]
fn second_migrate_is_up_to_date() {
    let dir = project();
    assert!(sg(dir.path(), &["migrate"]).status.success());

    let again = sg(dir.path(), &["migrate"]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("Schema version 5 (up to date)"));
    assert!(stdout(&again).contains("0 applied"));
}

#[test]
fn backup_writes_into_backup_dir() {
    let dir = project();
    assert!(sg(dir.path(), &["migrate"]).status.success());

    let backup = sg(dir.path(), &["backup"]);
    assert!(backup.status.success(), "{}", String::from_utf8_lossy(&backup.stderr));
    assert!(stdout(&backup).contains("shoko_005_"));
    assert!(dir.path().join("backups").is_dir());
}

#[test]
fn check_exit_code_follows_reachability() {
    let dir = project();
    assert!(sg(dir.path(), &["check"]).status.success());

    std::fs::write(
        dir.path().join("schemagate.yml"),
        "database:\n  type: duckdb\n  path: missing/dir/app.duckdb\n",
    )
    .unwrap();
    assert!(!sg(dir.path(), &["check"]).status.success());
}

#[test]
fn missing_config_fails() {
    let dir = TempDir::new().unwrap();
    assert!(!sg(dir.path(), &["status"]).status.success());
}
