//! Behavioural guarantees of the migration engine, checked against the spy
//! backend and an in-memory ledger.

use sg_core::{FixedClock, LogStatus, MigrationCommand, StepOutcome};
use sg_db::SqlConnection;
use sg_engine::testing::{MemoryVersionStore, SpyBackend, SpyConnection, StaticCatalog};
use sg_engine::{Bootstrap, BootstrapOptions, MigrationEngine, MigrationError, StartupState};
use std::cell::RefCell;
use std::rc::Rc;

type Cmd = MigrationCommand<SpyConnection>;

fn raw(v: i32, r: i32) -> Cmd {
    Cmd::raw(v, r, format!("STMT {}.{}", v, r))
}

fn five_versions() -> Vec<Cmd> {
    (1..=5)
        .flat_map(|v| (1..=3).map(move |r| raw(v, r)))
        .collect()
}

fn clock() -> FixedClock {
    FixedClock(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    )
}

#[test]
fn applying_twice_writes_nothing_the_second_time() {
    let spy = SpyBackend::new();
    let store = MemoryVersionStore::new();
    let commands = five_versions();

    let mut first = MigrationEngine::new(&spy, store.clone(), "1.0.0", &LogStatus);
    let mut conn = spy.connection();
    first.load_ledger(&mut conn).unwrap();
    first.apply_all(&mut conn, &commands).unwrap();
    let executed = spy.execute_count();
    let writes = store.writes();
    let ledger = store.entries();

    let mut second = MigrationEngine::new(&spy, store.clone(), "1.0.0", &LogStatus);
    second.load_ledger(&mut conn).unwrap();
    let report = second.apply_all(&mut conn, &commands).unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, commands.len());
    assert_eq!(spy.execute_count(), executed);
    assert_eq!(store.writes(), writes);
    assert_eq!(store.entries(), ledger);
}

#[test]
fn dispatch_follows_version_then_revision() {
    let spy = SpyBackend::new();
    let mut engine = MigrationEngine::new(&spy, MemoryVersionStore::new(), "1.0.0", &LogStatus);
    let mut conn = spy.connection();

    let mut commands = five_versions();
    commands.reverse();
    commands.swap(2, 9);
    engine.apply_all(&mut conn, &commands).unwrap();

    let expected: Vec<String> = five_versions()
        .iter()
        .map(|c| format!("STMT {}.{}", c.version, c.revision))
        .collect();
    assert_eq!(spy.executed(), expected);
}

#[test]
fn retry_resumes_at_the_failing_command() {
    let spy = SpyBackend::new().failing_on("STMT 3.2");
    let store = MemoryVersionStore::new();
    let commands = five_versions();
    let mut conn = spy.connection();

    let mut first = MigrationEngine::new(&spy, store.clone(), "1.0.0", &LogStatus);
    first.load_ledger(&mut conn).unwrap();
    let err = first.apply_all(&mut conn, &commands).unwrap_err();
    assert!(matches!(err, MigrationError::CommandFailed { .. }));
    let before_retry = spy.execute_count();

    spy.heal();
    let mut second = MigrationEngine::new(&spy, store.clone(), "1.0.0", &LogStatus);
    second.load_ledger(&mut conn).unwrap();
    second.apply_all(&mut conn, &commands).unwrap();

    let retried = &spy.executed()[before_retry..];
    assert_eq!(retried.first().map(String::as_str), Some("STMT 3.2"));
    assert_eq!(retried.len(), 8);
    assert_eq!(spy.count_of("STMT 3.1"), 1);
    assert_eq!(spy.count_of("STMT 3.2"), 2);
    assert_eq!(spy.count_of("STMT 1.1"), 1);
}

#[test]
fn legacy_ledger_is_backfilled_without_executing() {
    let spy = SpyBackend::new();
    let store = MemoryVersionStore::with_entries([("1", "1"), ("2", "")]);
    let mut engine = MigrationEngine::new(&spy, store.clone(), "1.0.0", &LogStatus);
    let mut conn = spy.connection();
    engine.load_ledger(&mut conn).unwrap();

    let written = engine.prefill_versions(&mut conn, &five_versions()).unwrap();

    assert_eq!(spy.execute_count(), 0);
    assert_eq!(written, 3);
    let keys = store.keys();
    let ones: Vec<&(String, String)> = keys.iter().filter(|(v, _)| v == "1").collect();
    assert_eq!(ones.len(), 3);
    assert_eq!(
        keys.iter().filter(|k| *k == &("1".to_string(), "1".to_string())).count(),
        1
    );
    assert!(!keys.iter().any(|(v, r)| v.as_str() > "2" && !r.is_empty()));
}

#[test]
fn deferred_fix_runs_after_all_ddl() {
    let spy = SpyBackend::new();
    let store = MemoryVersionStore::new();
    let mut engine = MigrationEngine::new(&spy, store.clone(), "1.0.0", &LogStatus);
    let mut conn = spy.connection();
    let order = Rc::new(RefCell::new(Vec::<String>::new()));

    let seen = Rc::clone(&order);
    let fix = Cmd::fix(3, 1, "FixupData", move |c: &mut SpyConnection| {
        seen.borrow_mut().push("fix".to_string());
        StepOutcome::from_result(c.execute_sql("UPDATE fixed").map(|_| StepOutcome::Done))
    });
    engine.apply_all(&mut conn, &[fix, raw(4, 1)]).unwrap();
    assert_eq!(spy.executed(), vec!["STMT 4.1"]);

    engine.run_deferred_fixes(&mut conn).unwrap();

    assert_eq!(spy.executed(), vec!["STMT 4.1", "UPDATE fixed"]);
    let keys = store.keys();
    let pos = |v: &str| keys.iter().position(|(kv, _)| kv == v).unwrap();
    assert!(pos("3") > pos("4"));
    assert_eq!(order.borrow().len(), 1);
}

#[test]
fn current_version_is_the_highest_major() {
    let spy = SpyBackend::new();
    let mut conn = spy.connection();

    let store = MemoryVersionStore::with_entries([("3", "1"), ("3", "2"), ("5", "1")]);
    let mut engine = MigrationEngine::new(&spy, store, "1.0.0", &LogStatus);
    assert_eq!(engine.load_ledger(&mut conn).unwrap(), 5);

    let mut empty = MigrationEngine::new(&spy, MemoryVersionStore::new(), "1.0.0", &LogStatus);
    assert_eq!(empty.load_ledger(&mut conn).unwrap(), 0);
}

#[test]
fn newer_schema_is_refused_before_any_execute() {
    let dir = tempfile::tempdir().unwrap();
    let spy = SpyBackend::new();
    let catalog = StaticCatalog {
        version_table: vec![raw(0, 1)],
        create_tables: vec![raw(1, 1)],
        patches: (2..=8).map(|v| raw(v, 1)).collect(),
        ..Default::default()
    };
    let clock = clock();
    let options = BootstrapOptions {
        backup_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let store = MemoryVersionStore::with_entries([("10", "1")]);
    let mut bootstrap = Bootstrap::new(&spy, &catalog, &(), options, &LogStatus, &clock);

    let err = bootstrap.run_with_store(store.clone()).unwrap_err();

    assert!(matches!(
        err,
        MigrationError::IncompatibleVersion { found: 10, required: 8 }
    ));
    assert_eq!(bootstrap.state(), StartupState::Failed);
    assert_eq!(spy.execute_count(), 0);
    assert!(spy.backups().is_empty());
    assert_eq!(store.writes(), 0);
}
