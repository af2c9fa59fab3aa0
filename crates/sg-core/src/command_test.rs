use super::*;

type Cmd = MigrationCommand<()>;

fn keys(commands: &[&Cmd]) -> Vec<(i32, i32)> {
    commands.iter().map(|c| c.key()).collect()
}

#[test]
fn raw_command_is_named_after_its_text() {
    let cmd = Cmd::raw(3, 1, "ALTER TABLE Users ADD PlexToken TEXT NULL");
    assert_eq!(cmd.name, "ALTER TABLE Users ADD PlexToken TEXT NULL");
    assert!(matches!(cmd.kind, CommandKind::RawStatement(ref sql) if sql == &cmd.name));
}

#[test]
fn version_zero_is_never_recorded() {
    assert!(!Cmd::raw(0, 1, "CREATE TABLE Versions ()").is_recorded());
    assert!(Cmd::raw(1, 1, "CREATE TABLE Users ()").is_recorded());
}

#[test]
fn version_key_uses_text_values() {
    let key = Cmd::raw(12, 3, "x").version_key();
    assert_eq!(key, VersionKey::new("12", "3"));
}

#[test]
fn status_label_truncates_long_names() {
    let short = Cmd::raw(1, 1, "CREATE INDEX IX_A ON A(B)");
    assert_eq!(short.status_label(), "CREATE INDEX IX_A ON A(B)");

    let long = Cmd::raw(
        1,
        2,
        "CREATE TABLE VideoLocal ( VideoLocalID INTEGER PRIMARY KEY, Hash TEXT NOT NULL )",
    );
    let label = long.status_label();
    assert_eq!(label, "CREATE TABLE VideoLocal ( VideoLocalID INT...");
    assert_eq!(label.chars().count(), 45);
}

#[test]
fn status_label_exactly_at_limit_is_kept() {
    let name = "x".repeat(42);
    assert_eq!(Cmd::raw(1, 1, name.clone()).status_label(), name);
}

#[test]
fn coded_step_outcomes() {
    let step = Cmd::coded(2, 1, "noop", |_| StepOutcome::NotApplicable("absent".into()));
    let CommandKind::CodedStep(f) = &step.kind else {
        panic!("expected coded step");
    };
    assert_eq!(f(&mut ()), StepOutcome::NotApplicable("absent".into()));
}

#[test]
fn no_op_succeeds() {
    let cmd = Cmd::no_op(4, 2);
    assert_eq!(cmd.name, "NoOperation");
    let CommandKind::CodedStep(f) = &cmd.kind else {
        panic!("expected coded step");
    };
    assert_eq!(f(&mut ()), StepOutcome::Done);
}

#[test]
fn from_result_maps_errors_to_failures() {
    let ok: Result<StepOutcome, String> = Ok(StepOutcome::Done);
    assert_eq!(StepOutcome::from_result(ok), StepOutcome::Done);
    let err: Result<StepOutcome, String> = Err("no such table".into());
    assert_eq!(
        StepOutcome::from_result(err),
        StepOutcome::Failed("no such table".into())
    );
}

#[test]
fn fix_is_deferred() {
    let fix = Cmd::fix(3, 2, "Normalize folders", |_| StepOutcome::Done);
    assert!(matches!(fix.kind, CommandKind::DeferredFix(_)));
    assert!(matches!(Cmd::raw(3, 1, "x").kind, CommandKind::RawStatement(_)));
}

#[test]
fn ordered_sorts_by_version_then_revision() {
    let commands = vec![
        Cmd::raw(2, 1, "c"),
        Cmd::raw(1, 2, "b"),
        Cmd::raw(0, 1, "ledger"),
        Cmd::raw(1, 1, "a"),
        Cmd::raw(10, 1, "d"),
    ];
    let sorted = ordered(&commands);
    assert_eq!(keys(&sorted), vec![(0, 1), (1, 1), (1, 2), (2, 1), (10, 1)]);
}

#[test]
#[should_panic(expected = "duplicate migration key 1.1")]
fn ordered_rejects_duplicate_keys() {
    let commands = vec![Cmd::raw(1, 1, "a"), Cmd::raw(1, 1, "b")];
    ordered(&commands);
}

#[test]
#[should_panic(expected = "unassigned revision")]
fn ordered_rejects_auto_revision() {
    let commands = vec![Cmd::raw(1, AUTO_REVISION, "a")];
    ordered(&commands);
}

#[test]
fn identity_display() {
    let id = Cmd::raw(5, 2, "DROP INDEX IX_X").identity();
    assert_eq!(id.to_string(), "5.2 (DROP INDEX IX_X)");
}
