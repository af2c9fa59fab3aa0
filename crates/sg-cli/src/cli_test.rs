use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    Cli::command().debug_assert();
}

#[test]
fn parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["sg", "status", "--json", "-v", "-d", "/srv/app"]).unwrap();

    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir, "/srv/app");
    assert!(matches!(cli.command, Commands::Status(StatusArgs { json: true })));
}

#[test]
fn project_dir_defaults_to_current() {
    let cli = Cli::try_parse_from(["sg", "check"]).unwrap();

    assert_eq!(cli.global.project_dir, ".");
    assert!(!cli.global.verbose);
    assert!(matches!(cli.command, Commands::Check));
}

#[test]
fn rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["sg", "rollback"]).is_err());
}
