//! schemagate CLI - bring an application database to the current schema

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{backup, check, migrate, status};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    match &cli.command {
        cli::Commands::Migrate => migrate::execute(&cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Backup => backup::execute(&cli.global),
        cli::Commands::Check => check::execute(&cli.global),
    }
}
