//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// schemagate - Versioned schema migrations for application databases
#[derive(Parser, Debug)]
#[command(name = "sg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to schemagate.yml in the project directory)
    #[arg(short, long, global = true, env = "SG_CONFIG")]
    pub config: Option<String>,

    /// Project directory; relative paths in the config resolve against it
    #[arg(short = 'd', long, global = true, default_value = ".")]
    pub project_dir: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the database and seed baseline data
    Migrate,

    /// Show the schema version without changing anything
    Status(StatusArgs),

    /// Back up the database at its current version
    Backup,

    /// Check that the database server is reachable
    Check,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
