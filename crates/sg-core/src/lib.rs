//! sg-core - Core library for schemagate
//!
//! This crate provides the configuration model, the migration command and
//! version ledger types, schema/owner template rendering, and the small
//! injectable services (clock, status reporting) shared by the adapter and
//! engine crates.

pub mod clock;
pub mod command;
pub mod config;
pub mod digest;
pub mod error;
pub mod ledger;
pub mod status;
pub mod template;

pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{
    ordered, CommandIdentity, CommandKind, MigrationCommand, StepFn, StepOutcome, AUTO_REVISION,
};
pub use config::{Config, DatabaseConfig, DbType, UsersConfig};
pub use digest::hash_password;
pub use error::{CoreError, CoreResult};
pub use ledger::{LedgerEntry, VersionKey, VersionLedger, DATABASE_VERSION_TYPE};
pub use status::{LogStatus, StatusReporter};
pub use template::{assign_revisions, render_commands, TemplateContext};
