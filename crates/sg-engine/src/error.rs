//! Error types for sg-engine

use sg_core::{CommandIdentity, DbType};
use sg_db::DbError;
use thiserror::Error;

/// Fatal startup and migration errors
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The server never answered the connectivity probe (G001)
    #[error("[G001] Could not reach the {backend} database after {attempts} attempts")]
    ConnectivityTimeout { backend: DbType, attempts: u32 },

    /// The ledger records a newer schema than this program knows (G002)
    #[error(
        "[G002] Database schema version {found} is newer than the supported version {required}; refusing to run against it"
    )]
    IncompatibleVersion { found: i32, required: i32 },

    /// A statement or coded step failed; nothing was recorded for it (G003)
    #[error("[G003] Migration command {command} failed: {cause}")]
    CommandFailed {
        command: CommandIdentity,
        cause: String,
    },

    /// A deferred data fix failed after the schema changes were committed (G004)
    #[error(
        "[G004] Data fix {command} failed: {cause}. Schema changes for this run are already committed; the fix will be retried on the next start"
    )]
    FixFailed {
        command: CommandIdentity,
        cause: String,
    },

    /// The version ledger could not be read or written (G005)
    #[error("[G005] Version ledger error: {0}")]
    Ledger(String),

    /// Database error outside command dispatch (G006)
    #[error("[G006] {0}")]
    Db(#[from] DbError),

    /// Startup could not be prepared (G007)
    #[error("[G007] Setup failed: {0}")]
    Setup(String),
}

impl MigrationError {
    /// The command a failure refers to, if any
    pub fn command(&self) -> Option<&CommandIdentity> {
        match self {
            MigrationError::CommandFailed { command, .. } | MigrationError::FixFailed { command, .. } => {
                Some(command)
            }
            _ => None,
        }
    }
}

/// Result type alias for MigrationError
pub type EngineResult<T> = Result<T, MigrationError>;
