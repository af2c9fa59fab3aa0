//! Error types for sg-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Backup could not be written (D004)
    #[error("[D004] Backup failed: {0}")]
    BackupFailed(String),

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// A result did not have the expected shape (D007)
    #[error("[D007] Unexpected result: {0}")]
    UnexpectedResult(String),

    /// A value could not be converted to or from its stored form (D008)
    #[error("[D008] Value conversion failed: {0}")]
    ConversionError(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the message
        // is the only thing to classify on.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl From<postgres::Error> for DbError {
    fn from(err: postgres::Error) -> Self {
        if err.is_closed() {
            DbError::ConnectionError(err.to_string())
        } else if err.code() == Some(&postgres::error::SqlState::UNDEFINED_TABLE) {
            DbError::TableNotFound(err.to_string())
        } else {
            DbError::ExecutionError(err.to_string())
        }
    }
}

impl From<mysql::Error> for DbError {
    fn from(err: mysql::Error) -> Self {
        match &err {
            // ER_NO_SUCH_TABLE
            mysql::Error::MySqlError(e) if e.code == 1146 => DbError::TableNotFound(e.message.clone()),
            mysql::Error::IoError(_) | mysql::Error::DriverError(_) => {
                DbError::ConnectionError(err.to_string())
            }
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}

impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        match &err {
            // Invalid object name
            tiberius::error::Error::Server(e) if e.code() == 208 => {
                DbError::TableNotFound(e.message().to_string())
            }
            tiberius::error::Error::Io { .. } | tiberius::error::Error::Tls(_) => {
                DbError::ConnectionError(err.to_string())
            }
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}
