//! Configuration types and parsing for schemagate.yml

use crate::error::{CoreError, CoreResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable that selects the config file when no flag is given
pub const CONFIG_ENV: &str = "SG_CONFIG";

/// Environment variable that overrides `database.password`
pub const PASSWORD_ENV: &str = "SG_DB_PASSWORD";

/// Default config file name looked up in a project directory
pub const CONFIG_FILE_NAME: &str = "schemagate.yml";

static IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();

/// Get the compiled identifier regex (built once, reused)
fn identifier_regex() -> &'static Regex {
    IDENTIFIER_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// Top-level configuration from schemagate.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target database connection and migration settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Accounts created when the user table is empty
    #[serde(default)]
    pub users: UsersConfig,

    /// Program version written into every ledger entry
    #[serde(default = "default_program_version")]
    pub program_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            users: UsersConfig::default(),
            program_version: default_program_version(),
        }
    }
}

/// Database engine selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// Embedded DuckDB file (default)
    #[default]
    DuckDb,
    /// PostgreSQL server
    Postgres,
    /// MySQL / MariaDB server
    MySql,
    /// Microsoft SQL Server
    SqlServer,
}

impl DbType {
    /// Default TCP port for client/server engines
    pub fn default_port(self) -> Option<u16> {
        match self {
            DbType::DuckDb => None,
            DbType::Postgres => Some(5432),
            DbType::MySql => Some(3306),
            DbType::SqlServer => Some(1433),
        }
    }

    /// Whether the engine runs in-process against a local file
    pub fn is_embedded(self) -> bool {
        matches!(self, DbType::DuckDb)
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::MySql => write!(f, "mysql"),
            DbType::SqlServer => write!(f, "sqlserver"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database engine
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Server host name (client/server engines)
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port; falls back to the engine's default port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Schema (database/catalog) name the migrations target
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Database file for the embedded engine, or `:memory:`
    #[serde(default)]
    pub path: Option<String>,

    /// Use this connection descriptor verbatim instead of building one
    #[serde(default)]
    pub override_connection_string: Option<String>,

    /// Directory that receives pre-upgrade backups
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Connectivity probe attempts before startup gives up
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Pause between connectivity probe attempts
    #[serde(default = "default_connect_backoff_ms")]
    pub connect_backoff_ms: u64,

    /// Pause after creating the database so the server can settle
    #[serde(default = "default_create_settle_ms")]
    pub create_settle_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            host: default_host(),
            port: None,
            username: String::new(),
            password: String::new(),
            schema: default_schema(),
            path: None,
            override_connection_string: None,
            backup_dir: default_backup_dir(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_ms: default_connect_backoff_ms(),
            create_settle_ms: default_create_settle_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Configured port, or the engine default
    pub fn effective_port(&self) -> u16 {
        self.port
            .or_else(|| self.db_type.default_port())
            .unwrap_or_default()
    }

    /// Embedded database file, defaulting to `<schema>.duckdb`
    pub fn effective_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("{}.duckdb", self.schema))
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }

    pub fn create_settle(&self) -> Duration {
        Duration::from_millis(self.create_settle_ms)
    }

    /// Backup directory resolved against `base`
    pub fn backup_dir_absolute(&self, base: &Path) -> PathBuf {
        let dir = Path::new(&self.backup_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base.join(dir)
        }
    }
}

/// Default account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsersConfig {
    #[serde(default = "default_username")]
    pub default_username: String,

    /// Plain-text password for the default account; empty means none
    #[serde(default)]
    pub default_password: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            default_username: default_username(),
            default_password: String::new(),
        }
    }
}

fn default_program_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_schema() -> String {
    "shoko".to_string()
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_connect_attempts() -> u32 {
    60
}

fn default_connect_backoff_ms() -> u64 {
    1000
}

fn default_create_settle_ms() -> u64 {
    3000
}

fn default_username() -> String {
    "Default".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for schemagate.yml or schemagate.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join(CONFIG_FILE_NAME);
        let yaml_path = dir.join("schemagate.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Resolve the config file from a CLI flag or SG_CONFIG
    ///
    /// Priority: CLI flag > SG_CONFIG env var > None (look in the project dir)
    pub fn resolve_path(cli_path: Option<&Path>) -> Option<PathBuf> {
        cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.database.password = password;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        let db = &self.database;

        if !identifier_regex().is_match(&db.schema) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "schema '{}' must start with a letter or underscore and contain only letters, digits, and underscores",
                    db.schema
                ),
            });
        }

        if db.connect_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "connect_attempts must be at least 1".to_string(),
            });
        }

        if db.db_type.is_embedded() {
            return Ok(());
        }

        if db.override_connection_string.is_none() {
            if db.host.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{} requires a host", db.db_type),
                });
            }
            if !identifier_regex().is_match(&db.username) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("username '{}' is not a valid identifier", db.username),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
