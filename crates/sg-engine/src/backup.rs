//! Pre-upgrade backups.

use chrono::NaiveDateTime;
use sg_core::Clock;
use sg_db::{Backend, DbResult};
use std::path::PathBuf;

/// `<schema>_<version:03>_<yyyyMMddHHmm>`, before the engine-specific extension
pub fn backup_file_stem(schema: &str, version: i32, now: NaiveDateTime) -> String {
    format!("{}_{:03}_{}", schema, version, now.format("%Y%m%d%H%M"))
}

/// Writes timestamped backups into one directory
pub struct BackupInvoker<'a> {
    dir: PathBuf,
    schema: String,
    clock: &'a dyn Clock,
}

impl<'a> BackupInvoker<'a> {
    pub fn new(dir: impl Into<PathBuf>, schema: impl Into<String>, clock: &'a dyn Clock) -> Self {
        Self {
            dir: dir.into(),
            schema: schema.into(),
            clock,
        }
    }

    /// Path the backend receives, without its extension
    pub fn target(&self, version: i32) -> PathBuf {
        self.dir
            .join(backup_file_stem(&self.schema, version, self.clock.now()))
    }

    /// Back up now and report the backend's error
    pub fn try_run<B: Backend>(&self, backend: &B, version: i32) -> DbResult<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::debug!("Could not create backup directory {}: {}", self.dir.display(), e);
        }
        let path = backend.backup(&self.target(version))?;
        log::info!("Database backed up to {}", path.display());
        Ok(path)
    }

    /// Best-effort backup; a failure is logged and the upgrade goes ahead
    pub fn run<B: Backend>(&self, backend: &B, version: i32) -> Option<PathBuf> {
        match self.try_run(backend, version) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Database backup skipped: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "backup_test.rs"]
mod tests;
