//! Idempotent command dispatch.
//!
//! [`MigrationEngine`] owns the in-memory ledger index and the deferred-fix
//! queue for one startup. Every command whose `(version, revision)` is already
//! in the ledger is skipped, so a failed run can simply be repeated.

use crate::error::{EngineResult, MigrationError};
use crate::store::VersionStore;
use sg_core::{
    ordered, CommandKind, LedgerEntry, MigrationCommand, StatusReporter, StepOutcome,
    VersionLedger,
};
use sg_db::Backend;
use std::ops::AddAssign;

/// Counts from one or more `apply_all` passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Statements and coded steps that ran
    pub applied: usize,
    /// Commands already present in the ledger
    pub skipped: usize,
    /// Fixes queued for the deferred pass
    pub deferred: usize,
}

impl AddAssign for ApplyReport {
    fn add_assign(&mut self, other: Self) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.deferred += other.deferred;
    }
}

/// Applies ordered command lists through a backend and keeps the ledger current
pub struct MigrationEngine<'a, B: Backend, S: VersionStore<B::Conn>> {
    backend: &'a B,
    store: S,
    ledger: VersionLedger,
    loaded: bool,
    /// First-loaded entry of a ledger that still has the coarse shape
    legacy: Option<LedgerEntry>,
    fixes: Vec<MigrationCommand<B::Conn>>,
    program_version: String,
    status: &'a dyn StatusReporter,
}

impl<'a, B: Backend, S: VersionStore<B::Conn>> MigrationEngine<'a, B, S> {
    pub fn new(
        backend: &'a B,
        store: S,
        program_version: impl Into<String>,
        status: &'a dyn StatusReporter,
    ) -> Self {
        Self {
            backend,
            store,
            ledger: VersionLedger::new(),
            loaded: false,
            legacy: None,
            fixes: Vec::new(),
            program_version: program_version.into(),
            status,
        }
    }

    /// Replace the in-memory index with the persisted ledger and return the
    /// current version.
    ///
    /// The legacy backfill signature is only taken from the first load, while
    /// the ledger still has its pre-upgrade shape.
    pub fn load_ledger(&mut self, conn: &mut B::Conn) -> EngineResult<i32> {
        let entries = if self.backend.has_version_table()? {
            self.store.load(conn)?
        } else {
            Vec::new()
        };
        self.ledger = VersionLedger::from_entries(entries);

        if !self.loaded {
            self.loaded = true;
            if self.ledger.has_legacy_signature() {
                self.legacy = self.ledger.first().cloned();
                log::info!(
                    "Version ledger has the legacy shape ({} entries), backfill pending",
                    self.ledger.len()
                );
            }
        }

        let version = self.ledger.current_version();
        log::debug!("Loaded {} ledger entries, version {}", self.ledger.len(), version);
        Ok(version)
    }

    pub fn current_version(&self) -> i32 {
        self.ledger.current_version()
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Fixes queued and not yet run
    pub fn pending_fixes(&self) -> &[MigrationCommand<B::Conn>] {
        &self.fixes
    }

    /// Whether the first load found a ledger that still needs backfilling
    pub fn needs_backfill(&self) -> bool {
        self.legacy.is_some()
    }

    /// Apply `commands` in `(version, revision)` order.
    ///
    /// Raw statements and coded steps run immediately and are recorded on
    /// success. Deferred fixes are queued for [`Self::run_deferred_fixes`].
    /// The first failure aborts the pass with nothing recorded for the
    /// failing command.
    pub fn apply_all(
        &mut self,
        conn: &mut B::Conn,
        commands: &[MigrationCommand<B::Conn>],
    ) -> EngineResult<ApplyReport> {
        let mut report = ApplyReport::default();

        for command in ordered(commands) {
            if command.is_recorded() && self.ledger.contains(&command.version_key()) {
                report.skipped += 1;
                continue;
            }

            match &command.kind {
                CommandKind::RawStatement(sql) => {
                    self.announce("Applying Schema Patches", command);
                    self.backend
                        .execute(conn, sql)
                        .map_err(|e| MigrationError::CommandFailed {
                            command: command.identity(),
                            cause: e.to_string(),
                        })?;
                }
                CommandKind::CodedStep(step) => {
                    self.announce("Applying Schema Patches", command);
                    match step(conn) {
                        StepOutcome::Done => {}
                        StepOutcome::NotApplicable(reason) => {
                            log::debug!("{} not applicable: {}", command.identity(), reason);
                        }
                        StepOutcome::Failed(cause) => {
                            return Err(MigrationError::CommandFailed {
                                command: command.identity(),
                                cause,
                            });
                        }
                    }
                }
                CommandKind::DeferredFix(_) => {
                    if !self.fixes.iter().any(|f| f.key() == command.key()) {
                        log::debug!("Queued fix {}", command.identity());
                        self.fixes.push(command.clone());
                    }
                    report.deferred += 1;
                    continue;
                }
            }

            self.record(conn, command)?;
            report.applied += 1;
        }

        Ok(report)
    }

    /// Run every queued fix in queue order, recording each as it succeeds
    pub fn run_deferred_fixes(&mut self, conn: &mut B::Conn) -> EngineResult<usize> {
        let fixes = std::mem::take(&mut self.fixes);
        let mut ran = 0;

        for fix in &fixes {
            if fix.is_recorded() && self.ledger.contains(&fix.version_key()) {
                continue;
            }
            let CommandKind::DeferredFix(callback) = &fix.kind else {
                continue;
            };

            self.announce("Applying Fixes", fix);
            match callback(conn) {
                StepOutcome::Failed(cause) => {
                    return Err(MigrationError::FixFailed {
                        command: fix.identity(),
                        cause,
                    });
                }
                StepOutcome::NotApplicable(reason) => {
                    log::debug!("Fix {} not applicable: {}", fix.identity(), reason);
                }
                StepOutcome::Done => {}
            }

            self.record(conn, fix)?;
            ran += 1;
        }

        Ok(ran)
    }

    /// Backfill a legacy ledger into per-revision entries.
    ///
    /// When the first load found the legacy signature, the recorded entry is
    /// deleted and every command at or below its version is written to the
    /// ledger as already applied. Only the version store is touched; nothing
    /// is executed. Returns the number of entries written.
    pub fn prefill_versions(
        &mut self,
        conn: &mut B::Conn,
        commands: &[MigrationCommand<B::Conn>],
    ) -> EngineResult<usize> {
        let Some(legacy) = self.legacy.take() else {
            return Ok(0);
        };
        let recorded = legacy.major().ok_or_else(|| {
            MigrationError::Ledger(format!(
                "legacy ledger version '{}' is not a number",
                legacy.key.value
            ))
        })?;

        log::info!("Backfilling version ledger up to version {}", recorded);
        self.store.delete(conn, &legacy.key)?;
        self.ledger.remove(&legacy.key);

        let mut written = 0;
        for command in ordered(commands) {
            if !command.is_recorded() || command.version > recorded {
                continue;
            }
            if self.ledger.contains(&command.version_key()) {
                continue;
            }
            self.record(conn, command)?;
            written += 1;
        }

        log::info!("Backfilled {} ledger entries", written);
        Ok(written)
    }

    fn record(&mut self, conn: &mut B::Conn, command: &MigrationCommand<B::Conn>) -> EngineResult<()> {
        if !command.is_recorded() {
            return Ok(());
        }
        let entry = LedgerEntry::new(command.version_key(), &command.name, &self.program_version);
        self.store.insert(conn, &entry)?;
        self.ledger.insert(entry);
        Ok(())
    }

    fn announce(&self, phase: &str, command: &MigrationCommand<B::Conn>) {
        log::debug!("Dispatching {}", command.identity());
        self.status.status(&format!(
            "Database - {}...{}.{} - {}",
            phase,
            command.version,
            command.revision,
            command.status_label()
        ));
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
