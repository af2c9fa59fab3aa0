//! Versioned migration commands.
//!
//! A command is one schema-change step keyed by `(version, revision)`. The
//! engine is generic over the connection type `C` that coded steps and
//! deferred fixes receive; it never inspects raw statement text.

use crate::ledger::VersionKey;
use std::fmt;
use std::rc::Rc;

/// Revision sentinel: the next sequential revision is assigned when the
/// command list is rendered
pub const AUTO_REVISION: i32 = -1;

/// Longest command name shown in a status line before it is cut off
const STATUS_NAME_LIMIT: usize = 42;

/// Result of a coded step or deferred fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step changed the database as intended
    Done,
    /// Nothing to do on this install; recorded like a success
    NotApplicable(String),
    /// The step failed with a diagnostic
    Failed(String),
}

impl StepOutcome {
    /// Turn any displayable error into a failed outcome
    pub fn from_result<E: fmt::Display>(result: Result<StepOutcome, E>) -> Self {
        result.unwrap_or_else(|e| StepOutcome::Failed(e.to_string()))
    }
}

/// Callback run against a live connection
pub type StepFn<C> = Rc<dyn Fn(&mut C) -> StepOutcome>;

/// What a command does when dispatched
pub enum CommandKind<C> {
    /// Backend-native DDL/DML executed verbatim
    RawStatement(String),
    /// Callback run in order with the DDL
    CodedStep(StepFn<C>),
    /// Callback queued until every command in the run has succeeded
    DeferredFix(StepFn<C>),
}

impl<C> Clone for CommandKind<C> {
    fn clone(&self) -> Self {
        match self {
            CommandKind::RawStatement(sql) => CommandKind::RawStatement(sql.clone()),
            CommandKind::CodedStep(f) => CommandKind::CodedStep(Rc::clone(f)),
            CommandKind::DeferredFix(f) => CommandKind::DeferredFix(Rc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for CommandKind<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::RawStatement(sql) => f.debug_tuple("RawStatement").field(sql).finish(),
            CommandKind::CodedStep(_) => f.write_str("CodedStep(..)"),
            CommandKind::DeferredFix(_) => f.write_str("DeferredFix(..)"),
        }
    }
}

/// One versioned migration step
pub struct MigrationCommand<C> {
    /// Major schema generation; `0` is the ledger's own bootstrap and is never recorded
    pub version: i32,
    /// Ordering key within the version, or [`AUTO_REVISION`]
    pub revision: i32,
    pub name: String,
    pub kind: CommandKind<C>,
}

impl<C> Clone for MigrationCommand<C> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            revision: self.revision,
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl<C> fmt::Debug for MigrationCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationCommand")
            .field("version", &self.version)
            .field("revision", &self.revision)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<C> MigrationCommand<C> {
    /// A raw statement, named after its own text
    pub fn raw(version: i32, revision: i32, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            version,
            revision,
            name: sql.clone(),
            kind: CommandKind::RawStatement(sql),
        }
    }

    pub fn coded(
        version: i32,
        revision: i32,
        name: impl Into<String>,
        step: impl Fn(&mut C) -> StepOutcome + 'static,
    ) -> Self {
        Self {
            version,
            revision,
            name: name.into(),
            kind: CommandKind::CodedStep(Rc::new(step)),
        }
    }

    pub fn fix(
        version: i32,
        revision: i32,
        name: impl Into<String>,
        fix: impl Fn(&mut C) -> StepOutcome + 'static,
    ) -> Self {
        Self {
            version,
            revision,
            name: name.into(),
            kind: CommandKind::DeferredFix(Rc::new(fix)),
        }
    }

    /// A coded step that always succeeds, used to keep revision numbers aligned
    /// across engines that have nothing to do at a given step
    pub fn no_op(version: i32, revision: i32) -> Self {
        Self::coded(version, revision, "NoOperation", |_| StepOutcome::Done)
    }

    pub fn key(&self) -> (i32, i32) {
        (self.version, self.revision)
    }

    pub fn version_key(&self) -> VersionKey {
        VersionKey::new(self.version.to_string(), self.revision.to_string())
    }

    /// Whether a successful run of this command is written to the ledger
    pub fn is_recorded(&self) -> bool {
        self.version != 0
    }

    pub fn identity(&self) -> CommandIdentity {
        CommandIdentity {
            version: self.version,
            revision: self.revision,
            name: self.name.clone(),
        }
    }

    /// Command name shortened for status lines
    pub fn status_label(&self) -> String {
        match self.name.char_indices().nth(STATUS_NAME_LIMIT) {
            Some((cut, _)) => format!("{}...", &self.name[..cut]),
            None => self.name.clone(),
        }
    }
}

/// Stable `(version, revision)` ordering of a command list.
///
/// # Panics
///
/// Panics when a key appears twice or a revision was never assigned; both
/// mean the compiled-in command list is broken.
pub fn ordered<C>(commands: &[MigrationCommand<C>]) -> Vec<&MigrationCommand<C>> {
    let mut sorted: Vec<&MigrationCommand<C>> = commands.iter().collect();
    sorted.sort_by_key(|c| c.key());

    for pair in sorted.windows(2) {
        if pair[0].key() == pair[1].key() {
            panic!(
                "duplicate migration key {}.{}: '{}' and '{}'",
                pair[0].version, pair[0].revision, pair[0].name, pair[1].name
            );
        }
    }
    if let Some(c) = sorted.iter().find(|c| c.revision == AUTO_REVISION) {
        panic!(
            "migration '{}' at version {} still has an unassigned revision",
            c.name, c.version
        );
    }
    sorted
}

/// Which command an error or ledger entry refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIdentity {
    pub version: i32,
    pub revision: i32,
    pub name: String,
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.version, self.revision, self.name)
    }
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
