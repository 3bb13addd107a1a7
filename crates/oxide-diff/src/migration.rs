//! The accumulate / render / apply workflow.
//!
//! A [`Migration`] holds two snapshots, the changes pending between them
//! and the statements rendered for those changes:
//!
//! ```text
//! Fresh --inspect--> Inspected --add_*_changes--> Diffed --apply--> Applied
//!                                                    ^                 |
//!                                                    +--add_*_changes--+
//! ```
//!
//! Applying folds the pending changes into the source snapshot in memory,
//! so a second diff against the unchanged target finds nothing left to do.

use tracing::info;

use crate::change::{Change, Changes};
use crate::diff::{diff_all, diff_extensions, DiffOptions};
use crate::error::{DiffError, Result};
use crate::graph::linearize;
use crate::inspect::{Inspector, JsonInspector};
use crate::snapshot::Snapshot;
use crate::state::SchemaState;
use crate::statements::{Fragment, Statements};

/// Where a migration is in its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// At least one snapshot has not been inspected yet.
    Fresh,
    /// Both snapshots are available.
    Inspected,
    /// Changes are pending.
    Diffed,
    /// Pending changes were folded into the source snapshot.
    Applied,
}

/// Diffs two database states and accumulates the statements between them.
pub struct Migration<I: Inspector = JsonInspector> {
    inspector: I,
    source_handle: Option<I::Handle>,
    target_handle: Option<I::Handle>,
    source: Option<Snapshot>,
    target: Option<Snapshot>,
    options: DiffOptions,
    changes: Changes,
    statements: Statements,
    state: MigrationState,
}

impl Migration<JsonInspector> {
    /// Creates a migration between two snapshots that are already loaded.
    pub fn from_snapshots(source: Snapshot, target: Snapshot, options: DiffOptions) -> Result<Self> {
        options.filter.validate()?;
        let mut migration = Self::unloaded(JsonInspector::new(), None, None, options);
        migration.source = Some(source.filtered(&migration.options.filter));
        migration.target = Some(target.filtered(&migration.options.filter));
        migration.state = MigrationState::Inspected;
        Ok(migration)
    }
}

impl<I: Inspector> Migration<I> {
    /// Creates a migration between the states behind two handles.
    ///
    /// Nothing is inspected until [`inspect_from`](Self::inspect_from) and
    /// [`inspect_target`](Self::inspect_target) run.
    pub fn new(inspector: I, source: I::Handle, target: I::Handle, options: DiffOptions) -> Result<Self> {
        options.filter.validate()?;
        Ok(Self::unloaded(inspector, Some(source), Some(target), options))
    }

    /// Creates a migration without handles. Both snapshots are empty, so
    /// every diff finds nothing.
    pub fn placeholder(inspector: I, options: DiffOptions) -> Result<Self> {
        options.filter.validate()?;
        let mut migration = Self::unloaded(inspector, None, None, options);
        migration.source = Some(Snapshot::new());
        migration.target = Some(Snapshot::new());
        migration.state = MigrationState::Inspected;
        Ok(migration)
    }

    fn unloaded(
        inspector: I,
        source_handle: Option<I::Handle>,
        target_handle: Option<I::Handle>,
        options: DiffOptions,
    ) -> Self {
        Self {
            inspector,
            source_handle,
            target_handle,
            source: None,
            target: None,
            options,
            changes: Changes::new(),
            statements: Statements::default(),
            state: MigrationState::Fresh,
        }
    }

    /// Inspects the source state.
    pub fn inspect_from(&mut self) -> Result<()> {
        let handle = self.source_handle()?;
        let snapshot = self.inspector.inspect(handle, &self.options.filter)?;
        info!(objects = snapshot.len(), "Inspected source");
        self.source = Some(snapshot);
        self.mark_inspected();
        Ok(())
    }

    /// Inspects the target state.
    pub fn inspect_target(&mut self) -> Result<()> {
        let handle = self.target_handle()?;
        let snapshot = self.inspector.inspect(handle, &self.options.filter)?;
        info!(objects = snapshot.len(), "Inspected target");
        self.target = Some(snapshot);
        self.mark_inspected();
        Ok(())
    }

    fn mark_inspected(&mut self) {
        if self.state == MigrationState::Fresh && self.source.is_some() && self.target.is_some() {
            self.state = MigrationState::Inspected;
        }
    }

    /// Enables or disables the destructive-statement gate.
    pub fn set_safety(&mut self, enabled: bool) {
        self.statements.safe = enabled;
    }

    /// Queues a raw SQL fragment, classified by the configured pattern.
    pub fn add_sql(&mut self, sql: impl Into<String>) {
        self.statements
            .push(Fragment::raw(sql, &self.options.destructive_pattern));
    }

    /// Diffs extensions only. With `drops` false, removed extensions are
    /// left in place.
    pub fn add_extension_changes(&mut self, drops: bool) -> Result<()> {
        let changes = diff_extensions(self.source()?, self.target()?, &self.options, drops);
        self.add_changes(changes)
    }

    /// Diffs every object kind. Privileges are only compared when
    /// `privileges` is set.
    pub fn add_all_changes(&mut self, privileges: bool) -> Result<()> {
        let changes = diff_all(self.source()?, self.target()?, &self.options, privileges);
        self.add_changes(changes)
    }

    fn add_changes(&mut self, changes: Vec<Change>) -> Result<()> {
        let fresh: Vec<Change> = changes
            .into_iter()
            .filter(|c| !self.changes.contains(c))
            .collect();

        let linearized = linearize(&fresh, self.source()?, self.target()?);
        info!(
            changes = fresh.len(),
            statements = linearized.fragments.len(),
            "Added changes"
        );
        self.statements.extend(linearized.fragments);
        self.changes.extend(fresh);
        self.changes.extend(linearized.diagnostics);
        self.state = MigrationState::Diffed;
        Ok(())
    }

    /// Folds the pending changes into the source snapshot and clears the
    /// pending changes and statements.
    pub fn apply(&mut self) -> Result<()> {
        let source = self.source()?.clone();
        let applied = SchemaState::from_changes(source, self.changes.iter())?;
        info!(changes = self.changes.len(), "Applied changes");

        self.source = Some(applied.into_snapshot());
        self.changes.clear();
        self.statements.clear();
        self.state = MigrationState::Applied;
        Ok(())
    }

    /// Rendered SQL for everything pending.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::AccessBeforeReady`] before both snapshots are
    /// inspected, and [`DiffError::UnsafeMigration`] if destructive
    /// statements are pending while the gate is enabled.
    pub fn sql(&self) -> Result<String> {
        self.statements()?.sql()
    }

    /// Pending statements.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::AccessBeforeReady`] before both snapshots are
    /// inspected.
    pub fn statements(&self) -> Result<&Statements> {
        self.ready("statements")?;
        Ok(&self.statements)
    }

    /// Pending changes by kind.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::AccessBeforeReady`] before both snapshots are
    /// inspected.
    pub fn changes(&self) -> Result<&Changes> {
        self.ready("changes")?;
        Ok(&self.changes)
    }

    /// Notes recorded while ordering, such as broken dependency cycles.
    pub fn diagnostics(&self) -> Result<&[Change]> {
        Ok(self.changes()?.diagnostics())
    }

    fn ready(&self, what: &'static str) -> Result<()> {
        if self.state == MigrationState::Fresh {
            return Err(DiffError::AccessBeforeReady {
                what,
                step: "inspect_from/inspect_target",
            });
        }
        Ok(())
    }

    /// Current workflow state.
    #[must_use]
    pub const fn state(&self) -> MigrationState {
        self.state
    }

    /// Options in use.
    #[must_use]
    pub const fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// The source snapshot, including applied changes.
    pub fn source(&self) -> Result<&Snapshot> {
        self.source.as_ref().ok_or(DiffError::AccessBeforeReady {
            what: "source snapshot",
            step: "inspect_from",
        })
    }

    /// The target snapshot.
    pub fn target(&self) -> Result<&Snapshot> {
        self.target.as_ref().ok_or(DiffError::AccessBeforeReady {
            what: "target snapshot",
            step: "inspect_target",
        })
    }

    /// Handle of the source state.
    pub fn source_handle(&self) -> Result<&I::Handle> {
        self.source_handle.as_ref().ok_or(DiffError::AccessBeforeReady {
            what: "source handle",
            step: "construction with a source",
        })
    }

    /// Handle of the target state.
    pub fn target_handle(&self) -> Result<&I::Handle> {
        self.target_handle.as_ref().ok_or(DiffError::AccessBeforeReady {
            what: "target handle",
            step: "construction with a target",
        })
    }
}
