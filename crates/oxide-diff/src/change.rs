//! Synthesized changes.
//!
//! A [`Change`] is one drop/create/alter operation tied to a single schema
//! object. Changes are never patched: every diff pass builds a fresh set.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{DiffError, Result};
use crate::snapshot::{ObjectId, ObjectKind, SchemaObject};

/// How a change updates the in-memory source snapshot once applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Insert or replace an object with its target definition.
    Put(SchemaObject),
    /// Remove an object.
    Remove(ObjectId),
}

/// One synthesized operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Kind of the changed object.
    pub kind: ObjectKind,
    /// Changed object (for columns, the column identifier).
    pub target: ObjectId,
    /// Graph node the statements are ordered by (for columns, the table).
    pub node: ObjectId,
    /// Statements emitted in the drop phase.
    pub drop: Vec<String>,
    /// Statements emitted in the create/alter phase.
    pub create: Vec<String>,
    /// Ownership and comment statements emitted after all structural ones.
    pub trailing: Vec<String>,
    /// Whether executing the change could discard data or break a dependent.
    pub destructive: bool,
    /// Objects this change's target depends on.
    pub depends_on: BTreeSet<ObjectId>,
    /// Snapshot updates performed by `apply`.
    pub effects: Vec<Effect>,
    /// Set on diagnostic changes, which carry no SQL.
    pub note: Option<String>,
}

impl Change {
    /// Creates an empty change for `target`.
    #[must_use]
    pub fn new(target: ObjectId) -> Self {
        Self {
            kind: target.kind,
            node: target.clone(),
            target,
            drop: Vec::new(),
            create: Vec::new(),
            trailing: Vec::new(),
            destructive: false,
            depends_on: BTreeSet::new(),
            effects: Vec::new(),
            note: None,
        }
    }

    /// Creates a diagnostic change that records a note and carries no SQL.
    #[must_use]
    pub fn diagnostic(target: ObjectId, note: impl Into<String>) -> Self {
        let mut change = Self::new(target);
        change.note = Some(note.into());
        change
    }

    /// Orders this change by another graph node.
    #[must_use]
    pub fn node(mut self, node: ObjectId) -> Self {
        self.node = node;
        self
    }

    /// Adds a drop-phase statement.
    #[must_use]
    pub fn drop_sql(mut self, sql: impl Into<String>) -> Self {
        self.drop.push(sql.into());
        self
    }

    /// Adds a create-phase statement.
    #[must_use]
    pub fn create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create.push(sql.into());
        self
    }

    /// Adds a trailing metadata statement.
    #[must_use]
    pub fn trailing_sql(mut self, sql: impl Into<String>) -> Self {
        self.trailing.push(sql.into());
        self
    }

    /// Adds several trailing metadata statements.
    #[must_use]
    pub fn extend_trailing(mut self, sql: impl IntoIterator<Item = String>) -> Self {
        self.trailing.extend(sql);
        self
    }

    /// Marks the change as destructive when `destructive` is true.
    #[must_use]
    pub const fn destructive(mut self, destructive: bool) -> Self {
        self.destructive = self.destructive || destructive;
        self
    }

    /// Records dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = ObjectId>) -> Self {
        self.depends_on.extend(deps);
        self
    }

    /// Adds an apply effect.
    #[must_use]
    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Returns true for diagnostic changes.
    #[must_use]
    pub const fn is_diagnostic(&self) -> bool {
        self.note.is_some()
    }

    /// Returns true if the change carries no SQL.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drop.is_empty() && self.create.is_empty() && self.trailing.is_empty()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref note) = self.note {
            return write!(f, "{}: {note}", self.target);
        }
        write!(f, "{}", self.target)?;
        if self.destructive {
            f.write_str(" (destructive)")?;
        }
        Ok(())
    }
}

/// Pending changes grouped by object kind.
///
/// The registry has one slot per [`ObjectKind`]; looking a kind up by an
/// unknown name fails instead of returning an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    slots: [Vec<Change>; ObjectKind::ALL.len()],
    diagnostics: Vec<Change>,
}

const fn slot(kind: ObjectKind) -> usize {
    kind as usize
}

impl Changes {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending changes of one kind, in generation order.
    #[must_use]
    pub fn get(&self, kind: ObjectKind) -> &[Change] {
        &self.slots[slot(kind)]
    }

    /// Pending changes of the kind named `name` (`"tables"`, `"enum"`, ...).
    pub fn by_name(&self, name: &str) -> Result<&[Change]> {
        let kind = name
            .parse::<ObjectKind>()
            .map_err(|_| DiffError::UnknownKind(name.to_string()))?;
        Ok(self.get(kind))
    }

    /// Adds a change. Diagnostic changes are kept apart from pending ones.
    pub fn push(&mut self, change: Change) {
        if change.is_diagnostic() {
            self.diagnostics.push(change);
        } else {
            self.slots[slot(change.kind)].push(change);
        }
    }

    /// Returns true if an equal change is already pending.
    #[must_use]
    pub fn contains(&self, change: &Change) -> bool {
        if change.is_diagnostic() {
            return self.diagnostics.contains(change);
        }
        self.slots[slot(change.kind)].contains(change)
    }

    /// Iterates over all pending changes, kind by kind.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.slots.iter().flatten()
    }

    /// Diagnostic changes recorded while ordering.
    #[must_use]
    pub fn diagnostics(&self) -> &[Change] {
        &self.diagnostics
    }

    /// Number of pending changes (diagnostics excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if any pending change is destructive.
    #[must_use]
    pub fn has_destructive(&self) -> bool {
        self.iter().any(|c| c.destructive)
    }

    /// Removes every pending change and diagnostic.
    pub fn clear(&mut self) {
        for changes in &mut self.slots {
            changes.clear();
        }
        self.diagnostics.clear();
    }
}

impl Extend<Change> for Changes {
    fn extend<T: IntoIterator<Item = Change>>(&mut self, iter: T) {
        for change in iter {
            self.push(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drop_users() -> Change {
        Change::new(ObjectId::table("public", "users"))
            .drop_sql("drop table \"public\".\"users\";")
            .destructive(true)
            .effect(Effect::Remove(ObjectId::table("public", "users")))
    }

    #[test]
    fn test_builder() {
        let change = drop_users();
        assert_eq!(change.kind, ObjectKind::Table);
        assert_eq!(change.node, change.target);
        assert!(change.destructive);
        assert!(!change.is_empty());
        assert_eq!(change.to_string(), "table \"public\".\"users\" (destructive)");
    }

    #[test]
    fn test_destructive_is_sticky() {
        let change = drop_users().destructive(false);
        assert!(change.destructive);
    }

    #[test]
    fn test_registry_by_name() {
        let mut changes = Changes::new();
        changes.push(drop_users());

        assert_eq!(changes.by_name("tables").unwrap().len(), 1);
        assert!(changes.by_name("views").unwrap().is_empty());
        assert!(matches!(
            changes.by_name("nonexist"),
            Err(DiffError::UnknownKind(name)) if name == "nonexist"
        ));
    }

    #[test]
    fn test_registry_keeps_diagnostics_apart() {
        let mut changes = Changes::new();
        changes.push(Change::diagnostic(
            ObjectId::function("public", "f", ""),
            "dependency cycle broken",
        ));
        assert!(changes.is_empty());
        assert_eq!(changes.diagnostics().len(), 1);

        changes.push(drop_users());
        assert!(changes.contains(&drop_users()));
        assert!(changes.has_destructive());

        changes.clear();
        assert!(changes.is_empty());
        assert!(changes.diagnostics().is_empty());
    }
}
