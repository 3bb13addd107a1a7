//! In-memory application of changes.
//!
//! Applying a change never touches a database: its effects are folded into
//! the source snapshot so that re-diffing against the target converges.

use tracing::debug;

use crate::change::{Change, Effect};
use crate::error::{DiffError, Result};
use crate::snapshot::Snapshot;

/// A snapshot being brought up to date by applied changes.
#[derive(Debug, Default)]
pub struct SchemaState {
    snapshot: Snapshot,
}

impl SchemaState {
    /// Creates a new empty schema state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing snapshot.
    #[must_use]
    pub const fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Consumes and returns the snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    /// Applies every effect of a change. Diagnostic changes have none.
    pub fn apply_change(&mut self, change: &Change) -> Result<()> {
        for effect in &change.effects {
            self.apply_effect(effect)?;
        }
        Ok(())
    }

    /// Applies a single effect.
    pub fn apply_effect(&mut self, effect: &Effect) -> Result<()> {
        match effect {
            Effect::Put(object) => {
                debug!(object = %object.id(), "Put object");
                self.snapshot.put(object.clone());
            }
            Effect::Remove(id) => {
                if !self.snapshot.remove(id) {
                    return Err(DiffError::InvalidState(format!("{id} does not exist")));
                }
                debug!(object = %id, "Removed object");
            }
        }
        Ok(())
    }

    /// Builds the state reached by applying `changes` to `snapshot`.
    pub fn from_changes<'a>(
        snapshot: Snapshot,
        changes: impl IntoIterator<Item = &'a Change>,
    ) -> Result<Self> {
        let mut state = Self::from_snapshot(snapshot);
        for change in changes {
            state.apply_change(change)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CatalogObject, Column, ObjectId, Table};

    fn users() -> Table {
        Table::new("public", "users").column(Column::new("id", "integer").not_null())
    }

    #[test]
    fn test_put_replaces_object() {
        let mut state = SchemaState::from_snapshot(Snapshot::new().with(users()));
        let wider = users().column(Column::new("email", "text"));
        state
            .apply_effect(&Effect::Put(wider.clone().into()))
            .unwrap();

        let table = &state.snapshot().tables[&wider.key()];
        assert!(table.get_column("email").is_some());
    }

    #[test]
    fn test_remove_object() {
        let mut state = SchemaState::from_snapshot(Snapshot::new().with(users()));
        state
            .apply_effect(&Effect::Remove(ObjectId::table("public", "users")))
            .unwrap();
        assert!(state.into_snapshot().is_empty());
    }

    #[test]
    fn test_missing_object_error() {
        let mut state = SchemaState::new();
        let result = state.apply_effect(&Effect::Remove(ObjectId::table("public", "nonexistent")));
        assert!(matches!(result, Err(DiffError::InvalidState(_))));
    }

    #[test]
    fn test_from_changes() {
        let create = Change::new(users().id()).effect(Effect::Put(users().into()));
        let state = SchemaState::from_changes(Snapshot::new(), [&create]).unwrap();
        assert_eq!(state.snapshot(), &Snapshot::new().with(users()));
    }
}
