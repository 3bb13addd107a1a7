//! Forced recreation of dependent objects.
//!
//! Dropping a view or function, rebuilding an enum or a table, or
//! rewriting a table column takes down objects that reference them. Those
//! dependents are dropped and recreated from their target definitions
//! even when they did not change.

use std::collections::{BTreeSet, VecDeque};

use crate::snapshot::{ObjectId, ObjectKind, Snapshot};

/// Kinds that can be dropped and recreated without losing data.
const RECREATABLE: [ObjectKind; 5] = [
    ObjectKind::Function,
    ObjectKind::View,
    ObjectKind::Index,
    ObjectKind::Trigger,
    ObjectKind::Policy,
];

/// Direct dependents of a rebuilt enum that must be recreated.
const ENUM_DEPENDENTS: [ObjectKind; 4] = [
    ObjectKind::Function,
    ObjectKind::View,
    ObjectKind::Index,
    ObjectKind::Policy,
];

/// Direct dependents of a dropped and recreated table.
const TABLE_DEPENDENTS: [ObjectKind; 5] = [
    ObjectKind::View,
    ObjectKind::Index,
    ObjectKind::Trigger,
    ObjectKind::Policy,
    ObjectKind::Constraint,
];

/// Objects whose change takes down what depends on them.
pub(super) struct Roots<'a> {
    /// Enums whose labels were removed or reordered.
    pub enums: &'a BTreeSet<ObjectId>,
    /// Tables with a dropped, retyped or regenerated column.
    pub rewritten_tables: &'a BTreeSet<ObjectId>,
    /// Tables dropped and created again.
    pub rebuilt_tables: &'a BTreeSet<ObjectId>,
    /// Views whose query changed.
    pub views: &'a BTreeSet<ObjectId>,
    /// Functions whose signature changed.
    pub functions: &'a BTreeSet<ObjectId>,
}

/// Computes the transitive set of objects to recreate.
///
/// Redefined views and functions are forced themselves; the other roots
/// only force their dependents. Only objects present in both snapshots
/// are returned; removed ones are dropped by their own change.
pub(super) fn forced(source: &Snapshot, target: &Snapshot, roots: &Roots<'_>) -> BTreeSet<ObjectId> {
    let mut queue: VecDeque<ObjectId> = VecDeque::new();
    for id in roots.enums {
        queue.extend(direct(source, id, &ENUM_DEPENDENTS));
    }
    for id in roots.rewritten_tables {
        queue.extend(direct(source, id, &[ObjectKind::View]));
    }
    for id in roots.rebuilt_tables {
        queue.extend(direct(source, id, &TABLE_DEPENDENTS));
    }
    queue.extend(roots.views.iter().chain(roots.functions).cloned());

    let mut forced = BTreeSet::new();
    while let Some(id) = queue.pop_front() {
        if forced.contains(&id) {
            continue;
        }
        queue.extend(direct(source, &id, &RECREATABLE));
        forced.insert(id);
    }

    forced.retain(|id| target.contains(id));
    forced
}

fn direct(source: &Snapshot, id: &ObjectId, kinds: &[ObjectKind]) -> Vec<ObjectId> {
    source
        .dependents_of(id)
        .into_iter()
        .filter(|dependent| kinds.contains(&dependent.kind))
        .collect()
}
