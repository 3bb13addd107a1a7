//! Per-kind difference computation.
//!
//! Each object kind is partitioned into added, dropped and common entries;
//! a per-kind policy then decides between ALTER in place and DROP + CREATE
//! and tags each resulting [`Change`] as destructive or not.

mod constraints;
mod dependents;
mod enums;
mod metadata;
mod objects;
mod privileges;
mod routines;
mod tables;
mod views;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::change::Change;
use crate::dialect::split_array;
use crate::snapshot::{ObjectId, ObjectKind, SchemaFilter, Snapshot};
use crate::statements::DestructivePattern;

pub use tables::is_narrowing;

/// Options for the diff engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Treat extension version differences as no change.
    pub ignore_extension_versions: bool,
    /// Schemas to keep or leave out when snapshots are loaded.
    pub filter: SchemaFilter,
    /// Classifies caller-supplied raw SQL fragments.
    pub destructive_pattern: DestructivePattern,
}

impl DiffOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores extension version differences.
    #[must_use]
    pub const fn ignore_extension_versions(mut self, ignore: bool) -> Self {
        self.ignore_extension_versions = ignore;
        self
    }

    /// Restricts snapshots to one schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.filter = self.filter.only(schema);
        self
    }

    /// Leaves a schema out of snapshots.
    #[must_use]
    pub fn excluding_schema(mut self, schema: impl Into<String>) -> Self {
        self.filter = self.filter.exclude(schema);
        self
    }

    /// Replaces the raw-fragment destructive pattern.
    #[must_use]
    pub fn with_destructive_pattern(mut self, pattern: DestructivePattern) -> Self {
        self.destructive_pattern = pattern;
        self
    }
}

/// Entries of one kind split by presence on each side.
pub(crate) struct Partition<'a, T> {
    /// Only in the target.
    pub added: Vec<&'a T>,
    /// Only in the source.
    pub dropped: Vec<&'a T>,
    /// In both, as `(source, target)`.
    pub common: Vec<(&'a T, &'a T)>,
}

pub(crate) fn partition<'a, T>(
    from: &'a BTreeMap<String, T>,
    to: &'a BTreeMap<String, T>,
) -> Partition<'a, T> {
    let from_names: BTreeSet<&str> = from.keys().map(String::as_str).collect();
    let to_names: BTreeSet<&str> = to.keys().map(String::as_str).collect();

    Partition {
        added: to_names.difference(&from_names).map(|n| &to[*n]).collect(),
        dropped: from_names.difference(&to_names).map(|n| &from[*n]).collect(),
        common: from_names
            .intersection(&to_names)
            .map(|n| (&from[*n], &to[*n]))
            .collect(),
    }
}

/// Shared state for one diff pass.
pub(crate) struct Context<'a> {
    pub source: &'a Snapshot,
    pub target: &'a Snapshot,
    pub options: &'a DiffOptions,
    /// Enums whose labels were removed or reordered.
    pub rebuilt_enums: BTreeSet<ObjectId>,
    /// Tables dropped and created again for a new partitioning clause.
    pub rebuilt_tables: BTreeSet<ObjectId>,
    /// Unchanged objects that must be dropped and recreated anyway.
    pub forced: BTreeSet<ObjectId>,
}

impl<'a> Context<'a> {
    fn new(source: &'a Snapshot, target: &'a Snapshot, options: &'a DiffOptions) -> Self {
        let rebuilt_enums = enums::rebuilt(source, target);
        let rebuilt_tables = tables::repartitioned(source, target);
        let mut rewritten = tables::rewritten(source, target);
        rewritten.extend(tables::using_types(source, &rebuilt_enums));
        let forced = dependents::forced(
            source,
            target,
            &dependents::Roots {
                enums: &rebuilt_enums,
                rewritten_tables: &rewritten,
                rebuilt_tables: &rebuilt_tables,
                views: &views::redefined(source, target),
                functions: &routines::resigned(source, target),
            },
        );
        Self {
            source,
            target,
            options,
            rebuilt_enums,
            rebuilt_tables,
            forced,
        }
    }

    pub fn is_forced(&self, id: &ObjectId) -> bool {
        self.forced.contains(id)
    }

    pub fn is_rebuilt_table(&self, id: &ObjectId) -> bool {
        self.rebuilt_tables.contains(id)
    }

    /// True if `data_type`, or its array element type, is a rebuilt enum.
    pub fn is_rebuilt_enum(&self, data_type: &str) -> bool {
        let (element, _) = split_array(data_type);
        self.rebuilt_enums
            .contains(&ObjectId::new(ObjectKind::Enum, element))
    }
}

/// Diffs every object kind. Privileges are only compared when requested.
#[must_use]
pub fn diff_all(
    source: &Snapshot,
    target: &Snapshot,
    options: &DiffOptions,
    include_privileges: bool,
) -> Vec<Change> {
    let ctx = Context::new(source, target, options);
    let mut changes = Vec::new();

    changes.extend(objects::schemas(&ctx));
    changes.extend(objects::extensions(&ctx, true));
    changes.extend(enums::changes(&ctx));
    changes.extend(objects::sequences(&ctx));
    changes.extend(routines::functions(&ctx));
    changes.extend(tables::changes(&ctx));
    changes.extend(views::changes(&ctx));
    changes.extend(constraints::constraints(&ctx));
    changes.extend(constraints::indexes(&ctx));
    changes.extend(routines::triggers(&ctx));
    changes.extend(constraints::policies(&ctx));

    let recreated = recreated(&ctx, &changes);
    if include_privileges {
        changes.extend(privileges::changes(&ctx, &recreated));
    }
    changes.extend(metadata::changes(&ctx, &recreated));

    for change in &changes {
        debug!(change = %change, "Generated change");
    }
    info!(
        changes = changes.len(),
        destructive = changes.iter().filter(|c| c.destructive).count(),
        forced = ctx.forced.len(),
        "Computed schema diff"
    );
    changes
}

/// Diffs extensions only. With `drops` false, removed extensions are kept.
#[must_use]
pub fn diff_extensions(
    source: &Snapshot,
    target: &Snapshot,
    options: &DiffOptions,
    drops: bool,
) -> Vec<Change> {
    let ctx = Context::new(source, target, options);
    let changes = objects::extensions(&ctx, drops);
    info!(changes = changes.len(), drops, "Computed extension diff");
    changes
}

/// Objects whose changes drop and recreate them, losing owner, comment
/// and grants.
fn recreated(ctx: &Context<'_>, changes: &[Change]) -> BTreeSet<ObjectId> {
    changes
        .iter()
        .filter(|c| !c.drop.is_empty() && !c.create.is_empty() && c.target == c.node)
        .map(|c| c.target.clone())
        .chain(ctx.rebuilt_enums.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, Table};

    #[test]
    fn test_partition() {
        let from = Snapshot::new()
            .with(Table::new("public", "a"))
            .with(Table::new("public", "b"));
        let to = Snapshot::new()
            .with(Table::new("public", "b").column(Column::new("id", "integer")))
            .with(Table::new("public", "c"));

        let tables = partition(&from.tables, &to.tables);
        assert_eq!(tables.added.len(), 1);
        assert_eq!(tables.added[0].name, "c");
        assert_eq!(tables.dropped[0].name, "a");
        assert_eq!(tables.common.len(), 1);
        assert_ne!(tables.common[0].0, tables.common[0].1);
    }

    #[test]
    fn test_self_diff_is_empty() {
        let snapshot = Snapshot::new().with(
            Table::new("public", "t").column(Column::new("id", "integer").not_null()),
        );
        assert!(diff_all(&snapshot, &snapshot, &DiffOptions::new(), true).is_empty());
    }

    #[test]
    fn test_options_builder() {
        let options = DiffOptions::new()
            .ignore_extension_versions(true)
            .excluding_schema("audit");
        assert!(options.ignore_extension_versions);
        assert!(!options.filter.allows("audit"));
        assert!(options.filter.allows("public"));
    }
}
