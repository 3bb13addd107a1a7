//! Enum types.
//!
//! Labels appended or inserted between existing ones are added in place.
//! Removing or reordering labels rebuilds the type: the old type is
//! renamed out of the way, the new one created, every column using it
//! converted through `text`, and the old type dropped.

use std::collections::BTreeSet;

use super::{metadata, partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::{literal, qualified, quote_ident, split_array};
use crate::snapshot::{CatalogObject, EnumType, ObjectId, Snapshot};

/// Suffix given to the old type while a rebuilt enum is swapped in.
pub(super) const OLD_VERSION_SUFFIX: &str = "__old_version_to_be_dropped";

pub(super) fn changes(ctx: &Context<'_>) -> Vec<Change> {
    let enums = partition(&ctx.source.enums, &ctx.target.enums);
    let mut changes = Vec::new();

    // New types
    for ty in enums.added {
        changes.push(
            Change::new(ty.id())
                .create_sql(create_type(ty))
                .extend_trailing(metadata::created("type", &ty.key(), ty.comment.as_deref()))
                .depends_on(ty.dependencies())
                .effect(Effect::Put(ty.clone().into())),
        );
    }

    // Dropped types
    for ty in enums.dropped {
        changes.push(
            Change::new(ty.id())
                .drop_sql(format!("drop type {};", ty.key()))
                .destructive(true)
                .effect(Effect::Remove(ty.id())),
        );
    }

    // Modified labels
    for (from, to) in enums.common {
        if from.labels == to.labels {
            continue;
        }
        if is_additive(&from.labels, &to.labels) {
            changes.push(add_values(from, to));
        } else {
            changes.push(rebuild(ctx, to));
        }
    }

    changes
}

/// Enums whose labels were removed or reordered.
pub(super) fn rebuilt(source: &Snapshot, target: &Snapshot) -> BTreeSet<ObjectId> {
    partition(&source.enums, &target.enums)
        .common
        .into_iter()
        .filter(|(from, to)| !is_additive(&from.labels, &to.labels))
        .map(|(_, to)| to.id())
        .collect()
}

/// True if `from` appears in `to` in the same order.
fn is_additive(from: &[String], to: &[String]) -> bool {
    let mut remaining = to.iter();
    from.iter().all(|label| remaining.any(|l| l == label))
}

fn create_type(ty: &EnumType) -> String {
    let labels: Vec<String> = ty.labels.iter().map(|l| literal(l)).collect();
    format!("create type {} as enum ({});", ty.key(), labels.join(", "))
}

fn add_values(from: &EnumType, to: &EnumType) -> Change {
    let existing: BTreeSet<&str> = from.labels.iter().map(String::as_str).collect();
    let name = to.key();
    let mut change = Change::new(to.id())
        .depends_on(to.dependencies())
        .effect(Effect::Put(to.clone().into()));

    for (i, label) in to.labels.iter().enumerate() {
        if existing.contains(label.as_str()) {
            continue;
        }
        let position = if i > 0 {
            format!(" after {}", literal(&to.labels[i - 1]))
        } else if let Some(next) = to.labels.iter().find(|l| existing.contains(l.as_str())) {
            format!(" before {}", literal(next))
        } else {
            String::new()
        };
        change = change.create_sql(format!(
            "alter type {name} add value {}{position};",
            literal(label)
        ));
    }
    change
}

fn rebuild(ctx: &Context<'_>, to: &EnumType) -> Change {
    let name = to.key();
    let old_name = format!("{}{OLD_VERSION_SUFFIX}", to.name);
    let mut change = Change::new(to.id())
        .create_sql(format!(
            "alter type {name} rename to {};",
            quote_ident(&old_name)
        ))
        .create_sql(create_type(to))
        .depends_on(to.dependencies())
        .destructive(true);

    for (from_table, to_table) in partition(&ctx.source.tables, &ctx.target.tables).common {
        let to_columns = to_table.columns_by_name();
        let mut touched = false;
        for column in from_table.columns.iter().filter(|c| split_array(&c.data_type).0 == name) {
            let Some(target) = to_columns.get(column.name.as_str()) else {
                continue;
            };
            if target.data_type != column.data_type {
                continue;
            }
            let array = split_array(&column.data_type).1;
            let prefix = format!(
                "alter table {} alter column {}",
                to_table.key(),
                quote_ident(&column.name)
            );
            if column.default.is_some() {
                change = change.create_sql(format!("{prefix} drop default;"));
            }
            change = change.create_sql(format!(
                "{prefix} set data type {name}{array} using {}::text{array}::{name}{array};",
                quote_ident(&column.name)
            ));
            if let Some(ref default) = target.default {
                change = change.create_sql(format!("{prefix} set default {default};"));
            }
            touched = true;
        }
        if touched {
            change = change.effect(Effect::Put(to_table.clone().into()));
        }
    }

    change
        .create_sql(format!(
            "drop type {};",
            qualified(&to.schema, &old_name)
        ))
        .extend_trailing(metadata::restored(
            "type",
            &name,
            to.owner.as_deref(),
            to.comment.as_deref(),
        ))
        .effect(Effect::Put(to.clone().into()))
}
