//! Ownership and comments.
//!
//! Metadata statements trail every structural statement. Objects that are
//! dropped and recreated get their owner and comment restored by the
//! recreating change; this module covers objects altered in place.

use std::collections::{BTreeMap, BTreeSet};

use super::{partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::{comment_literal, quote_ident};
use crate::snapshot::{
    CatalogObject, EnumType, Function, ObjectId, SchemaDef, SchemaObject, Sequence, Table, View,
};

/// Objects carrying an owner and a comment.
trait Described: CatalogObject + Clone + Into<SchemaObject> {
    fn keyword(&self) -> &'static str;
    fn owner(&self) -> Option<&str>;
    fn comment(&self) -> Option<&str>;
}

macro_rules! described {
    ($ty:ty, $keyword:expr) => {
        impl Described for $ty {
            fn keyword(&self) -> &'static str {
                $keyword
            }

            fn owner(&self) -> Option<&str> {
                self.owner.as_deref()
            }

            fn comment(&self) -> Option<&str> {
                self.comment.as_deref()
            }
        }
    };
}

described!(SchemaDef, "schema");
described!(EnumType, "type");
described!(Sequence, "sequence");
described!(Function, "function");
described!(Table, "table");

impl Described for View {
    fn keyword(&self) -> &'static str {
        View::keyword(self)
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

pub(super) fn owner_sql(keyword: &str, name: &str, owner: &str) -> String {
    format!("alter {keyword} {name} owner to {};", quote_ident(owner))
}

pub(super) fn comment_sql(keyword: &str, name: &str, comment: Option<&str>) -> String {
    format!("comment on {keyword} {name} is {};", comment_literal(comment))
}

/// Statements for a newly created object.
pub(super) fn created(keyword: &str, name: &str, comment: Option<&str>) -> Vec<String> {
    comment
        .map(|c| comment_sql(keyword, name, Some(c)))
        .into_iter()
        .collect()
}

/// Statements restoring owner and comment after a drop and recreate.
pub(super) fn restored(
    keyword: &str,
    name: &str,
    owner: Option<&str>,
    comment: Option<&str>,
) -> Vec<String> {
    owner
        .map(|o| owner_sql(keyword, name, o))
        .into_iter()
        .chain(created(keyword, name, comment))
        .collect()
}

pub(super) fn changes(ctx: &Context<'_>, recreated: &BTreeSet<ObjectId>) -> Vec<Change> {
    let mut changes = Vec::new();
    changes.extend(altered(&ctx.source.schemas, &ctx.target.schemas, recreated));
    changes.extend(altered(&ctx.source.enums, &ctx.target.enums, recreated));
    changes.extend(altered(&ctx.source.sequences, &ctx.target.sequences, recreated));
    changes.extend(altered(&ctx.source.functions, &ctx.target.functions, recreated));
    changes.extend(altered(&ctx.source.views, &ctx.target.views, recreated));

    for (from, to) in partition(&ctx.source.tables, &ctx.target.tables).common {
        if recreated.contains(&to.id()) {
            continue;
        }
        let change = table_metadata(from, to);
        if !change.is_empty() {
            changes.push(change);
        }
    }
    changes
}

fn altered<T: Described>(
    from: &BTreeMap<String, T>,
    to: &BTreeMap<String, T>,
    recreated: &BTreeSet<ObjectId>,
) -> Vec<Change> {
    partition(from, to)
        .common
        .into_iter()
        .filter(|(_, to)| !recreated.contains(&to.id()))
        .map(|(from, to)| describe(from, to))
        .filter(|change| !change.is_empty())
        .collect()
}

fn describe<T: Described>(from: &T, to: &T) -> Change {
    let name = to.key();
    let mut change = Change::new(to.id())
        .depends_on(to.dependencies())
        .effect(Effect::Put(to.clone().into()));
    if from.owner() != to.owner() {
        if let Some(owner) = to.owner() {
            change = change.trailing_sql(owner_sql(to.keyword(), &name, owner));
        }
    }
    if from.comment() != to.comment() {
        change = change.trailing_sql(comment_sql(to.keyword(), &name, to.comment()));
    }
    change
}

fn table_metadata(from: &Table, to: &Table) -> Change {
    let key = to.key();
    let mut change = describe(from, to);
    let from_columns = from.columns_by_name();

    for column in &to.columns {
        let old = from_columns.get(column.name.as_str());
        // A regenerated column is added back without its comment.
        let before = old
            .filter(|old| old.generated == column.generated)
            .and_then(|old| old.comment.as_deref());
        if before != column.comment.as_deref() {
            change = change.trailing_sql(comment_sql(
                "column",
                &format!("{key}.{}", quote_ident(&column.name)),
                column.comment.as_deref(),
            ));
        }
    }
    change
}
