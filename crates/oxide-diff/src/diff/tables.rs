//! Tables and columns.

use std::collections::BTreeSet;

use super::{metadata, partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::{quote_ident, split_array, strip_terminator};
use crate::snapshot::{CatalogObject, Column, ObjectId, Snapshot, Table};

pub(super) fn changes(ctx: &Context<'_>) -> Vec<Change> {
    let tables = partition(&ctx.source.tables, &ctx.target.tables);
    let mut changes = Vec::new();

    // New tables
    for table in tables.added {
        let mut change = Change::new(table.id())
            .create_sql(create_table(ctx.target, table))
            .extend_trailing(created_comments(table))
            .depends_on(table.dependencies())
            .effect(Effect::Put(table.clone().into()));
        if table.row_security {
            change = change.create_sql(row_security(table));
        }
        changes.push(change);
    }

    // Dropped tables
    for table in tables.dropped {
        changes.push(
            Change::new(table.id())
                .drop_sql(format!("drop table {};", table.key()))
                .destructive(true)
                .effect(Effect::Remove(table.id())),
        );
    }

    // Modified tables
    for (from, to) in tables.common {
        if ctx.is_rebuilt_table(&to.id()) {
            changes.push(rebuild(ctx, from, to));
            continue;
        }
        if from == to {
            continue;
        }
        changes.extend(diff_columns(ctx, from, to));
        if let Some(change) = reparent(from, to) {
            changes.push(change);
        }
        if from.row_security != to.row_security {
            changes.push(
                Change::new(to.id())
                    .create_sql(row_security(to))
                    .depends_on(to.dependencies())
                    .effect(Effect::Put(to.clone().into())),
            );
        }
    }

    changes
}

/// Tables that must be dropped and created again: the partitioning
/// clause changed, or the table is a partition of such a table.
pub(super) fn repartitioned(source: &Snapshot, target: &Snapshot) -> BTreeSet<ObjectId> {
    let common = partition(&source.tables, &target.tables).common;
    let mut rebuilt: BTreeSet<ObjectId> = common
        .iter()
        .filter(|(from, to)| from.partition_by != to.partition_by)
        .map(|(_, to)| to.id())
        .collect();

    // Partitions of partitions
    loop {
        let before = rebuilt.len();
        for (from, to) in &common {
            if from
                .partition_of
                .as_ref()
                .is_some_and(|p| rebuilt.contains(&p.parent))
            {
                rebuilt.insert(to.id());
            }
        }
        if rebuilt.len() == before {
            return rebuilt;
        }
    }
}

fn rebuild(ctx: &Context<'_>, from: &Table, to: &Table) -> Change {
    let mut change = Change::new(to.id())
        .drop_sql(format!("drop table {};", from.key()))
        .create_sql(create_table(ctx.target, to))
        .extend_trailing(
            to.owner
                .as_deref()
                .map(|owner| metadata::owner_sql("table", &to.key(), owner)),
        )
        .extend_trailing(created_comments(to))
        .depends_on(to.dependencies())
        .destructive(true)
        .effect(Effect::Put(to.clone().into()));
    if to.row_security {
        change = change.create_sql(row_security(to));
    }
    change
}

/// Detaches and attaches partitions, and adds or removes inherited
/// parents.
fn reparent(from: &Table, to: &Table) -> Option<Change> {
    let key = to.key();
    let mut change = Change::new(to.id())
        .depends_on(to.dependencies())
        .effect(Effect::Put(to.clone().into()));

    if from.partition_of != to.partition_of {
        if let Some(ref old) = from.partition_of {
            change = change.drop_sql(format!(
                "alter table {} detach partition {key};",
                old.parent.name
            ));
        }
        if let Some(ref new) = to.partition_of {
            change = change.create_sql(format!(
                "alter table {} attach partition {key} {};",
                new.parent.name, new.bound
            ));
        }
    }
    for parent in from.inherits.iter().filter(|p| !to.inherits.contains(p)) {
        change = change.drop_sql(format!("alter table {key} no inherit {};", parent.name));
    }
    for parent in to.inherits.iter().filter(|p| !from.inherits.contains(p)) {
        change = change.create_sql(format!("alter table {key} inherit {};", parent.name));
    }

    (!change.is_empty()).then_some(change)
}

/// Names of columns `table` receives from its partition parent or
/// inherited parents in `snapshot`.
fn inherited_columns<'a>(snapshot: &'a Snapshot, table: &Table) -> BTreeSet<&'a str> {
    table
        .parents()
        .filter_map(|parent| snapshot.tables.get(&parent.name))
        .flat_map(|parent| parent.columns.iter().map(|c| c.name.as_str()))
        .collect()
}

/// Tables whose rewrite invalidates views reading them: a column is
/// dropped, retyped, recollated or regenerated.
pub(super) fn rewritten(source: &Snapshot, target: &Snapshot) -> BTreeSet<ObjectId> {
    partition(&source.tables, &target.tables)
        .common
        .into_iter()
        .filter(|(from, to)| {
            let to_columns = to.columns_by_name();
            from.columns.iter().any(|column| {
                to_columns.get(column.name.as_str()).is_none_or(|other| {
                    other.data_type != column.data_type
                        || other.collation != column.collation
                        || other.generated != column.generated
                })
            })
        })
        .map(|(_, to)| to.id())
        .collect()
}

/// Tables with a column whose type, or array element type, is one of
/// `types`.
pub(super) fn using_types(source: &Snapshot, types: &BTreeSet<ObjectId>) -> BTreeSet<ObjectId> {
    source
        .tables
        .values()
        .filter(|table| {
            table
                .columns
                .iter()
                .any(|c| types.iter().any(|t| t.name == split_array(&c.data_type).0))
        })
        .map(CatalogObject::id)
        .collect()
}

fn diff_columns(ctx: &Context<'_>, from: &Table, to: &Table) -> Vec<Change> {
    let key = to.key();
    let mut inherited = inherited_columns(ctx.source, from);
    inherited.extend(inherited_columns(ctx.target, to));
    let local = |column: &&Column| !inherited.contains(column.name.as_str());
    let from_columns = from.columns_by_name();
    let to_columns = to.columns_by_name();
    let column_change = |name: &str| {
        Change::new(to.column_id(name))
            .node(to.id())
            .depends_on(to.dependencies())
            .effect(Effect::Put(to.clone().into()))
    };
    let mut changes = Vec::new();

    // New columns
    for column in to
        .columns
        .iter()
        .filter(local)
        .filter(|c| !from_columns.contains_key(c.name.as_str()))
    {
        changes.push(column_change(&column.name).create_sql(format!(
            "alter table {key} add column {};",
            column_definition(column)
        )));
    }

    // Dropped columns
    for column in from
        .columns
        .iter()
        .filter(local)
        .filter(|c| !to_columns.contains_key(c.name.as_str()))
    {
        changes.push(
            column_change(&column.name)
                .drop_sql(format!(
                    "alter table {key} drop column {};",
                    quote_ident(&column.name)
                ))
                .destructive(true),
        );
    }

    // Modified columns
    for column in to.columns.iter().filter(local) {
        let Some(old) = from_columns.get(column.name.as_str()) else {
            continue;
        };
        if *old != column {
            let change = alter_column(ctx, &key, old, column, column_change(&column.name));
            if !change.is_empty() {
                changes.push(change);
            }
        }
    }

    changes
}

fn alter_column(
    ctx: &Context<'_>,
    table: &str,
    from: &Column,
    to: &Column,
    mut change: Change,
) -> Change {
    let name = quote_ident(&to.name);

    if from.generated != to.generated {
        return change
            .drop_sql(format!("alter table {table} drop column {name};"))
            .create_sql(format!(
                "alter table {table} add column {};",
                column_definition(to)
            ))
            .destructive(true);
    }

    let prefix = format!("alter table {table} alter column {name}");
    let retyped = from.data_type != to.data_type;
    // Columns already of a rebuilt enum get their default from the rebuild.
    let keep_default = !retyped && ctx.is_rebuilt_enum(&to.data_type);
    let default_changed = from.default != to.default;

    if to.not_null && !from.not_null {
        change = change.create_sql(format!("{prefix} set not null;"));
    }
    if !keep_default
        && from.default.is_some()
        && (to.default.is_none() || (retyped && default_changed))
    {
        change = change.create_sql(format!("{prefix} drop default;"));
    }

    if retyped || from.collation != to.collation {
        let mut sql = format!("{prefix} set data type {}", to.data_type);
        if let Some(ref collation) = to.collation {
            sql.push_str(&format!(" collate {}", quote_ident(collation)));
        }
        if retyped {
            sql.push_str(&format!(" using {name}::{}", to.data_type));
        }
        sql.push(';');
        change = change
            .create_sql(sql)
            .destructive(is_narrowing(&from.data_type, &to.data_type));
    }

    match (from.identity, to.identity) {
        (None, Some(identity)) => {
            change = change.create_sql(format!(
                "{prefix} add generated {} as identity;",
                identity.as_sql()
            ));
        }
        (Some(_), None) => {
            change = change.create_sql(format!("{prefix} drop identity;"));
        }
        (Some(old), Some(new)) if old != new => {
            change = change.create_sql(format!("{prefix} set generated {};", new.as_sql()));
        }
        _ => {}
    }

    if !keep_default && default_changed {
        if let Some(ref default) = to.default {
            change = change.create_sql(format!("{prefix} set default {default};"));
        }
    }
    if from.not_null && !to.not_null {
        change = change.create_sql(format!("{prefix} drop not null;"));
    }

    change
}

/// Renders one column as it appears in CREATE TABLE or ADD COLUMN.
pub(super) fn column_definition(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.data_type);
    if let Some(ref collation) = column.collation {
        sql.push_str(&format!(" collate {}", quote_ident(collation)));
    }
    if let Some(ref expr) = column.generated {
        sql.push_str(&format!(" generated always as ({expr}) stored"));
    } else if let Some(identity) = column.identity {
        sql.push_str(&format!(" generated {} as identity", identity.as_sql()));
    }
    if column.not_null {
        sql.push_str(" not null");
    }
    if column.generated.is_none() && column.identity.is_none() {
        if let Some(ref default) = column.default {
            sql.push_str(&format!(" default {}", strip_terminator(default)));
        }
    }
    sql
}

fn create_table(snapshot: &Snapshot, table: &Table) -> String {
    let key = table.key();
    let partitioned = table
        .partition_by
        .as_ref()
        .map(|clause| format!(" partition by {clause}"))
        .unwrap_or_default();

    if let Some(ref partition) = table.partition_of {
        return format!(
            "create table {key} partition of {} {}{partitioned};",
            partition.parent.name, partition.bound
        );
    }

    let inherited = inherited_columns(snapshot, table);
    let columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !inherited.contains(c.name.as_str()))
        .map(|c| format!("    {}", column_definition(c)))
        .collect();
    let mut sql = if columns.is_empty() {
        format!("create table {key} (\n)")
    } else {
        format!("create table {key} (\n{}\n)", columns.join(",\n"))
    };
    if !table.inherits.is_empty() {
        let parents: Vec<&str> = table.inherits.iter().map(|p| p.name.as_str()).collect();
        sql.push_str(&format!(" inherits ({})", parents.join(", ")));
    }
    sql.push_str(&partitioned);
    sql.push(';');
    sql
}

fn row_security(table: &Table) -> String {
    let action = if table.row_security { "enable" } else { "disable" };
    format!("alter table {} {action} row level security;", table.key())
}

fn created_comments(table: &Table) -> Vec<String> {
    let key = table.key();
    let mut sql = metadata::created("table", &key, table.comment.as_deref());
    for column in &table.columns {
        sql.extend(metadata::created(
            "column",
            &format!("{key}.{}", quote_ident(&column.name)),
            column.comment.as_deref(),
        ));
    }
    sql
}

// ---- type narrowing ----

#[derive(Debug, PartialEq, Eq)]
enum TypeShape {
    /// Character types with an optional length limit.
    Text(Option<u32>),
    /// Integer types by width rank.
    Integer(u8),
    /// Numeric with optional `(precision, scale)`.
    Numeric(Option<(u32, u32)>),
    /// Floating point types by width rank.
    Float(u8),
    Other(String),
}

fn shape(data_type: &str) -> TypeShape {
    let normalized = data_type.trim().to_ascii_lowercase();
    if normalized.ends_with("[]") {
        return TypeShape::Other(normalized);
    }
    let (base, params) = normalized
        .split_once('(')
        .map_or((normalized.as_str(), ""), |(base, rest)| {
            (base.trim_end(), rest.trim_end_matches(')'))
        });
    let params: Vec<u32> = params
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect();

    match base {
        "text" => TypeShape::Text(None),
        "character varying" | "varchar" | "bpchar" => TypeShape::Text(params.first().copied()),
        "character" | "char" => TypeShape::Text(Some(params.first().copied().unwrap_or(1))),
        "smallint" | "int2" => TypeShape::Integer(1),
        "integer" | "int" | "int4" => TypeShape::Integer(2),
        "bigint" | "int8" => TypeShape::Integer(3),
        "real" | "float4" => TypeShape::Float(1),
        "double precision" | "float8" => TypeShape::Float(2),
        "numeric" | "decimal" => TypeShape::Numeric(match params.as_slice() {
            [] => None,
            [precision] => Some((*precision, 0)),
            [precision, scale, ..] => Some((*precision, *scale)),
        }),
        _ => TypeShape::Other(normalized.clone()),
    }
}

/// Returns true if converting a column from `from` to `to` may lose or
/// reject existing values. Unknown conversions count as narrowing.
#[must_use]
pub fn is_narrowing(from: &str, to: &str) -> bool {
    use TypeShape::{Float, Integer, Numeric, Other, Text};

    if from.trim().eq_ignore_ascii_case(to.trim()) {
        return false;
    }
    match (shape(from), shape(to)) {
        (Text(_), Text(None)) | (Integer(_) | Numeric(_), Numeric(None)) => false,
        (Text(Some(old)), Text(Some(new))) => new < old,
        (Integer(old), Integer(new)) | (Float(old), Float(new)) => new < old,
        (Numeric(Some((p1, s1))), Numeric(Some((p2, s2)))) => {
            s2 < s1 || p2.saturating_sub(s2) < p1.saturating_sub(s1)
        }
        (Other(old), Other(new)) => old != new,
        _ => true,
    }
}
