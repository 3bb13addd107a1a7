//! Constraints, indexes and row-level security policies.
//!
//! None of these can be altered in place: a changed definition is
//! dropped and added again.

use super::{partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::{qualified, quote_ident, quote_role, strip_terminator};
use crate::snapshot::{CatalogObject, Constraint, Index, Policy};

pub(super) fn constraints(ctx: &Context<'_>) -> Vec<Change> {
    let constraints = partition(&ctx.source.constraints, &ctx.target.constraints);
    let mut changes = Vec::new();

    for constraint in constraints.added {
        changes.push(
            Change::new(constraint.id())
                .create_sql(add_constraint(constraint))
                .depends_on(constraint.dependencies())
                .effect(Effect::Put(constraint.clone().into())),
        );
    }

    for constraint in constraints.dropped {
        changes.push(
            Change::new(constraint.id())
                .drop_sql(drop_constraint(constraint))
                .destructive(true)
                .effect(Effect::Remove(constraint.id())),
        );
    }

    for (from, to) in constraints.common {
        if from.constraint_type == to.constraint_type
            && strip_terminator(&from.definition) == strip_terminator(&to.definition)
            && from.references == to.references
            && !ctx.is_forced(&to.id())
        {
            continue;
        }
        changes.push(
            Change::new(to.id())
                .drop_sql(drop_constraint(from))
                .create_sql(add_constraint(to))
                .destructive(true)
                .depends_on(to.dependencies())
                .effect(Effect::Put(to.clone().into())),
        );
    }

    changes
}

fn add_constraint(constraint: &Constraint) -> String {
    format!(
        "alter table {} add constraint {} {};",
        qualified(&constraint.schema, &constraint.table),
        quote_ident(&constraint.name),
        strip_terminator(&constraint.definition)
    )
}

fn drop_constraint(constraint: &Constraint) -> String {
    format!(
        "alter table {} drop constraint {};",
        qualified(&constraint.schema, &constraint.table),
        quote_ident(&constraint.name)
    )
}

pub(super) fn indexes(ctx: &Context<'_>) -> Vec<Change> {
    let indexes = partition(&ctx.source.indexes, &ctx.target.indexes);
    let mut changes = Vec::new();

    for index in indexes.added {
        changes.push(
            Change::new(index.id())
                .create_sql(create_index(index))
                .depends_on(index.dependencies())
                .effect(Effect::Put(index.clone().into())),
        );
    }

    for index in indexes.dropped {
        changes.push(
            Change::new(index.id())
                .drop_sql(drop_index(index))
                .effect(Effect::Remove(index.id())),
        );
    }

    for (from, to) in indexes.common {
        let same = from.table == to.table
            && from.columns == to.columns
            && from.unique == to.unique
            && from.method == to.method
            && from.predicate == to.predicate;
        if same && !ctx.is_forced(&to.id()) {
            continue;
        }
        changes.push(
            Change::new(to.id())
                .drop_sql(drop_index(from))
                .create_sql(create_index(to))
                .depends_on(to.dependencies())
                .effect(Effect::Put(to.clone().into())),
        );
    }

    changes
}

fn create_index(index: &Index) -> String {
    let unique = if index.unique { "unique " } else { "" };
    let predicate = index
        .predicate
        .as_ref()
        .map(|p| format!(" where ({p})"))
        .unwrap_or_default();
    format!(
        "create {unique}index {} on {} using {} ({}){predicate};",
        quote_ident(&index.name),
        qualified(&index.schema, &index.table),
        index.method.as_deref().unwrap_or("btree"),
        index.columns.join(", ")
    )
}

fn drop_index(index: &Index) -> String {
    format!("drop index if exists {};", index.key())
}

pub(super) fn policies(ctx: &Context<'_>) -> Vec<Change> {
    let policies = partition(&ctx.source.policies, &ctx.target.policies);
    let mut changes = Vec::new();

    for policy in policies.added {
        changes.push(
            Change::new(policy.id())
                .create_sql(create_policy(policy))
                .depends_on(policy.dependencies())
                .effect(Effect::Put(policy.clone().into())),
        );
    }

    for policy in policies.dropped {
        changes.push(
            Change::new(policy.id())
                .drop_sql(drop_policy(policy))
                .destructive(true)
                .effect(Effect::Remove(policy.id())),
        );
    }

    for (from, to) in policies.common {
        let same = from.permissive == to.permissive
            && from.command == to.command
            && from.roles == to.roles
            && from.using == to.using
            && from.with_check == to.with_check;
        if same && !ctx.is_forced(&to.id()) {
            continue;
        }
        changes.push(
            Change::new(to.id())
                .drop_sql(drop_policy(from))
                .create_sql(create_policy(to))
                .depends_on(to.dependencies())
                .effect(Effect::Put(to.clone().into())),
        );
    }

    changes
}

fn create_policy(policy: &Policy) -> String {
    let kind = if policy.permissive {
        "permissive"
    } else {
        "restrictive"
    };
    let roles: Vec<String> = policy.roles.iter().map(|r| quote_role(r)).collect();
    let mut sql = format!(
        "create policy {} on {} as {kind} for {} to {}",
        quote_ident(&policy.name),
        qualified(&policy.schema, &policy.table),
        policy.command,
        roles.join(", ")
    );
    if let Some(ref using) = policy.using {
        sql.push_str(&format!(" using ({using})"));
    }
    if let Some(ref check) = policy.with_check {
        sql.push_str(&format!(" with check ({check})"));
    }
    sql.push(';');
    sql
}

fn drop_policy(policy: &Policy) -> String {
    format!(
        "drop policy {} on {};",
        quote_ident(&policy.name),
        qualified(&policy.schema, &policy.table)
    )
}
