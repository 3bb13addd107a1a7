//! Functions and triggers.
//!
//! Body-only changes are replaced in place. A changed result type,
//! argument list or trigger firing rule needs a drop and a fresh create.

use std::collections::BTreeSet;

use super::{metadata, partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::{qualified, quote_ident};
use crate::snapshot::{CatalogObject, Function, ObjectId, Snapshot, Trigger};

pub(super) fn functions(ctx: &Context<'_>) -> Vec<Change> {
    let functions = partition(&ctx.source.functions, &ctx.target.functions);
    let mut changes = Vec::new();

    // New functions
    for function in functions.added {
        changes.push(
            Change::new(function.id())
                .create_sql(create_function(function))
                .extend_trailing(metadata::created(
                    "function",
                    &function.signature(),
                    function.comment.as_deref(),
                ))
                .depends_on(function.dependencies())
                .effect(Effect::Put(function.clone().into())),
        );
    }

    // Dropped functions
    for function in functions.dropped {
        changes.push(
            Change::new(function.id())
                .drop_sql(drop_function(function))
                .destructive(true)
                .effect(Effect::Remove(function.id())),
        );
    }

    // Modified functions
    for (from, to) in functions.common {
        let change = Change::new(to.id())
            .depends_on(to.dependencies())
            .effect(Effect::Put(to.clone().into()));

        if ctx.is_forced(&to.id()) || is_resigned(from, to) {
            changes.push(
                change
                    .drop_sql(drop_function(from))
                    .create_sql(create_function(to))
                    .extend_trailing(metadata::restored(
                        "function",
                        &to.signature(),
                        to.owner.as_deref(),
                        to.comment.as_deref(),
                    )),
            );
        } else if from.body != to.body
            || from.language != to.language
            || from.volatility != to.volatility
            || from.security_definer != to.security_definer
        {
            changes.push(change.create_sql(create_function(to)));
        }
    }

    changes
}

/// Functions whose result type or argument list changed, so they are
/// dropped and created again.
pub(super) fn resigned(source: &Snapshot, target: &Snapshot) -> BTreeSet<ObjectId> {
    partition(&source.functions, &target.functions)
        .common
        .into_iter()
        .filter(|(from, to)| is_resigned(from, to))
        .map(|(_, to)| to.id())
        .collect()
}

fn is_resigned(from: &Function, to: &Function) -> bool {
    from.returns != to.returns || from.arguments != to.arguments
}

fn create_function(function: &Function) -> String {
    let security = if function.security_definer {
        " security definer"
    } else {
        ""
    };
    format!(
        "create or replace function {}({})\n returns {}\n language {}\n {}{security}\nas $function${}$function$;",
        qualified(&function.schema, &function.name),
        function.arguments,
        function.returns,
        function.language,
        function.volatility.as_sql(),
        function.body,
    )
}

fn drop_function(function: &Function) -> String {
    format!("drop function if exists {};", function.signature())
}

pub(super) fn triggers(ctx: &Context<'_>) -> Vec<Change> {
    let triggers = partition(&ctx.source.triggers, &ctx.target.triggers);
    let mut changes = Vec::new();

    // New triggers
    for trigger in triggers.added {
        changes.push(
            Change::new(trigger.id())
                .create_sql(create_trigger(trigger, false))
                .depends_on(trigger.dependencies())
                .effect(Effect::Put(trigger.clone().into())),
        );
    }

    // Dropped triggers
    for trigger in triggers.dropped {
        changes.push(
            Change::new(trigger.id())
                .drop_sql(drop_trigger(trigger))
                .destructive(true)
                .effect(Effect::Remove(trigger.id())),
        );
    }

    // Modified triggers
    for (from, to) in triggers.common {
        let change = Change::new(to.id())
            .depends_on(to.dependencies())
            .effect(Effect::Put(to.clone().into()));

        if ctx.is_forced(&to.id())
            || from.timing != to.timing
            || from.events != to.events
            || from.for_each_row != to.for_each_row
        {
            changes.push(
                change
                    .drop_sql(drop_trigger(from))
                    .create_sql(create_trigger(to, false)),
            );
        } else if from.function != to.function || from.condition != to.condition {
            changes.push(change.create_sql(create_trigger(to, true)));
        }
    }

    changes
}

fn create_trigger(trigger: &Trigger, replace: bool) -> String {
    let or_replace = if replace { "or replace " } else { "" };
    let level = if trigger.for_each_row { "row" } else { "statement" };
    let condition = trigger
        .condition
        .as_ref()
        .map(|c| format!(" when ({c})"))
        .unwrap_or_default();
    format!(
        "create {or_replace}trigger {} {} {} on {} for each {level}{condition} execute function {};",
        quote_ident(&trigger.name),
        trigger.timing.as_sql(),
        trigger.events.join(" or "),
        qualified(&trigger.schema, &trigger.table),
        trigger.function,
    )
}

fn drop_trigger(trigger: &Trigger) -> String {
    format!(
        "drop trigger if exists {} on {};",
        quote_ident(&trigger.name),
        qualified(&trigger.schema, &trigger.table)
    )
}
