//! Views and materialized views.

use std::collections::BTreeSet;

use super::{metadata, partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::strip_terminator;
use crate::snapshot::{CatalogObject, ObjectId, Snapshot, View};

pub(super) fn changes(ctx: &Context<'_>) -> Vec<Change> {
    let views = partition(&ctx.source.views, &ctx.target.views);
    let mut changes = Vec::new();

    // New views
    for view in views.added {
        changes.push(
            Change::new(view.id())
                .create_sql(create_view(view))
                .extend_trailing(metadata::created(
                    view.keyword(),
                    &view.key(),
                    view.comment.as_deref(),
                ))
                .depends_on(view.dependencies())
                .effect(Effect::Put(view.clone().into())),
        );
    }

    // Dropped views
    for view in views.dropped {
        changes.push(
            Change::new(view.id())
                .drop_sql(drop_view(view))
                .destructive(true)
                .effect(Effect::Remove(view.id())),
        );
    }

    // Redefined views, and views whose dependencies are recreated
    for (from, to) in views.common {
        if !is_redefined(from, to) && !ctx.is_forced(&to.id()) {
            continue;
        }
        changes.push(
            Change::new(to.id())
                .drop_sql(drop_view(from))
                .create_sql(create_view(to))
                .extend_trailing(metadata::restored(
                    to.keyword(),
                    &to.key(),
                    to.owner.as_deref(),
                    to.comment.as_deref(),
                ))
                .depends_on(to.dependencies())
                .effect(Effect::Put(to.clone().into())),
        );
    }

    changes
}

/// Views whose query or kind changed.
pub(super) fn redefined(source: &Snapshot, target: &Snapshot) -> BTreeSet<ObjectId> {
    partition(&source.views, &target.views)
        .common
        .into_iter()
        .filter(|(from, to)| is_redefined(from, to))
        .map(|(_, to)| to.id())
        .collect()
}

fn is_redefined(from: &View, to: &View) -> bool {
    strip_terminator(&from.definition) != strip_terminator(&to.definition)
        || from.materialized != to.materialized
}

fn create_view(view: &View) -> String {
    format!(
        "create {} {} as {};",
        view.keyword(),
        view.key(),
        strip_terminator(&view.definition).trim_start()
    )
}

fn drop_view(view: &View) -> String {
    format!("drop {} {};", view.keyword(), view.key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_all, DiffOptions};

    #[test]
    fn test_create_view_strips_terminator() {
        let view = View::new("public", "v", " select 1;\n");
        assert_eq!(create_view(&view), "create view \"public\".\"v\" as select 1;");
        assert_eq!(
            drop_view(&view.materialized()),
            "drop materialized view \"public\".\"v\";"
        );
    }

    #[test]
    fn test_redefined_view_restores_owner_and_comment() {
        let from = Snapshot::new().with(View::new("public", "v", "select 1").owner("app").comment("one"));
        let to = Snapshot::new().with(View::new("public", "v", "select 2").owner("app").comment("one"));
        let changes = diff_all(&from, &to, &DiffOptions::new(), false);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].drop, vec!["drop view \"public\".\"v\";"]);
        assert_eq!(changes[0].create, vec!["create view \"public\".\"v\" as select 2;"]);
        assert_eq!(
            changes[0].trailing,
            vec![
                "alter view \"public\".\"v\" owner to \"app\";",
                "comment on view \"public\".\"v\" is 'one';",
            ]
        );
        assert!(!changes[0].destructive);
    }

    #[test]
    fn test_view_to_materialized_view() {
        let from = Snapshot::new().with(View::new("public", "v", "select 1"));
        let to = Snapshot::new().with(View::new("public", "v", "select 1").materialized());
        let changes = diff_all(&from, &to, &DiffOptions::new(), false);

        assert_eq!(changes[0].drop, vec!["drop view \"public\".\"v\";"]);
        assert_eq!(
            changes[0].create,
            vec!["create materialized view \"public\".\"v\" as select 1;"]
        );
    }

    #[test]
    fn test_dropped_view_is_destructive() {
        let from = Snapshot::new().with(View::new("public", "v", "select 1"));
        let changes = diff_all(&from, &Snapshot::new(), &DiffOptions::new(), false);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].destructive);
    }
}
