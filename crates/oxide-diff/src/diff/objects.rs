//! Schemas, extensions and sequences.

use super::{metadata, partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::{literal, quote_ident};
use crate::snapshot::{CatalogObject, Extension, OwnedBy, Sequence};

pub(super) fn schemas(ctx: &Context<'_>) -> Vec<Change> {
    let schemas = partition(&ctx.source.schemas, &ctx.target.schemas);
    let mut changes = Vec::new();

    for schema in schemas.added {
        changes.push(
            Change::new(schema.id())
                .create_sql(format!("create schema if not exists {};", schema.key()))
                .extend_trailing(metadata::created(
                    "schema",
                    &schema.key(),
                    schema.comment.as_deref(),
                ))
                .effect(Effect::Put(schema.clone().into())),
        );
    }

    for schema in schemas.dropped {
        changes.push(
            Change::new(schema.id())
                .drop_sql(format!("drop schema if exists {};", schema.key()))
                .destructive(true)
                .effect(Effect::Remove(schema.id())),
        );
    }

    changes
}

/// Extension changes. Removed extensions are only dropped when `drops`
/// is set.
pub(super) fn extensions(ctx: &Context<'_>, drops: bool) -> Vec<Change> {
    let ignore_versions = ctx.options.ignore_extension_versions;
    let extensions = partition(&ctx.source.extensions, &ctx.target.extensions);
    let mut changes = Vec::new();

    // New extensions
    for extension in extensions.added {
        let version = if ignore_versions {
            None
        } else {
            extension.version.as_deref()
        };
        changes.push(
            Change::new(extension.id())
                .create_sql(create_extension(extension, version))
                .depends_on(extension.dependencies())
                .effect(Effect::Put(extension.clone().into())),
        );
    }

    // Dropped extensions
    if drops {
        for extension in extensions.dropped {
            changes.push(
                Change::new(extension.id())
                    .drop_sql(format!("drop extension if exists {};", extension.key()))
                    .destructive(true)
                    .effect(Effect::Remove(extension.id())),
            );
        }
    }

    // Moved or upgraded extensions
    for (from, to) in extensions.common {
        let name = to.key();
        let mut change = Change::new(to.id())
            .depends_on(to.dependencies())
            .effect(Effect::Put(to.clone().into()));
        if from.schema != to.schema {
            change = change.create_sql(format!(
                "alter extension {name} set schema {};",
                quote_ident(&to.schema)
            ));
        }
        if !ignore_versions && from.version != to.version {
            change = change.create_sql(match to.version {
                Some(ref version) => {
                    format!("alter extension {name} update to {};", literal(version))
                }
                None => format!("alter extension {name} update;"),
            });
        }
        if !change.is_empty() {
            changes.push(change);
        }
    }

    changes
}

fn create_extension(extension: &Extension, version: Option<&str>) -> String {
    let version = version
        .map(|v| format!(" version {}", literal(v)))
        .unwrap_or_default();
    format!(
        "create extension if not exists {} with schema {}{version};",
        extension.key(),
        quote_ident(&extension.schema)
    )
}

pub(super) fn sequences(ctx: &Context<'_>) -> Vec<Change> {
    let sequences = partition(&ctx.source.sequences, &ctx.target.sequences);
    let mut changes = Vec::new();

    // New sequences
    for sequence in sequences.added {
        let mut sql = format!("create sequence {}", sequence.key());
        if let Some(ref data_type) = sequence.data_type {
            sql.push_str(&format!(" as {data_type}"));
        }
        if let Some(start) = sequence.start {
            sql.push_str(&format!(" start with {start}"));
        }
        if let Some(increment) = sequence.increment {
            sql.push_str(&format!(" increment by {increment}"));
        }
        sql.push(';');

        let mut change = Change::new(sequence.id())
            .create_sql(sql)
            .depends_on(sequence.dependencies())
            .effect(Effect::Put(sequence.clone().into()));
        if let Some(ref owned_by) = sequence.owned_by {
            change = change.trailing_sql(owned_by_sql(sequence, Some(owned_by)));
        }
        changes.push(change.extend_trailing(metadata::created(
            "sequence",
            &sequence.key(),
            sequence.comment.as_deref(),
        )));
    }

    // Dropped sequences
    for sequence in sequences.dropped {
        changes.push(
            Change::new(sequence.id())
                .drop_sql(format!("drop sequence if exists {};", sequence.key()))
                .destructive(true)
                .effect(Effect::Remove(sequence.id())),
        );
    }

    // Altered sequences
    for (from, to) in sequences.common {
        let prefix = format!("alter sequence {}", to.key());
        let mut change = Change::new(to.id())
            .depends_on(to.dependencies())
            .effect(Effect::Put(to.clone().into()));
        if from.data_type != to.data_type {
            if let Some(ref data_type) = to.data_type {
                change = change.create_sql(format!("{prefix} as {data_type};"));
            }
        }
        if from.start != to.start {
            if let Some(start) = to.start {
                change = change.create_sql(format!("{prefix} start with {start};"));
            }
        }
        if from.increment != to.increment {
            if let Some(increment) = to.increment {
                change = change.create_sql(format!("{prefix} increment by {increment};"));
            }
        }
        if from.owned_by != to.owned_by {
            change = change.trailing_sql(owned_by_sql(to, to.owned_by.as_ref()));
        }
        if !change.is_empty() {
            changes.push(change);
        }
    }

    changes
}

fn owned_by_sql(sequence: &Sequence, owned_by: Option<&OwnedBy>) -> String {
    let owner = owned_by.map_or_else(
        || "none".to_string(),
        |o| format!("{}.{}", o.table, quote_ident(&o.column)),
    );
    format!("alter sequence {} owned by {owner};", sequence.key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_all, diff_extensions, DiffOptions};
    use crate::snapshot::{ObjectId, SchemaDef, Snapshot};

    fn citext(version: &str) -> Extension {
        Extension::new("citext", "public").version(version)
    }

    #[test]
    fn test_schema_create_and_drop() {
        let from = Snapshot::new().with(SchemaDef::new("old"));
        let to = Snapshot::new().with(SchemaDef::new("new").comment("fresh"));
        let changes = diff_all(&from, &to, &DiffOptions::new(), false);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].create, vec!["create schema if not exists \"new\";"]);
        assert_eq!(changes[0].trailing, vec!["comment on schema \"new\" is 'fresh';"]);
        assert_eq!(changes[1].drop, vec!["drop schema if exists \"old\";"]);
        assert!(changes[1].destructive);
    }

    #[test]
    fn test_extension_create_and_upgrade() {
        let from = Snapshot::new().with(citext("1.5"));
        let to = Snapshot::new()
            .with(citext("1.6"))
            .with(Extension::new("hstore", "public").version("1.8"));
        let changes = diff_extensions(&from, &to, &DiffOptions::new(), true);

        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0].create,
            vec!["create extension if not exists \"hstore\" with schema \"public\" version '1.8';"]
        );
        assert_eq!(
            changes[1].create,
            vec!["alter extension \"citext\" update to '1.6';"]
        );
    }

    #[test]
    fn test_ignore_extension_versions() {
        let from = Snapshot::new().with(citext("1.5"));
        let to = Snapshot::new()
            .with(citext("1.6"))
            .with(Extension::new("hstore", "public").version("1.8"));
        let options = DiffOptions::new().ignore_extension_versions(true);
        let changes = diff_extensions(&from, &to, &options, true);

        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].create,
            vec!["create extension if not exists \"hstore\" with schema \"public\";"]
        );
    }

    #[test]
    fn test_extension_only_mode_never_drops() {
        let from = Snapshot::new().with(citext("1.5"));
        let changes = diff_extensions(&from, &Snapshot::new(), &DiffOptions::new(), false);
        assert!(changes.is_empty());

        let changes = diff_extensions(&from, &Snapshot::new(), &DiffOptions::new(), true);
        assert_eq!(changes[0].drop, vec!["drop extension if exists \"citext\";"]);
        assert!(changes[0].destructive);
    }

    #[test]
    fn test_sequence_create_and_alter() {
        let table = ObjectId::table("public", "orders");
        let from = Snapshot::new().with(Sequence::new("public", "orders_id_seq").start(1));
        let to = Snapshot::new().with(
            Sequence::new("public", "orders_id_seq")
                .start(100)
                .increment(2)
                .owned_by(&table, "id"),
        );
        let changes = diff_all(&from, &to, &DiffOptions::new(), false);

        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].create,
            vec![
                "alter sequence \"public\".\"orders_id_seq\" start with 100;",
                "alter sequence \"public\".\"orders_id_seq\" increment by 2;",
            ]
        );
        assert_eq!(
            changes[0].trailing,
            vec!["alter sequence \"public\".\"orders_id_seq\" owned by \"public\".\"orders\".\"id\";"]
        );

        let created = diff_all(&Snapshot::new(), &to, &DiffOptions::new(), false);
        assert_eq!(
            created[0].create,
            vec!["create sequence \"public\".\"orders_id_seq\" start with 100 increment by 2;"]
        );
    }
}
