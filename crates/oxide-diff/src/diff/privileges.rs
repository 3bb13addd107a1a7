//! Privilege grants and revokes.
//!
//! Each grant or revoke is its own statement. Objects that are dropped and
//! recreated lose their grants, so those are issued again.

use std::collections::BTreeSet;

use super::{partition, Context};
use crate::change::{Change, Effect};
use crate::dialect::quote_role;
use crate::snapshot::{CatalogObject, ObjectId, Privilege};

pub(super) fn changes(ctx: &Context<'_>, recreated: &BTreeSet<ObjectId>) -> Vec<Change> {
    let privileges = partition(&ctx.source.privileges, &ctx.target.privileges);
    let mut changes = Vec::new();

    // Revoked
    for privilege in privileges.dropped {
        changes.push(
            Change::new(privilege.id())
                .drop_sql(revoke(privilege))
                .effect(Effect::Remove(privilege.id())),
        );
    }

    // Granted, or granted again after a recreate
    let regranted = privileges
        .common
        .into_iter()
        .filter(|(_, to)| recreated.contains(&to.target))
        .map(|(_, to)| to);
    for privilege in privileges.added.into_iter().chain(regranted) {
        changes.push(
            Change::new(privilege.id())
                .create_sql(grant(privilege))
                .depends_on(privilege.dependencies())
                .effect(Effect::Put(privilege.clone().into())),
        );
    }

    changes
}

fn grant(privilege: &Privilege) -> String {
    format!(
        "grant {} on {} {} to {};",
        privilege.privilege,
        privilege.object_type(),
        privilege.target.name,
        quote_role(&privilege.grantee)
    )
}

fn revoke(privilege: &Privilege) -> String {
    format!(
        "revoke {} on {} {} from {};",
        privilege.privilege,
        privilege.object_type(),
        privilege.target.name,
        quote_role(&privilege.grantee)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_all, DiffOptions};
    use crate::snapshot::{Snapshot, View};

    #[test]
    fn test_grant_and_revoke() {
        let func = ObjectId::function("public", "f", "integer");
        let from = Snapshot::new().with(Privilege::new(ObjectId::schema("app"), "usage", "reader"));
        let to = Snapshot::new().with(Privilege::new(func, "execute", "public"));

        let changes = diff_all(&from, &to, &DiffOptions::new(), true);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].drop, vec!["revoke usage on schema \"app\" from \"reader\";"]);
        assert!(!changes[0].destructive);
        assert_eq!(
            changes[1].create,
            vec!["grant execute on function \"public\".\"f\"(integer) to PUBLIC;"]
        );
    }

    #[test]
    fn test_privileges_only_when_requested() {
        let to = Snapshot::new().with(Privilege::new(ObjectId::table("public", "t"), "select", "reader"));
        assert!(diff_all(&Snapshot::new(), &to, &DiffOptions::new(), false).is_empty());
    }

    #[test]
    fn test_recreated_view_is_granted_again() {
        let select = Privilege::new(ObjectId::view("public", "v"), "select", "reader");
        let from = Snapshot::new()
            .with(View::new("public", "v", "select 1"))
            .with(select.clone());
        let to = Snapshot::new()
            .with(View::new("public", "v", "select 2"))
            .with(select);

        let changes = diff_all(&from, &to, &DiffOptions::new(), true);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[1].create,
            vec!["grant select on table \"public\".\"v\" to \"reader\";"]
        );
    }
}
