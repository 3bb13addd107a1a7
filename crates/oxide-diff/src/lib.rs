//! Schema diffing and dependency-ordered DDL synthesis for PostgreSQL.
//!
//! `oxide-diff` compares two schema snapshots and produces the statements
//! that turn the first into the second:
//! - Every object kind has its own policy for ALTER in place versus
//!   DROP + CREATE
//! - Statements are ordered through a dependency graph, so nothing is
//!   created before what it needs or dropped before what needs it
//! - Destructive statements are tagged and blocked unless explicitly allowed
//! - Applied changes are folded back into the source snapshot in memory,
//!   so a second diff can verify that the migration converges
//!
//! # Architecture
//!
//! - **Snapshot** - Per-kind catalog of one database state
//! - **Diff** - Per-kind difference computation producing [`Change`]s
//! - **Graph** - Dependency graph that linearizes change statements
//! - **Statements** - Ordered SQL fragments behind a safety gate
//! - **Migration** - The accumulate / render / apply workflow
//! - **Inspect** - The boundary where snapshots are produced
//!
//! # Example
//!
//! ```rust
//! use oxide_diff::prelude::*;
//!
//! let from = Snapshot::new().with(
//!     Table::new("public", "users").column(Column::new("id", "integer").not_null()),
//! );
//! let to = Snapshot::new().with(
//!     Table::new("public", "users")
//!         .column(Column::new("id", "integer").not_null())
//!         .column(Column::new("email", "text")),
//! );
//!
//! let mut migration = Migration::from_snapshots(from, to, DiffOptions::new()).unwrap();
//! migration.add_all_changes(false).unwrap();
//! assert_eq!(
//!     migration.sql().unwrap(),
//!     "alter table \"public\".\"users\" add column \"email\" text;\n\n"
//! );
//!
//! migration.apply().unwrap();
//! migration.add_all_changes(false).unwrap();
//! assert!(migration.changes().unwrap().is_empty());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the migration between two JSON snapshots
//! oxide-diff before.json after.json
//!
//! # Allow destructive statements
//! oxide-diff --unsafe before.json after.json
//! ```

pub mod change;
pub mod command;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod graph;
pub mod inspect;
pub mod migration;
pub mod snapshot;
pub mod state;
pub mod statements;

pub use change::{Change, Changes};
pub use error::{DiffError, Result};
pub use migration::Migration;
pub use snapshot::Snapshot;
pub use statements::Statements;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::change::{Change, Changes, Effect};
    pub use crate::diff::{diff_all, diff_extensions, DiffOptions};
    pub use crate::error::{DiffError, Result};
    pub use crate::graph::{linearize, DependencyGraph};
    pub use crate::inspect::{DataSource, InspectError, Inspector, JsonInspector};
    pub use crate::migration::{Migration, MigrationState};
    pub use crate::snapshot::{
        CatalogObject, Column, Constraint, ConstraintType, EnumType, Extension, Function,
        Identity, Index, ObjectId, ObjectKind, PartitionOf, Policy, Privilege, SchemaDef,
        SchemaFilter, SchemaObject, Sequence, Snapshot, Table, Trigger, TriggerTiming, View,
        Volatility,
    };
    pub use crate::state::SchemaState;
    pub use crate::statements::{DestructivePattern, Fragment, Statements};
}
