#![allow(dead_code)]

use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;

use oxide_diff::command::{run, Args, MigrationStatus};
use oxide_diff::prelude::*;

pub const UNSAFE_LINE: &str =
    "-- ERROR: destructive statements generated. Use the --unsafe flag to suppress this error.\n";

pub fn mood_id() -> ObjectId {
    ObjectId::enum_type("public", "mood")
}

pub fn person_id() -> ObjectId {
    ObjectId::table("public", "person")
}

/// A schema with an enum used by a table, two stacked views, a function,
/// constraints, an index and a grant.
pub fn before() -> Snapshot {
    Snapshot::new()
        .with(SchemaDef::new("public").owner("postgres"))
        .with(Extension::new("citext", "public").version("1.5"))
        .with(EnumType::new("public", "mood", ["sad", "ok", "happy"]))
        .with(person("'ok'::\"public\".\"mood\"", &[]))
        .with(
            Table::new("public", "orders")
                .column(Column::new("id", "integer").not_null())
                .column(Column::new("person_id", "integer"))
                .column(Column::new("total", "numeric"))
                .column(Column::new("note", "text").comment("old note")),
        )
        .with(Constraint::new(
            "public",
            "person",
            "person_pkey",
            ConstraintType::PrimaryKey,
            "PRIMARY KEY (id)",
        ))
        .with(Constraint::new(
            "public",
            "orders",
            "orders_pkey",
            ConstraintType::PrimaryKey,
            "PRIMARY KEY (id)",
        ))
        .with(
            Constraint::new(
                "public",
                "orders",
                "orders_person_fkey",
                ConstraintType::ForeignKey,
                "FOREIGN KEY (person_id) REFERENCES person(id)",
            )
            .references(&person_id()),
        )
        .with(person_moods())
        .with(happy_people())
        .with(cheer())
        .with(Index::new("public", "orders", "orders_person_idx", ["person_id"]))
        .with(Privilege::new(
            ObjectId::view("public", "person_moods"),
            "select",
            "reader",
        ))
}

/// [`before`] with a rebuilt enum, column changes, a new sequence, an
/// upgraded extension and a partial index.
pub fn after() -> Snapshot {
    before()
        .with(Extension::new("citext", "public").version("1.6"))
        .with(EnumType::new("public", "mood", ["sad", "happy"]))
        .with(person(
            "'happy'::\"public\".\"mood\"",
            &[Column::new("email", "character varying(100)")],
        ))
        .with(
            Table::new("public", "orders")
                .column(Column::new("id", "integer").not_null())
                .column(Column::new("person_id", "integer"))
                .column(Column::new("total", "numeric(10,2)")),
        )
        .with(
            Index::new("public", "orders", "orders_person_idx", ["person_id"])
                .predicate("person_id is not null"),
        )
        .with(Sequence::new("public", "invoice_seq").start(1000))
}

fn person(mood_default: &str, extra: &[Column]) -> Table {
    let mut table = Table::new("public", "person")
        .column(Column::new("id", "integer").identity(Identity::Always))
        .column(Column::new("name", "text"))
        .column(Column::new("mood", "\"public\".\"mood\"").default(mood_default))
        .depends_on(mood_id());
    for column in extra {
        table = table.column(column.clone());
    }
    table
}

fn person_moods() -> View {
    View::new("public", "person_moods", "SELECT name, mood FROM person;")
        .owner("app")
        .depends_on(person_id())
        .depends_on(mood_id())
}

fn happy_people() -> View {
    View::new(
        "public",
        "happy_people",
        "SELECT name FROM person_moods WHERE mood = 'happy'",
    )
    .owner("app")
    .depends_on(ObjectId::view("public", "person_moods"))
}

fn cheer() -> Function {
    Function::new(
        "public",
        "cheer",
        "text",
        "sql",
        "select 'cheer up, ' || m::text",
    )
    .arguments("m \"public\".\"mood\"", "\"public\".\"mood\"")
    .volatility(Volatility::Immutable)
    .depends_on(mood_id())
}

/// Writes a snapshot to a temporary JSON file.
pub fn snapshot_file(snapshot: &Snapshot) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(snapshot).unwrap().as_bytes())
        .unwrap();
    file
}

/// Runs the CLI with `argv` and captures its output.
pub fn run_cli(argv: &[&str]) -> (MigrationStatus, String, String) {
    let args = Args::try_parse_from(std::iter::once("oxide-diff").chain(argv.iter().copied()))
        .unwrap_or_else(|e| panic!("Failed to parse {argv:?}: {e}"));
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let status = run(&args, &mut out, &mut err).unwrap();
    (
        status,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

/// Position of `needle` in `sql`, failing the test if it is missing.
pub fn position(sql: &str, needle: &str) -> usize {
    sql.find(needle)
        .unwrap_or_else(|| panic!("Expected {needle:?} in:\n{sql}"))
}
