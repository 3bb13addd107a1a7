//! Tests for the command-line contract: stdout, stderr and exit status.

mod common;
use common::*;

use oxide_diff::command::MigrationStatus;
use oxide_diff::prelude::*;

fn users() -> Snapshot {
    Snapshot::new().with(Table::new("public", "users").column(Column::new("id", "integer").not_null()))
}

#[test]
fn empty_sources() {
    let (status, out, err) = run_cli(&["EMPTY", "EMPTY"]);
    assert_eq!(status, MigrationStatus::NoChanges);
    assert_eq!(status.code(), 0);
    assert_eq!(out, "");
    assert_eq!(err, "");
}

#[test]
fn identical_sources() {
    let file = snapshot_file(&before());
    let path = file.path().to_str().unwrap();
    let (status, out, _) = run_cli(&["--with-privileges", path, path]);
    assert_eq!(status, MigrationStatus::NoChanges);
    assert_eq!(out, "");
}

#[test]
fn changes_found() {
    let target = snapshot_file(&users());
    let (status, out, err) = run_cli(&["EMPTY", target.path().to_str().unwrap()]);

    assert_eq!(status, MigrationStatus::ChangesFound);
    assert_eq!(status.code(), 1);
    assert_eq!(
        out,
        "create table \"public\".\"users\" (\n    \"id\" integer not null\n);\n\n"
    );
    assert_eq!(err, "");
}

#[test]
fn unsafe_changes_are_suppressed() {
    let source = snapshot_file(&users());
    let (status, out, err) = run_cli(&[source.path().to_str().unwrap(), "EMPTY"]);

    assert_eq!(status, MigrationStatus::UnsafeChanges);
    assert_eq!(status.code(), 2);
    assert_eq!(out, "");
    assert_eq!(err, UNSAFE_LINE);
}

#[test]
fn unsafe_flag_renders_drops() {
    let source = snapshot_file(&users());
    let (status, out, err) = run_cli(&["--unsafe", source.path().to_str().unwrap(), "EMPTY"]);

    assert_eq!(status, MigrationStatus::ChangesFound);
    assert_eq!(out, "drop table \"public\".\"users\";\n\n");
    assert_eq!(err, "");
}

#[test]
fn create_extensions_only() {
    let source = snapshot_file(&Snapshot::new().with(Extension::new("hstore", "public")));
    let target = snapshot_file(&users().with(Extension::new("citext", "public").version("1.6")));
    let (status, out, _) = run_cli(&[
        "--create-extensions-only",
        "--ignore-extension-versions",
        source.path().to_str().unwrap(),
        target.path().to_str().unwrap(),
    ]);

    assert_eq!(status, MigrationStatus::ChangesFound);
    assert_eq!(
        out,
        "create extension if not exists \"citext\" with schema \"public\";\n\n"
    );
}

#[test]
fn excluded_schemas() {
    let target = snapshot_file(
        &users()
            .with(Table::new("excludedschema1", "a"))
            .with(Table::new("excludedschema2", "b")),
    );
    let (status, out, _) = run_cli(&[
        "--exclude_schemas",
        "excludedschema1",
        "excludedschema2",
        "--",
        "EMPTY",
        target.path().to_str().unwrap(),
    ]);

    assert_eq!(status, MigrationStatus::ChangesFound);
    assert!(out.contains("\"public\".\"users\""));
    assert!(!out.contains("excludedschema"));
}

#[test]
fn missing_snapshot_file_is_an_error() {
    let args = <oxide_diff::command::Args as clap::Parser>::try_parse_from([
        "oxide-diff",
        "/nonexistent/from.json",
        "EMPTY",
    ])
    .unwrap();
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let error = oxide_diff::command::run(&args, &mut out, &mut err).unwrap_err();
    assert!(matches!(
        error.downcast_ref::<DiffError>(),
        Some(DiffError::Inspect(InspectError::MissingSource(_)))
    ));
}
