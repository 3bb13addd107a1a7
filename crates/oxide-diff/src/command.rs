//! Command-line front end.
//!
//! [`run`] writes rendered SQL to `out` and the unsafe warning to `err`,
//! and reports the outcome as a [`MigrationStatus`].

use std::io::Write;

use clap::Parser;

use crate::diff::DiffOptions;
use crate::error::{DiffError, UNSAFE_MESSAGE};
use crate::inspect::{DataSource, JsonInspector};
use crate::migration::Migration;

/// Generate a PostgreSQL migration script between two schema snapshots.
#[derive(Debug, Parser)]
#[command(name = "oxide-diff")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Prevent the error when destructive statements are generated.
    #[arg(long = "unsafe")]
    pub unsafe_: bool,

    /// Restrict the output to statements for a single schema.
    #[arg(long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Exclude one schema from the diff.
    #[arg(long = "exclude_schema", value_name = "SCHEMA")]
    pub exclude_schema: Option<String>,

    /// Exclude several schemas from the diff.
    #[arg(long = "exclude_schemas", value_name = "SCHEMA", num_args = 1..)]
    pub exclude_schemas: Vec<String>,

    /// Only output "create extension" statements, nothing else.
    #[arg(long)]
    pub create_extensions_only: bool,

    /// Ignore the versions when comparing extensions.
    #[arg(long)]
    pub ignore_extension_versions: bool,

    /// Also output privilege differences (grant/revoke statements).
    #[arg(long)]
    pub with_privileges: bool,

    /// Log diff progress to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// The database you want to migrate (a JSON snapshot, or EMPTY).
    #[arg(value_name = "FROM")]
    pub dburl_from: String,

    /// The database you want to use as the target (a JSON snapshot, or EMPTY).
    #[arg(value_name = "TARGET")]
    pub dburl_target: String,
}

impl Args {
    /// Diff options described by the flags.
    #[must_use]
    pub fn options(&self) -> DiffOptions {
        let mut options =
            DiffOptions::new().ignore_extension_versions(self.ignore_extension_versions);
        if let Some(ref schema) = self.schema {
            options = options.with_schema(schema);
        }
        for schema in self.exclude_schema.iter().chain(&self.exclude_schemas) {
            options = options.excluding_schema(schema);
        }
        options
    }
}

/// Outcome of one run, used as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// The two databases are already in sync.
    NoChanges = 0,
    /// Migration SQL was written.
    ChangesFound = 1,
    /// Destructive statements were generated and suppressed.
    UnsafeChanges = 2,
}

impl MigrationStatus {
    /// Process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Diffs the two data sources named by `args`.
///
/// # Errors
///
/// Inspection failures and write errors on `out` or `err` are returned
/// unchanged. Blocked destructive statements are not an error; they are
/// reported on `err` and as [`MigrationStatus::UnsafeChanges`].
pub fn run(args: &Args, out: &mut impl Write, err: &mut impl Write) -> anyhow::Result<MigrationStatus> {
    let mut migration = Migration::new(
        JsonInspector::new(),
        DataSource::from(args.dburl_from.as_str()),
        DataSource::from(args.dburl_target.as_str()),
        args.options(),
    )?;
    migration.inspect_from()?;
    migration.inspect_target()?;

    if args.unsafe_ {
        migration.set_safety(false);
    }
    if args.create_extensions_only {
        migration.add_extension_changes(false)?;
    } else {
        migration.add_all_changes(args.with_privileges)?;
    }

    if migration.statements()?.is_empty() {
        return Ok(MigrationStatus::NoChanges);
    }
    match migration.sql() {
        Ok(sql) => {
            write!(out, "{sql}")?;
            Ok(MigrationStatus::ChangesFound)
        }
        Err(DiffError::UnsafeMigration) => {
            writeln!(err, "-- ERROR: {UNSAFE_MESSAGE}")?;
            Ok(MigrationStatus::UnsafeChanges)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("oxide-diff").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_flags() {
        let args = parse(&[
            "--unsafe",
            "--exclude_schema",
            "audit",
            "--exclude_schemas",
            "a",
            "b",
            "--with-privileges",
            "from.json",
            "to.json",
        ]);
        assert!(args.unsafe_);
        assert!(args.with_privileges);
        assert_eq!(args.exclude_schemas, vec!["a", "b"]);
        assert_eq!(args.dburl_target, "to.json");

        let options = args.options();
        assert!(!options.filter.allows("audit"));
        assert!(!options.filter.allows("b"));
        assert!(options.filter.allows("public"));
    }

    #[test]
    fn test_schema_flag() {
        let args = parse(&["--schema", "goodschema", "--ignore-extension-versions", "EMPTY", "EMPTY"]);
        let options = args.options();
        assert!(options.ignore_extension_versions);
        assert!(options.filter.allows("goodschema"));
        assert!(!options.filter.allows("public"));
    }

    #[test]
    fn test_empty_sources() {
        let args = parse(&["EMPTY", "EMPTY"]);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = run(&args, &mut out, &mut err).unwrap();

        assert_eq!(status, MigrationStatus::NoChanges);
        assert_eq!(status.code(), 0);
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_schema_and_exclude_conflict() {
        let args = parse(&["--schema", "a", "--exclude_schema", "b", "EMPTY", "EMPTY"]);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        assert!(run(&args, &mut out, &mut err).is_err());
    }
}
