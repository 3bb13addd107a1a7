//! oxide-diff CLI
//!
//! Compares two schema snapshots and prints the SQL that migrates the
//! first into the second.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use oxide_diff::command::{run, Args};

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Setup logging; stderr stays reserved for the unsafe warning otherwise
    if args.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(io::stderr)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let status = run(&args, &mut io::stdout().lock(), &mut io::stderr().lock())?;
    Ok(ExitCode::from(status.code()))
}
