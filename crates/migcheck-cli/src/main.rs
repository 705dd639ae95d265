//! migcheck - batch safety lint for schema migration plans.
//!
//! Loads a schema snapshot and one or more migration plan files, analyzes
//! each as an independent migration unit, and reports a verdict per file.
//! Exits 1 when any plan is unsafe, 2 on input errors.

mod formatter;
mod input;

use std::path::PathBuf;

use clap::Parser;

use formatter::{OutputFormat, VerdictPrinter};
use input::{MigrationFile, SchemaFile};
use migcheck_core::{CompatVersion, StaticContext};

/// migcheck - static safety analysis for schema migrations
#[derive(Parser, Debug)]
#[command(name = "migcheck")]
#[command(version, about = "Static safety analysis for schema migrations")]
pub struct Args {
    /// Schema snapshot (JSON) describing the pre-existing tables
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Target framework compatibility version, e.g. 7.1
    #[arg(long)]
    pub compat_version: Option<CompatVersion>,

    /// Target database server major version
    #[arg(long)]
    pub db_version: Option<u32>,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Migration plan files (JSON), analyzed as independent units
    #[arg(required = true)]
    pub migrations: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("migcheck=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = SchemaFile::load(&args.schema)?.into_schema();
    tracing::debug!(
        schema = %args.schema.display(),
        migrations = args.migrations.len(),
        "loaded schema snapshot"
    );

    let mut context = StaticContext::new();
    if let Some(version) = args.compat_version {
        context = context.with_compat_version(version);
    }
    if let Some(version) = args.db_version {
        context = context.with_db_major_version(version);
    }

    let printer = VerdictPrinter::new(args.format);
    let mut all_safe = true;

    for path in &args.migrations {
        let plan = MigrationFile::load(path)?;
        // Each plan gets a fresh unit and tracker; nothing carries over.
        match plan.analyze(&context, &schema) {
            Ok(report) => printer.safe(path, &report),
            Err(error) => {
                all_safe = false;
                printer.unsafe_verdict(path, &error);
            }
        }
    }

    Ok(all_safe)
}
