//! Build `ux-ui5-tooling-schema.json` from the middleware schemas.
//!
//! Usage:
//!   ui5-schema-merge                     # merges ./schema
//!   ui5-schema-merge packages/yaml-schema
//!   ui5-schema-merge --schema-dir schema --mappings mappings.json --quiet

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use ui5_schema_merge::{
    MergeOptions, OUTPUT_FILE_NAME, load_middleware_mappings, merge_schemas_with, run_cli,
};

#[derive(Parser, Debug)]
#[command(name = "ui5-schema-merge")]
#[command(about = "Merge middleware JSON Schemas into one UI5 tooling schema")]
struct Cli {
    /// Package root containing the `schema/` directory.
    #[arg(default_value = ".")]
    base_dir: PathBuf,
    /// Schema directory to read from and write to, instead of `<BASE_DIR>/schema`.
    #[arg(long)]
    schema_dir: Option<PathBuf>,
    /// JSON array of {middlewareName, schemaFileName} replacing the built-in table.
    #[arg(long)]
    mappings: Option<PathBuf>,
    /// Output file name inside the schema directory.
    #[arg(long, default_value = OUTPUT_FILE_NAME)]
    output: String,
    /// Only log warnings.
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    if let Err(err) = run(cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let plain = cli.schema_dir.is_none()
        && cli.mappings.is_none()
        && cli.output == OUTPUT_FILE_NAME
        && !cli.quiet;
    if plain {
        run_cli(&cli.base_dir)?;
        return Ok(());
    }

    let schema_dir = cli
        .schema_dir
        .unwrap_or_else(|| cli.base_dir.join(ui5_schema_merge::SCHEMA_DIR));
    let mut options = MergeOptions {
        output_file_name: cli.output,
        verbose: !cli.quiet,
        ..MergeOptions::default()
    };
    if let Some(path) = cli.mappings {
        options.mappings = load_middleware_mappings(&path)?;
    }

    let output = merge_schemas_with(&schema_dir, &options)
        .with_context(|| format!("merging schemas in {}", schema_dir.display()))?;
    println!("Merged schema written to {}", output.display());
    Ok(())
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
