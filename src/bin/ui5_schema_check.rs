//! Validate a middleware `configuration` block against a merged schema.
//!
//! Usage:
//!   ui5-schema-check --middleware fiori-tools-proxy --file config.json
//!   ui5-schema-check --middleware reload-middleware --schema schema/ux-ui5-tooling-schema.json < config.json

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::io::{Read, stdin};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use ui5_schema_merge::{MiddlewareValidator, OUTPUT_FILE_NAME, SCHEMA_DIR};

#[derive(Parser, Debug)]
#[command(name = "ui5-schema-check")]
#[command(about = "Validate a middleware configuration against the merged UI5 tooling schema")]
struct Cli {
    /// Middleware name selecting the configuration schema.
    #[arg(long)]
    middleware: String,
    /// Merged schema; defaults to schema/ux-ui5-tooling-schema.json.
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Configuration JSON; reads stdin when omitted.
    #[arg(long)]
    file: Option<PathBuf>,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let schema_path = cli
        .schema
        .unwrap_or_else(|| Path::new(SCHEMA_DIR).join(OUTPUT_FILE_NAME));
    let merged = read_json(Some(schema_path.as_path()))?;
    let configuration = read_json(cli.file.as_deref())?;

    let validator = MiddlewareValidator::new(&merged)
        .with_context(|| format!("compiling {}", schema_path.display()))?;
    validator.validate(&cli.middleware, &configuration)?;
    println!("{} configuration is valid", cli.middleware);
    Ok(())
}

fn read_json(path: Option<&Path>) -> Result<Value> {
    let mut buf = String::new();
    let source = match path {
        Some(path) => {
            buf = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            path.display().to_string()
        }
        None => {
            stdin()
                .read_to_string(&mut buf)
                .context("reading configuration from stdin")?;
            "stdin".to_string()
        }
    };
    serde_json::from_str(&buf).with_context(|| format!("parsing JSON from {source}"))
}
