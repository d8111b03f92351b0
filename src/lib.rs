//! Merges UI5 tooling middleware configuration schemas.
//!
//! Each middleware ships its own JSON Schema, possibly referencing
//! definitions and properties of other schema files. [`merge_schemas`]
//! combines them into a single self-contained draft-07 document that
//! extends the UI5 tooling base schema with one `if`/`then` branch per
//! middleware name.

pub mod merger;
pub mod namespace;
pub mod refs;
pub mod resolver;
pub mod schema_loader;
pub mod validate;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use merger::{
    BASE_SCHEMA_URL, DRAFT_07_SCHEMA, MergeContext, MergeOptions, MergeSummary, MergedSchema,
    MiddlewareMapping, OUTPUT_FILE_NAME, build_merged_schema, default_middleware_mappings,
    load_middleware_mappings, merge_schemas, merge_schemas_with, process_middleware_mapping,
    write_schema,
};
pub use namespace::{prefix_definitions, prefix_refs};
pub use refs::{SchemaRef, namespace_prefix};
pub use resolver::resolve_external_refs;
pub use schema_loader::{SchemaCache, SchemaLoadError, load_schema};
pub use validate::{MiddlewareValidator, dangling_refs, external_file_refs};

/// Directory under a package root that holds the middleware schemas.
pub const SCHEMA_DIR: &str = "schema";

/// Merge the schemas under `base_dir/schema` and report the written file.
pub fn run_cli(base_dir: &Path) -> Result<PathBuf> {
    let schema_dir = base_dir.join(SCHEMA_DIR);
    let output = merge_schemas(&schema_dir, true)?;
    println!("Merged schema written to {}", output.display());
    Ok(output)
}
