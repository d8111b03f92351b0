//! Assembles the merged UI5 tooling schema.
//!
//! Each middleware mapping contributes one `if`/`then` condition keyed on the
//! `name` of a `customMiddleware` entry. Definitions from every source file
//! are namespaced by file and pooled under a single `definitions` block, so
//! the output document has no references into other files.

use crate::namespace::{prefix_definitions, prefix_refs};
use crate::refs::{DEFINITIONS_KEY, namespace_prefix};
use crate::resolver::resolve_external_refs;
use crate::schema_loader::{SchemaCache, load_schema};
use crate::validate::{dangling_refs, external_file_refs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value, json};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// File written into the schema directory by [`merge_schemas`].
pub const OUTPUT_FILE_NAME: &str = "ux-ui5-tooling-schema.json";
/// Root schema every merged document extends.
pub const BASE_SCHEMA_URL: &str = "https://ui5.github.io/cli/schema/ui5.yaml.json";
pub const DRAFT_07_SCHEMA: &str = "http://json-schema.org/draft-07/schema#";

/// Binds a middleware name to the schema describing its `configuration`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareMapping {
    pub middleware_name: String,
    pub schema_file_name: String,
}

impl MiddlewareMapping {
    pub fn new(middleware_name: impl Into<String>, schema_file_name: impl Into<String>) -> Self {
        Self {
            middleware_name: middleware_name.into(),
            schema_file_name: schema_file_name.into(),
        }
    }
}

const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("fiori-tools-preview", "preview-middleware-schema.json"),
    ("preview-middleware", "preview-middleware-schema.json"),
    ("fiori-tools-proxy", "fiori-tools-proxy-schema.json"),
    ("backend-proxy-middleware", "backend-proxy-middleware-schema.json"),
    ("backend-proxy-middleware-cf", "backend-proxy-middleware-cf-schema.json"),
    ("fiori-tools-appreload", "reload-middleware-schema.json"),
    ("reload-middleware", "reload-middleware-schema.json"),
    ("fiori-tools-servestatic", "serve-static-middleware-schema.json"),
    ("serve-static-middleware", "serve-static-middleware-schema.json"),
    ("ui5-proxy-middleware", "ui5-proxy-middleware-schema.json"),
];

/// The built-in middleware table, in output order.
pub fn default_middleware_mappings() -> Vec<MiddlewareMapping> {
    DEFAULT_MAPPINGS
        .iter()
        .map(|(name, file)| MiddlewareMapping::new(*name, *file))
        .collect()
}

/// Read a JSON array of `{ "middlewareName", "schemaFileName" }` entries.
pub fn load_middleware_mappings(path: &Path) -> Result<Vec<MiddlewareMapping>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading middleware mappings {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("parsing middleware mappings {}", path.display()))
}

/// Inputs of one merge run.
#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub mappings: Vec<MiddlewareMapping>,
    pub base_schema_url: String,
    pub output_file_name: String,
    /// Log per-mapping progress and the summary at info level.
    pub verbose: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            mappings: default_middleware_mappings(),
            base_schema_url: BASE_SCHEMA_URL.to_string(),
            output_file_name: OUTPUT_FILE_NAME.to_string(),
            verbose: true,
        }
    }
}

/// State accumulated across the mappings of a single run.
#[derive(Debug, Default)]
pub struct MergeContext {
    /// Schemas reached through cross-file references.
    pub loaded: SchemaCache,
    /// Source files whose definitions are already pooled.
    pub processed: HashSet<String>,
    /// Namespaced definitions from every processed file.
    pub definitions: Map<String, Value>,
}

impl MergeContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeSummary {
    pub definitions: usize,
    pub conditions: usize,
}

/// A merged document and what went into it.
#[derive(Clone, Debug)]
pub struct MergedSchema {
    pub document: Value,
    pub summary: MergeSummary,
}

/// Build the condition for one mapping, pooling its definitions into `ctx`.
pub fn process_middleware_mapping(
    mapping: &MiddlewareMapping,
    schema_dir: &Path,
    ctx: &mut MergeContext,
    verbose: bool,
) -> Result<Value> {
    let file = mapping.schema_file_name.as_str();
    let prefix = namespace_prefix(file);
    if verbose {
        info!(middleware = %mapping.middleware_name, schema = file, "processing middleware");
    } else {
        debug!(middleware = %mapping.middleware_name, schema = file, "processing middleware");
    }

    // The mapped schema itself is always read fresh; only files reached via
    // cross-file references share the cache.
    let schema = load_schema(schema_dir, file)?;
    let resolved = resolve_external_refs(&schema, schema_dir, &mut ctx.loaded, &prefix)
        .with_context(|| format!("resolving references of {file}"))?;

    if !ctx.processed.contains(file) {
        let namespaced = prefix_definitions(&resolved, &prefix);
        if let Some(Value::Object(definitions)) = namespaced.get(DEFINITIONS_KEY) {
            if verbose {
                info!(schema = file, count = definitions.len(), "adding namespaced definitions");
            }
            ctx.definitions
                .extend(definitions.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        ctx.processed.insert(file.to_string());
    }

    let mut configuration = Value::Object(match resolved {
        Value::Object(root) => root
            .into_iter()
            .filter(|(key, _)| key != "$schema" && key != DEFINITIONS_KEY)
            .collect(),
        _ => Map::new(),
    });
    prefix_refs(&mut configuration, &prefix);

    Ok(json!({
        "if": {
            "properties": {
                "name": { "const": mapping.middleware_name }
            }
        },
        "then": {
            "properties": {
                "configuration": configuration
            }
        }
    }))
}

/// Merge the schemas in `schema_dir` into one document without writing it.
pub fn build_merged_schema(schema_dir: &Path, options: &MergeOptions) -> Result<MergedSchema> {
    let mut ctx = MergeContext::new();
    let mut conditions = Vec::with_capacity(options.mappings.len());
    for mapping in &options.mappings {
        let condition = process_middleware_mapping(mapping, schema_dir, &mut ctx, options.verbose)
            .with_context(|| format!("merging schema for {}", mapping.middleware_name))?;
        conditions.push(condition);
    }

    let summary = MergeSummary {
        definitions: ctx.definitions.len(),
        conditions: conditions.len(),
    };
    let document = json!({
        "$schema": DRAFT_07_SCHEMA,
        "allOf": [
            { "$ref": options.base_schema_url },
            {
                "properties": {
                    "server": {
                        "properties": {
                            "customMiddleware": {
                                "items": { "allOf": conditions }
                            }
                        }
                    }
                },
                "definitions": ctx.definitions
            }
        ]
    });

    for reference in dangling_refs(&document) {
        warn!(reference = %reference, "merged schema references a missing definition");
    }
    for reference in external_file_refs(&document) {
        warn!(reference = %reference, "merged schema still references another schema file");
    }

    Ok(MergedSchema { document, summary })
}

/// Merge with the built-in mappings and write [`OUTPUT_FILE_NAME`] into
/// `schema_dir`. Returns the written path.
pub fn merge_schemas(schema_dir: &Path, verbose: bool) -> Result<PathBuf> {
    let options = MergeOptions {
        verbose,
        ..MergeOptions::default()
    };
    merge_schemas_with(schema_dir, &options)
}

pub fn merge_schemas_with(schema_dir: &Path, options: &MergeOptions) -> Result<PathBuf> {
    let merged = build_merged_schema(schema_dir, options)?;
    let output = schema_dir.join(&options.output_file_name);
    write_schema(&output, &merged.document)?;

    if options.verbose {
        info!(
            output = %output.display(),
            definitions = merged.summary.definitions,
            conditions = merged.summary.conditions,
            "merged schema written"
        );
    }
    Ok(output)
}

/// Write `value` as 4-space indented JSON, replacing `path` atomically.
pub fn write_schema(path: &Path, value: &Value) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    {
        let mut serializer =
            Serializer::with_formatter(tmp.as_file_mut(), PrettyFormatter::with_indent(b"    "));
        value
            .serialize(&mut serializer)
            .with_context(|| format!("serializing {}", path.display()))?;
    }
    tmp.as_file_mut()
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
