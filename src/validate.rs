//! Checks on a merged schema document.
//!
//! The integrity helpers report references the merge could not make local.
//! [`MiddlewareValidator`] compiles each middleware's configuration schema
//! together with the pooled definitions so configurations can be checked
//! the way an editor would check them.

use crate::merger::DRAFT_07_SCHEMA;
use crate::refs::{DEFINITIONS_KEY, SchemaRef, collect_refs};
use anyhow::{Result, anyhow, bail};
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const DEFINITIONS_POINTER: &str = "/allOf/1/definitions";
const CONDITIONS_POINTER: &str = "/allOf/1/properties/server/properties/customMiddleware/items/allOf";

/// Pooled definitions of a merged document.
pub fn merged_definitions(merged: &Value) -> Option<&Map<String, Value>> {
    merged.pointer(DEFINITIONS_POINTER).and_then(Value::as_object)
}

/// Local references that point at nothing in the merged document.
pub fn dangling_refs(merged: &Value) -> Vec<String> {
    let empty = Map::new();
    let definitions = merged_definitions(merged).unwrap_or(&empty);
    collect_refs(merged)
        .into_iter()
        .filter(|reference| match SchemaRef::parse(reference) {
            SchemaRef::Internal { name, .. } => !definitions.contains_key(&name),
            SchemaRef::External { .. } => false,
            SchemaRef::Opaque => match reference.strip_prefix('#') {
                Some(pointer) if !pointer.is_empty() => merged.pointer(pointer).is_none(),
                _ => false,
            },
        })
        .collect()
}

/// References that still point into another schema file.
pub fn external_file_refs(merged: &Value) -> Vec<String> {
    collect_refs(merged)
        .into_iter()
        .filter(|reference| matches!(SchemaRef::parse(reference), SchemaRef::External { .. }))
        .collect()
}

/// Compiled configuration schemas keyed by middleware name.
pub struct MiddlewareValidator {
    compiled: BTreeMap<String, JSONSchema>,
}

impl MiddlewareValidator {
    /// Compile one validator per middleware condition in `merged`.
    pub fn new(merged: &Value) -> Result<Self> {
        let conditions = merged
            .pointer(CONDITIONS_POINTER)
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("merged schema has no customMiddleware conditions"))?;
        let definitions = merged_definitions(merged).cloned().unwrap_or_default();

        let mut compiled = BTreeMap::new();
        for condition in conditions {
            let name = condition
                .pointer("/if/properties/name/const")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("middleware condition without a name const"))?;
            let schema = configuration_schema(condition, &definitions)
                .ok_or_else(|| anyhow!("middleware {name} has no configuration schema"))?;
            let validator = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&schema)
                .map_err(|err| anyhow!("compiling configuration schema for {name}: {err}"))?;
            compiled.insert(name.to_string(), validator);
        }
        Ok(Self { compiled })
    }

    pub fn middleware_names(&self) -> impl Iterator<Item = &str> {
        self.compiled.keys().map(String::as_str)
    }

    /// Validate a `configuration` object for `middleware`.
    pub fn validate(&self, middleware: &str, configuration: &Value) -> Result<()> {
        let Some(validator) = self.compiled.get(middleware) else {
            bail!("unknown middleware '{middleware}'");
        };
        if let Err(errors) = validator.validate(configuration) {
            let details = errors
                .map(|err| format!("{}: {}", err.instance_path, err))
                .collect::<Vec<_>>()
                .join("\n");
            bail!("configuration for {middleware} failed schema validation:\n{details}");
        }
        Ok(())
    }
}

fn configuration_schema(condition: &Value, definitions: &Map<String, Value>) -> Option<Value> {
    let mut schema = condition
        .pointer("/then/properties/configuration")?
        .as_object()?
        .clone();
    schema.insert("$schema".to_string(), Value::String(DRAFT_07_SCHEMA.to_string()));
    let mut pooled = definitions.clone();
    if let Some(Value::Object(own)) = schema.remove(DEFINITIONS_KEY) {
        pooled.extend(own);
    }
    schema.insert(DEFINITIONS_KEY.to_string(), Value::Object(pooled));
    Some(Value::Object(schema))
}
