//! Cross-file `$ref` resolution.
//!
//! References into other schema files are made local: a referenced
//! definition is copied into the importing document under a namespaced name
//! (together with everything it depends on), and a referenced property is
//! inlined where the reference stood. A property that refers back to itself
//! while it is being inlined is also extracted as a definition so the cycle
//! becomes an ordinary recursive `$ref`.

use crate::refs::{
    DEFINITIONS_KEY, ExternalTarget, RefAction, SchemaRef, definition_pointer, definition_ref,
    namespace_prefix, rewrite_refs,
};
use crate::schema_loader::{SchemaCache, SchemaLoadError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Resolve every external reference in `schema`.
///
/// Extracted definitions are named `<prefix>_<sourcePrefix>_<name>` and are
/// added to the returned document's `definitions`. Files reached through a
/// reference are loaded through `cache`. The input is left untouched.
pub fn resolve_external_refs(
    schema: &Value,
    schema_dir: &Path,
    cache: &mut SchemaCache,
    prefix: &str,
) -> Result<Value, SchemaLoadError> {
    let mut resolver = RefResolver {
        schema_dir,
        cache,
        prefix,
        extracted: Map::new(),
        seen: HashSet::new(),
        inlining: HashSet::new(),
        recursive: HashSet::new(),
    };

    let mut resolved = schema.clone();
    rewrite_refs(&mut resolved, &mut |reference| {
        resolver.resolve_ref(reference, None)
    })?;

    if !resolver.extracted.is_empty() {
        if let Value::Object(root) = &mut resolved {
            let definitions = root
                .entry(DEFINITIONS_KEY)
                .or_insert_with(|| Value::Object(Map::new()));
            if !definitions.is_object() {
                *definitions = Value::Object(Map::new());
            }
            if let Value::Object(definitions) = definitions {
                definitions.extend(std::mem::take(&mut resolver.extracted));
            }
        }
    }
    Ok(resolved)
}

struct RefResolver<'a> {
    schema_dir: &'a Path,
    cache: &'a mut SchemaCache,
    prefix: &'a str,
    extracted: Map<String, Value>,
    // Namespaced names already extracted (or being extracted) in this pass.
    seen: HashSet<String>,
    // (file, pointer) of properties currently being inlined.
    inlining: HashSet<(String, String)>,
    // Properties that referred back to themselves; they live in `extracted`.
    recursive: HashSet<(String, String)>,
}

impl RefResolver<'_> {
    /// Decide what happens to one reference.
    ///
    /// `source` is the file the reference was written in when it sits inside
    /// extracted or inlined content; internal references there point into
    /// that file, not into the document being resolved.
    fn resolve_ref(
        &mut self,
        reference: &str,
        source: Option<&str>,
    ) -> Result<RefAction, SchemaLoadError> {
        match SchemaRef::parse(reference) {
            SchemaRef::Internal { name, rest } => {
                let Some(file) = source else {
                    return Ok(RefAction::Keep);
                };
                Ok(match self.extract_definition(file, &name)? {
                    Some(new_name) => RefAction::Replace(definition_ref(&new_name, &rest)),
                    None => RefAction::Keep,
                })
            }
            SchemaRef::External { file, target } => match target {
                ExternalTarget::Definition(name) => {
                    Ok(match self.extract_definition(&file, &name)? {
                        Some(new_name) => RefAction::Replace(definition_ref(&new_name, "")),
                        None => RefAction::Keep,
                    })
                }
                ExternalTarget::Property(pointer) => self.inline_property(&file, &pointer),
                ExternalTarget::Unsupported(pointer) => {
                    debug!(reference, pointer = %pointer, "leaving unsupported external reference");
                    Ok(RefAction::Keep)
                }
            },
            SchemaRef::Opaque => Ok(RefAction::Keep),
        }
    }

    /// Copy `name` out of `file` into the extracted set, with its
    /// dependencies. Returns the namespaced name, or `None` when the file has
    /// no such definition.
    fn extract_definition(
        &mut self,
        file: &str,
        name: &str,
    ) -> Result<Option<String>, SchemaLoadError> {
        let source_prefix = namespace_prefix(file);
        let new_name = format!("{}_{}_{}", self.prefix, source_prefix, name);
        if self.seen.contains(&new_name) {
            return Ok(Some(new_name));
        }

        let schema = self.cache.get_or_load(self.schema_dir, file)?;
        let Some(mut definition) = schema.pointer(&definition_pointer(name)).cloned() else {
            warn!(file, definition = name, "referenced definition not found; leaving reference unresolved");
            return Ok(None);
        };

        self.seen.insert(new_name.clone());
        rewrite_refs(&mut definition, &mut |reference| {
            self.resolve_ref(reference, Some(file))
        })?;
        self.extracted.insert(new_name.clone(), definition);
        Ok(Some(new_name))
    }

    /// Inline the schema of a property from another file, pulling in the
    /// definitions it depends on.
    fn inline_property(&mut self, file: &str, pointer: &str) -> Result<RefAction, SchemaLoadError> {
        let key = (file.to_string(), pointer.to_string());
        if self.inlining.contains(&key) || self.recursive.contains(&key) {
            self.recursive.insert(key);
            let name = self.property_definition_name(file, pointer);
            debug!(file, pointer, definition = %name, "recursive property reference");
            return Ok(RefAction::Replace(definition_ref(&name, "")));
        }

        let schema = self.cache.get_or_load(self.schema_dir, file)?;
        let Some(mut body) = schema.pointer(pointer).cloned() else {
            warn!(file, pointer, "referenced property not found; leaving reference unresolved");
            return Ok(RefAction::Keep);
        };

        self.inlining.insert(key.clone());
        let walked = rewrite_refs(&mut body, &mut |reference| {
            self.resolve_ref(reference, Some(file))
        });
        self.inlining.remove(&key);
        walked?;

        if self.recursive.contains(&key) {
            let name = self.property_definition_name(file, pointer);
            self.seen.insert(name.clone());
            self.extracted.insert(name, body.clone());
        }
        match body {
            Value::Object(map) => Ok(RefAction::Inline(map)),
            other => {
                warn!(file, pointer, value = %other, "referenced property is not an object schema; leaving reference unresolved");
                Ok(RefAction::Keep)
            }
        }
    }

    /// `/properties/node` in `g-schema.json` becomes `<prefix>_g_property_node`.
    fn property_definition_name(&self, file: &str, pointer: &str) -> String {
        let path = pointer
            .trim_start_matches('/')
            .split('/')
            .filter(|segment| *segment != "properties")
            .map(|segment| segment.replace("~1", "_").replace("~0", "_"))
            .collect::<Vec<_>>()
            .join("_");
        format!("{}_{}_property_{}", self.prefix, namespace_prefix(file), path)
    }
}
