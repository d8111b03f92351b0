//! Definition namespacing.

use crate::refs::{DEFINITIONS_KEY, SchemaRef, definition_ref, rename_refs};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Copy `schema` with every `definitions` key renamed to `<prefix>_<key>`.
///
/// Internal references anywhere in the document are rewritten when they
/// name one of the renamed definitions; all other references are kept. A
/// schema without `definitions` is returned as an unchanged copy.
pub fn prefix_definitions(schema: &Value, prefix: &str) -> Value {
    let Some(definitions) = schema.get(DEFINITIONS_KEY).and_then(Value::as_object) else {
        return schema.clone();
    };
    let renames: HashMap<String, String> = definitions
        .keys()
        .map(|name| (name.clone(), format!("{prefix}_{name}")))
        .collect();

    let mut namespaced = schema.clone();
    rename_refs(&mut namespaced, |reference| match SchemaRef::parse(reference) {
        SchemaRef::Internal { name, rest } => renames
            .get(&name)
            .map(|new_name| definition_ref(new_name, &rest)),
        _ => None,
    });

    if let Some(Value::Object(defs)) = namespaced.get_mut(DEFINITIONS_KEY) {
        let renamed: Map<String, Value> = std::mem::take(defs)
            .into_iter()
            .map(|(name, body)| {
                let new_name = renames
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| format!("{prefix}_{name}"));
                (new_name, body)
            })
            .collect();
        *defs = renamed;
    }
    namespaced
}

/// Prefix every internal definition reference under `value` in place.
///
/// Produces the same names as [`prefix_definitions`] for the same prefix.
pub fn prefix_refs(value: &mut Value, prefix: &str) {
    rename_refs(value, |reference| match SchemaRef::parse(reference) {
        SchemaRef::Internal { name, rest } => {
            Some(definition_ref(&format!("{prefix}_{name}"), &rest))
        }
        _ => None,
    });
}
