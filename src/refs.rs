//! `$ref` classification and the shared reference-rewriting walker.
//!
//! Every pass that touches references (external resolution, definition
//! namespacing, configuration prefixing) goes through [`rewrite_refs`] and
//! only differs in what it does with each reference string.

use serde_json::{Map, Value};
use std::convert::Infallible;

pub const REF_KEY: &str = "$ref";
pub const DEFINITIONS_KEY: &str = "definitions";

const INTERNAL_DEFINITION_PREFIX: &str = "#/definitions/";
const EXTERNAL_MARKER: &str = ".json#";
const DEFINITIONS_POINTER: &str = "/definitions/";
const PROPERTIES_POINTER: &str = "/properties/";

/// A parsed `$ref` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaRef {
    /// `#/definitions/<name>` with an optional pointer tail after the name.
    Internal { name: String, rest: String },
    /// `<file>.json#<pointer>`.
    External { file: String, target: ExternalTarget },
    /// Anything else; never rewritten.
    Opaque,
}

/// Where an external reference points inside its file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExternalTarget {
    Definition(String),
    /// JSON pointer starting with `/properties/`.
    Property(String),
    Unsupported(String),
}

impl SchemaRef {
    pub fn parse(reference: &str) -> SchemaRef {
        if reference.contains(EXTERNAL_MARKER) {
            let (file, pointer) = reference.split_once('#').unwrap_or((reference, ""));
            return SchemaRef::External {
                file: file.to_string(),
                target: ExternalTarget::parse(pointer),
            };
        }
        match reference.strip_prefix(INTERNAL_DEFINITION_PREFIX) {
            Some(tail) if !tail.is_empty() => {
                let (name, rest) = match tail.find('/') {
                    Some(idx) => (&tail[..idx], &tail[idx..]),
                    None => (tail, ""),
                };
                SchemaRef::Internal {
                    name: unescape_segment(name),
                    rest: rest.to_string(),
                }
            }
            _ => SchemaRef::Opaque,
        }
    }
}

impl ExternalTarget {
    fn parse(pointer: &str) -> ExternalTarget {
        if let Some(name) = pointer.strip_prefix(DEFINITIONS_POINTER) {
            if !name.is_empty() && !name.contains('/') {
                return ExternalTarget::Definition(unescape_segment(name));
            }
        }
        if pointer.starts_with(PROPERTIES_POINTER) && pointer.len() > PROPERTIES_POINTER.len() {
            return ExternalTarget::Property(pointer.to_string());
        }
        ExternalTarget::Unsupported(pointer.to_string())
    }
}

/// Build `#/definitions/<name><rest>`, escaping the name as a pointer segment.
pub fn definition_ref(name: &str, rest: &str) -> String {
    format!("{INTERNAL_DEFINITION_PREFIX}{}{rest}", escape_segment(name))
}

/// JSON pointer to a definition entry, for use with [`Value::pointer`].
pub fn definition_pointer(name: &str) -> String {
    format!("{DEFINITIONS_POINTER}{}", escape_segment(name))
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Namespace prefix for a schema file name.
///
/// `backend-proxy-middleware-schema.json` becomes `backend_proxy_middleware`.
pub fn namespace_prefix(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix("-schema.json")
        .or_else(|| file_name.strip_suffix(".json"))
        .unwrap_or(file_name);
    stem.replace(['-', '.'], "_")
}

/// What to do with one `$ref` node.
#[derive(Debug)]
pub enum RefAction {
    Keep,
    Replace(String),
    /// Drop the `$ref` and assign these keys into the node, replacing any
    /// sibling with the same name. The body is already resolved and is not
    /// walked again.
    Inline(Map<String, Value>),
}

/// Visit every object holding a string `$ref`, depth first and pre-order.
///
/// Children are walked after the visitor ran, except keys that came from an
/// inlined body. Walking stops at the first visitor error.
pub fn rewrite_refs<E>(
    value: &mut Value,
    visitor: &mut dyn FnMut(&str) -> Result<RefAction, E>,
) -> Result<(), E> {
    match value {
        Value::Object(map) => {
            let reference = map.get(REF_KEY).and_then(Value::as_str).map(str::to_owned);
            let mut inlined: Vec<String> = Vec::new();
            if let Some(reference) = reference {
                match visitor(&reference)? {
                    RefAction::Keep => {}
                    RefAction::Replace(new_ref) => {
                        map.insert(REF_KEY.to_string(), Value::String(new_ref));
                    }
                    RefAction::Inline(body) => {
                        map.remove(REF_KEY);
                        for (key, child) in body {
                            inlined.push(key.clone());
                            map.insert(key, child);
                        }
                    }
                }
            }
            for (key, child) in map.iter_mut() {
                if key != REF_KEY && !inlined.contains(key) {
                    rewrite_refs(child, visitor)?;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_refs(item, visitor)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Infallible rename pass: `rename` returns the replacement, if any.
pub fn rename_refs(value: &mut Value, mut rename: impl FnMut(&str) -> Option<String>) {
    let result = rewrite_refs::<Infallible>(value, &mut |reference| {
        Ok(match rename(reference) {
            Some(new_ref) => RefAction::Replace(new_ref),
            None => RefAction::Keep,
        })
    });
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Every `$ref` string under `value`, in walk order.
pub fn collect_refs(value: &Value) -> Vec<String> {
    let mut refs = Vec::new();
    collect_into(value, &mut refs);
    refs
}

fn collect_into(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get(REF_KEY).and_then(Value::as_str) {
                refs.push(reference.to_string());
            }
            for (key, child) in map {
                if key != REF_KEY {
                    collect_into(child, refs);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_into(item, refs)),
        _ => {}
    }
}
