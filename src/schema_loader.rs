//! Schema file loading and the per-run loaded-schema cache.
//!
//! `load_schema` always goes to disk. Cross-file references go through a
//! [`SchemaCache`] instead so each referenced file is parsed at most once per
//! merge run.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A schema file could not be read or parsed.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("reading schema {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing schema {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaLoadError {
    /// Path of the schema file that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            SchemaLoadError::Read { path, .. } | SchemaLoadError::Parse { path, .. } => path,
        }
    }
}

/// Read `schema_dir/file_name` and parse it as JSON.
pub fn load_schema(schema_dir: &Path, file_name: &str) -> Result<Value, SchemaLoadError> {
    let path = schema_dir.join(file_name);
    let data = fs::read_to_string(&path).map_err(|source| SchemaLoadError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| SchemaLoadError::Parse { path, source })
}

/// Parsed schemas keyed by file name. Entries are never invalidated; a new
/// run starts from a new cache.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: HashMap<String, Value>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schema for `file_name`, loading it on first use.
    pub fn get_or_load(
        &mut self,
        schema_dir: &Path,
        file_name: &str,
    ) -> Result<&Value, SchemaLoadError> {
        if !self.schemas.contains_key(file_name) {
            let schema = load_schema(schema_dir, file_name)?;
            self.schemas.insert(file_name.to_string(), schema);
        }
        Ok(&self.schemas[file_name])
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.schemas.contains_key(file_name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
