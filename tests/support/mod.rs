#![allow(dead_code)]

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/schema")
}

// Copies the fixture schemas into `<tmp>/schema` so tests can write output
// next to them without touching the checked-in files.
pub struct SchemaWorkspace {
    pub root: TempDir,
}

impl SchemaWorkspace {
    pub fn with_fixtures() -> Result<Self> {
        let workspace = Self::empty()?;
        for entry in fs::read_dir(fixtures_dir()).context("listing fixture schemas")? {
            let entry = entry?;
            fs::copy(entry.path(), workspace.schema_dir().join(entry.file_name()))
                .with_context(|| format!("copying {}", entry.path().display()))?;
        }
        Ok(workspace)
    }

    pub fn empty() -> Result<Self> {
        let root = TempDir::new().context("creating temp workspace")?;
        fs::create_dir_all(root.path().join("schema"))?;
        Ok(Self { root })
    }

    pub fn base_dir(&self) -> &Path {
        self.root.path()
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.root.path().join("schema")
    }

    pub fn write_schema(&self, name: &str, value: &Value) -> Result<()> {
        fs::write(self.schema_dir().join(name), serde_json::to_string_pretty(value)?)
            .with_context(|| format!("writing {name}"))
    }
}

pub fn conditions(merged: &Value) -> &Vec<Value> {
    merged
        .pointer("/allOf/1/properties/server/properties/customMiddleware/items/allOf")
        .and_then(Value::as_array)
        .expect("merged schema has middleware conditions")
}

pub fn definitions(merged: &Value) -> &Map<String, Value> {
    merged
        .pointer("/allOf/1/definitions")
        .and_then(Value::as_object)
        .expect("merged schema has definitions")
}

pub fn configuration<'a>(merged: &'a Value, middleware: &str) -> Result<&'a Value> {
    conditions(merged)
        .iter()
        .find(|condition| {
            condition.pointer("/if/properties/name/const").and_then(Value::as_str)
                == Some(middleware)
        })
        .and_then(|condition| condition.pointer("/then/properties/configuration"))
        .ok_or_else(|| anyhow!("no condition for {middleware}"))
}
