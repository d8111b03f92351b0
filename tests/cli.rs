// Smoke tests for the ui5-schema-merge and ui5-schema-check binaries.
mod support;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use ui5_schema_merge::OUTPUT_FILE_NAME;

use support::SchemaWorkspace;

const MERGE_BIN: &str = env!("CARGO_BIN_EXE_ui5-schema-merge");
const CHECK_BIN: &str = env!("CARGO_BIN_EXE_ui5-schema-check");

fn run(cmd: &mut Command) -> Result<Output> {
    cmd.output().with_context(|| format!("running {cmd:?}"))
}

#[test]
fn merge_binary_writes_schema_for_base_dir() -> Result<()> {
    let workspace = SchemaWorkspace::with_fixtures()?;
    let output = run(Command::new(MERGE_BIN).arg(workspace.base_dir()))?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Merged schema written to"), "stdout: {stdout}");

    let merged: Value = serde_json::from_str(&fs::read_to_string(
        workspace.schema_dir().join(OUTPUT_FILE_NAME),
    )?)?;
    assert!(merged.get("allOf").is_some());
    Ok(())
}

#[test]
fn merge_binary_honours_mappings_and_output() -> Result<()> {
    let workspace = SchemaWorkspace::with_fixtures()?;
    let mappings = workspace.base_dir().join("mappings.json");
    fs::write(
        &mappings,
        serde_json::to_string(&json!([
            { "middlewareName": "reload-middleware", "schemaFileName": "reload-middleware-schema.json" }
        ]))?,
    )?;

    let output = run(Command::new(MERGE_BIN)
        .arg("--schema-dir")
        .arg(workspace.schema_dir())
        .arg("--mappings")
        .arg(&mappings)
        .arg("--output")
        .arg("reload-only.json")
        .arg("--quiet"))?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let merged: Value = serde_json::from_str(&fs::read_to_string(
        workspace.schema_dir().join("reload-only.json"),
    )?)?;
    let conditions = support::conditions(&merged);
    assert_eq!(conditions.len(), 1);
    assert!(!workspace.schema_dir().join(OUTPUT_FILE_NAME).exists());
    Ok(())
}

#[test]
fn merge_binary_fails_on_missing_schema_dir() -> Result<()> {
    let workspace = SchemaWorkspace::empty()?;
    let output = run(Command::new(MERGE_BIN).arg(workspace.base_dir()))?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("preview-middleware-schema.json"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn check_binary_validates_stdin_configuration() -> Result<()> {
    let workspace = SchemaWorkspace::with_fixtures()?;
    let merged = ui5_schema_merge::merge_schemas(&workspace.schema_dir(), false)?;

    let check = |config: &Value| -> Result<Output> {
        let mut child = Command::new(CHECK_BIN)
            .arg("--middleware")
            .arg("serve-static-middleware")
            .arg("--schema")
            .arg(&merged)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawning ui5-schema-check")?;
        child
            .stdin
            .take()
            .context("stdin handle")?
            .write_all(config.to_string().as_bytes())?;
        Ok(child.wait_with_output()?)
    };

    let ok = check(&json!({ "paths": [{ "path": "/resources", "src": "./lib" }] }))?;
    assert!(ok.status.success(), "stderr: {}", String::from_utf8_lossy(&ok.stderr));

    let bad = check(&json!({ "paths": "nope" }))?;
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("failed schema validation"));
    Ok(())
}
