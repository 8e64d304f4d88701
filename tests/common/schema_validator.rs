//! JSON schema checks for timeline response bodies
//!
//! Schemas live in `tests/schemas/<name>.json` and are compiled as Draft 7.

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::path::PathBuf;

/// Compile `tests/schemas/<name>.json`
pub fn load_test_schema(name: &str) -> JSONSchema {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/schemas")
        .join(format!("{name}.json"));

    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read schema {}: {e}", path.display()));
    let schema: Value = serde_json::from_str(&raw)
        .unwrap_or_else(|e| panic!("schema {} is not JSON: {e}", path.display()));

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .unwrap_or_else(|e| panic!("schema {} does not compile: {e}", path.display()))
}

/// Collect every violation of `schema` in `data`
pub fn violations(data: &Value, schema: &JSONSchema) -> Vec<String> {
    match schema.validate(data) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect(),
    }
}

/// Panic with every violation when `data` does not match schema `name`
pub fn assert_matches_schema(data: &Value, name: &str) {
    let schema = load_test_schema(name);
    let found = violations(data, &schema);
    assert!(
        found.is_empty(),
        "response does not match {name} schema:\n{}",
        found.join("\n")
    );
}
