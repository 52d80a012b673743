//! Schema migration support for profile documents.
//!
//! Documents are upgraded one schema step at a time, so a file written by
//! any older version can be brought to the current layout. Documents from
//! a newer schema are refused.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{LumenError, Result};

/// Current schema version for profile documents.
pub const CURRENT_SCHEMA_VERSION: &str = "1.1.0";

/// Version assumed for documents without a `schema_version` field.
const LEGACY_SCHEMA_VERSION: &str = "1.0.0";

type MigrationFn = fn(Value) -> Result<Value>;

/// Maps (from_version, to_version) to the step between them.
fn migration_registry() -> HashMap<(&'static str, &'static str), MigrationFn> {
    let mut registry: HashMap<(&'static str, &'static str), MigrationFn> = HashMap::new();
    registry.insert(("1.0.0", "1.1.0"), migrate_1_0_0_to_1_1_0);
    registry
}

/// All known schema versions in order.
fn version_order() -> &'static [&'static str] {
    &["1.0.0", "1.1.0"]
}

/// Schema version recorded in a document
pub fn document_version(data: &Value) -> &str {
    data.get("schema_version")
        .and_then(|v| v.as_str())
        .unwrap_or(LEGACY_SCHEMA_VERSION)
}

/// Migrate a profile document to [`CURRENT_SCHEMA_VERSION`].
///
/// # Errors
/// `MigrationError` if the document comes from a newer schema or a step
/// fails; `InvalidSchemaVersion` if the version is not recognized at all.
pub fn migrate_document(mut data: Value) -> Result<Value> {
    let current_version = document_version(&data).to_string();
    let target_version = CURRENT_SCHEMA_VERSION;

    if current_version == target_version {
        return Ok(data);
    }

    if compare_versions(&current_version, target_version) == Some(Ordering::Greater) {
        return Err(LumenError::MigrationError {
            from: current_version,
            to: target_version.to_string(),
            reason: "document was written by a newer schema".to_string(),
        });
    }

    let path = find_migration_path(&current_version, target_version);
    if path.is_empty() {
        return Err(LumenError::InvalidSchemaVersion {
            version: current_version,
        });
    }

    let registry = migration_registry();
    for (from, to) in path {
        let migration_fn = registry
            .get(&(from, to))
            .ok_or_else(|| LumenError::MigrationError {
                from: from.to_string(),
                to: to.to_string(),
                reason: "Migration function not found in registry".to_string(),
            })?;

        data = migration_fn(data).map_err(|e| LumenError::MigrationError {
            from: from.to_string(),
            to: to.to_string(),
            reason: format!("Migration failed: {}", e),
        })?;

        if let Some(obj) = data.as_object_mut() {
            obj.insert("schema_version".to_string(), Value::String(to.to_string()));
        }
        debug!(from = %from, to = %to, "Migrated profile document");
    }

    Ok(data)
}

/// Find the sequence of steps needed to go from one version to another.
///
/// Returns an empty vector if `from == to`, if either version is unknown,
/// or if no forward path exists.
pub fn find_migration_path(from: &str, to: &str) -> Vec<(&'static str, &'static str)> {
    let versions = version_order();
    let registry = migration_registry();

    let (Some(from_idx), Some(to_idx)) = (
        versions.iter().position(|&v| v == from),
        versions.iter().position(|&v| v == to),
    ) else {
        return Vec::new();
    };

    if from_idx >= to_idx {
        return Vec::new();
    }

    let mut path = Vec::new();
    let mut current_idx = from_idx;

    while current_idx < to_idx {
        let current = versions[current_idx];
        let next = ((current_idx + 1)..=to_idx)
            .find(|&next_idx| registry.contains_key(&(current, versions[next_idx])));

        match next {
            Some(next_idx) => {
                path.push((current, versions[next_idx]));
                current_idx = next_idx;
            }
            None => return Vec::new(),
        }
    }

    path
}

/// Compare dotted numeric versions; None if either does not parse.
fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let parse = |v: &str| -> Option<Vec<u64>> { v.split('.').map(|p| p.parse().ok()).collect() };
    Some(parse(a)?.cmp(&parse(b)?))
}

/// 1.0.0 documents had no overlay region.
fn migrate_1_0_0_to_1_1_0(mut data: Value) -> Result<Value> {
    if let Some(obj) = data.as_object_mut() {
        obj.entry("overlay_layers")
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_migrate_current_version_unchanged() {
        let data = json!({
            "schema_version": CURRENT_SCHEMA_VERSION,
            "name": "Racing"
        });

        let result = migrate_document(data.clone()).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_missing_version_is_legacy_and_gains_overlay() {
        let data = json!({ "name": "Racing", "layers": [] });

        let result = migrate_document(data).unwrap();
        assert_eq!(result["schema_version"], json!(CURRENT_SCHEMA_VERSION));
        assert_eq!(result["overlay_layers"], json!([]));
    }

    #[test]
    fn test_existing_overlay_kept() {
        let data = json!({ "schema_version": "1.0.0", "overlay_layers": [{ "$type": "x" }] });
        let result = migrate_document(data).unwrap();
        assert_eq!(result["overlay_layers"], json!([{ "$type": "x" }]));
    }

    #[test]
    fn test_find_migration_path() {
        assert!(find_migration_path("1.1.0", "1.1.0").is_empty());
        assert_eq!(find_migration_path("1.0.0", "1.1.0"), vec![("1.0.0", "1.1.0")]);
        assert!(find_migration_path("0.9.0", "1.1.0").is_empty());
        assert!(find_migration_path("1.1.0", "1.0.0").is_empty());
    }

    #[test]
    fn test_newer_schema_refused() {
        let data = json!({ "schema_version": "9.0.0" });
        let result = migrate_document(data);
        assert!(matches!(result, Err(LumenError::MigrationError { .. })));
    }

    #[test]
    fn test_unknown_schema_version() {
        let data = json!({ "schema_version": "0.5.0" });
        match migrate_document(data) {
            Err(LumenError::InvalidSchemaVersion { version }) => assert_eq!(version, "0.5.0"),
            other => panic!("Expected InvalidSchemaVersion error, got {:?}", other),
        }
    }
}
