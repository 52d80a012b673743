//! Profile document codec.
//!
//! A profile document is a JSON object tagged with its profile kind. Every
//! layer inside carries its own `$type` tag, so documents are
//! self-describing. Decoding distinguishes three outcomes per layer:
//! resolved, kept inert (tag unknown or properties unreadable), or dropped
//! (the handler exists but is not available in this context).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{DecodeErrorKind, LumenError, Result};
use crate::layers::{
    HandlerCatalog, LayerCollection, LayerEntry, Profile, ProfileId, Region, TypeRegistry,
};
use crate::state::migration::{self, CURRENT_SCHEMA_VERSION};

/// Key holding the type tag of a profile or layer
pub const TYPE_KEY: &str = "$type";

/// Top-level keys owned by the codec; never taken from extra fields.
const RESERVED_KEYS: &[&str] = &[TYPE_KEY, "schema_version", "name", "layers", "overlay_layers"];

/// Layer keys owned by the codec.
const RESERVED_LAYER_KEYS: &[&str] = &[TYPE_KEY, "name", "enabled", "properties"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Drop a leading UTF-8 byte order mark, as written by some editors.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// On-disk shape of a profile
#[derive(Debug, Serialize, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "$type")]
    kind: String,
    schema_version: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    layers: Vec<Value>,
    #[serde(default)]
    overlay_layers: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Shared fields of a layer document
#[derive(Debug, Deserialize)]
struct LayerDocument {
    #[serde(rename = "$type")]
    tag: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    properties: Value,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

/// A layer that could not be fully restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerIssue {
    pub region: Region,
    /// Position in the document's layer list
    pub index: usize,
    pub tag: String,
    pub reason: String,
}

/// What decoding had to do to produce a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Schema version the document was migrated from, if any
    pub migrated_from: Option<String>,
    /// Layers kept without a handler
    pub inert: Vec<LayerIssue>,
    /// Layers removed because their handler is unavailable
    pub dropped: Vec<LayerIssue>,
}

impl DecodeReport {
    /// True when the document decoded without any partial error
    pub fn is_clean(&self) -> bool {
        self.inert.is_empty() && self.dropped.is_empty()
    }
}

/// A decoded profile and its report
#[derive(Debug, Clone)]
pub struct DecodedProfile {
    pub profile: Profile,
    pub report: DecodeReport,
}

enum LayerOutcome {
    Resolved(LayerEntry),
    Inert(LayerEntry, String),
    Dropped(String, String),
}

/// Decode a profile document read from `path`.
///
/// # Errors
/// A fatal `Decode` error when the document is not valid JSON, comes from an
/// incompatible schema, or names a profile kind the registry does not know.
/// Failures confined to one layer are recovered and listed in the report.
pub fn decode(
    bytes: &[u8],
    path: &Path,
    registry: &TypeRegistry,
    catalog: &HandlerCatalog,
) -> Result<DecodedProfile> {
    let fatal = |reason: String| LumenError::Decode {
        path: path.to_path_buf(),
        kind: DecodeErrorKind::Fatal,
        reason,
    };

    let value: Value =
        serde_json::from_slice(strip_bom(bytes)).map_err(|e| fatal(e.to_string()))?;
    if !value.is_object() {
        return Err(fatal("document root is not an object".to_string()));
    }

    let original_version = migration::document_version(&value).to_string();
    let value = migration::migrate_document(value).map_err(|e| fatal(e.to_string()))?;

    let document: ProfileDocument =
        serde_json::from_value(value).map_err(|e| fatal(e.to_string()))?;
    if registry.resolve_profile_kind(&document.kind).is_none() {
        return Err(fatal(format!("unknown profile kind '{}'", document.kind)));
    }

    let mut report = DecodeReport {
        migrated_from: (original_version != CURRENT_SCHEMA_VERSION).then_some(original_version),
        ..DecodeReport::default()
    };

    let main = decode_layers(document.layers, Region::Main, path, registry, catalog, &mut report);
    let overlay = decode_layers(
        document.overlay_layers,
        Region::Overlay,
        path,
        registry,
        catalog,
        &mut report,
    );

    let name = if document.name.trim().is_empty() {
        ProfileId::from_path(path).to_string()
    } else {
        document.name
    };

    debug!(
        path = %path.display(),
        layers = main.len() + overlay.len(),
        inert = report.inert.len(),
        dropped = report.dropped.len(),
        "Decoded profile"
    );

    Ok(DecodedProfile {
        profile: Profile::from_parts(
            document.kind,
            name,
            path.to_path_buf(),
            main,
            overlay,
            document.extra,
        ),
        report,
    })
}

fn decode_layers(
    raws: Vec<Value>,
    region: Region,
    path: &Path,
    registry: &TypeRegistry,
    catalog: &HandlerCatalog,
    report: &mut DecodeReport,
) -> LayerCollection {
    let mut entries = Vec::with_capacity(raws.len());

    for (index, raw) in raws.into_iter().enumerate() {
        match decode_layer(raw, registry, catalog) {
            LayerOutcome::Resolved(entry) => entries.push(entry),
            LayerOutcome::Inert(entry, reason) => {
                let err = LumenError::Decode {
                    path: path.to_path_buf(),
                    kind: DecodeErrorKind::Partial,
                    reason: reason.clone(),
                };
                warn!(region = %region, index, tag = %entry.variant_tag(), error = %err, "Keeping layer without handler");
                report.inert.push(LayerIssue {
                    region,
                    index,
                    tag: entry.variant_tag().to_string(),
                    reason,
                });
                entries.push(entry);
            }
            LayerOutcome::Dropped(tag, reason) => {
                warn!(path = %path.display(), region = %region, index, tag = %tag, reason = %reason, "Dropping layer");
                report.dropped.push(LayerIssue {
                    region,
                    index,
                    tag,
                    reason,
                });
            }
        }
    }

    LayerCollection::from_entries(entries)
}

fn decode_layer(raw: Value, registry: &TypeRegistry, catalog: &HandlerCatalog) -> LayerOutcome {
    let header = match LayerDocument::deserialize(&raw) {
        Ok(header) => header,
        Err(e) => {
            let tag = raw
                .get(TYPE_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return inert(raw, tag, format!("malformed layer: {}", e));
        }
    };

    let Some(mut handler) = registry.create(&header.tag) else {
        let reason = format!("unknown layer type '{}'", header.tag);
        return inert(raw, header.tag, reason);
    };

    if !catalog.is_available(handler.handler_id()) {
        let reason = format!("handler '{}' is not available", handler.handler_id());
        return LayerOutcome::Dropped(header.tag, reason);
    }

    let properties = if header.properties.is_null() {
        Value::Object(Map::new())
    } else {
        header.properties
    };
    if let Err(e) = handler.from_json(&properties) {
        let reason = format!("invalid properties: {}", e);
        return inert(raw, header.tag, reason);
    }

    let mut entry = LayerEntry::new(header.name, handler).with_extra_fields(header.extra);
    entry.set_enabled(header.enabled);
    LayerOutcome::Resolved(entry)
}

fn inert(raw: Value, tag: String, reason: String) -> LayerOutcome {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let enabled = raw.get("enabled").and_then(Value::as_bool).unwrap_or(true);
    LayerOutcome::Inert(LayerEntry::unresolved(tag, name, enabled, raw), reason)
}

/// Encode a profile as a pretty-printed document at the current schema.
pub fn encode(profile: &Profile) -> Result<Vec<u8>> {
    let extra = profile
        .extra_fields()
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let document = ProfileDocument {
        kind: profile.kind().to_string(),
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
        name: profile.name().to_string(),
        layers: encode_layers(profile.main_layers())?,
        overlay_layers: encode_layers(profile.overlay_layers())?,
        extra,
    };

    Ok(serde_json::to_vec_pretty(&document)?)
}

fn encode_layers(collection: &LayerCollection) -> Result<Vec<Value>> {
    collection.iter().map(encode_layer).collect()
}

fn encode_layer(entry: &LayerEntry) -> Result<Value> {
    match (entry.handler(), entry.raw()) {
        (Some(handler), _) => {
            let mut layer: Map<String, Value> = entry
                .extra_fields()
                .iter()
                .filter(|(key, _)| !RESERVED_LAYER_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            layer.insert(TYPE_KEY.to_string(), json!(handler.type_tag()));
            layer.insert("name".to_string(), json!(entry.name()));
            layer.insert("enabled".to_string(), json!(entry.is_enabled()));
            layer.insert("properties".to_string(), handler.to_json()?);
            Ok(Value::Object(layer))
        }
        (None, Some(raw)) => Ok(raw.clone()),
        (None, None) => Err(LumenError::InvariantViolation {
            reason: format!("layer {} has neither handler nor document", entry.id()),
        }),
    }
}
