//! Document Tests
//!
//! Decoding and re-encoding profile documents through a context folder,
//! including documents with layers this build cannot restore.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

use lumen::context::{ContextConfig, LightingContext};
use lumen::layers::{HandlerCatalog, ProfileId, Region, TypeRegistry};
use lumen::state::{decode, encode, CURRENT_SCHEMA_VERSION};

fn solid(name: &str, color: &str) -> Value {
    json!({
        "$type": "solid_color",
        "name": name,
        "enabled": true,
        "properties": {
            "primary_color": color,
            "sequence": {
                "kind": "free_form",
                "keys": [],
                "freeform": { "x": 4.0, "y": 2.0, "width": 16.0, "height": 8.0, "angle": 45.0 }
            }
        }
    })
}

fn gradient(name: &str) -> Value {
    json!({
        "$type": "gradient",
        "name": name,
        "enabled": false,
        "properties": {
            "stops": [
                { "position": 0.0, "color": "#FF000000" },
                { "position": 1.0, "color": "#FFFFFFFF" }
            ],
            "speed": -0.5,
            "angle": 90.0,
            "sequence": {
                "kind": "sequence",
                "keys": ["F1", "F2", "F3"],
                "freeform": { "x": 0.0, "y": 0.0, "width": 30.0, "height": 30.0, "angle": 0.0 }
            }
        }
    })
}

fn unknown_layer() -> Value {
    json!({
        "$type": "plugin_ripple",
        "name": "Ripple",
        "enabled": true,
        "properties": { "radius": 12, "colors": ["#FF00FF00"] },
        "plugin_version": "2.1"
    })
}

fn document(main: Vec<Value>, overlay: Vec<Value>) -> Value {
    json!({
        "$type": "application",
        "schema_version": CURRENT_SCHEMA_VERSION,
        "name": "Racing",
        "layers": main,
        "overlay_layers": overlay,
        "last_device": "keyboard-01"
    })
}

fn write(root: &Path, stem: &str, value: &Value) -> std::path::PathBuf {
    let folder = ContextConfig::new("game").with_root(root).profile_folder();
    fs::create_dir_all(&folder).unwrap();
    let path = folder.join(format!("{}.json", stem));
    fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

fn read(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn open(root: &Path, config: ContextConfig) -> LightingContext {
    LightingContext::load(
        config.with_root(root),
        Arc::new(TypeRegistry::with_builtins()),
    )
    .unwrap()
}

#[test]
fn test_resolvable_document_round_trips() {
    let original = document(
        vec![solid("Top", "#FFFF8800"), gradient("Bottom")],
        vec![solid("Flash", "#80FFFFFF")],
    );
    let path = Path::new("/profiles/racing.json");
    let registry = TypeRegistry::with_builtins();

    let decoded = decode(
        original.to_string().as_bytes(),
        path,
        &registry,
        &HandlerCatalog::default(),
    )
    .unwrap();
    let reencoded: Value = serde_json::from_slice(&encode(&decoded.profile).unwrap()).unwrap();

    assert_eq!(reencoded, original);
}

#[test]
fn test_unresolvable_layer_survives_save() {
    let root = TempDir::new().unwrap();
    let original = document(
        vec![solid("One", "#FFFF0000"), unknown_layer(), gradient("Three")],
        Vec::new(),
    );
    let path = write(root.path(), "default", &original);

    let mut ctx = open(root.path(), ContextConfig::new("game"));
    let id = ProfileId::from("default");
    {
        let layers = ctx.profile(&id).unwrap().main_layers();
        assert_eq!(layers.len(), 3);
        let inert: Vec<bool> = layers.iter().map(|e| e.is_inert()).collect();
        assert_eq!(inert, vec![false, true, false]);
    }
    assert_eq!(ctx.load_report().inert_layers(), 1);

    ctx.save_all().unwrap();
    assert_eq!(read(&path), original);
}

#[test]
fn test_edit_keeps_inert_layer_in_place() {
    let root = TempDir::new().unwrap();
    let path = write(
        root.path(),
        "default",
        &document(vec![unknown_layer(), solid("Base", "#FF0000FF")], Vec::new()),
    );

    let mut ctx = open(root.path(), ContextConfig::new("game"));
    let id = ProfileId::from("default");
    ctx.add_layer(&id, Region::Main, "solid_color", Some("New"))
        .unwrap();

    let saved = read(&path);
    let names: Vec<&str> = saved["layers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["New", "Ripple", "Base"]);
    assert_eq!(saved["layers"][1], unknown_layer());
}

#[test]
fn test_unavailable_handler_is_dropped_from_context() {
    let root = TempDir::new().unwrap();
    let keyed = json!({ "$type": "keyed_background", "name": "Team", "properties": {} });
    write(
        root.path(),
        "default",
        &document(vec![keyed.clone(), solid("Base", "#FF0000FF")], Vec::new()),
    );

    let plain = open(root.path(), ContextConfig::new("game"));
    let id = ProfileId::from("default");
    assert_eq!(plain.profile(&id).unwrap().main_layers().len(), 1);
    assert_eq!(plain.load_report().dropped_layers(), 1);
    drop(plain);

    write(
        root.path(),
        "default",
        &document(vec![keyed, solid("Base", "#FF0000FF")], Vec::new()),
    );
    let extended = open(
        root.path(),
        ContextConfig::new("game").with_extra_layer("KeyedBackground"),
    );
    let layers = extended.profile(&id).unwrap().main_layers();
    assert_eq!(layers.len(), 2);
    assert!(!layers.get(0).unwrap().is_inert());
}

#[test]
fn test_legacy_document_is_upgraded_on_save() {
    let root = TempDir::new().unwrap();
    let legacy = json!({
        "$type": "application",
        "name": "Old",
        "layers": [solid("Base", "#FF0000FF")]
    });
    let path = write(root.path(), "old", &legacy);

    let mut ctx = open(root.path(), ContextConfig::new("game"));
    assert_eq!(
        ctx.load_report().decoded[0].1.migrated_from.as_deref(),
        Some("1.0.0")
    );
    ctx.save_all().unwrap();

    let saved = read(&path);
    assert_eq!(saved["schema_version"], json!(CURRENT_SCHEMA_VERSION));
    assert_eq!(saved["overlay_layers"], json!([]));
    assert_eq!(saved["layers"], legacy["layers"]);
}

#[test]
fn test_unknown_fields_are_preserved() {
    let root = TempDir::new().unwrap();
    let path = write(root.path(), "default", &document(Vec::new(), Vec::new()));

    let mut ctx = open(root.path(), ContextConfig::new("game"));
    ctx.rename(&ProfileId::from("default"), "Renamed").unwrap();

    let saved = read(&path);
    assert_eq!(saved["name"], json!("Renamed"));
    assert_eq!(saved["last_device"], json!("keyboard-01"));
}

#[test]
fn test_layer_level_fields_survive_autosave() {
    let root = TempDir::new().unwrap();
    let mut top = solid("Top", "#FFFF8800");
    top["opacity"] = json!(0.5);
    top["sequence_hint"] = json!({ "device": "keyboard-01", "zone": 3 });
    let mut bottom = gradient("Bottom");
    bottom["properties"]["speed"] = json!(0.1);
    bottom["properties"]["angle"] = json!(12.3);
    let path = write(root.path(), "default", &document(vec![top, bottom], Vec::new()));

    let mut ctx = open(root.path(), ContextConfig::new("game"));
    let id = ProfileId::from("default");
    ctx.add_layer(&id, Region::Overlay, "percent", None).unwrap();

    let saved = read(&path);
    assert_eq!(saved["layers"][0]["opacity"], json!(0.5));
    assert_eq!(saved["layers"][0]["sequence_hint"]["zone"], json!(3));
    assert_eq!(saved["layers"][1]["properties"]["speed"], json!(0.1));
    assert_eq!(saved["layers"][1]["properties"]["angle"], json!(12.3));
}

#[test]
fn test_newer_document_is_skipped_not_rewritten() {
    let root = TempDir::new().unwrap();
    let mut future = document(Vec::new(), Vec::new());
    future["schema_version"] = json!("3.0.0");
    let path = write(root.path(), "future", &future);

    let ctx = open(root.path(), ContextConfig::new("game"));
    assert!(ctx.profile(&ProfileId::from("future")).is_none());
    assert_eq!(read(&path), future);
}
