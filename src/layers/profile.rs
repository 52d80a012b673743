//! Profiles
//!
//! A profile is one persisted document of a context: a display name, the
//! file it lives in, and two layer collections (main and overlay).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::collection::{LayerChange, LayerCollection};
use super::registry::ProfileDefaults;

/// Identity of a profile within its context: the file stem of its document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the document at `path`
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The two layer regions of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Main,
    Overlay,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Main => f.write_str("main"),
            Region::Overlay => f.write_str("overlay"),
        }
    }
}

/// Changes drained from a profile in one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    /// The profile's own fields (name, extra fields) changed
    pub fields: bool,
    pub layers: Vec<(Region, LayerChange)>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        !self.fields && self.layers.is_empty()
    }
}

/// A named profile document
#[derive(Debug, Clone)]
pub struct Profile {
    id: ProfileId,
    name: String,
    filepath: PathBuf,
    kind: String,
    main_layers: LayerCollection,
    overlay_layers: LayerCollection,
    /// Top-level document fields this version does not interpret
    extra: Map<String, Value>,
    fields_changed: bool,
}

impl Profile {
    /// Create a profile of `kind` from its default contents
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        filepath: impl Into<PathBuf>,
        defaults: ProfileDefaults,
    ) -> Self {
        let filepath = filepath.into();
        Self {
            id: ProfileId::from_path(&filepath),
            name: name.into(),
            filepath,
            kind: kind.into(),
            main_layers: LayerCollection::from_entries(defaults.main),
            overlay_layers: LayerCollection::from_entries(defaults.overlay),
            extra: Map::new(),
            fields_changed: false,
        }
    }

    /// Reassemble a decoded profile
    pub(crate) fn from_parts(
        kind: String,
        name: String,
        filepath: PathBuf,
        main_layers: LayerCollection,
        overlay_layers: LayerCollection,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            id: ProfileId::from_path(&filepath),
            name,
            filepath,
            kind,
            main_layers,
            overlay_layers,
            extra,
            fields_changed: false,
        }
    }

    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the display name; the file identity stays the same
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.name {
            self.name = name;
            self.fields_changed = true;
        }
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// Give the profile a new file, and with it a new identity
    pub(crate) fn relocate(&mut self, filepath: PathBuf) {
        self.id = ProfileId::from_path(&filepath);
        self.filepath = filepath;
    }

    /// Profile kind tag written at the document root
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn layers(&self, region: Region) -> &LayerCollection {
        match region {
            Region::Main => &self.main_layers,
            Region::Overlay => &self.overlay_layers,
        }
    }

    pub fn layers_mut(&mut self, region: Region) -> &mut LayerCollection {
        match region {
            Region::Main => &mut self.main_layers,
            Region::Overlay => &mut self.overlay_layers,
        }
    }

    pub fn main_layers(&self) -> &LayerCollection {
        &self.main_layers
    }

    pub fn overlay_layers(&self) -> &LayerCollection {
        &self.overlay_layers
    }

    pub fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Set an uninterpreted top-level field, kept across saves
    pub fn set_extra_field(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
        self.fields_changed = true;
    }

    /// Replace both regions with default contents, keeping name and file
    pub fn reset_to(&mut self, defaults: ProfileDefaults) {
        self.main_layers.replace_all(defaults.main);
        self.overlay_layers.replace_all(defaults.overlay);
    }

    /// Total layers across both regions
    pub fn layer_count(&self) -> usize {
        self.main_layers.len() + self.overlay_layers.len()
    }

    pub fn has_changes(&self) -> bool {
        self.fields_changed || self.main_layers.has_changes() || self.overlay_layers.has_changes()
    }

    /// Drain every change recorded since the last call
    pub fn take_changes(&mut self) -> ProfileChanges {
        let mut layers: Vec<(Region, LayerChange)> = self
            .main_layers
            .take_changes()
            .into_iter()
            .map(|c| (Region::Main, c))
            .collect();
        layers.extend(
            self.overlay_layers
                .take_changes()
                .into_iter()
                .map(|c| (Region::Overlay, c)),
        );

        ProfileChanges {
            fields: std::mem::take(&mut self.fields_changed),
            layers,
        }
    }
}
