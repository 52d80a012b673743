//! Lighting context configuration.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LumenError, Result};
use crate::layers::{HandlerCatalog, APPLICATION_PROFILE};

/// Folder under the root that holds one sub-folder per context.
const PROFILES_DIR: &str = "Profiles";

/// Describes one lighting context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Folder name of the context, supplied by the application matcher
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Profile kind used for new and default profiles
    #[serde(default = "default_profile_kind")]
    pub profile_kind: String,

    /// Handler ids available here on top of the global set
    #[serde(default)]
    pub extra_layers: BTreeSet<String>,

    /// Data root; the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

fn default_profile_kind() -> String {
    APPLICATION_PROFILE.to_string()
}

/// `<platform data dir>/lumen`
pub fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumen")
}

impl ContextConfig {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            profile_kind: default_profile_kind(),
            extra_layers: BTreeSet::new(),
            root: None,
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_extra_layer(mut self, handler_id: impl Into<String>) -> Self {
        self.extra_layers.insert(handler_id.into());
        self
    }

    pub fn with_profile_kind(mut self, kind: impl Into<String>) -> Self {
        self.profile_kind = kind.into();
        self
    }

    /// Read a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LumenError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject ids that cannot be used as a single folder name.
    pub fn validate(&self) -> Result<()> {
        let id = self.id.trim();
        if id.is_empty() || id == "." || id == ".." {
            return Err(LumenError::InvalidParameter {
                name: "id".to_string(),
                reason: format!("'{}' is not a usable context id", self.id),
            });
        }
        if self.id.contains(['/', '\\']) {
            return Err(LumenError::InvalidParameter {
                name: "id".to_string(),
                reason: "context id must not contain path separators".to_string(),
            });
        }
        Ok(())
    }

    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(default_root)
    }

    /// `<root>/Profiles/<id>`
    pub fn profile_folder(&self) -> PathBuf {
        self.root().join(PROFILES_DIR).join(&self.id)
    }

    /// Live handler catalog of this context.
    pub fn catalog(&self) -> HandlerCatalog {
        HandlerCatalog::with_extras(self.extra_layers.iter().cloned())
    }
}
