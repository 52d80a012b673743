//! Context settings record.
//!
//! A small document next to the profiles holding context-level switches and
//! the id of the selected profile. Every change is written immediately.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{LumenError, Result};

/// File name of the settings record inside a context folder.
pub const SETTINGS_FILENAME: &str = "settings.json";

/// Persisted context configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsRecord {
    pub enabled: bool,
    pub overlay_enabled: bool,
    pub hidden: bool,
    /// Id of the profile active at the last save
    pub selected_profile: Option<String>,

    /// Fields written by other versions, kept as-is.
    #[serde(flatten)]
    pub unknown_fields: Map<String, Value>,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            enabled: true,
            overlay_enabled: true,
            hidden: false,
            selected_profile: None,
            unknown_fields: Map::new(),
        }
    }
}

/// A settings record bound to its file.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
    record: SettingsRecord,
}

impl SettingsFile {
    /// Load the record at `path`.
    ///
    /// A missing or unreadable file yields the defaults and is rewritten
    /// right away.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let (record, rewrite) = match read_record(&path) {
            Ok(Some(record)) => (record, false),
            Ok(None) => {
                debug!(path = %path.display(), "No settings record, using defaults");
                (SettingsRecord::default(), true)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Settings record unreadable, using defaults");
                (SettingsRecord::default(), true)
            }
        };

        let settings = Self { path, record };
        if rewrite {
            if let Err(err) = settings.save() {
                warn!(path = %settings.path.display(), error = %err, "Could not write settings record");
            }
        }
        settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self) -> &SettingsRecord {
        &self.record
    }

    /// Apply `f` and save if anything changed.
    ///
    /// # Returns
    /// Whether the record changed.
    pub fn update(&mut self, f: impl FnOnce(&mut SettingsRecord)) -> Result<bool> {
        let before = self.record.clone();
        f(&mut self.record);
        if self.record == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Write the record to its file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| LumenError::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.path, content).map_err(|e| LumenError::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<Option<SettingsRecord>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| LumenError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    if content.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_str(content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);

        let settings = SettingsFile::load(&path);
        assert_eq!(settings.record(), &SettingsRecord::default());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "[[[").unwrap();

        let settings = SettingsFile::load(&path);
        assert!(settings.record().enabled);

        let written: SettingsRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, SettingsRecord::default());
    }

    #[test]
    fn test_bom_prefixed_file_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        let content = format!(
            "\u{feff}{}",
            json!({ "enabled": false, "selected_profile": "racing" })
        );
        fs::write(&path, content).unwrap();

        let settings = SettingsFile::load(&path);
        assert!(!settings.record().enabled);
        assert_eq!(settings.record().selected_profile.as_deref(), Some("racing"));
    }

    #[test]
    fn test_update_saves_only_on_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        let mut settings = SettingsFile::load(&path);

        assert!(!settings.update(|r| r.enabled = true).unwrap());
        assert!(settings
            .update(|r| r.selected_profile = Some("racing".to_string()))
            .unwrap());

        let reloaded = SettingsFile::load(&path);
        assert_eq!(reloaded.record().selected_profile.as_deref(), Some("racing"));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, json!({ "enabled": false, "theme": "dark" }).to_string()).unwrap();

        let mut settings = SettingsFile::load(&path);
        assert!(!settings.record().enabled);
        settings.update(|r| r.hidden = true).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], json!("dark"));
        assert_eq!(raw["hidden"], json!(true));
    }
}
