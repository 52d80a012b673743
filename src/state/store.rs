//! Profile document storage.
//!
//! Reads and writes individual profile documents in a context folder. A
//! document named `default` that fails to decode is moved aside instead of
//! being skipped, so its bytes survive for inspection.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::error::{LumenError, Result};
use crate::layers::{HandlerCatalog, Profile, ProfileId, TypeRegistry};
use crate::state::codec::{self, DecodedProfile};
use crate::state::filename::PROFILE_EXTENSION;

/// Id of the distinguished default profile.
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Suffix appended to quarantined documents.
const QUARANTINE_SUFFIX: &str = "corrupted";

/// Reads and writes profile documents of one context folder.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    folder: PathBuf,
    registry: Arc<TypeRegistry>,
    catalog: HandlerCatalog,
}

impl ProfileStore {
    pub fn new(folder: impl Into<PathBuf>, registry: Arc<TypeRegistry>, catalog: HandlerCatalog) -> Self {
        Self {
            folder: folder.into(),
            registry,
            catalog,
        }
    }

    /// Get the context folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Path of the document for a file name inside the folder.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.folder.join(filename)
    }

    /// Candidate documents in the folder, sorted by file name.
    ///
    /// `excluded` names a file that lives in the folder but is not a profile.
    pub fn list_documents(&self, excluded: &str) -> Vec<PathBuf> {
        if !self.folder.exists() {
            return Vec::new();
        }

        let mut documents: Vec<PathBuf> = WalkDir::new(&self.folder)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_string_lossy() != excluded)
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str()) == Some(PROFILE_EXTENSION)
            })
            .map(|entry| entry.path().to_path_buf())
            .collect();

        documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        documents
    }

    /// Load the document at `path`.
    ///
    /// Returns `Ok(None)` when the file is missing, blank, or fails to decode
    /// and is not the default document.
    ///
    /// # Errors
    /// `Quarantined` when the default document failed to decode and was moved
    /// aside; `FileRead` when the file exists but cannot be read.
    pub fn load(&self, path: &Path) -> Result<Option<DecodedProfile>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LumenError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        if codec::strip_bom(&bytes).iter().all(u8::is_ascii_whitespace) {
            debug!(path = %path.display(), "Skipping blank profile document");
            return Ok(None);
        }

        match codec::decode(&bytes, path, &self.registry, &self.catalog) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(err) => {
                error!(path = %path.display(), error = %err, "Failed to decode profile");
                if ProfileId::from_path(path).as_str() != DEFAULT_PROFILE_ID {
                    return Ok(None);
                }

                let moved_to = self.quarantine(path)?;
                error!(
                    path = %path.display(),
                    moved_to = %moved_to.display(),
                    "Quarantined corrupted default profile"
                );
                Err(LumenError::Quarantined {
                    path: path.to_path_buf(),
                    moved_to,
                })
            }
        }
    }

    /// Read and decode a document from anywhere, without quarantine.
    pub fn read_external(&self, path: &Path) -> Result<DecodedProfile> {
        let bytes = fs::read(path).map_err(|e| LumenError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        codec::decode(&bytes, path, &self.registry, &self.catalog)
    }

    /// Write a profile to its file, creating the folder if needed.
    ///
    /// The write is a direct overwrite.
    pub fn save(&self, profile: &Profile) -> Result<()> {
        let path = profile.filepath();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| LumenError::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let content = codec::encode(profile)?;
        fs::write(path, content).map_err(|e| LumenError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        debug!(profile = %profile.id(), path = %path.display(), "Saved profile");
        Ok(())
    }

    /// Remove a document if present.
    ///
    /// # Returns
    /// Whether a file was removed.
    pub fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not delete profile");
                Err(LumenError::FileDelete {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    /// Move a document to the first free `<path>.corrupted`,
    /// `<path>(1).corrupted`, `<path>(2).corrupted`, ...
    pub fn quarantine(&self, path: &Path) -> Result<PathBuf> {
        let target = quarantine_target(path);
        fs::rename(path, &target).map_err(|e| LumenError::FileWrite {
            path: target.clone(),
            source: e,
        })?;
        Ok(target)
    }
}

fn quarantine_target(path: &Path) -> PathBuf {
    let base = path.as_os_str().to_string_lossy().into_owned();

    let first = PathBuf::from(format!("{}.{}", base, QUARANTINE_SUFFIX));
    if !first.exists() {
        return first;
    }

    (1u32..)
        .map(|n| PathBuf::from(format!("{}({}).{}", base, n, QUARANTINE_SUFFIX)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{ProfileDefaults, APPLICATION_PROFILE};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ProfileStore {
        ProfileStore::new(
            dir.path(),
            Arc::new(TypeRegistry::with_builtins()),
            HandlerCatalog::default(),
        )
    }

    fn profile(store: &ProfileStore, stem: &str) -> Profile {
        Profile::new(
            APPLICATION_PROFILE,
            stem,
            store.path_for(&format!("{}.json", stem)),
            ProfileDefaults::default(),
        )
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let profile = profile(&store, "racing");

        store.save(&profile).unwrap();
        let loaded = store.load(profile.filepath()).unwrap().unwrap();
        assert_eq!(loaded.profile.name(), "racing");
        assert_eq!(loaded.profile.id(), profile.id());
    }

    #[test]
    fn test_save_creates_folder() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(
            dir.path().join("Profiles").join("game"),
            Arc::new(TypeRegistry::with_builtins()),
            HandlerCatalog::default(),
        );
        let profile = profile(&store, "default");

        store.save(&profile).unwrap();
        assert!(profile.filepath().exists());
    }

    #[test]
    fn test_blank_and_missing_load_as_none() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path_for("blank.json"), "  \n\t").unwrap();

        assert!(store.load(&store.path_for("blank.json")).unwrap().is_none());
        assert!(store.load(&store.path_for("missing.json")).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_non_default_is_skipped_in_place() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.path_for("broken.json");
        fs::write(&path, "{ nope").unwrap();

        assert!(store.load(&path).unwrap().is_none());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_default_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.path_for("default.json");
        fs::write(&path, "{ nope").unwrap();
        fs::write(store.path_for("default.json.corrupted"), "older").unwrap();

        match store.load(&path) {
            Err(LumenError::Quarantined { moved_to, .. }) => {
                assert_eq!(moved_to, store.path_for("default.json(1).corrupted"));
                assert_eq!(fs::read_to_string(moved_to).unwrap(), "{ nope");
            }
            other => panic!("expected quarantine, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_default_with_bom_is_loaded_not_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.path_for("default.json");
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(&codec::encode(&profile(&store, "default")).unwrap());
        fs::write(&path, bytes).unwrap();

        let loaded = store.load(&path).unwrap().unwrap();
        assert_eq!(loaded.profile.name(), "default");
        assert!(path.exists());
        assert!(!store.path_for("default.json.corrupted").exists());
    }

    #[test]
    fn test_bom_only_file_is_blank() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.path_for("default.json");
        fs::write(&path, b"\xEF\xBB\xBF\n").unwrap();

        assert!(store.load(&path).unwrap().is_none());
        assert!(path.exists());
    }

    #[test]
    fn test_list_documents_skips_settings_and_others() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for name in ["b.json", "a.json", "settings.json", "notes.txt", "default.json.corrupted"] {
            fs::write(store.path_for(name), "{}").unwrap();
        }

        let names: Vec<String> = store
            .list_documents("settings.json")
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(!store.delete(&store.path_for("gone.json")).unwrap());
    }
}
