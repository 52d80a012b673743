//! Lighting context: the profile set of one integration.
//!
//! Owns every profile of the context folder, the settings record, and the
//! autosave coordinator. Exactly one profile is active once loading has
//! finished, and the set never becomes empty.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::config::ContextConfig;
use super::events::{ContextEvent, EventBus};
use crate::error::{LumenError, Result};
use crate::layers::{
    LayerEntry, LayerId, Profile, ProfileDefaults, ProfileId, Region, TypeRegistry,
};
use crate::state::filename;
use crate::state::{
    AutosaveCoordinator, DecodeReport, ProfileStore, SaveDecision, SavePolicy, SettingsFile,
    SettingsRecord, DEFAULT_PROFILE_ID, SETTINGS_FILENAME,
};

/// A context shared between threads; one lock serializes every operation.
pub type SharedContext = Arc<Mutex<LightingContext>>;

/// What happened while loading the context folder.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Corrupt default documents and where they were moved
    pub quarantined: Vec<(PathBuf, PathBuf)>,
    /// Documents that produced no profile
    pub skipped: Vec<PathBuf>,
    /// Per-profile decode reports, in load order
    pub decoded: Vec<(ProfileId, DecodeReport)>,
    /// A fresh default profile had to be created
    pub synthesized_default: bool,
}

impl LoadReport {
    pub fn inert_layers(&self) -> usize {
        self.decoded.iter().map(|(_, r)| r.inert.len()).sum()
    }

    pub fn dropped_layers(&self) -> usize {
        self.decoded.iter().map(|(_, r)| r.dropped.len()).sum()
    }
}

/// The profiles of one lighting context.
#[derive(Debug)]
pub struct LightingContext {
    config: ContextConfig,
    store: ProfileStore,
    settings: SettingsFile,
    profiles: Vec<Profile>,
    active: Option<ProfileId>,
    autosave: AutosaveCoordinator,
    events: EventBus,
    load_report: LoadReport,
    closed: bool,
}

impl LightingContext {
    /// Load the context folder with immediate saves.
    pub fn load(config: ContextConfig, registry: Arc<TypeRegistry>) -> Result<Self> {
        Self::load_with_policy(config, registry, SavePolicy::Immediate)
    }

    /// Load the context folder.
    ///
    /// # Errors
    /// `InvalidParameter` for an unusable config, `UnknownTag` if the
    /// config's profile kind is not registered. Unreadable documents never
    /// fail the load.
    pub fn load_with_policy(
        config: ContextConfig,
        registry: Arc<TypeRegistry>,
        policy: SavePolicy,
    ) -> Result<Self> {
        config.validate()?;
        if registry.resolve_profile_kind(&config.profile_kind).is_none() {
            return Err(LumenError::UnknownTag {
                tag: config.profile_kind.clone(),
            });
        }

        let folder = config.profile_folder();
        let settings = SettingsFile::load(folder.join(SETTINGS_FILENAME));
        let store = ProfileStore::new(folder, registry, config.catalog());

        let mut context = Self {
            config,
            store,
            settings,
            profiles: Vec::new(),
            active: None,
            autosave: AutosaveCoordinator::new(policy),
            events: EventBus::new(),
            load_report: LoadReport::default(),
            closed: false,
        };
        context.load_profiles()?;
        Ok(context)
    }

    fn load_profiles(&mut self) -> Result<()> {
        let mut report = LoadReport::default();

        for path in self.store.list_documents(SETTINGS_FILENAME) {
            match self.store.load(&path) {
                Ok(Some(decoded)) => {
                    report
                        .decoded
                        .push((decoded.profile.id().clone(), decoded.report));
                    self.profiles.push(decoded.profile);
                }
                Ok(None) => report.skipped.push(path),
                Err(LumenError::Quarantined { path, moved_to }) => {
                    report.quarantined.push((path, moved_to));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping profile");
                    report.skipped.push(path);
                }
            }
        }

        let needs_default = !report.quarantined.is_empty() || self.profiles.is_empty();
        if needs_default && self.profile(&ProfileId::from(DEFAULT_PROFILE_ID)).is_none() {
            let profile = self.create_profile(DEFAULT_PROFILE_ID)?;
            if let Err(err) = self.autosave.save(&self.store, &profile) {
                warn!(profile = %profile.id(), error = %err, "Could not write default profile");
                self.autosave.mark_dirty(profile.id());
            }
            self.profiles.push(profile);
            report.synthesized_default = true;
        }

        let selected = self.settings.record().selected_profile.clone();
        let active = selected
            .as_deref()
            .and_then(|id| self.position(&ProfileId::from(id)))
            .or_else(|| self.position(&ProfileId::from(DEFAULT_PROFILE_ID)))
            .or(if self.profiles.is_empty() { None } else { Some(0) })
            .map(|index| self.profiles[index].id().clone());

        self.autosave.attach(active.clone());
        self.active = active;
        self.persist_selection();

        info!(
            context = %self.config.id,
            profiles = self.profiles.len(),
            active = ?self.active.as_ref().map(ProfileId::as_str),
            skipped = report.skipped.len(),
            quarantined = report.quarantined.len(),
            "Loaded lighting context"
        );
        self.load_report = report;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn folder(&self) -> &Path {
        self.store.folder()
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.store.registry()
    }

    pub fn settings(&self) -> &SettingsRecord {
        self.settings.record()
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profile(&self, id: &ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id() == id)
    }

    pub fn active_id(&self) -> Option<&ProfileId> {
        self.active.as_ref()
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.as_ref().and_then(|id| self.profile(id))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Profiles with edits not yet on disk.
    pub fn pending_saves(&self) -> usize {
        self.autosave.dirty_count()
    }

    /// Profile documents written since load.
    pub fn writes(&self) -> u64 {
        self.autosave.writes()
    }

    pub fn subscribe(&mut self) -> Receiver<ContextEvent> {
        self.events.subscribe()
    }

    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    // ------------------------------------------------------------------
    // Profile set operations
    // ------------------------------------------------------------------

    /// Make `id` the active profile.
    ///
    /// The previous profile is saved first. Switching to the profile that is
    /// already active does nothing.
    ///
    /// # Returns
    /// Whether the active profile changed.
    pub fn switch_to(&mut self, id: &ProfileId) -> Result<bool> {
        self.ensure_open()?;
        if self.active.as_ref() == Some(id) {
            return Ok(false);
        }
        if self.position(id).is_none() {
            return Err(LumenError::ProfileNotFound { id: id.to_string() });
        }

        if let Some(previous) = self.active.take() {
            if let Err(err) = self.save_profile(&previous) {
                warn!(profile = %previous, error = %err, "Could not save profile before switching");
            }
        }

        let detached = self.autosave.attach(Some(id.clone()));
        debug!(from = ?detached.as_ref().map(ProfileId::as_str), to = %id, "Switching profile");
        self.active = Some(id.clone());
        self.persist_selection();

        self.events.emit(ContextEvent::ActiveProfileChanged {
            context: self.config.id.clone(),
            profile: id.clone(),
        });
        Ok(true)
    }

    /// Create a profile named `name` from the context's defaults and switch to it.
    pub fn add(&mut self, name: &str) -> Result<ProfileId> {
        self.ensure_open()?;

        let profile = self.create_profile(name)?;
        let id = profile.id().clone();
        self.profiles.push(profile);
        info!(profile = %id, name = %name, "Added profile");

        self.events
            .emit(ContextEvent::ProfileAdded { profile: id.clone() });
        self.save_all_logged();
        self.switch_to(&id)?;
        Ok(id)
    }

    /// Add a profile named `Profile <n+1>`.
    pub fn new_default_profile(&mut self) -> Result<ProfileId> {
        let name = format!("Profile {}", self.profiles.len() + 1);
        self.add(&name)
    }

    /// Remove a profile and its document.
    ///
    /// Refused when it is the last profile or not part of this context. If it
    /// was active, the profile now at its index (or the new last one) takes
    /// over.
    ///
    /// # Returns
    /// Whether the profile was removed.
    pub fn delete(&mut self, id: &ProfileId) -> Result<bool> {
        self.ensure_open()?;

        if self.profiles.len() <= 1 {
            let refused = LumenError::InvariantViolation {
                reason: "a context keeps at least one profile".to_string(),
            };
            debug!(profile = %id, reason = %refused, "Ignoring delete");
            return Ok(false);
        }
        let Some(index) = self.position(id) else {
            debug!(profile = %id, "Ignoring delete of unknown profile");
            return Ok(false);
        };

        let removed = self.profiles.remove(index);
        self.autosave.forget(id);

        if self.active.as_ref() == Some(id) {
            self.active = None;
            let neighbor = self.profiles[index.min(self.profiles.len() - 1)]
                .id()
                .clone();
            self.switch_to(&neighbor)?;
        }

        if let Err(err) = self.store.delete(removed.filepath()) {
            warn!(profile = %id, error = %err, "Profile removed, document left on disk");
        }
        self.save_all_logged();

        info!(profile = %id, "Deleted profile");
        self.events
            .emit(ContextEvent::ProfileRemoved { profile: id.clone() });
        Ok(true)
    }

    /// Restore a profile's layers to the defaults of its kind.
    pub fn reset(&mut self, id: &ProfileId) -> Result<()> {
        self.ensure_open()?;

        let index = self.require(id)?;
        let defaults = self.defaults_for(self.profiles[index].kind())?;
        self.profiles[index].reset_to(defaults);
        self.commit(index);

        if self.active.as_ref() == Some(id) {
            self.events.emit(ContextEvent::ActiveProfileChanged {
                context: self.config.id.clone(),
                profile: id.clone(),
            });
        }
        Ok(())
    }

    /// Change a profile's display name; its file stays the same.
    pub fn rename(&mut self, id: &ProfileId, name: &str) -> Result<()> {
        let name = name.to_string();
        self.edit_profile(id, |profile| profile.set_name(name))
    }

    /// Edit a profile; everything changed inside `f` is saved as one batch.
    pub fn edit_profile<R>(&mut self, id: &ProfileId, f: impl FnOnce(&mut Profile) -> R) -> Result<R> {
        self.ensure_open()?;

        let index = self.require(id)?;
        let result = f(&mut self.profiles[index]);
        self.commit(index);
        Ok(result)
    }

    /// Construct a layer of type `tag` and put it on top of `region`.
    ///
    /// # Errors
    /// `UnknownTag` if the tag is not registered, `InvalidParameter` if its
    /// handler is not available in this context.
    pub fn add_layer(
        &mut self,
        id: &ProfileId,
        region: Region,
        tag: &str,
        name: Option<&str>,
    ) -> Result<LayerId> {
        self.ensure_open()?;

        let handler = self
            .store
            .registry()
            .create(tag)
            .ok_or_else(|| LumenError::UnknownTag {
                tag: tag.to_string(),
            })?;
        if !self.store.catalog().is_available(handler.handler_id()) {
            return Err(LumenError::InvalidParameter {
                name: "tag".to_string(),
                reason: format!(
                    "handler '{}' is not available in context '{}'",
                    handler.handler_id(),
                    self.config.id
                ),
            });
        }

        let name = name.unwrap_or(handler.display_name()).to_string();
        let entry = LayerEntry::new(name, handler);
        self.edit_profile(id, |profile| profile.layers_mut(region).push_front(entry))
    }

    /// Read an external document into this context under a fresh file name.
    pub fn import_profile(&mut self, path: &Path) -> Result<ProfileId> {
        self.ensure_open()?;

        let mut profile = self.store.read_external(path)?.profile;
        let filename = self.allocate_filename(profile.name());
        profile.relocate(self.store.path_for(&filename));

        let id = profile.id().clone();
        self.autosave.save(&self.store, &profile)?;
        self.profiles.push(profile);

        info!(profile = %id, source = %path.display(), "Imported profile");
        self.events
            .emit(ContextEvent::ProfileAdded { profile: id.clone() });
        Ok(id)
    }

    /// Persist the settings record and every profile.
    ///
    /// Every write is attempted; the first failure is returned.
    pub fn save_all(&mut self) -> Result<()> {
        self.ensure_open()?;

        let mut first_error = self.settings.save().err();
        for profile in &self.profiles {
            if let Err(err) = self.autosave.save(&self.store, profile) {
                warn!(profile = %profile.id(), error = %err, "Could not save profile");
                self.autosave.mark_dirty(profile.id());
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Write every profile with pending edits.
    pub fn flush(&mut self) -> Result<usize> {
        self.ensure_open()?;
        self.autosave.flush(&self.store, &self.profiles)
    }

    /// Flush pending saves and dispose of the context.
    ///
    /// Later operations fail with `ContextClosed`. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let flushed = self.autosave.flush(&self.store, &self.profiles);
        self.autosave.attach(None);
        self.closed = true;
        info!(context = %self.config.id, "Closed lighting context");
        flushed.map(|_| ())
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<bool> {
        self.ensure_open()?;
        self.settings.update(|record| record.enabled = enabled)
    }

    pub fn set_overlay_enabled(&mut self, enabled: bool) -> Result<bool> {
        self.ensure_open()?;
        self.settings.update(|record| record.overlay_enabled = enabled)
    }

    pub fn set_hidden(&mut self, hidden: bool) -> Result<bool> {
        self.ensure_open()?;
        self.settings.update(|record| record.hidden = hidden)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(LumenError::ContextClosed);
        }
        Ok(())
    }

    fn position(&self, id: &ProfileId) -> Option<usize> {
        self.profiles.iter().position(|p| p.id() == id)
    }

    fn require(&self, id: &ProfileId) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| LumenError::ProfileNotFound { id: id.to_string() })
    }

    fn defaults_for(&self, kind: &str) -> Result<ProfileDefaults> {
        let registry = self.store.registry();
        let template = registry
            .resolve_profile_kind(kind)
            .ok_or_else(|| LumenError::UnknownTag {
                tag: kind.to_string(),
            })?;
        Ok(template(registry))
    }

    /// Free file name, checked against the folder and unsaved profiles.
    fn allocate_filename(&self, name: &str) -> String {
        filename::allocate_with(name, |candidate| {
            self.store.path_for(candidate).exists()
                || self
                    .profiles
                    .iter()
                    .any(|p| p.filepath().file_name() == Some(OsStr::new(candidate)))
        })
    }

    fn create_profile(&self, name: &str) -> Result<Profile> {
        let defaults = self.defaults_for(&self.config.profile_kind)?;
        let filename = self.allocate_filename(name);
        Ok(Profile::new(
            self.config.profile_kind.clone(),
            name,
            self.store.path_for(&filename),
            defaults,
        ))
    }

    fn save_profile(&mut self, id: &ProfileId) -> Result<()> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| LumenError::ProfileNotFound { id: id.to_string() })?;
        self.autosave.save(&self.store, profile)
    }

    fn save_all_logged(&mut self) {
        if let Err(err) = self.save_all() {
            warn!(context = %self.config.id, error = %err, "Saving profiles failed");
        }
    }

    /// Drain the changes of one profile, notify, and save per policy.
    fn commit(&mut self, index: usize) {
        let changes = self.profiles[index].take_changes();
        let id = self.profiles[index].id().clone();

        for (region, change) in &changes.layers {
            self.events.emit(ContextEvent::LayerChanged {
                profile: id.clone(),
                region: *region,
                index: change.index,
            });
        }

        if self.autosave.on_changes(&id, &changes) == SaveDecision::Write {
            if let Err(err) = self.autosave.save(&self.store, &self.profiles[index]) {
                warn!(profile = %id, error = %err, "Autosave failed, will retry on flush");
                self.autosave.mark_dirty(&id);
            }
        }
    }

    fn persist_selection(&mut self) {
        let selected = self.active.as_ref().map(|id| id.to_string());
        if let Err(err) = self
            .settings
            .update(|record| record.selected_profile = selected)
        {
            warn!(context = %self.config.id, error = %err, "Could not persist selected profile");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextEvent;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> LightingContext {
        let config = ContextConfig::new("desktop").with_root(dir.path());
        LightingContext::load(config, Arc::new(TypeRegistry::with_builtins())).unwrap()
    }

    #[test]
    fn test_empty_folder_synthesizes_default() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        assert_eq!(ctx.profiles().len(), 1);
        assert_eq!(ctx.active_id().unwrap().as_str(), DEFAULT_PROFILE_ID);
        assert!(ctx.load_report().synthesized_default);
        assert!(ctx.folder().join("default.json").exists());
    }

    #[test]
    fn test_switch_to_active_is_silent() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let events = ctx.subscribe();
        let writes = ctx.writes();

        let active = ctx.active_id().unwrap().clone();
        assert!(!ctx.switch_to(&active).unwrap());
        assert_eq!(ctx.writes(), writes);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_switch_to_unknown_profile() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let result = ctx.switch_to(&ProfileId::from("nope"));
        assert!(matches!(result, Err(LumenError::ProfileNotFound { .. })));
    }

    #[test]
    fn test_edit_batch_writes_once() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let id = ctx.active_id().unwrap().clone();
        let writes = ctx.writes();

        ctx.edit_profile(&id, |profile| {
            let layers = profile.layers_mut(Region::Main);
            layers.clear();
            layers.push(LayerEntry::new(
                "A",
                Box::new(crate::layers::SolidColorLayer::default()),
            ));
        })
        .unwrap();

        assert_eq!(ctx.writes(), writes + 1);
    }

    #[test]
    fn test_rename_of_inactive_profile_is_deferred() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let default = ctx.active_id().unwrap().clone();
        ctx.add("Second").unwrap();
        let writes = ctx.writes();

        ctx.rename(&default, "Renamed").unwrap();
        assert_eq!(ctx.writes(), writes);
        assert_eq!(ctx.pending_saves(), 1);

        assert_eq!(ctx.flush().unwrap(), 1);
        assert_eq!(ctx.pending_saves(), 0);
    }

    #[test]
    fn test_add_layer_checks_catalog() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let id = ctx.active_id().unwrap().clone();

        let result = ctx.add_layer(&id, Region::Main, "keyed_background", None);
        assert!(matches!(result, Err(LumenError::InvalidParameter { .. })));

        let result = ctx.add_layer(&id, Region::Main, "plugin_wave", None);
        assert!(matches!(result, Err(LumenError::UnknownTag { .. })));

        let layer = ctx
            .add_layer(&id, Region::Overlay, "gradient", Some("Rainbow"))
            .unwrap();
        let overlay = ctx.profile(&id).unwrap().overlay_layers();
        assert_eq!(overlay.get(0).unwrap().id(), layer);
        assert_eq!(overlay.get(0).unwrap().name(), "Rainbow");
    }

    #[test]
    fn test_reset_active_emits_change() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let id = ctx.active_id().unwrap().clone();
        ctx.add_layer(&id, Region::Main, "percent", None).unwrap();
        let events = ctx.subscribe();

        ctx.reset(&id).unwrap();

        assert_eq!(ctx.profile(&id).unwrap().main_layers().len(), 1);
        let received: Vec<ContextEvent> = events.try_iter().collect();
        assert!(received
            .iter()
            .any(|e| matches!(e, ContextEvent::ActiveProfileChanged { .. })));
    }

    #[test]
    fn test_closed_context_refuses_operations() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.close().unwrap();

        assert!(ctx.is_closed());
        assert!(matches!(ctx.add("x"), Err(LumenError::ContextClosed)));
        assert!(matches!(
            ctx.set_enabled(false),
            Err(LumenError::ContextClosed)
        ));
        assert!(ctx.close().is_ok());
    }

    #[test]
    fn test_settings_toggles_are_persisted() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);

        assert!(ctx.set_overlay_enabled(false).unwrap());
        assert!(!ctx.set_overlay_enabled(false).unwrap());

        let reloaded = SettingsFile::load(ctx.folder().join(SETTINGS_FILENAME));
        assert!(!reloaded.record().overlay_enabled);
    }

    #[test]
    fn test_unknown_profile_kind_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = ContextConfig::new("desktop")
            .with_root(dir.path())
            .with_profile_kind("nope");
        let result = LightingContext::load(config, Arc::new(TypeRegistry::with_builtins()));
        assert!(matches!(result, Err(LumenError::UnknownTag { .. })));
    }
}
