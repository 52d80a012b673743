//! Autosave coordinator for profile documents.
//!
//! Edits are batched by the context: every batch drains the changes a
//! profile recorded and hands them here. The coordinator decides whether
//! the batch is written now or later and is the only writer of profile
//! documents, so saves for one path are never reordered.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::layers::{Profile, ProfileChanges, ProfileId};
use crate::state::store::ProfileStore;

/// When edit batches reach the disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavePolicy {
    /// One full rewrite per batch that changed something.
    #[default]
    Immediate,
    /// Batches mark the profile dirty; [`AutosaveCoordinator::flush`] writes.
    Deferred,
}

/// Outcome of handing a batch to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    /// Nothing changed.
    Skip,
    /// Write the profile now.
    Write,
    /// The profile is dirty and will be written later.
    Defer,
}

/// Decides and performs profile saves.
#[derive(Debug, Clone, Default)]
pub struct AutosaveCoordinator {
    policy: SavePolicy,
    /// Profile whose own field changes are saved right away.
    attached: Option<ProfileId>,
    dirty: BTreeSet<ProfileId>,
    writes: u64,
}

impl AutosaveCoordinator {
    pub fn new(policy: SavePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    /// Attach to `id`, detaching the previous profile.
    ///
    /// # Returns
    /// The profile that was attached before.
    pub fn attach(&mut self, id: Option<ProfileId>) -> Option<ProfileId> {
        std::mem::replace(&mut self.attached, id)
    }

    pub fn attached(&self) -> Option<&ProfileId> {
        self.attached.as_ref()
    }

    /// Classify a drained batch of changes.
    pub fn on_changes(&mut self, id: &ProfileId, changes: &ProfileChanges) -> SaveDecision {
        if changes.is_empty() {
            return SaveDecision::Skip;
        }

        let field_only = changes.layers.is_empty();
        let is_attached = self.attached.as_ref() == Some(id);

        if self.policy == SavePolicy::Deferred || (field_only && !is_attached) {
            self.dirty.insert(id.clone());
            return SaveDecision::Defer;
        }
        SaveDecision::Write
    }

    /// Write `profile` and clear its dirty mark.
    pub fn save(&mut self, store: &ProfileStore, profile: &Profile) -> Result<()> {
        store.save(profile)?;
        self.dirty.remove(profile.id());
        self.writes += 1;
        Ok(())
    }

    /// Write every dirty profile once.
    ///
    /// A failed write is logged and the profile stays dirty; the first
    /// error is returned after the others were attempted.
    pub fn flush<'a>(
        &mut self,
        store: &ProfileStore,
        profiles: impl IntoIterator<Item = &'a Profile>,
    ) -> Result<usize> {
        let mut written = 0;
        let mut first_error = None;

        for profile in profiles {
            if !self.dirty.contains(profile.id()) {
                continue;
            }
            match self.save(store, profile) {
                Ok(()) => written += 1,
                Err(err) => {
                    warn!(profile = %profile.id(), error = %err, "Deferred save failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        debug!(written, remaining = self.dirty.len(), "Flushed dirty profiles");
        match first_error {
            Some(err) => Err(err),
            None => Ok(written),
        }
    }

    /// Leave `id` for the next flush, e.g. after a failed write.
    pub fn mark_dirty(&mut self, id: &ProfileId) {
        self.dirty.insert(id.clone());
    }

    /// Drop any pending state for a profile that no longer exists.
    pub fn forget(&mut self, id: &ProfileId) {
        self.dirty.remove(id);
        if self.attached.as_ref() == Some(id) {
            self.attached = None;
        }
    }

    pub fn is_dirty(&self, id: &ProfileId) -> bool {
        self.dirty.contains(id)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Documents written since creation.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}
