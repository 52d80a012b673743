//! Layer Collection
//!
//! An ordered list of layers belonging to one region of a profile. Order is
//! the render z-order and must survive a save/load cycle exactly.
//!
//! Handlers never hold a reference back to their collection. Every mutation
//! goes through a method here, which records a [`LayerChange`]; the owner of
//! the profile drains those records with [`LayerCollection::take_changes`]
//! and turns them into saves. A removed entry takes nothing with it that
//! could still fire.

use super::entry::{LayerEntry, LayerId};
use crate::error::{LumenError, Result};

/// What happened to a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerChangeKind {
    Added,
    Removed,
    Moved,
    Updated,
    Cleared,
}

/// A single recorded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerChange {
    pub kind: LayerChangeKind,
    /// Index affected; for `Moved` the destination, for `Cleared` zero
    pub index: usize,
    /// Layer affected; `None` for `Cleared`
    pub layer: Option<LayerId>,
}

impl LayerChange {
    fn new(kind: LayerChangeKind, index: usize, layer: LayerId) -> Self {
        Self {
            kind,
            index,
            layer: Some(layer),
        }
    }
}

/// Ordered, observable sequence of layers
#[derive(Debug, Clone, Default)]
pub struct LayerCollection {
    entries: Vec<LayerEntry>,
    changes: Vec<LayerChange>,
}

impl LayerCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection without recording any change (document load)
    pub fn from_entries(entries: Vec<LayerEntry>) -> Self {
        Self {
            entries,
            changes: Vec::new(),
        }
    }

    /// Add a layer on top of the stack (index 0)
    ///
    /// # Returns
    /// The id of the new layer
    pub fn push_front(&mut self, entry: LayerEntry) -> LayerId {
        self.insert(0, entry)
    }

    /// Add a layer at the bottom of the stack
    pub fn push(&mut self, entry: LayerEntry) -> LayerId {
        let index = self.entries.len();
        self.insert(index, entry)
    }

    /// Insert a layer at `index`, clamped to the valid range
    pub fn insert(&mut self, index: usize, entry: LayerEntry) -> LayerId {
        let index = index.min(self.entries.len());
        let id = entry.id();
        self.entries.insert(index, entry);
        self.changes
            .push(LayerChange::new(LayerChangeKind::Added, index, id));
        id
    }

    /// Remove the layer at `index`
    pub fn remove(&mut self, index: usize) -> Option<LayerEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        self.changes
            .push(LayerChange::new(LayerChangeKind::Removed, index, entry.id()));
        Some(entry)
    }

    /// Mutate the layer at `index`
    ///
    /// The closure's edits are recorded as one `Updated` change.
    pub fn update<R>(&mut self, index: usize, f: impl FnOnce(&mut LayerEntry) -> R) -> Option<R> {
        let entry = self.entries.get_mut(index)?;
        let id = entry.id();
        let result = f(entry);
        self.changes
            .push(LayerChange::new(LayerChangeKind::Updated, index, id));
        Some(result)
    }

    /// Mutate a layer by its id
    pub fn update_by_id<R>(
        &mut self,
        id: LayerId,
        f: impl FnOnce(&mut LayerEntry) -> R,
    ) -> Option<R> {
        let index = self.index_of(id)?;
        self.update(index, f)
    }

    /// Move a layer to a new position
    ///
    /// # Errors
    /// Returns error if the layer is not found
    pub fn move_layer(&mut self, id: LayerId, new_index: usize) -> Result<()> {
        let current_index = self
            .index_of(id)
            .ok_or_else(|| LumenError::InvalidParameter {
                name: "layer".to_string(),
                reason: format!("layer {} not found in collection", id),
            })?;

        let target_index = new_index.min(self.entries.len() - 1);
        if current_index == target_index {
            return Ok(());
        }

        let entry = self.entries.remove(current_index);
        self.entries.insert(target_index, entry);
        self.changes
            .push(LayerChange::new(LayerChangeKind::Moved, target_index, id));

        Ok(())
    }

    /// Copy a layer and insert the copy directly below the original
    ///
    /// # Returns
    /// The id of the copy, or None if the original wasn't found
    pub fn duplicate(&mut self, id: LayerId) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let copy = self.entries[index].duplicate();
        Some(self.insert(index + 1, copy))
    }

    /// Remove every layer
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.changes.push(LayerChange {
            kind: LayerChangeKind::Cleared,
            index: 0,
            layer: None,
        });
    }

    /// Replace the whole contents, recorded as one clear plus one add per layer
    pub fn replace_all(&mut self, entries: Vec<LayerEntry>) {
        self.clear();
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn get(&self, index: usize) -> Option<&LayerEntry> {
        self.entries.get(index)
    }

    pub fn get_by_id(&self, id: LayerId) -> Option<&LayerEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Get the index of a layer by id
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Get the number of layers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all layers in z-order
    pub fn iter(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter()
    }

    /// Iterate over the layers that take part in rendering
    pub fn iter_active(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter().filter(|e| e.is_active())
    }

    /// Number of layers without a handler
    pub fn inert_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_inert()).count()
    }

    /// True when changes were recorded since the last drain
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drain the recorded changes, oldest first
    pub fn take_changes(&mut self) -> Vec<LayerChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Color, SolidColorLayer};
    use serde_json::json;

    fn solid(name: &str) -> LayerEntry {
        LayerEntry::new(name, Box::new(SolidColorLayer::default()))
    }

    fn names(collection: &LayerCollection) -> Vec<&str> {
        collection.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_collection_new() {
        let collection = LayerCollection::new();
        assert!(collection.is_empty());
        assert!(!collection.has_changes());
    }

    #[test]
    fn test_from_entries_records_nothing() {
        let collection = LayerCollection::from_entries(vec![solid("a"), solid("b")]);
        assert_eq!(collection.len(), 2);
        assert!(!collection.has_changes());
    }

    #[test]
    fn test_push_front_and_push() {
        let mut collection = LayerCollection::new();
        collection.push(solid("middle"));
        collection.push_front(solid("top"));
        collection.push(solid("bottom"));

        assert_eq!(names(&collection), vec!["top", "middle", "bottom"]);
        assert_eq!(collection.take_changes().len(), 3);
        assert!(!collection.has_changes());
    }

    #[test]
    fn test_remove_records_index() {
        let mut collection = LayerCollection::from_entries(vec![solid("a"), solid("b")]);
        let removed = collection.remove(1).unwrap();

        assert_eq!(removed.name(), "b");
        let changes = collection.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, LayerChangeKind::Removed);
        assert_eq!(changes[0].index, 1);
        assert_eq!(changes[0].layer, Some(removed.id()));
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut collection = LayerCollection::from_entries(vec![solid("a")]);
        assert!(collection.remove(5).is_none());
        assert!(!collection.has_changes());
    }

    #[test]
    fn test_update_records_change() {
        let mut collection = LayerCollection::from_entries(vec![solid("a")]);
        let id = collection.get(0).unwrap().id();

        collection.update_by_id(id, |entry| {
            entry.set_name("renamed");
            entry
                .handler_mut()
                .unwrap()
                .set_param("primary_color", &json!(Color::WHITE.to_string()))
                .unwrap();
        });

        assert_eq!(collection.get(0).unwrap().name(), "renamed");
        let changes = collection.take_changes();
        assert_eq!(changes[0].kind, LayerChangeKind::Updated);
    }

    #[test]
    fn test_move_layer() {
        let mut collection =
            LayerCollection::from_entries(vec![solid("a"), solid("b"), solid("c")]);
        let c = collection.get(2).unwrap().id();

        collection.move_layer(c, 0).unwrap();
        assert_eq!(names(&collection), vec!["c", "a", "b"]);

        collection.move_layer(c, 99).unwrap();
        assert_eq!(names(&collection), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_layer_not_found() {
        let mut collection = LayerCollection::from_entries(vec![solid("a")]);
        assert!(collection.move_layer(LayerId::new(), 0).is_err());
    }

    #[test]
    fn test_duplicate_inserts_below() {
        let mut collection = LayerCollection::from_entries(vec![solid("a"), solid("b")]);
        let a = collection.get(0).unwrap().id();

        let copy = collection.duplicate(a).unwrap();
        assert_eq!(names(&collection), vec!["a", "a", "b"]);
        assert_eq!(collection.index_of(copy), Some(1));
    }

    #[test]
    fn test_clear_empty_is_silent() {
        let mut collection = LayerCollection::new();
        collection.clear();
        assert!(!collection.has_changes());
    }

    #[test]
    fn test_iter_active_skips_inert_and_disabled() {
        let mut disabled = solid("off");
        disabled.set_enabled(false);
        let inert = LayerEntry::unresolved("gone", "gone", true, json!({}));

        let collection = LayerCollection::from_entries(vec![solid("on"), disabled, inert]);
        let active: Vec<_> = collection.iter_active().map(|e| e.name()).collect();

        assert_eq!(active, vec!["on"]);
        assert_eq!(collection.inert_count(), 1);
    }
}
