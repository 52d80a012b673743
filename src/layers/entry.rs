//! Layer entries
//!
//! One item of a [`LayerCollection`](super::LayerCollection): the variant
//! tag, the resolved handler (if any) and the per-layer settings shared by
//! every variant.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::handler::LayerHandler;

/// Runtime identity of a layer.
///
/// Assigned when the entry is created or decoded and never written to disk,
/// so documents round-trip byte-for-byte regardless of session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One layer of a profile.
///
/// An entry without a handler is inert: it is never rendered, but the
/// document it was read from is kept verbatim in `raw` and written back on
/// every save so nothing is lost while its variant is unavailable.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    id: LayerId,
    variant_tag: String,
    handler: Option<Box<dyn LayerHandler>>,
    name: String,
    enabled: bool,
    raw: Option<Value>,
    /// Layer-level document fields this build does not interpret
    extra: Map<String, Value>,
}

impl LayerEntry {
    /// Create a resolved entry around `handler`
    pub fn new(name: impl Into<String>, handler: Box<dyn LayerHandler>) -> Self {
        Self {
            id: LayerId::new(),
            variant_tag: handler.type_tag().to_string(),
            handler: Some(handler),
            name: name.into(),
            enabled: true,
            raw: None,
            extra: Map::new(),
        }
    }

    /// Attach document fields to write back alongside the layer
    pub fn with_extra_fields(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    /// Create an inert entry that preserves `raw` as read from a document
    pub fn unresolved(
        variant_tag: impl Into<String>,
        name: impl Into<String>,
        enabled: bool,
        raw: Value,
    ) -> Self {
        Self {
            id: LayerId::new(),
            variant_tag: variant_tag.into(),
            handler: None,
            name: name.into(),
            enabled,
            raw: Some(raw),
            extra: Map::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn variant_tag(&self) -> &str {
        &self.variant_tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the layer; ignored for inert entries
    pub fn set_name(&mut self, name: impl Into<String>) {
        if self.handler.is_some() {
            self.name = name.into();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the layer
    ///
    /// Ignored for inert entries: their document is preserved as read.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.handler.is_some() {
            self.enabled = enabled;
        }
    }

    /// Toggle the enabled state, returning the new state
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// True when no handler is attached
    pub fn is_inert(&self) -> bool {
        self.handler.is_none()
    }

    /// True when the entry takes part in rendering
    pub fn is_active(&self) -> bool {
        self.enabled && self.handler.is_some()
    }

    pub fn handler(&self) -> Option<&dyn LayerHandler> {
        self.handler.as_deref()
    }

    pub fn handler_mut(&mut self) -> Option<&mut (dyn LayerHandler + 'static)> {
        self.handler.as_deref_mut()
    }

    pub fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Document kept for an inert entry
    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    /// Copy of this entry with a fresh id
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            id: LayerId::new(),
            ..self.clone()
        }
    }
}
