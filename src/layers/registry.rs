//! Type registry
//!
//! Maps stable string tags to variant constructors. Two namespaces live
//! here: layer handler tags, resolved for every layer of a document, and
//! profile-kind tags, resolved for the document root. The registry is built
//! once when a context starts and shared read-only afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde_json::Value;
use tracing::warn;

use super::entry::LayerEntry;
use super::gradient::GradientLayer;
use super::handler::LayerHandler;
use super::keyed_background::KeyedBackgroundLayer;
use super::percent::PercentLayer;
use super::solid_color::SolidColorLayer;
use crate::error::{LumenError, Result};

/// Produces a default-initialized handler
pub type HandlerFactory = fn() -> Box<dyn LayerHandler>;

/// Produces the default contents of a profile of some kind
pub type ProfileTemplate = fn(&TypeRegistry) -> ProfileDefaults;

/// Tag of the profile kind registered by [`TypeRegistry::with_builtins`]
pub const APPLICATION_PROFILE: &str = "application";

/// Handler ids every context can use
pub const GLOBAL_HANDLERS: &[&str] = &["Default", "Gradient", "Percent"];

/// Default layers for a new or reset profile
#[derive(Debug, Clone, Default)]
pub struct ProfileDefaults {
    pub main: Vec<LayerEntry>,
    pub overlay: Vec<LayerEntry>,
}

/// A registered layer variant
#[derive(Clone)]
struct HandlerRegistration {
    factory: HandlerFactory,
    handler_id: &'static str,
    display_name: &'static str,
    /// Properties of a freshly constructed handler, captured at registration
    defaults: Value,
}

/// Registry of layer variants and profile kinds
#[derive(Clone, Default)]
pub struct TypeRegistry {
    handlers: HashMap<String, HandlerRegistration>,
    aliases: HashMap<String, String>,
    profile_kinds: HashMap<String, ProfileTemplate>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("tags", &self.list_tags())
            .field("aliases", &self.aliases)
            .field("profile_kinds", &self.list_profile_kinds())
            .finish()
    }
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with all built-in variants and the application profile kind
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        let handlers: [(&str, HandlerFactory); 4] = [
            (SolidColorLayer::TAG, || Box::new(SolidColorLayer::default())),
            (GradientLayer::TAG, || Box::new(GradientLayer::default())),
            (PercentLayer::TAG, || Box::new(PercentLayer::default())),
            (KeyedBackgroundLayer::TAG, || {
                Box::new(KeyedBackgroundLayer::default())
            }),
        ];
        for (tag, factory) in handlers {
            if let Err(err) = registry.register(tag, factory) {
                warn!(tag = %tag, error = %err, "Skipping built-in layer type");
            }
        }

        let aliases = [("solid_fill", SolidColorLayer::TAG)];
        for (legacy, current) in aliases {
            if let Err(err) = registry.register_alias(legacy, current) {
                warn!(alias = %legacy, error = %err, "Skipping built-in alias");
            }
        }

        if let Err(err) = registry.register_profile_kind(APPLICATION_PROFILE, application_defaults) {
            warn!(kind = %APPLICATION_PROFILE, error = %err, "Skipping built-in profile kind");
        }

        registry
    }

    /// Register a layer variant
    ///
    /// # Errors
    /// `DuplicateTag` if `tag` is already registered or used as an alias; the
    /// first registration is kept.
    pub fn register(&mut self, tag: &str, factory: HandlerFactory) -> Result<()> {
        if self.handlers.contains_key(tag) || self.aliases.contains_key(tag) {
            warn!(tag = %tag, "Layer type tag already registered, keeping the first");
            return Err(LumenError::DuplicateTag {
                tag: tag.to_string(),
            });
        }

        let handler = factory();
        let defaults = handler.to_json().unwrap_or(Value::Null);
        self.handlers.insert(
            tag.to_string(),
            HandlerRegistration {
                factory,
                handler_id: handler.handler_id(),
                display_name: handler.display_name(),
                defaults,
            },
        );
        Ok(())
    }

    /// Let documents written with `legacy` resolve to `current`
    ///
    /// # Errors
    /// `UnknownTag` if `current` is not registered, `DuplicateTag` if
    /// `legacy` is already taken.
    pub fn register_alias(&mut self, legacy: &str, current: &str) -> Result<()> {
        if !self.handlers.contains_key(current) {
            return Err(LumenError::UnknownTag {
                tag: current.to_string(),
            });
        }
        if self.handlers.contains_key(legacy) || self.aliases.contains_key(legacy) {
            warn!(tag = %legacy, "Alias collides with a registered tag, ignoring");
            return Err(LumenError::DuplicateTag {
                tag: legacy.to_string(),
            });
        }
        self.aliases.insert(legacy.to_string(), current.to_string());
        Ok(())
    }

    /// Register a profile kind
    pub fn register_profile_kind(&mut self, tag: &str, template: ProfileTemplate) -> Result<()> {
        if self.profile_kinds.contains_key(tag) {
            warn!(tag = %tag, "Profile kind already registered, keeping the first");
            return Err(LumenError::DuplicateTag {
                tag: tag.to_string(),
            });
        }
        self.profile_kinds.insert(tag.to_string(), template);
        Ok(())
    }

    /// Current tag for `tag`, following aliases; None if unknown
    pub fn canonical_tag<'a>(&'a self, tag: &'a str) -> Option<&'a str> {
        if self.handlers.contains_key(tag) {
            return Some(tag);
        }
        self.aliases.get(tag).map(|s| s.as_str())
    }

    /// Look up the factory for a tag
    pub fn resolve(&self, tag: &str) -> Option<HandlerFactory> {
        let tag = self.canonical_tag(tag)?;
        self.handlers.get(tag).map(|r| r.factory)
    }

    /// Construct a default-initialized handler for a tag
    pub fn create(&self, tag: &str) -> Option<Box<dyn LayerHandler>> {
        self.resolve(tag).map(|factory| factory())
    }

    /// Default properties recorded for a tag
    pub fn defaults(&self, tag: &str) -> Option<&Value> {
        let tag = self.canonical_tag(tag)?;
        self.handlers.get(tag).map(|r| &r.defaults)
    }

    /// Handler id produced by a tag's factory
    pub fn handler_id(&self, tag: &str) -> Option<&'static str> {
        let tag = self.canonical_tag(tag)?;
        self.handlers.get(tag).map(|r| r.handler_id)
    }

    /// Look up a profile kind
    pub fn resolve_profile_kind(&self, tag: &str) -> Option<ProfileTemplate> {
        self.profile_kinds.get(tag).copied()
    }

    /// Check if a layer tag (or alias) is registered
    pub fn has_tag(&self, tag: &str) -> bool {
        self.canonical_tag(tag).is_some()
    }

    /// Registered layer tags with their display names, sorted by tag
    pub fn list_tags(&self) -> Vec<(&str, &'static str)> {
        let sorted: BTreeMap<&str, &'static str> = self
            .handlers
            .iter()
            .map(|(tag, r)| (tag.as_str(), r.display_name))
            .collect();
        sorted.into_iter().collect()
    }

    /// Registered profile kinds, sorted
    pub fn list_profile_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.profile_kinds.keys().map(|s| s.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Defaults for the built-in application profile kind
fn application_defaults(registry: &TypeRegistry) -> ProfileDefaults {
    let main = registry
        .create(SolidColorLayer::TAG)
        .map(|handler| LayerEntry::new("Background", handler))
        .into_iter()
        .collect();

    ProfileDefaults {
        main,
        overlay: Vec::new(),
    }
}

/// Live handler registry of one context
///
/// Lists the handler ids currently available. A layer whose handler id is
/// missing here is dropped on load, unlike a layer whose type tag cannot be
/// constructed at all, which is kept inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerCatalog {
    available: HashSet<String>,
}

impl HandlerCatalog {
    /// Catalog with the global handlers plus `extras`
    pub fn with_extras<I, S>(extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut available: HashSet<String> =
            GLOBAL_HANDLERS.iter().map(|s| s.to_string()).collect();
        available.extend(extras.into_iter().map(Into::into));
        Self { available }
    }

    pub fn is_available(&self, id: &str) -> bool {
        self.available.contains(id)
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl Default for HandlerCatalog {
    fn default() -> Self {
        Self::with_extras(std::iter::empty::<String>())
    }
}
