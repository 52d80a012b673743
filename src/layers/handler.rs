//! Layer handler trait definition
//!
//! A handler is the concrete variant behind a layer: it owns the layer's
//! typed properties and knows how to move them to and from JSON. The set of
//! variants is open; new ones are added by registering a factory with the
//! [`TypeRegistry`](super::TypeRegistry).

use std::fmt;

use serde_json::Value;

use crate::error::{LumenError, Result};

/// Base trait for all layer variants
pub trait LayerHandler: Send + Sync + fmt::Debug {
    /// Stable type tag written to documents
    fn type_tag(&self) -> &'static str;

    /// Id looked up in the context's live handler catalog
    fn handler_id(&self) -> &'static str;

    /// Human-readable variant name
    fn display_name(&self) -> &'static str;

    /// Serialize the properties to JSON
    fn to_json(&self) -> Result<Value>;

    /// Replace the properties from JSON
    ///
    /// Missing fields take their defaults; fields of the wrong shape are an
    /// error and leave the handler untouched.
    fn from_json(&mut self, json: &Value) -> Result<()>;

    /// Restore every property to its default value
    fn reset(&mut self);

    /// Clone the handler into a boxed trait object
    fn box_clone(&self) -> Box<dyn LayerHandler>;

    /// Get a single property by name
    fn get_param(&self, name: &str) -> Option<Value> {
        self.to_json().ok()?.get(name).cloned()
    }

    /// Set a single property by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let mut props = self.to_json()?;
        let map = props
            .as_object_mut()
            .ok_or_else(|| LumenError::InvalidParameter {
                name: name.to_string(),
                reason: "properties are not an object".to_string(),
            })?;
        if !map.contains_key(name) {
            return Err(LumenError::InvalidParameter {
                name: name.to_string(),
                reason: format!("'{}' has no such property", self.type_tag()),
            });
        }
        map.insert(name.to_string(), value.clone());
        self.from_json(&props)
    }
}

impl Clone for Box<dyn LayerHandler> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Helper macro to implement common LayerHandler trait methods
///
/// The implementing type must have a `properties` field whose type is
/// `Serialize + DeserializeOwned + Default` with `#[serde(default)]`.
#[macro_export]
macro_rules! impl_handler_common {
    ($type_tag:expr, $handler_id:expr, $display_name:expr) => {
        fn type_tag(&self) -> &'static str {
            $type_tag
        }

        fn handler_id(&self) -> &'static str {
            $handler_id
        }

        fn display_name(&self) -> &'static str {
            $display_name
        }

        fn to_json(&self) -> $crate::error::Result<serde_json::Value> {
            Ok(serde_json::to_value(&self.properties)?)
        }

        fn from_json(&mut self, json: &serde_json::Value) -> $crate::error::Result<()> {
            self.properties = serde_json::from_value(json.clone())?;
            Ok(())
        }

        fn reset(&mut self) {
            self.properties = Default::default();
        }

        fn box_clone(&self) -> Box<dyn $crate::layers::LayerHandler> {
            Box::new(self.clone())
        }
    };
}
