//! Keyed Background Layer
//!
//! Fills the whole device with a color picked by a key from the context
//! state (a character, a team, a map). The key-to-color table ships with
//! defaults that users can override entry by entry. This handler is not
//! part of the global set; contexts opt in through their extra layers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::color::Color;
use super::handler::LayerHandler;
use crate::impl_handler_common;

/// Properties of [`KeyedBackgroundLayer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyedBackgroundProperties {
    /// Path of the key in the context state
    pub key_path: String,
    pub colors: BTreeMap<String, Color>,
    /// Used for keys that have no entry in `colors`
    pub fallback: Color,
}

impl Default for KeyedBackgroundProperties {
    fn default() -> Self {
        let colors = [
            ("undefined", Color::BLACK),
            ("red_team", Color::rgb(0xD1, 0x2B, 0x2B)),
            ("blue_team", Color::rgb(0x2B, 0x5C, 0xD1)),
            ("neutral", Color::rgb(0x80, 0x80, 0x80)),
        ]
        .into_iter()
        .map(|(k, c)| (k.to_string(), c))
        .collect();

        Self {
            key_path: String::new(),
            colors,
            fallback: Color::BLACK,
        }
    }
}

/// Background color chosen by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedBackgroundLayer {
    pub properties: KeyedBackgroundProperties,
}

impl KeyedBackgroundLayer {
    pub const TAG: &'static str = "keyed_background";
    pub const HANDLER_ID: &'static str = "KeyedBackground";

    /// Color for `key`, falling back when the key has no entry
    pub fn color_for(&self, key: &str) -> Color {
        self.properties
            .colors
            .get(key)
            .copied()
            .unwrap_or(self.properties.fallback)
    }
}

impl LayerHandler for KeyedBackgroundLayer {
    impl_handler_common!(
        KeyedBackgroundLayer::TAG,
        KeyedBackgroundLayer::HANDLER_ID,
        "Keyed Background"
    );
}
