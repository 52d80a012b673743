//! Solid Color Layer
//!
//! Fills its affected region with a single color. This is the variant new
//! profiles start with.

use serde::{Deserialize, Serialize};

use super::color::Color;
use super::handler::LayerHandler;
use super::key_sequence::KeySequence;
use crate::impl_handler_common;

/// Properties of [`SolidColorLayer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidColorProperties {
    pub primary_color: Color,
    pub sequence: KeySequence,
}

impl Default for SolidColorProperties {
    fn default() -> Self {
        Self {
            primary_color: Color::argb(0xFF, 0x00, 0x7A, 0xFF),
            sequence: KeySequence::default(),
        }
    }
}

/// Single-color fill
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidColorLayer {
    pub properties: SolidColorProperties,
}

impl SolidColorLayer {
    pub const TAG: &'static str = "solid_color";

    pub fn new(color: Color) -> Self {
        Self {
            properties: SolidColorProperties {
                primary_color: color,
                ..SolidColorProperties::default()
            },
        }
    }
}

impl LayerHandler for SolidColorLayer {
    impl_handler_common!(SolidColorLayer::TAG, "Default", "Solid Color");
}
