//! Gradient Layer
//!
//! Scrolls a multi-stop color gradient across the affected region.

use serde::{Deserialize, Serialize};

use super::color::Color;
use super::handler::LayerHandler;
use super::key_sequence::KeySequence;
use crate::impl_handler_common;

/// One stop of the gradient, `position` in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f64,
    pub color: Color,
}

/// Properties of [`GradientLayer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientProperties {
    pub stops: Vec<GradientStop>,
    /// Scroll speed in region-widths per second; negative scrolls backwards
    pub speed: f64,
    /// Direction of travel in degrees
    pub angle: f64,
    pub sequence: KeySequence,
}

impl Default for GradientProperties {
    fn default() -> Self {
        Self {
            stops: vec![
                GradientStop {
                    position: 0.0,
                    color: Color::RED,
                },
                GradientStop {
                    position: 0.5,
                    color: Color::GREEN,
                },
                GradientStop {
                    position: 1.0,
                    color: Color::BLUE,
                },
            ],
            speed: 1.0,
            angle: 0.0,
            sequence: KeySequence::default(),
        }
    }
}

/// Scrolling gradient
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientLayer {
    pub properties: GradientProperties,
}

impl GradientLayer {
    pub const TAG: &'static str = "gradient";

    /// Add a stop, keeping stops sorted by position
    pub fn add_stop(&mut self, position: f64, color: Color) {
        let position = position.clamp(0.0, 1.0);
        let index = self
            .properties
            .stops
            .iter()
            .position(|s| s.position > position)
            .unwrap_or(self.properties.stops.len());
        self.properties
            .stops
            .insert(index, GradientStop { position, color });
    }
}

impl LayerHandler for GradientLayer {
    impl_handler_common!(GradientLayer::TAG, "Gradient", "Gradient");
}
