//! Percent Layer
//!
//! Draws a bar whose fill follows a value read from the context's state
//! (for example health or ammo). The value itself is supplied by the
//! rendering pipeline; only the binding and appearance are stored here.

use serde::{Deserialize, Serialize};

use super::color::Color;
use super::handler::LayerHandler;
use super::key_sequence::KeySequence;
use crate::impl_handler_common;

/// How the bar is filled between the two colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentEffectType {
    /// Keys light up one by one in the primary color
    #[default]
    Progressive,
    /// Like progressive, with the edge key partially lit
    ProgressiveGradual,
    /// All keys blend from secondary to primary
    AllAtOnce,
}

/// Properties of [`PercentLayer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentProperties {
    pub primary_color: Color,
    pub secondary_color: Color,
    pub effect_type: PercentEffectType,
    /// Path of the current value in the context state
    pub variable_path: String,
    /// Path of the maximum value in the context state
    pub max_variable_path: String,
    /// Fraction below which the bar blinks; `0.0` disables blinking
    pub blink_threshold: f64,
    pub blink_background: bool,
    pub sequence: KeySequence,
}

impl Default for PercentProperties {
    fn default() -> Self {
        Self {
            primary_color: Color::GREEN,
            secondary_color: Color::RED,
            effect_type: PercentEffectType::Progressive,
            variable_path: String::new(),
            max_variable_path: String::new(),
            blink_threshold: 0.0,
            blink_background: false,
            sequence: KeySequence::default(),
        }
    }
}

/// Value-driven bar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentLayer {
    pub properties: PercentProperties,
}

impl PercentLayer {
    pub const TAG: &'static str = "percent";

    /// Fraction of the bar to light for `value` out of `max`, clamped to `0.0..=1.0`
    pub fn fill_fraction(value: f64, max: f64) -> f64 {
        if max <= 0.0 || !value.is_finite() || !max.is_finite() {
            return 0.0;
        }
        (value / max).clamp(0.0, 1.0)
    }

    /// Whether the bar should blink at the given fill fraction
    pub fn should_blink(&self, fraction: f64) -> bool {
        self.properties.blink_threshold > 0.0 && fraction <= self.properties.blink_threshold
    }
}

impl LayerHandler for PercentLayer {
    impl_handler_common!(PercentLayer::TAG, "Percent", "Percent Effect");
}
