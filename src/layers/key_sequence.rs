//! Affected-region description shared by layer properties.
//!
//! A sequence is either an ordered list of device key names or a free-form
//! rectangle in device space. Both parts are always persisted so switching
//! the kind back and forth in an editor does not lose the other half.

use serde::{Deserialize, Serialize};

/// Which half of a [`KeySequence`] is in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySequenceKind {
    #[default]
    Sequence,
    FreeForm,
}

/// Free-form rectangle, rotated by `angle` degrees around its center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeFormRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl Default for FreeFormRegion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 30.0,
            height: 30.0,
            angle: 0.0,
        }
    }
}

/// A series of device keys or a free-form region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySequence {
    pub kind: KeySequenceKind,
    pub keys: Vec<String>,
    pub freeform: FreeFormRegion,
}

impl KeySequence {
    /// Sequence over the given keys, in order.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: KeySequenceKind::Sequence,
            keys: keys.into_iter().map(Into::into).collect(),
            freeform: FreeFormRegion::default(),
        }
    }

    pub fn from_freeform(region: FreeFormRegion) -> Self {
        Self {
            kind: KeySequenceKind::FreeForm,
            keys: Vec::new(),
            freeform: region,
        }
    }

    /// True when the sequence affects nothing.
    pub fn is_empty(&self) -> bool {
        match self.kind {
            KeySequenceKind::Sequence => self.keys.is_empty(),
            KeySequenceKind::FreeForm => self.freeform.width <= 0.0 || self.freeform.height <= 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keys_keeps_order() {
        let seq = KeySequence::from_keys(["W", "A", "S", "D"]);
        assert_eq!(seq.kind, KeySequenceKind::Sequence);
        assert_eq!(seq.keys, vec!["W", "A", "S", "D"]);
        assert!(!seq.is_empty());
    }

    #[test]
    fn test_freeform_empty_when_degenerate() {
        let seq = KeySequence::from_freeform(FreeFormRegion {
            width: 0.0,
            ..FreeFormRegion::default()
        });
        assert!(seq.is_empty());
        assert!(KeySequence::default().is_empty());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let seq: KeySequence = serde_json::from_value(serde_json::json!({
            "kind": "free_form"
        }))
        .unwrap();
        assert_eq!(seq.kind, KeySequenceKind::FreeForm);
        assert_eq!(seq.freeform, FreeFormRegion::default());
    }
}
