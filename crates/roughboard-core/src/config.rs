//! Editor tunables.

use crate::element::SerializableColor;
use serde::{Deserialize, Serialize};

/// Default hit tolerance for path-like shapes, in world units.
pub const HIT_TOLERANCE: f64 = 10.0;
/// Default tolerance used when looking for a binding target.
pub const BINDING_TOLERANCE: f64 = 20.0;
/// Default grid spacing.
pub const GRID_SIZE: f64 = 20.0;

/// Configuration for the editor and the renderer.
///
/// Every field has a default, so a partial JSON document is enough to
/// override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Distance below which a path-like shape counts as hit.
    pub hit_tolerance: f64,
    /// Expansion applied to element bounds when searching for a binding target.
    pub binding_tolerance: f64,
    /// Side of the square handle hit box, in screen pixels.
    pub handle_size: f64,
    /// Scale multiplier for a wheel step towards the user.
    pub zoom_in_factor: f64,
    /// Scale multiplier for a wheel step away from the user.
    pub zoom_out_factor: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Text line spacing as a multiple of the font size.
    pub line_height: f64,
    pub selection_color: SerializableColor,
    /// Gap between an element and its selection outline.
    pub selection_offset: f64,
    pub selection_dash: [f64; 2],
    pub grid_color: SerializableColor,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: HIT_TOLERANCE,
            binding_tolerance: BINDING_TOLERANCE,
            handle_size: 8.0,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
            min_zoom: 0.1,
            max_zoom: 10.0,
            line_height: 1.2,
            selection_color: SerializableColor::new(0x3b, 0x82, 0xf6, 255),
            selection_offset: 2.0,
            selection_dash: [5.0, 5.0],
            grid_color: SerializableColor::new(0xf0, 0xf0, 0xf0, 255),
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON, filling in defaults for missing keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert!((config.hit_tolerance - 10.0).abs() < f64::EPSILON);
        assert!((config.binding_tolerance - 20.0).abs() < f64::EPSILON);
        assert!((config.line_height - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json() {
        let config = EditorConfig::from_json(r#"{"maxZoom": 4.0, "handleSize": 12}"#).unwrap();
        assert!((config.max_zoom - 4.0).abs() < f64::EPSILON);
        assert!((config.handle_size - 12.0).abs() < f64::EPSILON);
        assert!((config.min_zoom - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.selection_color, SerializableColor::new(0x3b, 0x82, 0xf6, 255));
    }

    #[test]
    fn test_roundtrip() {
        let config = EditorConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }
}
