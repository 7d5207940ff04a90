//! Fill styles, the active creation style and style patches.

use super::SerializableColor;
use serde::{Deserialize, Serialize};

/// Default stroke colour for new elements.
pub const DEFAULT_STROKE_COLOR: SerializableColor = SerializableColor::new(0x1e, 0x1e, 0x1e, 255);

/// Fill pattern style for shapes (inspired by roughjs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillStyle {
    /// Parallel diagonal lines.
    #[default]
    Hachure,
    /// Solid fill color.
    Solid,
    /// Two perpendicular sets of hachure lines.
    CrossHatch,
    Zigzag,
    Dots,
    Dashed,
    ZigzagLine,
}

/// The style a style provider hands to the editor for new elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActiveStyle {
    pub stroke_color: SerializableColor,
    pub fill_color: SerializableColor,
    pub fill_style: FillStyle,
    pub stroke_width: f64,
}

impl Default for ActiveStyle {
    fn default() -> Self {
        Self {
            stroke_color: DEFAULT_STROKE_COLOR,
            fill_color: SerializableColor::transparent(),
            fill_style: FillStyle::Hachure,
            stroke_width: 2.0,
        }
    }
}

/// A partial style change applied to existing elements.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleUpdate {
    pub stroke_color: Option<SerializableColor>,
    pub background_color: Option<SerializableColor>,
    pub fill_style: Option<FillStyle>,
    pub stroke_width: Option<f64>,
}

impl StyleUpdate {
    pub fn stroke_color(color: SerializableColor) -> Self {
        Self {
            stroke_color: Some(color),
            ..Self::default()
        }
    }

    pub fn background_color(color: SerializableColor) -> Self {
        Self {
            background_color: Some(color),
            ..Self::default()
        }
    }

    pub fn fill_style(fill_style: FillStyle) -> Self {
        Self {
            fill_style: Some(fill_style),
            ..Self::default()
        }
    }

    pub fn stroke_width(width: f64) -> Self {
        Self {
            stroke_width: Some(width),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
