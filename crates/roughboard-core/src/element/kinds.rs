//! Variant payloads of [`ElementKind`](super::ElementKind).

use super::Element;
use crate::binding::Binding;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Width and height of a box-like element. Signed while a drag is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxShape {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl BoxShape {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Font families understood by the text renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontFamily {
    #[default]
    SansSerif,
    Monospace,
    Serif,
}

impl FontFamily {
    /// CSS font stack for this family.
    pub fn css_name(self) -> &'static str {
        match self {
            FontFamily::SansSerif => "Arial, sans-serif",
            FontFamily::Monospace => "Courier New, monospace",
            FontFamily::Serif => "Georgia, serif",
        }
    }
}

impl From<u8> for FontFamily {
    fn from(code: u8) -> Self {
        match code {
            2 => FontFamily::Monospace,
            3 => FontFamily::Serif,
            _ => FontFamily::SansSerif,
        }
    }
}

impl From<FontFamily> for u8 {
    fn from(family: FontFamily) -> Self {
        match family {
            FontFamily::SansSerif => 1,
            FontFamily::Monospace => 2,
            FontFamily::Serif => 3,
        }
    }
}

impl Serialize for FontFamily {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8((*self).into())
    }
}

impl<'de> Deserialize<'de> for FontFamily {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u64::deserialize(deserializer)?;
        Ok(u8::try_from(code).map(FontFamily::from).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Multi-line text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextShape {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub vertical_align: VerticalAlign,
}

pub const DEFAULT_TEXT: &str = "Double click to edit";
pub const DEFAULT_FONT_SIZE: f64 = 20.0;
/// Approximate advance of one glyph as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f64 = 0.6;

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

impl Default for TextShape {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 24.0,
            text: DEFAULT_TEXT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: FontFamily::default(),
            text_align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
        }
    }
}

impl TextShape {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// Replace the content and re-derive the box from it.
    pub fn set_text(&mut self, text: impl Into<String>, line_height: f64) {
        self.text = text.into();
        let longest = self.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let line_count = self.lines().count().max(1);
        self.width = longest as f64 * self.font_size * GLYPH_WIDTH_FACTOR;
        self.height = line_count as f64 * self.font_size * line_height;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Placeholder,
    Pending,
    Saved,
    Error,
}

/// Smallest width or height an image can be dragged to.
pub const MIN_IMAGE_SIZE: f64 = 50.0;

/// An image placeholder. Pixel data lives outside the scene, keyed by `file_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageShape {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub status: ImageStatus,
    #[serde(default)]
    pub file_id: Option<String>,
}

impl Default for ImageShape {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 150.0,
            status: ImageStatus::Placeholder,
            file_id: None,
        }
    }
}

/// Arrow or line: a polyline relative to the element origin, optionally
/// bound to other elements at either end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearShape {
    #[serde(with = "point_pairs")]
    pub points: Vec<Point>,
    #[serde(default)]
    pub start_binding: Option<Binding>,
    #[serde(default)]
    pub end_binding: Option<Binding>,
}

impl LinearShape {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            start_binding: None,
            end_binding: None,
        }
    }

    pub fn binding(&self, end: PathEnd) -> Option<&Binding> {
        match end {
            PathEnd::Start => self.start_binding.as_ref(),
            PathEnd::End => self.end_binding.as_ref(),
        }
    }

    pub fn binding_mut(&mut self, end: PathEnd) -> &mut Option<Binding> {
        match end {
            PathEnd::Start => &mut self.start_binding,
            PathEnd::End => &mut self.end_binding,
        }
    }
}

/// Either end of an arrow or line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathEnd {
    Start,
    End,
}

/// Freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreedrawShape {
    #[serde(with = "point_pairs")]
    pub points: Vec<Point>,
}

impl Default for FreedrawShape {
    fn default() -> Self {
        Self {
            points: vec![Point::ZERO],
        }
    }
}

/// Nested group. Children are positioned relative to the group origin and
/// the group box is the union of their bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupShape {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub children: Vec<Element>,
}

/// Points written as `[[dx, dy], ...]`.
pub(crate) mod point_pairs {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(points.iter().map(|p| [p.x, p.y]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point>, D::Error> {
        let pairs = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(|[x, y]| Point::new(x, y)).collect())
    }
}
