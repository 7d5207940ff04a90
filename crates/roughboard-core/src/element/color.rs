//! RGBA8 colour stored on elements, serialized as CSS-style hex.

use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Serializable color representation (RGBA8).
///
/// Written as `#rrggbb` when opaque, `#rrggbbaa` otherwise, and as the
/// literal `transparent` when fully transparent black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or a small set of keywords.
    pub fn parse(color: &str) -> Option<Self> {
        let color = color.trim();
        match color.to_ascii_lowercase().as_str() {
            "transparent" => return Some(Self::transparent()),
            "black" => return Some(Self::black()),
            "white" => return Some(Self::white()),
            _ => {}
        }

        let hex = color.strip_prefix('#')?;
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(0..1)?;
                let g = channel(1..2)?;
                let b = channel(2..3)?;
                Some(Self::new(r * 17, g * 17, b * 17, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// This colour with its alpha multiplied by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::transparent() {
            write!(f, "transparent")
        } else if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for SerializableColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SerializableColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_else(|| {
            log::warn!("Unrecognized color '{}', using black", raw);
            Self::black()
        }))
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(SerializableColor::parse("#1e1e1e"), Some(SerializableColor::new(30, 30, 30, 255)));
        assert_eq!(SerializableColor::parse("#fff"), Some(SerializableColor::white()));
        assert_eq!(SerializableColor::parse("#ff000080"), Some(SerializableColor::new(255, 0, 0, 128)));
        assert_eq!(SerializableColor::parse("transparent"), Some(SerializableColor::transparent()));
        assert_eq!(SerializableColor::parse("#12"), None);
        assert_eq!(SerializableColor::parse("#gggggg"), None);
        assert_eq!(SerializableColor::parse("red"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SerializableColor::new(0x3b, 0x82, 0xf6, 255).to_string(), "#3b82f6");
        assert_eq!(SerializableColor::new(1, 2, 3, 4).to_string(), "#01020304");
        assert_eq!(SerializableColor::transparent().to_string(), "transparent");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&SerializableColor::white()).unwrap();
        assert_eq!(json, "\"#ffffff\"");
        let back: SerializableColor = serde_json::from_str("\"#ABCDEF\"").unwrap();
        assert_eq!(back, SerializableColor::new(0xab, 0xcd, 0xef, 255));
    }

    #[test]
    fn test_unparseable_falls_back_to_black() {
        let color: SerializableColor = serde_json::from_str("\"not-a-color\"").unwrap();
        assert_eq!(color, SerializableColor::black());
    }

    #[test]
    fn test_opacity() {
        let half = SerializableColor::black().with_opacity(0.5);
        assert_eq!(half.a, 128);
        assert_eq!(SerializableColor::white().with_opacity(2.0).a, 255);
    }

    #[test]
    fn test_peniko_conversion() {
        let color = SerializableColor::new(10, 20, 30, 40);
        let peniko_color: Color = color.into();
        assert_eq!(SerializableColor::from(peniko_color), color);
    }
}
