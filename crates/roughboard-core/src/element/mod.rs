//! Element definitions for the scene.

mod color;
mod kinds;
mod style;

pub use color::SerializableColor;
pub use kinds::{
    BoxShape, DEFAULT_FONT_SIZE, DEFAULT_TEXT, FontFamily, FreedrawShape, GroupShape, ImageShape,
    ImageStatus, LinearShape, MIN_IMAGE_SIZE, PathEnd, TextAlign, TextShape, VerticalAlign,
};
pub use style::{ActiveStyle, DEFAULT_STROKE_COLOR, FillStyle, StyleUpdate};

use crate::drawable::{Drawable, DrawableCache};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Stable element identifier. Never reused within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The type tag of an element, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Rectangle,
    Diamond,
    Ellipse,
    Arrow,
    Line,
    Text,
    Freedraw,
    Image,
    Frame,
    Group,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Rectangle => "rectangle",
            ElementType::Diamond => "diamond",
            ElementType::Ellipse => "ellipse",
            ElementType::Arrow => "arrow",
            ElementType::Line => "line",
            ElementType::Text => "text",
            ElementType::Freedraw => "freedraw",
            ElementType::Image => "image",
            ElementType::Frame => "frame",
            ElementType::Group => "group",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("Unknown element type: {0}")]
pub struct UnknownElementType(pub String);

impl FromStr for ElementType {
    type Err = UnknownElementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "rectangle" => ElementType::Rectangle,
            "diamond" => ElementType::Diamond,
            "ellipse" => ElementType::Ellipse,
            "arrow" => ElementType::Arrow,
            "line" => ElementType::Line,
            "text" => ElementType::Text,
            "freedraw" => ElementType::Freedraw,
            "image" => ElementType::Image,
            "frame" => ElementType::Frame,
            "group" => ElementType::Group,
            other => return Err(UnknownElementType(other.to_string())),
        })
    }
}

/// Type-specific payload. Serialized inline with a `"type"` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Rectangle(BoxShape),
    Diamond(BoxShape),
    Ellipse(BoxShape),
    Arrow(LinearShape),
    Line(LinearShape),
    Text(TextShape),
    Freedraw(FreedrawShape),
    Image(ImageShape),
    Frame(BoxShape),
    Group(GroupShape),
}

impl ElementKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementKind::Rectangle(_) => ElementType::Rectangle,
            ElementKind::Diamond(_) => ElementType::Diamond,
            ElementKind::Ellipse(_) => ElementType::Ellipse,
            ElementKind::Arrow(_) => ElementType::Arrow,
            ElementKind::Line(_) => ElementType::Line,
            ElementKind::Text(_) => ElementType::Text,
            ElementKind::Freedraw(_) => ElementType::Freedraw,
            ElementKind::Image(_) => ElementType::Image,
            ElementKind::Frame(_) => ElementType::Frame,
            ElementKind::Group(_) => ElementType::Group,
        }
    }
}

fn default_stroke_color() -> SerializableColor {
    DEFAULT_STROKE_COLOR
}

fn default_stroke_width() -> f64 {
    2.0
}

fn default_opacity() -> f64 {
    100.0
}

fn default_roughness() -> f64 {
    1.0
}

/// Generate a style seed for a new element.
/// Uses a simple counter + hash approach that works on all platforms.
pub fn generate_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    // splitmix32-style mixing
    let mut x = counter.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

/// One visual object in the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: SerializableColor,
    #[serde(default = "SerializableColor::transparent")]
    pub background_color: SerializableColor,
    #[serde(default)]
    pub fill_style: FillStyle,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// Percentage in `[0, 100]`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_roughness")]
    pub roughness: f64,
    #[serde(default = "generate_seed")]
    pub seed: u32,
    /// Owning group, set only on children of a group element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ElementId>,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(skip)]
    drawable: DrawableCache,
}

impl Element {
    /// Wrap a payload with default common attributes and a fresh id.
    pub fn new(kind: ElementKind, origin: Point) -> Self {
        Self {
            id: ElementId::generate(),
            x: origin.x,
            y: origin.y,
            stroke_color: DEFAULT_STROKE_COLOR,
            background_color: SerializableColor::transparent(),
            fill_style: FillStyle::Hachure,
            stroke_width: default_stroke_width(),
            opacity: default_opacity(),
            roughness: default_roughness(),
            seed: generate_seed(),
            group_id: None,
            kind,
            drawable: DrawableCache::default(),
        }
    }

    /// Build a type-appropriate element spanning `start` to `end`.
    ///
    /// Box types take their size from the drag, arrows and lines get the
    /// two-point path `[(0,0), end - start]`, and freedraw starts with a
    /// single point. Text and images start at their default size.
    pub fn create(element_type: ElementType, start: Point, end: Point, style: &ActiveStyle) -> Self {
        let drag = end - start;
        let kind = match element_type {
            ElementType::Rectangle => ElementKind::Rectangle(BoxShape::new(drag.x, drag.y)),
            ElementType::Diamond => ElementKind::Diamond(BoxShape::new(drag.x, drag.y)),
            ElementType::Ellipse => ElementKind::Ellipse(BoxShape::new(drag.x, drag.y)),
            ElementType::Frame => ElementKind::Frame(BoxShape::new(drag.x, drag.y)),
            ElementType::Arrow => ElementKind::Arrow(LinearShape::new(vec![Point::ZERO, drag.to_point()])),
            ElementType::Line => ElementKind::Line(LinearShape::new(vec![Point::ZERO, drag.to_point()])),
            ElementType::Text => ElementKind::Text(TextShape::default()),
            ElementType::Freedraw => ElementKind::Freedraw(FreedrawShape::default()),
            ElementType::Image => ElementKind::Image(ImageShape::default()),
            ElementType::Group => ElementKind::Group(GroupShape {
                width: drag.x.abs(),
                height: drag.y.abs(),
                children: Vec::new(),
            }),
        };

        let mut element = Self::new(kind, start);
        element.stroke_color = style.stroke_color;
        element.stroke_width = style.stroke_width;
        match element_type {
            ElementType::Rectangle | ElementType::Diamond | ElementType::Ellipse | ElementType::Image => {
                element.background_color = style.fill_color;
                element.fill_style = if style.fill_color.is_transparent() {
                    style.fill_style
                } else {
                    FillStyle::Solid
                };
            }
            ElementType::Frame => {
                element.background_color = SerializableColor::white();
                element.fill_style = FillStyle::Solid;
                element.roughness = 0.0;
            }
            ElementType::Freedraw => element.roughness = 0.0,
            ElementType::Group => {
                element.stroke_color = SerializableColor::new(0x88, 0x88, 0x88, 255);
                element.stroke_width = 1.0;
                element.roughness = 0.0;
            }
            ElementType::Arrow | ElementType::Line | ElementType::Text => {}
        }
        element
    }

    /// Wrap already-relative children in a group element.
    pub fn group(id: ElementId, bounds: Rect, children: Vec<Element>) -> Self {
        let mut element = Self::create(ElementType::Group, bounds.origin(), bounds.origin(), &ActiveStyle::default());
        element.id = id;
        element.kind = ElementKind::Group(GroupShape {
            width: bounds.width(),
            height: bounds.height(),
            children,
        });
        element
    }

    pub fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    /// Local origin.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_box(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Rectangle(_)
                | ElementKind::Diamond(_)
                | ElementKind::Ellipse(_)
                | ElementKind::Text(_)
                | ElementKind::Image(_)
                | ElementKind::Frame(_)
        )
    }

    pub fn is_path(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Arrow(_) | ElementKind::Line(_) | ElementKind::Freedraw(_)
        )
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ElementKind::Group(_))
    }

    /// Signed width/height for box types and groups.
    pub fn size(&self) -> Option<Size> {
        match &self.kind {
            ElementKind::Rectangle(b) | ElementKind::Diamond(b) | ElementKind::Ellipse(b) | ElementKind::Frame(b) => {
                Some(Size::new(b.width, b.height))
            }
            ElementKind::Text(t) => Some(Size::new(t.width, t.height)),
            ElementKind::Image(i) => Some(Size::new(i.width, i.height)),
            ElementKind::Group(g) => Some(Size::new(g.width, g.height)),
            ElementKind::Arrow(_) | ElementKind::Line(_) | ElementKind::Freedraw(_) => None,
        }
    }

    /// Set width/height of a box type. No-op for other types.
    pub fn set_size(&mut self, width: f64, height: f64) {
        match &mut self.kind {
            ElementKind::Rectangle(b) | ElementKind::Diamond(b) | ElementKind::Ellipse(b) | ElementKind::Frame(b) => {
                b.width = width;
                b.height = height;
            }
            ElementKind::Image(i) => {
                i.width = width.max(MIN_IMAGE_SIZE);
                i.height = height.max(MIN_IMAGE_SIZE);
            }
            ElementKind::Text(t) => {
                t.width = width;
                t.height = height;
            }
            ElementKind::Arrow(_) | ElementKind::Line(_) | ElementKind::Freedraw(_) | ElementKind::Group(_) => {}
        }
    }

    /// Relative path points for arrows, lines and freedraw.
    pub fn points(&self) -> Option<&[Point]> {
        match &self.kind {
            ElementKind::Arrow(l) | ElementKind::Line(l) => Some(&l.points),
            ElementKind::Freedraw(f) => Some(&f.points),
            _ => None,
        }
    }

    /// Path points translated by the element origin.
    pub fn absolute_points(&self) -> Vec<Point> {
        let origin = self.origin().to_vec2();
        self.points()
            .map(|points| points.iter().map(|p| *p + origin).collect())
            .unwrap_or_default()
    }

    pub fn as_linear(&self) -> Option<&LinearShape> {
        match &self.kind {
            ElementKind::Arrow(l) | ElementKind::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_linear_mut(&mut self) -> Option<&mut LinearShape> {
        match &mut self.kind {
            ElementKind::Arrow(l) | ElementKind::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextShape> {
        match &self.kind {
            ElementKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Element] {
        match &self.kind {
            ElementKind::Group(g) => &g.children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Element>> {
        match &mut self.kind {
            ElementKind::Group(g) => Some(&mut g.children),
            _ => None,
        }
    }

    /// Extend the element during an active drawing gesture.
    ///
    /// Box types take `end - origin` as their size (images never shrink
    /// below [`MIN_IMAGE_SIZE`]), arrows and lines move their second point,
    /// and freedraw appends a point. Text and groups are left alone.
    pub fn update_drag_dimensions(&mut self, end: Point) {
        let relative = end - self.origin();
        match &mut self.kind {
            ElementKind::Rectangle(b) | ElementKind::Diamond(b) | ElementKind::Ellipse(b) | ElementKind::Frame(b) => {
                b.width = relative.x;
                b.height = relative.y;
            }
            ElementKind::Image(i) => {
                i.width = relative.x.max(MIN_IMAGE_SIZE);
                i.height = relative.y.max(MIN_IMAGE_SIZE);
            }
            ElementKind::Arrow(l) | ElementKind::Line(l) => {
                if l.points.len() >= 2 {
                    l.points[1] = relative.to_point();
                } else {
                    l.points.push(relative.to_point());
                }
            }
            ElementKind::Freedraw(f) => f.points.push(relative.to_point()),
            ElementKind::Text(_) | ElementKind::Group(_) => {}
        }
    }

    /// Shift the origin. Path points stay relative to it.
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Merge a style patch. A non-transparent background forces a solid fill
    /// unless the patch names a fill style itself.
    pub fn recolor(&mut self, update: &StyleUpdate) {
        if let Some(color) = update.stroke_color {
            self.stroke_color = color;
        }
        if let Some(color) = update.background_color {
            self.background_color = color;
            if !color.is_transparent() {
                self.fill_style = FillStyle::Solid;
            }
        }
        if let Some(fill_style) = update.fill_style {
            self.fill_style = fill_style;
        }
        if let Some(width) = update.stroke_width {
            self.stroke_width = width.max(0.0);
        }
    }

    /// Move one end of an arrow or line to an absolute position, keeping
    /// every other point where it is. Moving the start re-bases the origin
    /// so the first point stays at `(0, 0)`.
    pub fn set_endpoint(&mut self, end: PathEnd, absolute: Point) {
        let origin = self.origin();
        let Some(linear) = self.as_linear_mut() else {
            return;
        };
        if linear.points.is_empty() {
            return;
        }
        match end {
            PathEnd::End => {
                if let Some(last) = linear.points.last_mut() {
                    *last = (absolute - origin).to_point();
                }
            }
            PathEnd::Start => {
                let shift = origin - absolute;
                for point in linear.points.iter_mut().skip(1) {
                    *point += shift;
                }
                linear.points[0] = Point::ZERO;
                self.x = absolute.x;
                self.y = absolute.y;
            }
        }
    }

    /// Absolute position of one end of an arrow or line.
    pub fn endpoint(&self, end: PathEnd) -> Option<Point> {
        let points = self.as_linear()?.points.as_slice();
        let point = match end {
            PathEnd::Start => points.first(),
            PathEnd::End => points.last(),
        }?;
        Some(*point + self.origin().to_vec2())
    }

    /// Whether a freshly drawn element has no extent and should be discarded.
    /// Text never counts as empty.
    pub fn is_zero_extent(&self) -> bool {
        match &self.kind {
            ElementKind::Rectangle(b) | ElementKind::Diamond(b) | ElementKind::Ellipse(b) | ElementKind::Frame(b) => {
                b.width == 0.0 && b.height == 0.0
            }
            ElementKind::Image(i) => i.width == 0.0 && i.height == 0.0,
            ElementKind::Arrow(l) | ElementKind::Line(l) => match (l.points.first(), l.points.last()) {
                (Some(first), Some(last)) => first == last,
                _ => true,
            },
            ElementKind::Freedraw(f) => match f.points.first() {
                Some(first) => f.points.iter().all(|p| p == first),
                None => true,
            },
            ElementKind::Text(_) | ElementKind::Group(_) => false,
        }
    }

    /// Replace text content and re-derive the text box. No-op for other types.
    pub fn set_text(&mut self, text: impl Into<String>, line_height: f64) {
        if let ElementKind::Text(t) = &mut self.kind {
            t.set_text(text, line_height);
        }
    }

    /// Hand-drawn geometry for this element, regenerated only when its
    /// geometry or style changed since the last call.
    pub fn drawable(&self) -> Arc<Drawable> {
        self.drawable.get_or_generate(self)
    }

    /// Fingerprint of everything the drawable depends on. The origin is
    /// excluded since drawables are built relative to it.
    pub fn drawable_key(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.element_type().hash(&mut hasher);
        self.stroke_color.hash(&mut hasher);
        self.background_color.hash(&mut hasher);
        self.fill_style.hash(&mut hasher);
        self.stroke_width.to_bits().hash(&mut hasher);
        self.roughness.to_bits().hash(&mut hasher);
        self.seed.hash(&mut hasher);
        if let Some(size) = self.size() {
            size.width.to_bits().hash(&mut hasher);
            size.height.to_bits().hash(&mut hasher);
        }
        if let Some(points) = self.points() {
            for point in points {
                point.x.to_bits().hash(&mut hasher);
                point.y.to_bits().hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
