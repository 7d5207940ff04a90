//! Hand-drawn geometry generated for each element and cached on it.
//!
//! Drawables are built in the element's own frame (origin at the element's
//! `(x, y)`), so moving an element, panning or zooming never invalidates them.

use crate::element::{Element, ElementKind, FillStyle, SerializableColor};
use crate::geometry::{left_normal, normalized_rect};
use kurbo::{BezPath, Circle, Ellipse, Line, PathEl, Point, Rect, Shape, Vec2};
use std::sync::{Arc, RwLock};

/// Length of each arrowhead barb.
pub const ARROWHEAD_LENGTH: f64 = 15.0;
/// Angle between an arrowhead barb and the final segment.
pub const ARROWHEAD_ANGLE: f64 = std::f64::consts::FRAC_PI_6;
/// Hachure line angle in degrees (roughjs default).
const HACHURE_ANGLE: f64 = -41.0;
/// Points used to approximate an ellipse outline for fill clipping.
const ELLIPSE_SEGMENTS: usize = 36;
/// Fraction of the distance towards each new point a freedraw stroke moves.
const STREAMLINE: f64 = 0.5;

/// One piece of a drawable.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawablePart {
    Fill {
        path: BezPath,
        color: SerializableColor,
    },
    Stroke {
        path: BezPath,
        color: SerializableColor,
        width: f64,
        dashed: bool,
    },
}

/// Cached hand-drawn geometry for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drawable {
    pub parts: Vec<DrawablePart>,
}

impl Drawable {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn fill(&mut self, path: BezPath, color: SerializableColor) {
        self.parts.push(DrawablePart::Fill { path, color });
    }

    fn stroke(&mut self, path: BezPath, color: SerializableColor, width: f64, dashed: bool) {
        self.parts.push(DrawablePart::Stroke {
            path,
            color,
            width,
            dashed,
        });
    }
}

/// Memo slot stored on every element, keyed on [`Element::drawable_key`].
#[derive(Default)]
pub struct DrawableCache {
    slot: RwLock<Option<(u64, Arc<Drawable>)>>,
}

impl DrawableCache {
    pub(crate) fn get_or_generate(&self, element: &Element) -> Arc<Drawable> {
        let key = element.drawable_key();
        if let Ok(slot) = self.slot.read() {
            if let Some((cached_key, drawable)) = slot.as_ref() {
                if *cached_key == key {
                    return Arc::clone(drawable);
                }
            }
        }

        let drawable = Arc::new(generate(element));
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some((key, Arc::clone(&drawable)));
        }
        drawable
    }

    /// Whether a drawable for exactly this key is cached.
    pub fn is_cached(&self, key: u64) -> bool {
        self.slot
            .read()
            .map(|slot| matches!(slot.as_ref(), Some((k, _)) if *k == key))
            .unwrap_or(false)
    }
}

impl Clone for DrawableCache {
    fn clone(&self) -> Self {
        let slot = self.slot.read().map(|slot| slot.clone()).unwrap_or(None);
        Self {
            slot: RwLock::new(slot),
        }
    }
}

impl std::fmt::Debug for DrawableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = self.slot.read().ok().and_then(|slot| slot.as_ref().map(|(k, _)| *k));
        f.debug_struct("DrawableCache").field("key", &key).finish()
    }
}

/// Simple xorshift32 PRNG for deterministic randomness.
struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Random float in range [-1, 1]
    fn next_f64(&mut self) -> f64 {
        (self.next_u32() as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    fn offset(&mut self, amount: f64) -> f64 {
        self.next_f64() * amount
    }
}

/// Apply the hand-drawn effect to a path.
///
/// Endpoints are randomly offset (lines overshoot at corners) and straight
/// segments get a slight bow. `stroke_index` selects an independent random
/// sequence so repeated strokes of the same path differ.
pub fn apply_hand_drawn_effect(path: &BezPath, roughness: f64, seed: u32, stroke_index: u32) -> BezPath {
    if roughness <= 0.0 {
        return path.clone();
    }

    let max_randomness_offset = roughness * 2.0;
    let bowing = roughness;
    let mut rng = SimpleRng::new(seed.wrapping_add(stroke_index.wrapping_mul(99991)));
    let mut jitter = |p: Point, amount: f64| Point::new(p.x + rng.offset(amount), p.y + rng.offset(amount));

    let mut result = BezPath::new();
    let mut last_point = Point::ZERO;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                result.move_to(jitter(p, max_randomness_offset));
                last_point = p;
            }
            PathEl::LineTo(p) => {
                let d = p - last_point;
                let len = d.hypot();
                let perp = left_normal(d);
                let bow = jitter(Point::ZERO, bowing * roughness * len / 200.0).x;
                let mid = last_point.midpoint(p) + perp * bow;
                let end = jitter(p, max_randomness_offset);
                result.quad_to(mid, end);
                last_point = p;
            }
            PathEl::QuadTo(p1, p2) => {
                result.quad_to(jitter(p1, max_randomness_offset * 0.7), jitter(p2, max_randomness_offset));
                last_point = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                result.curve_to(
                    jitter(p1, max_randomness_offset * 0.5),
                    jitter(p2, max_randomness_offset * 0.5),
                    jitter(p3, max_randomness_offset),
                );
                last_point = p3;
            }
            PathEl::ClosePath => result.close_path(),
        }
    }

    result
}

/// Closed polygon path through `points`.
pub fn polygon_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

/// Open polyline path through `points`.
pub fn polyline_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
    }
    path
}

/// Corners of the diamond inscribed in `rect`: top, right, bottom, left.
pub fn diamond_points(rect: Rect) -> [Point; 4] {
    let center = rect.center();
    [
        Point::new(center.x, rect.y0),
        Point::new(rect.x1, center.y),
        Point::new(center.x, rect.y1),
        Point::new(rect.x0, center.y),
    ]
}

fn rect_points(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}

fn ellipse_points(rect: Rect) -> Vec<Point> {
    let center = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let angle = i as f64 / ELLIPSE_SEGMENTS as f64 * std::f64::consts::TAU;
            Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
        })
        .collect()
}

/// Parallel fill lines at `angle_degrees`, `gap` apart, clipped to a polygon
/// with an even-odd scanline.
pub fn hachure_lines(polygon: &[Point], gap: f64, angle_degrees: f64) -> Vec<Line> {
    if polygon.len() < 3 || gap <= 0.0 {
        return Vec::new();
    }

    let rotate = kurbo::Affine::rotate(angle_degrees.to_radians());
    let unrotate = rotate.inverse();
    let pts: Vec<Point> = polygon.iter().map(|p| unrotate * *p).collect();
    let min_y = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let mut lines = Vec::new();
    let mut y = min_y + gap / 2.0;
    while y < max_y {
        let mut xs: Vec<f64> = pts
            .iter()
            .zip(pts.iter().cycle().skip(1))
            .filter(|(a, b)| (a.y <= y && b.y > y) || (b.y <= y && a.y > y))
            .map(|(a, b)| a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x))
            .collect();
        xs.sort_by(f64::total_cmp);
        for pair in xs.chunks_exact(2) {
            lines.push(Line::new(rotate * Point::new(pair[0], y), rotate * Point::new(pair[1], y)));
        }
        y += gap;
    }
    lines
}

/// Closed, filled outline of a freehand stroke of the given width.
///
/// Points are streamline-smoothed, offset along their normals by half the
/// width and joined with round caps. Width does not depend on pressure.
pub fn freedraw_outline(points: &[Point], width: f64) -> BezPath {
    let radius = (width / 2.0).max(0.5);

    let mut smoothed: Vec<Point> = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let next = match smoothed.last() {
            Some(prev) if i + 1 < points.len() => prev.lerp(*p, 1.0 - STREAMLINE),
            _ => *p,
        };
        if smoothed.last().is_none_or(|prev| (next - *prev).hypot() > 0.01) {
            smoothed.push(next);
        }
    }

    if smoothed.len() < 2 {
        let center = smoothed.first().or(points.first()).copied().unwrap_or(Point::ZERO);
        return Circle::new(center, radius).to_path(0.1);
    }

    let normals: Vec<Vec2> = (0..smoothed.len())
        .map(|i| {
            let prev = smoothed[i.saturating_sub(1)];
            let next = smoothed[(i + 1).min(smoothed.len() - 1)];
            left_normal(next - prev)
        })
        .collect();

    let left: Vec<Point> = smoothed.iter().zip(&normals).map(|(p, n)| *p + *n * radius).collect();
    let right: Vec<Point> = smoothed.iter().zip(&normals).map(|(p, n)| *p - *n * radius).collect();

    let mut path = BezPath::new();
    path.move_to(left[0]);
    for p in &left[1..] {
        path.line_to(*p);
    }
    round_cap(&mut path, smoothed[smoothed.len() - 1], normals[normals.len() - 1], radius);
    for p in right.iter().rev().skip(1) {
        path.line_to(*p);
    }
    round_cap(&mut path, smoothed[0], -normals[0], radius);
    path.close_path();
    path
}

/// Half circle from `center + normal * radius` to `center - normal * radius`,
/// bulging forward along the stroke direction.
fn round_cap(path: &mut BezPath, center: Point, normal: Vec2, radius: f64) {
    const STEPS: usize = 6;
    let forward = Vec2::new(normal.y, -normal.x);
    for step in 1..=STEPS {
        let angle = step as f64 / STEPS as f64 * std::f64::consts::PI;
        let offset = normal * angle.cos() + forward * angle.sin();
        path.line_to(center + offset * radius);
    }
}

/// The two barbs of an arrowhead at the end of `points`.
pub fn arrowhead(points: &[Point]) -> Option<BezPath> {
    let [.., from, tip] = points else {
        return None;
    };
    let d = *tip - *from;
    if d.hypot() < f64::EPSILON {
        return None;
    }
    let angle = d.y.atan2(d.x);
    let barb = |a: f64| *tip - Vec2::new(a.cos(), a.sin()) * ARROWHEAD_LENGTH;
    let mut path = BezPath::new();
    path.move_to(barb(angle - ARROWHEAD_ANGLE));
    path.line_to(*tip);
    path.line_to(barb(angle + ARROWHEAD_ANGLE));
    Some(path)
}

/// Build the drawable for an element in its own frame.
pub fn generate(element: &Element) -> Drawable {
    let mut drawable = Drawable::default();
    let width = element.stroke_width;

    match &element.kind {
        ElementKind::Rectangle(_) | ElementKind::Frame(_) | ElementKind::Image(_) => {
            if let Some(rect) = local_rect(element) {
                let outline = rect_points(rect);
                add_fill(&mut drawable, element, &outline, polygon_path(&outline));
                add_stroke(&mut drawable, element, &polygon_path(&outline), width);
            }
        }
        ElementKind::Diamond(_) => {
            if let Some(rect) = local_rect(element) {
                let outline = diamond_points(rect);
                add_fill(&mut drawable, element, &outline, polygon_path(&outline));
                add_stroke(&mut drawable, element, &polygon_path(&outline), width);
            }
        }
        ElementKind::Ellipse(_) => {
            if let Some(rect) = local_rect(element) {
                let path = Ellipse::from_rect(rect).to_path(0.1);
                add_fill(&mut drawable, element, &ellipse_points(rect), path.clone());
                add_stroke(&mut drawable, element, &path, width);
            }
        }
        ElementKind::Arrow(linear) => {
            add_stroke(&mut drawable, element, &polyline_path(&linear.points), width);
            if let Some(head) = arrowhead(&linear.points) {
                add_stroke(&mut drawable, element, &head, width);
            }
        }
        ElementKind::Line(linear) => {
            add_stroke(&mut drawable, element, &polyline_path(&linear.points), width);
        }
        ElementKind::Freedraw(pen) => {
            drawable.fill(freedraw_outline(&pen.points, width), element.stroke_color);
        }
        ElementKind::Group(group) => {
            let rect = Rect::new(0.0, 0.0, group.width, group.height);
            drawable.stroke(rect.to_path(0.1), element.stroke_color, width, true);
        }
        ElementKind::Text(_) => {}
    }

    drawable
}

fn local_rect(element: &Element) -> Option<Rect> {
    let size = element.size()?;
    Some(normalized_rect(Point::ZERO, size.width, size.height))
}

fn add_fill(drawable: &mut Drawable, element: &Element, outline: &[Point], path: BezPath) {
    let color = element.background_color;
    if color.is_transparent() {
        return;
    }
    let gap = (element.stroke_width * 4.0).max(2.0);
    let hachure = |angle: f64| {
        let mut lines = BezPath::new();
        for line in hachure_lines(outline, gap, angle) {
            lines.move_to(line.p0);
            lines.line_to(line.p1);
        }
        lines
    };

    match element.fill_style {
        FillStyle::Solid => {
            let path = apply_hand_drawn_effect(&path, element.roughness * 0.3, element.seed, 0);
            drawable.fill(path, color);
        }
        FillStyle::CrossHatch => {
            for (index, angle) in [HACHURE_ANGLE, HACHURE_ANGLE + 90.0].into_iter().enumerate() {
                let lines = apply_hand_drawn_effect(&hachure(angle), element.roughness, element.seed, 2 + index as u32);
                drawable.stroke(lines, color, element.stroke_width / 2.0, false);
            }
        }
        FillStyle::Hachure | FillStyle::Zigzag | FillStyle::Dots | FillStyle::Dashed | FillStyle::ZigzagLine => {
            let lines = apply_hand_drawn_effect(&hachure(HACHURE_ANGLE), element.roughness, element.seed, 2);
            drawable.stroke(lines, color, element.stroke_width / 2.0, false);
        }
    }
}

fn add_stroke(drawable: &mut Drawable, element: &Element, path: &BezPath, width: f64) {
    if element.roughness > 0.0 {
        for stroke_index in 0..2 {
            let rough = apply_hand_drawn_effect(path, element.roughness, element.seed, stroke_index);
            drawable.stroke(rough, element.stroke_color, width, false);
        }
    } else {
        drawable.stroke(path.clone(), element.stroke_color, width, false);
    }
}
