//! Attaching arrow and line endpoints to other elements.

use crate::element::{Element, ElementId, ElementKind, PathEnd};
use crate::geometry::bounds_of;
use crate::scene::Scene;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::TAU;

/// Focus recorded for every new binding.
pub const DEFAULT_FOCUS: f64 = 0.5;

fn default_focus() -> f64 {
    DEFAULT_FOCUS
}

/// Reference from an arrow or line endpoint to a spot on another element's outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "elementId", alias = "targetElementId")]
    pub element_id: ElementId,
    /// Position along the target's outline, in `[0, 1)`.
    #[serde(default = "default_focus")]
    pub focus: f64,
    /// Distance between the pointer and the outline when the binding was made.
    #[serde(default)]
    pub gap: f64,
}

impl Binding {
    pub fn new(element_id: ElementId, gap: f64) -> Self {
        Self {
            element_id,
            focus: DEFAULT_FOCUS,
            gap,
        }
    }
}

/// Point on the element's outline at `focus`, in the element's frame.
///
/// Boxes walk their perimeter clockwise from the top-left corner, ellipses
/// map focus to a parametric angle, diamonds are treated as a square of
/// half-diagonal `min(w, h) / 2` walked from the top vertex, and paths are
/// walked by arc length.
pub fn connection_point_at(element: &Element, focus: f64) -> Point {
    let focus = focus.rem_euclid(1.0);
    match &element.kind {
        ElementKind::Ellipse(_) => {
            let rect = bounds_of(element);
            let angle = focus * TAU;
            let center = rect.center();
            Point::new(
                center.x + rect.width() / 2.0 * angle.cos(),
                center.y + rect.height() / 2.0 * angle.sin(),
            )
        }
        ElementKind::Diamond(_) => {
            let corners = diamond_corners(bounds_of(element));
            let t = focus * 4.0;
            let side = (t.floor() as usize).min(3);
            corners[side].lerp(corners[(side + 1) % 4], t - side as f64)
        }
        ElementKind::Arrow(_) | ElementKind::Line(_) | ElementKind::Freedraw(_) => {
            walk_polyline(&element.absolute_points(), focus)
        }
        _ => walk_polyline(&closed_rect(bounds_of(element)), focus),
    }
}

/// Outline point closest to `point`, in the element's frame.
///
/// Boxes clamp to the rectangle and project onto the nearest edge; ellipses
/// and diamonds cast a ray from the centre through `point`.
pub fn nearest_connection_point(element: &Element, point: Point) -> Point {
    let rect = bounds_of(element);
    match &element.kind {
        ElementKind::Ellipse(_) | ElementKind::Diamond(_) => {
            let center = rect.center();
            let d = point - center;
            let (hw, hh) = (rect.width() / 2.0, rect.height() / 2.0);
            if d.hypot() < f64::EPSILON || hw <= 0.0 || hh <= 0.0 {
                return connection_point_at(element, 0.0);
            }
            let scale = if matches!(element.kind, ElementKind::Ellipse(_)) {
                1.0 / ((d.x / hw).powi(2) + (d.y / hh).powi(2)).sqrt()
            } else {
                let r = hw.min(hh);
                r / (d.x.abs() + d.y.abs())
            };
            center + d * scale
        }
        ElementKind::Arrow(_) | ElementKind::Line(_) | ElementKind::Freedraw(_) => {
            nearest_on_polyline(&element.absolute_points(), point)
        }
        _ => {
            let clamped = Point::new(point.x.clamp(rect.x0, rect.x1), point.y.clamp(rect.y0, rect.y1));
            let edges = [
                (clamped.x - rect.x0, Point::new(rect.x0, clamped.y)),
                (rect.x1 - clamped.x, Point::new(rect.x1, clamped.y)),
                (clamped.y - rect.y0, Point::new(clamped.x, rect.y0)),
                (rect.y1 - clamped.y, Point::new(clamped.x, rect.y1)),
            ];
            edges
                .into_iter()
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, p)| p)
                .unwrap_or(clamped)
        }
    }
}

/// Topmost element whose bounds, grown by `tolerance`, contain `point`.
///
/// Looser than click hit-testing; used to discover binding targets.
pub fn find_element_at<'a>(
    point: Point,
    elements: impl DoubleEndedIterator<Item = &'a Element>,
    tolerance: f64,
) -> Option<&'a Element> {
    elements
        .rev()
        .find(|element| bounds_of(element).inflate(tolerance, tolerance).contains(point))
}

/// Look for a binding target near `point`.
///
/// Returns the binding to record and the snapped endpoint position. Arrows
/// and lines are never targets, and neither is `exclude`.
pub fn probe_binding(scene: &Scene, point: Point, exclude: Option<&ElementId>, tolerance: f64) -> Option<(Binding, Point)> {
    let candidates = scene
        .ordered()
        .filter(|element| Some(&element.id) != exclude && element.as_linear().is_none());
    let target = find_element_at(point, candidates, tolerance)?;
    let gap = (point - nearest_connection_point(target, point)).hypot();
    let binding = Binding::new(target.id.clone(), gap);
    let snapped = connection_point_at(target, binding.focus);
    Some((binding, snapped))
}

/// Move every endpoint bound to one of `moved` (or to something nested in
/// one of them) onto its target's current outline. The other endpoint keeps
/// its absolute position. Arrows and lines nested in groups are updated in
/// their group's frame. Returns how many endpoints were updated.
pub fn reanchor(scene: &mut Scene, moved: &[ElementId]) -> usize {
    let affected: HashSet<ElementId> = moved.iter().flat_map(|id| scene.descendant_ids(id)).collect();
    if affected.is_empty() {
        return 0;
    }

    let mut updates = Vec::new();
    scene.visit_with_offset(&mut |element, offset| {
        let Some(linear) = element.as_linear() else {
            return;
        };
        for end in [PathEnd::Start, PathEnd::End] {
            let Some(binding) = linear.binding(end) else {
                continue;
            };
            if !affected.contains(&binding.element_id) {
                continue;
            }
            if let Some(target) = scene.locate(&binding.element_id) {
                let anchor = connection_point_at(&target, binding.focus) - offset;
                updates.push((element.id.clone(), end, anchor));
            }
        }
    });

    let count = updates.len();
    for (id, end, point) in updates {
        if let Some(element) = scene.find_mut(&id) {
            element.set_endpoint(end, point);
        }
    }
    if count > 0 {
        log::debug!("Re-anchored {count} bound endpoint(s)");
    }
    count
}

/// Clear bindings of moved arrows and lines, nested ones included, whose
/// target stayed behind.
pub fn release_detached(scene: &mut Scene, moved: &[ElementId]) -> usize {
    let moved_set: HashSet<ElementId> = moved.iter().flat_map(|id| scene.descendant_ids(id)).collect();
    let mut released = 0;
    for id in moved {
        scene.visit_subtree_mut(id, &mut |element| {
            let Some(linear) = element.as_linear_mut() else {
                return;
            };
            for end in [PathEnd::Start, PathEnd::End] {
                let slot = linear.binding_mut(end);
                if slot.as_ref().is_some_and(|binding| !moved_set.contains(&binding.element_id)) {
                    *slot = None;
                    released += 1;
                }
            }
        });
    }
    released
}

/// Drop every binding whose target no longer exists. Returns how many were cleared.
pub fn clear_stale_bindings(scene: &mut Scene) -> usize {
    let mut live = HashSet::new();
    for id in scene.ordered_ids() {
        live.extend(scene.descendant_ids(id));
    }

    let mut cleared = 0;
    scene.visit_mut(&mut |element| {
        if let Some(linear) = element.as_linear_mut() {
            for end in [PathEnd::Start, PathEnd::End] {
                let slot = linear.binding_mut(end);
                if slot.as_ref().is_some_and(|binding| !live.contains(&binding.element_id)) {
                    *slot = None;
                    cleared += 1;
                }
            }
        }
    });
    cleared
}

fn diamond_corners(rect: Rect) -> [Point; 4] {
    let center = rect.center();
    let r = rect.width().min(rect.height()) / 2.0;
    [
        center + Vec2::new(0.0, -r),
        center + Vec2::new(r, 0.0),
        center + Vec2::new(0.0, r),
        center + Vec2::new(-r, 0.0),
    ]
}

fn closed_rect(rect: Rect) -> [Point; 5] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
        Point::new(rect.x0, rect.y0),
    ]
}

/// Point at fraction `t` of the polyline's length.
fn walk_polyline(points: &[Point], t: f64) -> Point {
    let Some(first) = points.first() else {
        return Point::ZERO;
    };
    let total: f64 = points.windows(2).map(|w| (w[1] - w[0]).hypot()).sum();
    if total < f64::EPSILON {
        return *first;
    }
    let mut remaining = t * total;
    for w in points.windows(2) {
        let len = (w[1] - w[0]).hypot();
        if remaining <= len && len > 0.0 {
            return w[0].lerp(w[1], remaining / len);
        }
        remaining -= len;
    }
    points[points.len() - 1]
}

fn nearest_on_polyline(points: &[Point], point: Point) -> Point {
    match points {
        [] => point,
        [only] => *only,
        _ => points
            .windows(2)
            .map(|w| {
                let seg = w[1] - w[0];
                let len_sq = seg.hypot2();
                let t = if len_sq < f64::EPSILON {
                    0.0
                } else {
                    ((point - w[0]).dot(seg) / len_sq).clamp(0.0, 1.0)
                };
                w[0] + seg * t
            })
            .min_by(|a, b| (point - *a).hypot().total_cmp(&(point - *b).hypot()))
            .unwrap_or(point),
    }
}
