//! Hit-testing and bounds for elements.

use crate::element::{Element, ElementKind};
use kurbo::{Point, Rect, Vec2};

/// Distance from a point to a line segment (a→b).
pub fn distance_point_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
/// A single point degenerates to the distance to that point.
pub fn distance_point_to_polyline(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => points
            .windows(2)
            .map(|w| distance_point_to_segment(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Axis-aligned box spanned by an origin and a signed size.
pub fn normalized_rect(origin: Point, width: f64, height: f64) -> Rect {
    Rect::new(origin.x, origin.y, origin.x + width, origin.y + height).abs()
}

/// Containment in a box, diamond or ellipse inscribed in `rect`.
/// Zero-area boxes never contain anything.
fn box_contains(kind: &ElementKind, rect: Rect, point: Point) -> bool {
    if rect.width() == 0.0 || rect.height() == 0.0 {
        return false;
    }
    let center = rect.center();
    let hw = rect.width() / 2.0;
    let hh = rect.height() / 2.0;
    let d = point - center;
    match kind {
        ElementKind::Diamond(_) => d.x.abs() / hw + d.y.abs() / hh <= 1.0,
        ElementKind::Ellipse(_) => (d.x / hw).powi(2) + (d.y / hh).powi(2) <= 1.0,
        _ => point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1,
    }
}

/// Whether `point` (world coordinates, same frame as the element) hits the element.
///
/// Path types match when any segment is strictly closer than `tolerance`;
/// a path with fewer than two points has no segments and never matches.
/// Groups match anywhere inside their bounding box.
pub fn point_in_element(point: Point, element: &Element, tolerance: f64) -> bool {
    match &element.kind {
        ElementKind::Arrow(_) | ElementKind::Line(_) | ElementKind::Freedraw(_) => {
            let points = element.absolute_points();
            points.len() >= 2 && distance_point_to_polyline(point, &points) < tolerance
        }
        kind => match element.size() {
            Some(size) => box_contains(kind, normalized_rect(element.origin(), size.width, size.height), point),
            None => false,
        },
    }
}

/// Normalized bounding box of an element in its parent frame.
pub fn bounds_of(element: &Element) -> Rect {
    match element.size() {
        Some(size) => normalized_rect(element.origin(), size.width, size.height),
        None => points_bounds(&element.absolute_points()).unwrap_or_else(|| Rect::from_origin_size(element.origin(), (0.0, 0.0))),
    }
}

/// Bounding box of a point set.
pub fn points_bounds(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(rest.iter().fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p)))
}

/// Union of the bounds of several elements.
pub fn union_bounds<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Option<Rect> {
    elements.into_iter().map(bounds_of).reduce(|acc, b| acc.union(b))
}

/// Inclusive overlap test that also accepts degenerate (zero-width) boxes.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Unit normal to the left of a direction, or zero for a null vector.
pub fn left_normal(direction: Vec2) -> Vec2 {
    let len = direction.hypot();
    if len < f64::EPSILON {
        Vec2::ZERO
    } else {
        Vec2::new(-direction.y / len, direction.x / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ActiveStyle, ElementId, ElementType};

    fn make(element_type: ElementType, start: (f64, f64), end: (f64, f64)) -> Element {
        Element::create(element_type, start.into(), end.into(), &ActiveStyle::default())
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_point_to_segment(Point::new(5.0, 3.0), a, b) - 3.0).abs() < f64::EPSILON);
        assert!((distance_point_to_segment(Point::new(-3.0, 4.0), a, b) - 5.0).abs() < f64::EPSILON);
        assert!((distance_point_to_segment(Point::new(13.0, 4.0), a, b) - 5.0).abs() < f64::EPSILON);
        assert!((distance_point_to_segment(Point::new(3.0, 4.0), a, a) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_center_is_inside_every_type() {
        let elements = [
            make(ElementType::Rectangle, (10.0, 10.0), (110.0, 60.0)),
            make(ElementType::Diamond, (10.0, 10.0), (110.0, 60.0)),
            make(ElementType::Ellipse, (10.0, 10.0), (110.0, 60.0)),
            make(ElementType::Frame, (10.0, 10.0), (110.0, 60.0)),
            make(ElementType::Rectangle, (110.0, 60.0), (10.0, 10.0)),
            make(ElementType::Text, (10.0, 10.0), (10.0, 10.0)),
            make(ElementType::Image, (10.0, 10.0), (10.0, 10.0)),
            make(ElementType::Arrow, (10.0, 10.0), (110.0, 60.0)),
            make(ElementType::Line, (10.0, 60.0), (110.0, 10.0)),
            Element::group(ElementId::from("g"), Rect::new(0.0, 0.0, 40.0, 40.0), Vec::new()),
        ];
        for element in &elements {
            let bounds = bounds_of(element);
            assert!(
                point_in_element(bounds.center(), element, 10.0),
                "center should hit {}",
                element.element_type()
            );
            let far = Point::new(bounds.x1 + 1000.0, bounds.center().y);
            assert!(!point_in_element(far, element, 10.0));
        }
    }

    #[test]
    fn test_freedraw_hit() {
        let mut pen = make(ElementType::Freedraw, (0.0, 0.0), (0.0, 0.0));
        pen.update_drag_dimensions(Point::new(50.0, 0.0));
        pen.update_drag_dimensions(Point::new(100.0, 0.0));
        assert!(point_in_element(Point::new(50.0, 9.0), &pen, 10.0));
        assert!(!point_in_element(Point::new(50.0, 10.0), &pen, 10.0));
    }

    #[test]
    fn test_single_point_freedraw_has_no_segments() {
        let dot = make(ElementType::Freedraw, (40.0, 40.0), (40.0, 40.0));
        assert_eq!(dot.absolute_points(), vec![Point::new(40.0, 40.0)]);
        assert!(!point_in_element(Point::new(40.0, 40.0), &dot, 10.0));
        assert!(!point_in_element(Point::new(45.0, 40.0), &dot, 10.0));
    }

    #[test]
    fn test_diamond_corners_are_outside() {
        let diamond = make(ElementType::Diamond, (0.0, 0.0), (100.0, 100.0));
        assert!(!point_in_element(Point::new(5.0, 5.0), &diamond, 10.0));
        assert!(point_in_element(Point::new(50.0, 1.0), &diamond, 10.0));
    }

    #[test]
    fn test_ellipse_corner_is_outside() {
        let ellipse = make(ElementType::Ellipse, (0.0, 0.0), (100.0, 50.0));
        assert!(!point_in_element(Point::new(2.0, 2.0), &ellipse, 10.0));
        assert!(point_in_element(Point::new(99.0, 25.0), &ellipse, 10.0));
    }

    #[test]
    fn test_zero_area_never_matches() {
        let flat = make(ElementType::Rectangle, (0.0, 0.0), (100.0, 0.0));
        assert!(!point_in_element(Point::new(50.0, 0.0), &flat, 10.0));
        let thin = make(ElementType::Ellipse, (0.0, 0.0), (0.0, 100.0));
        assert!(!point_in_element(Point::new(0.0, 50.0), &thin, 10.0));
    }

    #[test]
    fn test_bounds_normalizes() {
        let rect = make(ElementType::Rectangle, (100.0, 100.0), (50.0, 20.0));
        assert_eq!(bounds_of(&rect), Rect::new(50.0, 20.0, 100.0, 100.0));

        let line = make(ElementType::Line, (100.0, 100.0), (50.0, 150.0));
        assert_eq!(bounds_of(&line), Rect::new(50.0, 100.0, 100.0, 150.0));
    }

    #[test]
    fn test_overlap_accepts_degenerate() {
        let marquee = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(rects_overlap(marquee, Rect::new(50.0, 50.0, 150.0, 50.0)));
        assert!(!rects_overlap(marquee, Rect::new(101.0, 0.0, 150.0, 50.0)));
    }

    #[test]
    fn test_union_bounds() {
        let a = make(ElementType::Rectangle, (0.0, 0.0), (10.0, 10.0));
        let b = make(ElementType::Ellipse, (20.0, -5.0), (30.0, 5.0));
        assert_eq!(union_bounds([&a, &b]), Some(Rect::new(0.0, -5.0, 30.0, 10.0)));
        assert_eq!(union_bounds(std::iter::empty()), None);
    }
}
