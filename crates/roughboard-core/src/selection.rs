//! Selection set and resize handles.

use crate::element::{Element, ElementId, ElementKind, PathEnd};
use crate::geometry::points_bounds;
use crate::scene::Scene;
use kurbo::{Point, Rect};

/// Ordered set of selected element ids. Never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.ids.contains(id)
    }

    /// The selected id when exactly one element is selected.
    pub fn single(&self) -> Option<&ElementId> {
        match self.ids.as_slice() {
            [id] => Some(id),
            _ => None,
        }
    }

    pub fn select_only(&mut self, id: ElementId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn add(&mut self, id: ElementId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: &ElementId) {
        self.ids.retain(|existing| existing != id);
    }

    /// Add the id if absent, remove it if present.
    pub fn toggle(&mut self, id: ElementId) {
        if self.ids.contains(&id) {
            self.remove(&id);
        } else {
            self.ids.push(id);
        }
    }

    /// Replace the whole set, dropping duplicates.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer name a top-level element.
    pub fn retain_existing(&mut self, scene: &Scene) {
        self.ids.retain(|id| scene.contains(id));
    }
}

/// Resize handle positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    /// First point of an arrow or line.
    Start,
    /// Last point of an arrow or line.
    End,
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Square hit box of side `size` centred on the handle.
    pub fn hit_test(&self, point: Point, size: f64) -> bool {
        let half = size / 2.0;
        (point.x - self.position.x).abs() <= half && (point.y - self.position.y).abs() <= half
    }
}

/// Handles for a top-level element.
///
/// Boxes get eight handles on their (signed) outline, arrows and lines get
/// their two endpoints, freedraw shows its bounding-box corners, and text
/// and groups get none.
pub fn get_handles(element: &Element) -> Vec<Handle> {
    match &element.kind {
        ElementKind::Rectangle(_)
        | ElementKind::Diamond(_)
        | ElementKind::Ellipse(_)
        | ElementKind::Image(_)
        | ElementKind::Frame(_) => {
            let Some(size) = element.size() else {
                return Vec::new();
            };
            let (x0, y0) = (element.x, element.y);
            let (x1, y1) = (x0 + size.width, y0 + size.height);
            let (xm, ym) = (x0 + size.width / 2.0, y0 + size.height / 2.0);
            vec![
                Handle::new(Point::new(x0, y0), HandleKind::NorthWest),
                Handle::new(Point::new(xm, y0), HandleKind::North),
                Handle::new(Point::new(x1, y0), HandleKind::NorthEast),
                Handle::new(Point::new(x1, ym), HandleKind::East),
                Handle::new(Point::new(x1, y1), HandleKind::SouthEast),
                Handle::new(Point::new(xm, y1), HandleKind::South),
                Handle::new(Point::new(x0, y1), HandleKind::SouthWest),
                Handle::new(Point::new(x0, ym), HandleKind::West),
            ]
        }
        ElementKind::Arrow(_) | ElementKind::Line(_) => [PathEnd::Start, PathEnd::End]
            .into_iter()
            .filter_map(|end| {
                let kind = match end {
                    PathEnd::Start => HandleKind::Start,
                    PathEnd::End => HandleKind::End,
                };
                element.endpoint(end).map(|p| Handle::new(p, kind))
            })
            .collect(),
        ElementKind::Freedraw(_) => match points_bounds(&element.absolute_points()) {
            Some(Rect { x0, y0, x1, y1 }) => vec![
                Handle::new(Point::new(x0, y0), HandleKind::NorthWest),
                Handle::new(Point::new(x1, y0), HandleKind::NorthEast),
                Handle::new(Point::new(x1, y1), HandleKind::SouthEast),
                Handle::new(Point::new(x0, y1), HandleKind::SouthWest),
            ],
            None => Vec::new(),
        },
        ElementKind::Text(_) | ElementKind::Group(_) => Vec::new(),
    }
}

/// Find which handle (if any) is hit at the given point.
/// `size` is the hit box side in world units (screen size divided by zoom).
pub fn hit_test_handles(element: &Element, point: Point, size: f64) -> Option<HandleKind> {
    get_handles(element)
        .into_iter()
        .find(|handle| handle.hit_test(point, size))
        .map(|handle| handle.kind)
}

/// Resize `original` by dragging `handle` to `point`.
///
/// Box handles move only the edges they own. `Start`/`End` move that end of
/// an arrow or line. Freedraw is left unchanged.
pub fn apply_resize(original: &Element, handle: HandleKind, point: Point) -> Element {
    let mut element = original.clone();
    match handle {
        HandleKind::Start => element.set_endpoint(PathEnd::Start, point),
        HandleKind::End => element.set_endpoint(PathEnd::End, point),
        _ => {
            let Some(size) = original.size() else {
                return element;
            };
            if !element.is_box() || element.as_text().is_some() {
                return element;
            }
            let (mut x0, mut y0) = (original.x, original.y);
            let (mut x1, mut y1) = (x0 + size.width, y0 + size.height);
            let (west, east, north, south) = edges_of(handle);
            if west {
                x0 = point.x;
            }
            if east {
                x1 = point.x;
            }
            if north {
                y0 = point.y;
            }
            if south {
                y1 = point.y;
            }
            element.x = x0;
            element.y = y0;
            element.set_size(x1 - x0, y1 - y0);
        }
    }
    element
}

/// Which edges (west, east, north, south) a box handle drags.
fn edges_of(handle: HandleKind) -> (bool, bool, bool, bool) {
    match handle {
        HandleKind::NorthWest => (true, false, true, false),
        HandleKind::North => (false, false, true, false),
        HandleKind::NorthEast => (false, true, true, false),
        HandleKind::East => (false, true, false, false),
        HandleKind::SouthEast => (false, true, false, true),
        HandleKind::South => (false, false, false, true),
        HandleKind::SouthWest => (true, false, false, true),
        HandleKind::West => (true, false, false, false),
        HandleKind::Start | HandleKind::End => (false, false, false, false),
    }
}
