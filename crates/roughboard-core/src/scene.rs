//! Scene storage and the interchange record.

use crate::binding;
use crate::config::GRID_SIZE;
use crate::element::{Element, ElementId, SerializableColor};
use crate::error::{SceneError, SceneResult};
use crate::geometry::{bounds_of, point_in_element, rects_overlap};
use crate::grouping;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

fn default_background() -> SerializableColor {
    SerializableColor::white()
}

fn default_grid_size() -> Option<f64> {
    Some(GRID_SIZE)
}

/// Serialized form of a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneData {
    pub elements: Vec<Element>,
    #[serde(default = "default_background")]
    pub background_color: SerializableColor,
    /// Grid spacing, or `None` when the grid is hidden.
    #[serde(default = "default_grid_size")]
    pub grid_size: Option<f64>,
}

impl Default for SceneData {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            background_color: default_background(),
            grid_size: default_grid_size(),
        }
    }
}

impl SceneData {
    /// Parse an interchange document.
    ///
    /// Accepts a few omissions older documents make: arrows and lines
    /// without `points` get a two-point path spanning their box, freedraw
    /// gets a single point, and the background may come from
    /// `appState.viewBackgroundColor`.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| SceneError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> SceneResult<Self> {
        let Some(root) = value.as_object_mut() else {
            return Err(SceneError::InvalidJson("top level must be an object".to_string()));
        };
        let raw_elements = match root.remove("elements") {
            None => return Err(SceneError::MissingElements),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(SceneError::ElementsNotArray),
        };

        let mut elements = Vec::with_capacity(raw_elements.len());
        for (index, mut raw) in raw_elements.into_iter().enumerate() {
            patch_element(&mut raw);
            let element = serde_json::from_value::<Element>(raw).map_err(|e| SceneError::InvalidElement {
                index,
                message: e.to_string(),
            })?;
            elements.push(element);
        }

        let app_state = root.get("appState").and_then(Value::as_object);
        let background = root
            .get("backgroundColor")
            .or_else(|| app_state.and_then(|state| state.get("viewBackgroundColor")))
            .and_then(Value::as_str)
            .map(|s| {
                SerializableColor::parse(s).unwrap_or_else(|| {
                    log::warn!("Unparseable background colour {s:?}, using white");
                    default_background()
                })
            })
            .unwrap_or_else(default_background);
        let grid_size = match root.get("gridSize").or_else(|| app_state.and_then(|state| state.get("gridSize"))) {
            None => default_grid_size(),
            Some(value) => value.as_f64().filter(|size| *size > 0.0),
        };

        Ok(Self {
            elements,
            background_color: background,
            grid_size,
        })
    }

    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Serialization(e.to_string()))
    }
}

/// Fill in fields a lenient loader tolerates being absent.
fn patch_element(raw: &mut Value) {
    let Some(object) = raw.as_object_mut() else {
        return;
    };
    let number = |object: &Map<String, Value>, key: &str| object.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    let kind = object.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some("arrow" | "line") if !object.contains_key("points") => {
            let (width, height) = (number(object, "width"), number(object, "height"));
            object.insert("points".to_string(), json!([[0.0, 0.0], [width, height]]));
        }
        Some("freedraw") if !object.contains_key("points") => {
            object.insert("points".to_string(), json!([[0.0, 0.0]]));
        }
        Some("group") => {
            if let Some(Value::Array(children)) = object.get_mut("children") {
                children.iter_mut().for_each(patch_element);
            }
        }
        _ => {}
    }
}

/// All elements of a drawing, keyed by id, with a separate z-order.
#[derive(Debug, Clone)]
pub struct Scene {
    elements: HashMap<ElementId, Element>,
    /// Top-level ids, back to front.
    z_order: Vec<ElementId>,
    pub background_color: SerializableColor,
    pub grid_size: Option<f64>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            z_order: Vec::new(),
            background_color: default_background(),
            grid_size: default_grid_size(),
        }
    }

    /// Build a scene from interchange data.
    ///
    /// Rejects duplicate ids anywhere in the tree. Afterwards flat
    /// `groupId` tags are folded into nested groups and bindings to
    /// missing elements are cleared.
    pub fn from_data(data: SceneData) -> SceneResult<Self> {
        let mut seen = HashSet::new();
        for element in &data.elements {
            check_unique(element, &mut seen)?;
        }

        let mut scene = Self {
            elements: HashMap::with_capacity(data.elements.len()),
            z_order: Vec::with_capacity(data.elements.len()),
            background_color: data.background_color,
            grid_size: data.grid_size,
        };
        for element in data.elements {
            scene.add(element);
        }

        let folded = grouping::fold_tag_groups(&mut scene);
        if folded > 0 {
            log::warn!("Folded {folded} tag group(s) into nested groups");
        }
        let cleared = binding::clear_stale_bindings(&mut scene);
        if cleared > 0 {
            log::warn!("Cleared {cleared} binding(s) to missing elements");
        }
        Ok(scene)
    }

    /// Parse and validate an interchange document.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let scene = Self::from_data(SceneData::from_json(json)?)?;
        log::info!("Loaded scene with {} element(s)", scene.len());
        Ok(scene)
    }

    /// Snapshot as interchange data, top-level elements in z-order.
    pub fn to_data(&self) -> SceneData {
        SceneData {
            elements: self.ordered().cloned().collect(),
            background_color: self.background_color,
            grid_size: self.grid_size,
        }
    }

    pub fn to_json(&self) -> SceneResult<String> {
        self.to_data().to_json()
    }

    /// Add an element on top. An element with an existing id replaces it in place.
    pub fn add(&mut self, element: Element) -> ElementId {
        let id = element.id.clone();
        if self.elements.insert(id.clone(), element).is_none() {
            self.z_order.push(id.clone());
        }
        id
    }

    /// Insert at a z-order position (clamped).
    pub fn insert_at(&mut self, index: usize, element: Element) {
        let id = element.id.clone();
        if self.elements.insert(id.clone(), element).is_some() {
            self.z_order.retain(|existing| *existing != id);
        }
        let index = index.min(self.z_order.len());
        self.z_order.insert(index, id);
    }

    /// Remove a top-level element without touching bindings.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let element = self.elements.remove(id)?;
        self.z_order.retain(|existing| existing != id);
        Some(element)
    }

    /// Remove a top-level element and clear every binding that pointed at
    /// it or at one of its descendants.
    pub fn delete(&mut self, id: &ElementId) -> Option<Element> {
        let element = self.remove(id)?;
        binding::clear_stale_bindings(self);
        Some(element)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.z_order.clear();
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Whether a top-level element has this id.
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Whether any element, nested or not, has this id.
    pub fn contains_deep(&self, id: &ElementId) -> bool {
        self.contains(id) || self.elements.values().any(|element| find_nested(element.children(), id).is_some())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Top-level elements, back to front.
    pub fn ordered(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.z_order.iter().filter_map(|id| self.elements.get(id))
    }

    pub fn ordered_ids(&self) -> &[ElementId] {
        &self.z_order
    }

    pub fn index_of(&self, id: &ElementId) -> Option<usize> {
        self.z_order.iter().position(|existing| existing == id)
    }

    /// Ids of top-level elements hit by `point`, front to back.
    pub fn elements_at_point(&self, point: Point, tolerance: f64) -> Vec<ElementId> {
        self.ordered()
            .rev()
            .filter(|element| point_in_element(point, element, tolerance))
            .map(|element| element.id.clone())
            .collect()
    }

    /// Topmost top-level element hit by `point`.
    pub fn topmost_at(&self, point: Point, tolerance: f64) -> Option<ElementId> {
        self.ordered()
            .rev()
            .find(|element| point_in_element(point, element, tolerance))
            .map(|element| element.id.clone())
    }

    /// Ids of top-level elements whose bounds overlap `rect`, in z-order.
    pub fn elements_in_rect(&self, rect: Rect) -> Vec<ElementId> {
        self.ordered()
            .filter(|element| rects_overlap(rect, bounds_of(element)))
            .map(|element| element.id.clone())
            .collect()
    }

    /// Union of the bounds of every top-level element.
    pub fn bounds(&self) -> Option<Rect> {
        self.ordered().map(bounds_of).reduce(|acc, b| acc.union(b))
    }

    /// A copy of the element with this id in world coordinates, searching
    /// inside groups as well.
    pub fn locate(&self, id: &ElementId) -> Option<Element> {
        if let Some(element) = self.elements.get(id) {
            return Some(element.clone());
        }
        self.ordered().find_map(|group| locate_nested(group, id, Vec2::ZERO))
    }

    /// Ids of the element and every element nested under it.
    pub fn descendant_ids(&self, id: &ElementId) -> Vec<ElementId> {
        let mut ids = Vec::new();
        if let Some(element) = self.elements.get(id) {
            collect_ids(element, &mut ids);
        }
        ids
    }

    /// Mutable access to any element, nested or not.
    ///
    /// A nested element's origin stays relative to its parent group.
    pub fn find_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        if self.elements.contains_key(id) {
            return self.elements.get_mut(id);
        }
        self.elements.values_mut().find_map(|element| find_nested_mut(element, id))
    }

    /// Visit every element depth-first, children after their group.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        for element in self.elements.values_mut() {
            visit_element_mut(element, f);
        }
    }

    /// Visit a top-level element and everything nested under it.
    pub fn visit_subtree_mut(&mut self, id: &ElementId, f: &mut impl FnMut(&mut Element)) {
        if let Some(element) = self.elements.get_mut(id) {
            visit_element_mut(element, f);
        }
    }

    /// Visit every element in z-order, depth-first, together with the offset
    /// from its parent's frame to world space.
    pub fn visit_with_offset(&self, f: &mut impl FnMut(&Element, Vec2)) {
        for element in self.ordered() {
            visit_element_with_offset(element, Vec2::ZERO, f);
        }
    }
}

fn check_unique(element: &Element, seen: &mut HashSet<ElementId>) -> SceneResult<()> {
    if !seen.insert(element.id.clone()) {
        return Err(SceneError::DuplicateId(element.id.clone()));
    }
    element.children().iter().try_for_each(|child| check_unique(child, seen))
}

fn find_nested<'a>(children: &'a [Element], id: &ElementId) -> Option<&'a Element> {
    children
        .iter()
        .find_map(|child| if &child.id == id { Some(child) } else { find_nested(child.children(), id) })
}

fn locate_nested(parent: &Element, id: &ElementId, offset: Vec2) -> Option<Element> {
    let offset = offset + parent.origin().to_vec2();
    parent.children().iter().find_map(|child| {
        if &child.id == id {
            let mut found = child.clone();
            found.translate(offset);
            found.group_id = None;
            Some(found)
        } else {
            locate_nested(child, id, offset)
        }
    })
}

fn collect_ids(element: &Element, ids: &mut Vec<ElementId>) {
    ids.push(element.id.clone());
    for child in element.children() {
        collect_ids(child, ids);
    }
}

fn find_nested_mut<'a>(parent: &'a mut Element, id: &ElementId) -> Option<&'a mut Element> {
    parent.children_mut()?.iter_mut().find_map(|child| {
        if &child.id == id {
            Some(child)
        } else {
            find_nested_mut(child, id)
        }
    })
}

fn visit_element_with_offset(element: &Element, offset: Vec2, f: &mut impl FnMut(&Element, Vec2)) {
    f(element, offset);
    let inner = offset + element.origin().to_vec2();
    for child in element.children() {
        visit_element_with_offset(child, inner, f);
    }
}

fn visit_element_mut(element: &mut Element, f: &mut impl FnMut(&mut Element)) {
    f(element);
    if let Some(children) = element.children_mut() {
        for child in children {
            visit_element_mut(child, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ActiveStyle, ElementKind, ElementType};

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::create(ElementType::Rectangle, Point::new(x, y), Point::new(x + w, y + h), &ActiveStyle::default())
    }

    #[test]
    fn test_add_and_remove() {
        let mut scene = Scene::new();
        let id = scene.add(rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(&id));
        assert!(scene.remove(&id).is_some());
        assert!(scene.is_empty());
        assert!(scene.ordered_ids().is_empty());
    }

    #[test]
    fn test_add_same_id_replaces_in_place() {
        let mut scene = Scene::new();
        let a = scene.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = scene.add(rect(20.0, 0.0, 10.0, 10.0));
        let mut moved = scene.get(&a).cloned().unwrap();
        moved.x = 99.0;
        scene.add(moved);
        assert_eq!(scene.ordered_ids(), &[a.clone(), b]);
        assert!((scene.get(&a).unwrap().x - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_order_is_front_to_back() {
        let mut scene = Scene::new();
        let back = scene.add(rect(0.0, 0.0, 100.0, 100.0));
        let front = scene.add(rect(50.0, 50.0, 100.0, 100.0));
        let hits = scene.elements_at_point(Point::new(75.0, 75.0), 10.0);
        assert_eq!(hits, vec![front.clone(), back]);
        assert_eq!(scene.topmost_at(Point::new(75.0, 75.0), 10.0), Some(front));
        assert_eq!(scene.topmost_at(Point::new(500.0, 500.0), 10.0), None);
    }

    #[test]
    fn test_elements_in_rect() {
        let mut scene = Scene::new();
        let a = scene.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = scene.add(rect(30.0, 0.0, 10.0, 10.0));
        let _c = scene.add(rect(100.0, 0.0, 10.0, 10.0));
        let hits = scene.elements_in_rect(Rect::new(-5.0, -5.0, 50.0, 20.0));
        assert_eq!(hits, vec![a, b]);
    }

    #[test]
    fn test_insert_at_clamps() {
        let mut scene = Scene::new();
        let a = scene.add(rect(0.0, 0.0, 10.0, 10.0));
        let b = rect(0.0, 0.0, 5.0, 5.0);
        let b_id = b.id.clone();
        scene.insert_at(99, b);
        assert_eq!(scene.index_of(&b_id), Some(1));
        let c = rect(0.0, 0.0, 5.0, 5.0);
        let c_id = c.id.clone();
        scene.insert_at(0, c);
        assert_eq!(scene.ordered_ids(), &[c_id, a, b_id]);
    }

    #[test]
    fn test_locate_nested_child() {
        let mut child = rect(5.0, 5.0, 10.0, 10.0);
        child.group_id = Some(ElementId::from("g"));
        let child_id = child.id.clone();
        let group = Element::group(ElementId::from("g"), Rect::new(100.0, 200.0, 115.0, 215.0), vec![child]);
        let mut scene = Scene::new();
        scene.add(group);

        assert!(!scene.contains(&child_id));
        assert!(scene.contains_deep(&child_id));
        let located = scene.locate(&child_id).unwrap();
        assert_eq!(located.origin(), Point::new(105.0, 205.0));
        assert_eq!(scene.descendant_ids(&ElementId::from("g")).len(), 2);
    }

    #[test]
    fn test_load_missing_and_non_array() {
        assert!(matches!(Scene::from_json("{}"), Err(SceneError::MissingElements)));
        assert!(matches!(Scene::from_json(r#"{"elements": 3}"#), Err(SceneError::ElementsNotArray)));
        assert!(matches!(Scene::from_json("not json"), Err(SceneError::InvalidJson(_))));
    }

    #[test]
    fn test_load_rejects_unknown_type_with_index() {
        let json = r#"{"elements": [
            {"id": "a", "type": "rectangle", "x": 0, "y": 0, "width": 10, "height": 10},
            {"id": "b", "type": "hexagon", "x": 0, "y": 0}
        ]}"#;
        match Scene::from_json(json) {
            Err(SceneError::InvalidElement { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let json = r#"{"elements": [
            {"id": "a", "type": "rectangle", "width": 10, "height": 10},
            {"id": "a", "type": "ellipse", "width": 10, "height": 10}
        ]}"#;
        assert!(matches!(Scene::from_json(json), Err(SceneError::DuplicateId(_))));
    }

    #[test]
    fn test_lenient_points_and_app_state() {
        let json = r##"{
            "elements": [
                {"id": "l", "type": "line", "x": 1, "y": 2, "width": 30, "height": 40},
                {"id": "f", "type": "freedraw", "x": 0, "y": 0}
            ],
            "appState": {"viewBackgroundColor": "#000000"},
            "gridSize": null
        }"##;
        let scene = Scene::from_json(json).unwrap();
        let line = scene.get(&ElementId::from("l")).unwrap();
        assert_eq!(line.points().unwrap(), &[Point::ZERO, Point::new(30.0, 40.0)]);
        let pen = scene.get(&ElementId::from("f")).unwrap();
        assert_eq!(pen.points().unwrap().len(), 1);
        assert_eq!(scene.background_color, SerializableColor::black());
        assert_eq!(scene.grid_size, None);
    }

    #[test]
    fn test_defaults_when_absent() {
        let scene = Scene::from_json(r#"{"elements": []}"#).unwrap();
        assert_eq!(scene.background_color, SerializableColor::white());
        assert_eq!(scene.grid_size, Some(GRID_SIZE));
    }

    #[test]
    fn test_stale_bindings_cleared_on_load() {
        let json = r#"{"elements": [
            {"id": "r", "type": "rectangle", "width": 10, "height": 10},
            {"id": "a", "type": "arrow", "points": [[0,0],[50,0]],
             "startBinding": {"elementId": "r", "focus": 0.5, "gap": 0},
             "endBinding": {"targetElementId": "gone", "focus": 0.5, "gap": 0}}
        ]}"#;
        let scene = Scene::from_json(json).unwrap();
        let arrow = scene.get(&ElementId::from("a")).unwrap().as_linear().unwrap();
        assert_eq!(arrow.start_binding.as_ref().map(|b| b.element_id.as_str()), Some("r"));
        assert!(arrow.end_binding.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut scene = Scene::new();
        scene.add(rect(10.0, 10.0, 100.0, 50.0));
        scene.add(Element::create(
            ElementType::Arrow,
            Point::new(0.0, 0.0),
            Point::new(40.0, 40.0),
            &ActiveStyle::default(),
        ));
        scene.grid_size = None;

        let json = scene.to_json().unwrap();
        let loaded = Scene::from_json(&json).unwrap();
        assert_eq!(loaded.ordered_ids(), scene.ordered_ids());
        assert_eq!(loaded.grid_size, None);
        for (a, b) in scene.ordered().zip(loaded.ordered()) {
            assert_eq!(serde_json::to_value(a).unwrap(), serde_json::to_value(b).unwrap());
        }
        assert!(matches!(loaded.ordered().nth(1).map(|e| &e.kind), Some(ElementKind::Arrow(_))));
    }

    #[test]
    fn test_delete_clears_bindings() {
        let mut scene = Scene::new();
        let target = scene.add(rect(0.0, 0.0, 10.0, 10.0));
        let mut arrow = Element::create(ElementType::Arrow, Point::new(50.0, 0.0), Point::new(80.0, 0.0), &ActiveStyle::default());
        arrow.as_linear_mut().unwrap().end_binding = Some(binding::Binding::new(target.clone(), 0.0));
        let arrow_id = scene.add(arrow);

        scene.delete(&target);
        let linear = scene.get(&arrow_id).unwrap().as_linear().unwrap();
        assert!(linear.end_binding.is_none());
    }
}
