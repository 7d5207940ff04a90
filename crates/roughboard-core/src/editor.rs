//! Pointer-driven editing state machine.

use crate::binding::{self, probe_binding};
use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::element::{ActiveStyle, Element, ElementId, ElementType, PathEnd, StyleUpdate};
use crate::error::SceneResult;
use crate::grouping;
use crate::input::{InputEvent, KeyEvent, Modifiers, MouseButton, PointerEvent, PointerQueue};
use crate::scene::{Scene, SceneData};
use crate::selection::{HandleKind, Selection, apply_resize, hit_test_handles};
use crate::tools::ToolKind;
use kurbo::{Point, Rect, Vec2};

/// Receives the scene after every event that changed it.
pub trait SceneObserver {
    fn scene_changed(&mut self, scene: &Scene);
}

impl<F: FnMut(&Scene)> SceneObserver for F {
    fn scene_changed(&mut self, scene: &Scene) {
        self(scene)
    }
}

/// Current gesture, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Drawing,
    Moving,
    Resizing,
    Panning,
    Erasing,
    RectangleSelecting,
}

/// Gesture in progress and what it needs to finish or roll back.
#[derive(Debug, Default)]
enum Interaction {
    #[default]
    Idle,
    Drawing {
        id: ElementId,
        /// Last world position applied to the element.
        last: Point,
        previous_selection: Vec<ElementId>,
    },
    Moving {
        start: Point,
        /// Snapshots of the selected elements when the drag began.
        originals: Vec<Element>,
        /// Element pressed inside an existing multi-selection; the selection
        /// collapses to it if the pointer is released without moving.
        pressed: Option<ElementId>,
    },
    Resizing {
        handle: HandleKind,
        original: Element,
    },
    Panning {
        /// Last screen position.
        last: Point,
    },
    Erasing,
    RectangleSelecting {
        start: Point,
        current: Point,
        previous_selection: Vec<ElementId>,
    },
}

/// Owns the scene, selection and viewport and turns input events into edits.
pub struct Editor {
    scene: Scene,
    selection: Selection,
    camera: Camera,
    tool: ToolKind,
    config: EditorConfig,
    active_style: ActiveStyle,
    interaction: Interaction,
    /// Bumped whenever the static render layer must be rebuilt.
    static_revision: u64,
    /// Snap point of the binding candidate while drawing an arrow or line.
    binding_preview: Option<Point>,
    queue: PointerQueue,
    observers: Vec<Box<dyn SceneObserver>>,
    /// Set when the current event changed the scene.
    mutated: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("elements", &self.scene.len())
            .field("selection", &self.selection)
            .field("tool", &self.tool)
            .field("mode", &self.mode())
            .field("static_revision", &self.static_revision)
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            scene: Scene::new(),
            selection: Selection::new(),
            camera: Camera::from_config(&config),
            tool: ToolKind::default(),
            config,
            active_style: ActiveStyle::default(),
            interaction: Interaction::Idle,
            static_revision: 0,
            binding_preview: None,
            queue: PointerQueue::new(),
            observers: Vec::new(),
            mutated: false,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn active_style(&self) -> &ActiveStyle {
        &self.active_style
    }

    pub fn static_revision(&self) -> u64 {
        self.static_revision
    }

    pub fn binding_preview(&self) -> Option<Point> {
        self.binding_preview
    }

    pub fn mode(&self) -> Mode {
        match self.interaction {
            Interaction::Idle => Mode::Idle,
            Interaction::Drawing { .. } => Mode::Drawing,
            Interaction::Moving { .. } => Mode::Moving,
            Interaction::Resizing { .. } => Mode::Resizing,
            Interaction::Panning { .. } => Mode::Panning,
            Interaction::Erasing => Mode::Erasing,
            Interaction::RectangleSelecting { .. } => Mode::RectangleSelecting,
        }
    }

    /// Marquee rectangle in world coordinates while rectangle-selecting.
    pub fn marquee(&self) -> Option<Rect> {
        match self.interaction {
            Interaction::RectangleSelecting { start, current, .. } => Some(Rect::from_points(start, current)),
            _ => None,
        }
    }

    pub fn add_observer(&mut self, observer: impl SceneObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Queue an event for the next [`process_pending`](Self::process_pending).
    /// Consecutive moves collapse into the latest one.
    pub fn enqueue(&mut self, event: impl Into<InputEvent>) {
        self.queue.push(event);
    }

    /// Handle every queued event in order. Call once per frame.
    pub fn process_pending(&mut self) -> usize {
        let events: Vec<InputEvent> = self.queue.drain().collect();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pointer(PointerEvent::Down {
                position,
                button,
                modifiers,
            }) => self.pointer_down(position, button, modifiers),
            InputEvent::Pointer(PointerEvent::Move { position }) => self.pointer_move(position),
            InputEvent::Pointer(PointerEvent::Up { position, .. }) => self.pointer_up(position),
            InputEvent::Pointer(PointerEvent::Scroll { position, delta }) => self.wheel(position, delta),
            InputEvent::Key(KeyEvent::Pressed(key)) => {
                self.handle_key(&key);
            }
            InputEvent::Key(KeyEvent::Released(_)) => {}
        }
    }

    /// Start a gesture. `position` is in screen coordinates.
    pub fn pointer_down(&mut self, position: Point, button: MouseButton, modifiers: Modifiers) {
        if !matches!(self.interaction, Interaction::Idle) {
            return;
        }
        let world = self.camera.screen_to_world(position);
        match (button, self.tool) {
            (MouseButton::Middle, _) | (MouseButton::Left, ToolKind::Hand) => {
                self.interaction = Interaction::Panning { last: position };
            }
            (MouseButton::Left, ToolKind::Selection) => self.begin_selection(world, modifiers.shift),
            (MouseButton::Left, ToolKind::Eraser) => {
                self.interaction = Interaction::Erasing;
                self.erase_at(world);
            }
            (MouseButton::Left, tool) => {
                if let Some(element_type) = tool.element_type() {
                    self.begin_drawing(element_type, world);
                }
            }
            (MouseButton::Right, _) => {}
        }
        self.finish_event();
    }

    /// Continue the current gesture.
    pub fn pointer_move(&mut self, position: Point) {
        let world = self.camera.screen_to_world(position);
        let mut interaction = std::mem::take(&mut self.interaction);
        match &mut interaction {
            Interaction::Idle => {}
            Interaction::Drawing { id, last, .. } => {
                if let Some(element) = self.scene.get_mut(id) {
                    element.update_drag_dimensions(world);
                    self.mutated = true;
                }
                *last = world;
                self.binding_preview = self.preview_binding(id, world);
            }
            Interaction::Moving { start, originals, .. } => {
                self.apply_move(originals, world - *start);
            }
            Interaction::Resizing { handle, original } => {
                self.scene.add(apply_resize(original, *handle, world));
                self.mutated = true;
            }
            Interaction::Panning { last } => {
                self.camera.pan(position - *last);
                *last = position;
                self.invalidate_static();
            }
            Interaction::Erasing => self.erase_at(world),
            Interaction::RectangleSelecting { start, current, .. } => {
                *current = world;
                let ids = self.scene.elements_in_rect(Rect::from_points(*start, world));
                if ids.as_slice() != self.selection.ids() {
                    self.selection.set(ids);
                    self.invalidate_static();
                }
            }
        }
        self.interaction = interaction;
        self.finish_event();
    }

    /// Finish the current gesture.
    pub fn pointer_up(&mut self, position: Point) {
        let world = self.camera.screen_to_world(position);
        let interaction = std::mem::take(&mut self.interaction);
        if matches!(interaction, Interaction::Idle) {
            return;
        }
        match interaction {
            Interaction::Drawing { id, last, .. } => self.finish_drawing(id, last, world),
            Interaction::Moving {
                start,
                originals,
                pressed,
                ..
            } => {
                let delta = world - start;
                if delta == Vec2::ZERO {
                    self.apply_move(&originals, delta);
                    if let Some(pressed) = pressed {
                        self.selection.select_only(pressed);
                    }
                } else {
                    self.apply_move(&originals, delta);
                    let ids: Vec<ElementId> = originals.iter().map(|element| element.id.clone()).collect();
                    let released = binding::release_detached(&mut self.scene, &ids);
                    if released > 0 {
                        log::debug!("Released {released} binding(s) of moved elements");
                    }
                    binding::reanchor(&mut self.scene, &ids);
                }
            }
            Interaction::Resizing { handle, original } => self.finish_resize(handle, &original, world),
            Interaction::Idle
            | Interaction::Panning { .. }
            | Interaction::Erasing
            | Interaction::RectangleSelecting { .. } => {}
        }
        self.binding_preview = None;
        self.invalidate_static();
        self.finish_event();
    }

    /// Zoom around the pointer. Negative `delta.y` zooms in.
    pub fn wheel(&mut self, position: Point, delta: Vec2) {
        if delta.y == 0.0 {
            return;
        }
        let factor = if delta.y < 0.0 {
            self.config.zoom_in_factor
        } else {
            self.config.zoom_out_factor
        };
        if self.camera.zoom_at(position, factor) {
            self.invalidate_static();
        }
    }

    /// Keyboard shortcuts. Returns whether the key was used.
    pub fn handle_key(&mut self, key: &str) -> bool {
        match key {
            "Escape" => {
                if !self.cancel() && !self.selection.is_empty() {
                    self.selection.clear();
                    self.invalidate_static();
                }
                true
            }
            "Delete" | "Backspace" => matches!(self.interaction, Interaction::Idle) && self.delete_selected() > 0,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if matches!(self.interaction, Interaction::Idle) => match ToolKind::from_shortcut(c) {
                        Some(tool) => {
                            self.set_tool(tool);
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }
        }
    }

    /// Abort the current gesture and restore the state from before it began.
    /// Returns whether a gesture was active.
    pub fn cancel(&mut self) -> bool {
        let interaction = std::mem::take(&mut self.interaction);
        let active = !matches!(interaction, Interaction::Idle);
        match interaction {
            Interaction::Drawing {
                id, previous_selection, ..
            } => {
                self.scene.remove(&id);
                self.selection.set(previous_selection);
                self.mutated = true;
            }
            Interaction::Moving { originals, .. } => {
                for original in originals {
                    self.scene.add(original);
                }
                self.mutated = true;
            }
            Interaction::Resizing { original, .. } => {
                self.scene.add(original);
                self.mutated = true;
            }
            Interaction::RectangleSelecting { previous_selection, .. } => self.selection.set(previous_selection),
            Interaction::Idle | Interaction::Panning { .. } | Interaction::Erasing => {}
        }
        if active {
            log::debug!("Gesture cancelled");
            self.selection.retain_existing(&self.scene);
            self.binding_preview = None;
            self.invalidate_static();
        }
        self.finish_event();
        active
    }

    /// Switch tools. Leaving for anything but selection or hand clears the selection.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if !matches!(self.interaction, Interaction::Idle) {
            self.cancel();
        }
        if !tool.keeps_selection() && !self.selection.is_empty() {
            self.selection.clear();
            self.invalidate_static();
        }
        self.tool = tool;
    }

    /// Style used for the next created element.
    pub fn set_active_style(&mut self, style: ActiveStyle) {
        self.active_style = style;
    }

    /// Update the active style and apply the change to every selected element.
    /// Returns how many elements changed.
    pub fn apply_style(&mut self, update: &StyleUpdate) -> usize {
        if let Some(color) = update.stroke_color {
            self.active_style.stroke_color = color;
        }
        if let Some(color) = update.background_color {
            self.active_style.fill_color = color;
        }
        if let Some(fill_style) = update.fill_style {
            self.active_style.fill_style = fill_style;
        }
        if let Some(width) = update.stroke_width {
            self.active_style.stroke_width = width;
        }

        let mut changed = 0;
        for id in self.selection.ids() {
            if let Some(element) = self.scene.get_mut(id) {
                recolor_deep(element, update);
                changed += 1;
            }
        }
        if changed > 0 {
            self.mutated = true;
            self.invalidate_static();
        }
        self.finish_event();
        changed
    }

    pub fn can_group(&self) -> bool {
        grouping::can_group(&self.scene, self.selection.ids())
    }

    pub fn can_ungroup(&self) -> bool {
        grouping::can_ungroup(&self.scene, self.selection.ids())
    }

    /// Group the selection and select the new group.
    pub fn group_selection(&mut self) -> Option<ElementId> {
        let id = grouping::group(&mut self.scene, self.selection.ids())?;
        self.selection.select_only(id.clone());
        self.mutated = true;
        self.invalidate_static();
        self.finish_event();
        Some(id)
    }

    /// Dissolve the selected group and select its children.
    pub fn ungroup_selection(&mut self) -> Option<Vec<ElementId>> {
        if !self.can_ungroup() {
            return None;
        }
        let id = self.selection.single()?.clone();
        let children = grouping::ungroup(&mut self.scene, &id)?;
        self.selection.set(children.iter().cloned());
        self.mutated = true;
        self.invalidate_static();
        self.finish_event();
        Some(children)
    }

    /// Delete every selected element. Bindings to them are cleared.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selection.ids().to_vec();
        let deleted = ids.iter().filter(|id| self.scene.delete(id).is_some()).count();
        self.selection.clear();
        if deleted > 0 {
            log::debug!("Deleted {deleted} element(s)");
            self.mutated = true;
            self.invalidate_static();
        }
        self.finish_event();
        deleted
    }

    /// Replace the content of a text element. Returns false for other elements.
    pub fn set_text(&mut self, id: &ElementId, text: &str) -> bool {
        let line_height = self.config.line_height;
        let Some(element) = self.scene.get_mut(id).filter(|element| element.as_text().is_some()) else {
            return false;
        };
        element.set_text(text, line_height);
        self.mutated = true;
        self.invalidate_static();
        self.finish_event();
        true
    }

    /// Add an element on top of the scene.
    pub fn insert_element(&mut self, element: Element) -> ElementId {
        let id = self.scene.add(element);
        self.mutated = true;
        self.invalidate_static();
        self.finish_event();
        id
    }

    /// Replace the whole scene. On error nothing changes.
    pub fn replace_scene(&mut self, data: SceneData) -> SceneResult<()> {
        let scene = Scene::from_data(data)?;
        self.install(scene);
        Ok(())
    }

    /// Replace the element list, keeping background and grid settings.
    pub fn replace_elements(&mut self, elements: Vec<Element>) -> SceneResult<()> {
        self.replace_scene(SceneData {
            elements,
            background_color: self.scene.background_color,
            grid_size: self.scene.grid_size,
        })
    }

    /// Replace the scene from an interchange document. On error nothing changes.
    pub fn load_json(&mut self, json: &str) -> SceneResult<()> {
        let scene = Scene::from_json(json)?;
        self.install(scene);
        Ok(())
    }

    pub fn save_json(&self) -> SceneResult<String> {
        let json = self.scene.to_json()?;
        log::info!("Saved scene with {} element(s)", self.scene.len());
        Ok(json)
    }

    pub fn to_data(&self) -> SceneData {
        self.scene.to_data()
    }

    fn install(&mut self, scene: Scene) {
        self.interaction = Interaction::Idle;
        self.binding_preview = None;
        self.scene = scene;
        self.selection.retain_existing(&self.scene);
        log::info!("Scene replaced with {} element(s)", self.scene.len());
        self.mutated = true;
        self.invalidate_static();
        self.finish_event();
    }

    fn begin_selection(&mut self, world: Point, shift: bool) {
        if let Some(id) = self.selection.single() {
            if let Some(element) = self.scene.get(id) {
                let size = self.config.handle_size / self.camera.zoom;
                if let Some(handle) = hit_test_handles(element, world, size) {
                    log::debug!("Resizing {id} by {handle:?}");
                    self.interaction = Interaction::Resizing {
                        handle,
                        original: element.clone(),
                    };
                    return;
                }
            }
        }

        let before = self.selection.clone();
        match self.scene.topmost_at(world, self.config.hit_tolerance) {
            Some(id) => {
                let mut pressed = None;
                if shift {
                    self.selection.toggle(id.clone());
                } else if self.selection.contains(&id) && self.selection.len() > 1 {
                    pressed = Some(id.clone());
                } else {
                    self.selection.select_only(id.clone());
                }
                if self.selection.contains(&id) {
                    let originals = self
                        .selection
                        .ids()
                        .iter()
                        .filter_map(|id| self.scene.get(id).cloned())
                        .collect();
                    self.interaction = Interaction::Moving {
                        start: world,
                        originals,
                        pressed,
                    };
                }
            }
            None if shift => {}
            None => {
                let previous_selection = self.selection.ids().to_vec();
                self.selection.clear();
                self.interaction = Interaction::RectangleSelecting {
                    start: world,
                    current: world,
                    previous_selection,
                };
            }
        }
        if self.selection != before {
            self.invalidate_static();
        }
    }

    fn begin_drawing(&mut self, element_type: ElementType, world: Point) {
        let mut origin = world;
        let mut start_binding = None;
        if matches!(element_type, ElementType::Arrow | ElementType::Line) {
            if let Some((binding, snapped)) = probe_binding(&self.scene, world, None, self.config.binding_tolerance) {
                origin = snapped;
                start_binding = Some(binding);
            }
        }

        let mut element = Element::create(element_type, origin, origin, &self.active_style);
        if let Some(linear) = element.as_linear_mut() {
            linear.start_binding = start_binding;
        }
        let previous_selection = self.selection.ids().to_vec();
        let id = self.scene.add(element);
        log::debug!("Drawing {element_type} {id}");
        self.selection.select_only(id.clone());
        self.interaction = Interaction::Drawing {
            id,
            last: world,
            previous_selection,
        };
        self.mutated = true;
        self.invalidate_static();
    }

    fn finish_drawing(&mut self, id: ElementId, last: Point, world: Point) {
        let Some(element) = self.scene.get_mut(&id) else {
            return;
        };
        if world != last {
            element.update_drag_dimensions(world);
        }
        self.mutated = true;

        if element.is_zero_extent() {
            log::debug!("Discarded empty {} {id}", element.element_type());
            self.scene.remove(&id);
            self.selection.clear();
            return;
        }

        let end = element.as_linear().and_then(|_| element.endpoint(PathEnd::End));
        if let Some(end) = end {
            let probe = probe_binding(&self.scene, end, Some(&id), self.config.binding_tolerance);
            if let (Some((binding, snapped)), Some(element)) = (probe, self.scene.get_mut(&id)) {
                element.set_endpoint(PathEnd::End, snapped);
                if let Some(linear) = element.as_linear_mut() {
                    linear.end_binding = Some(binding);
                }
            }
        }

        if self.tool != ToolKind::Text {
            self.tool = ToolKind::Selection;
        }
    }

    fn finish_resize(&mut self, handle: HandleKind, original: &Element, world: Point) {
        let mut resized = apply_resize(original, handle, world);
        let end = match handle {
            HandleKind::Start => Some(PathEnd::Start),
            HandleKind::End => Some(PathEnd::End),
            _ => None,
        };
        if let Some(end) = end.filter(|_| resized.as_linear().is_some()) {
            let probe = resized
                .endpoint(end)
                .and_then(|at| probe_binding(&self.scene, at, Some(&resized.id), self.config.binding_tolerance));
            let binding = match probe {
                Some((binding, snapped)) => {
                    resized.set_endpoint(end, snapped);
                    Some(binding)
                }
                None => None,
            };
            if let Some(linear) = resized.as_linear_mut() {
                *linear.binding_mut(end) = binding;
            }
        }
        let id = self.scene.add(resized);
        binding::reanchor(&mut self.scene, &[id]);
        self.mutated = true;
    }

    /// Put every original back, shifted by `delta`.
    fn apply_move(&mut self, originals: &[Element], delta: Vec2) {
        for original in originals {
            let mut element = original.clone();
            element.translate(delta);
            self.scene.add(element);
        }
        if !originals.is_empty() {
            self.mutated = true;
        }
    }

    fn erase_at(&mut self, world: Point) {
        if let Some(id) = self.scene.topmost_at(world, self.config.hit_tolerance) {
            self.scene.delete(&id);
            self.selection.remove(&id);
            log::debug!("Erased {id}");
            self.mutated = true;
            self.invalidate_static();
        }
    }

    fn preview_binding(&self, id: &ElementId, world: Point) -> Option<Point> {
        self.scene.get(id)?.as_linear()?;
        probe_binding(&self.scene, world, Some(id), self.config.binding_tolerance).map(|(_, snapped)| snapped)
    }

    fn invalidate_static(&mut self) {
        self.static_revision += 1;
    }

    fn finish_event(&mut self) {
        if std::mem::take(&mut self.mutated) {
            self.selection.retain_existing(&self.scene);
            for observer in &mut self.observers {
                observer.scene_changed(&self.scene);
            }
        }
    }
}

/// Restyle an element, or every leaf under it when it is a group.
fn recolor_deep(element: &mut Element, update: &StyleUpdate) {
    match element.children_mut() {
        Some(children) => {
            for child in children {
                recolor_deep(child, update);
            }
        }
        None => element.recolor(update),
    }
}
