//! Two-layer renderer: a cached static layer and a per-frame dynamic layer.

use crate::display_list::DisplayList;
use crate::draw::{
    draw_background, draw_binding_indicator, draw_element, draw_grid, draw_handles, draw_marquee,
    draw_selection_outline,
};
use crate::renderer::{Painter, RenderContext, RenderResult, Renderer};
use kurbo::{Rect, Size};
use roughboard_core::geometry::{bounds_of, rects_overlap};
use roughboard_core::{Element, ElementId, Mode};

/// Extra world-space margin when culling, covering strokes and jitter.
const CULL_MARGIN: f64 = 20.0;

/// Everything the static layer depends on besides the scene revision.
#[derive(Debug, Clone, PartialEq)]
struct StaticKey {
    revision: u64,
    viewport: Size,
    scale_factor: f64,
    show_grid: bool,
    editing: Option<ElementId>,
}

impl StaticKey {
    fn of(ctx: &RenderContext) -> Self {
        Self {
            revision: ctx.editor.static_revision(),
            viewport: ctx.viewport_size,
            scale_factor: ctx.scale_factor,
            show_grid: ctx.show_grid,
            editing: ctx.editing_element.cloned(),
        }
    }
}

/// Renders unselected elements into a cached static layer and everything
/// that follows the pointer into a dynamic layer rebuilt every frame.
///
/// The static layer is rebuilt only when the editor's static revision, the
/// viewport or the frame options change, so dragging a selection costs the
/// size of the selection rather than the size of the scene.
#[derive(Debug, Default)]
pub struct LayeredRenderer {
    static_layer: DisplayList,
    dynamic_layer: DisplayList,
    cached: Option<StaticKey>,
    static_rebuilds: u64,
}

impl LayeredRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn static_layer(&self) -> &DisplayList {
        &self.static_layer
    }

    pub fn dynamic_layer(&self) -> &DisplayList {
        &self.dynamic_layer
    }

    /// Number of times the static layer has been rebuilt.
    pub fn static_rebuilds(&self) -> u64 {
        self.static_rebuilds
    }

    /// Force a static rebuild on the next frame.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Replay the static layer, then the dynamic layer.
    pub fn replay(&self, painter: &mut dyn Painter) -> RenderResult<()> {
        self.static_layer.replay(painter)?;
        self.dynamic_layer.replay(painter)
    }

    fn rebuild_static(&mut self, ctx: &RenderContext) {
        let editor = ctx.editor;
        let transform = ctx.transform();
        let zoom = editor.camera().zoom;
        let line_height = editor.config().line_height;
        let visible = editor.camera().visible_world_rect(ctx.logical_size());

        self.static_layer.clear();
        draw_background(&mut self.static_layer, ctx.viewport_size, ctx.background_color());
        if let Some(grid_size) = editor.scene().grid_size.filter(|_| ctx.show_grid) {
            let color = editor.config().grid_color.into();
            draw_grid(&mut self.static_layer, visible, grid_size, transform, color, zoom);
        }

        let mut culled = 0;
        for element in editor.scene().ordered() {
            if editor.selection().contains(&element.id) || ctx.editing_element == Some(&element.id) {
                continue;
            }
            if !is_visible(element, visible) {
                culled += 1;
                continue;
            }
            draw_element(&mut self.static_layer, element, transform, line_height);
        }
        log::trace!(
            "Static layer rebuilt: {} commands, {culled} element(s) culled",
            self.static_layer.len()
        );
    }

    fn rebuild_dynamic(&mut self, ctx: &RenderContext) {
        let editor = ctx.editor;
        let config = editor.config();
        let transform = ctx.transform();
        let zoom = editor.camera().zoom;
        let selection = editor.selection();

        self.dynamic_layer.clear();
        for element in editor.scene().ordered().filter(|element| selection.contains(&element.id)) {
            if ctx.editing_element != Some(&element.id) {
                draw_element(&mut self.dynamic_layer, element, transform, config.line_height);
            }
            draw_selection_outline(&mut self.dynamic_layer, element, transform, config, zoom);
        }

        if editor.mode() != Mode::Drawing {
            if let Some(element) = selection.single().and_then(|id| editor.scene().get(id)) {
                draw_handles(&mut self.dynamic_layer, element, transform, config, zoom);
            }
        }
        if let Some(rect) = editor.marquee() {
            draw_marquee(&mut self.dynamic_layer, rect, transform, config, zoom);
        }
        if let Some(point) = editor.binding_preview() {
            draw_binding_indicator(&mut self.dynamic_layer, point, transform, config, zoom);
        }
    }
}

fn is_visible(element: &Element, visible: Rect) -> bool {
    let margin = CULL_MARGIN + element.stroke_width;
    rects_overlap(bounds_of(element).inflate(margin, margin), visible)
}

impl Renderer for LayeredRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        let key = StaticKey::of(ctx);
        if self.cached.as_ref() != Some(&key) {
            self.rebuild_static(ctx);
            self.cached = Some(key);
            self.static_rebuilds += 1;
        }
        self.rebuild_dynamic(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_list::TextRun;
    use crate::renderer::RendererError;
    use kurbo::{Affine, BezPath, Point, Stroke, Vec2};
    use peniko::Color;
    use roughboard_core::element::{ElementKind, TextShape};
    use roughboard_core::{Editor, Modifiers, MouseButton, SceneData, ToolKind};

    #[derive(Default)]
    struct CountingPainter {
        calls: Vec<&'static str>,
        fail_on_text: bool,
    }

    impl CountingPainter {
        fn count(&self, kind: &str) -> usize {
            self.calls.iter().filter(|call| **call == kind).count()
        }
    }

    impl Painter for CountingPainter {
        fn fill(&mut self, _: Affine, _: &BezPath, _: Color) -> RenderResult<()> {
            self.calls.push("fill");
            Ok(())
        }

        fn stroke(&mut self, _: Affine, _: &BezPath, _: &Stroke, _: Color) -> RenderResult<()> {
            self.calls.push("stroke");
            Ok(())
        }

        fn text(&mut self, _: Affine, _: &TextRun) -> RenderResult<()> {
            if self.fail_on_text {
                return Err(RendererError::RenderFailed("no fonts".to_string()));
            }
            self.calls.push("text");
            Ok(())
        }

        fn image(&mut self, _: Affine, _: Rect, _: &str) -> RenderResult<()> {
            self.calls.push("image");
            Ok(())
        }
    }

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    fn draw_rect(editor: &mut Editor, from: (f64, f64), to: (f64, f64)) {
        editor.set_tool(ToolKind::Rectangle);
        editor.pointer_down(from.into(), MouseButton::Left, Modifiers::default());
        editor.pointer_move(to.into());
        editor.pointer_up(to.into());
    }

    fn click(editor: &mut Editor, at: (f64, f64)) {
        editor.pointer_down(at.into(), MouseButton::Left, Modifiers::default());
        editor.pointer_up(at.into());
    }

    fn build(renderer: &mut LayeredRenderer, editor: &Editor) {
        let _ = env_logger::builder().is_test(true).try_init();
        renderer.build_scene(&RenderContext::new(editor, VIEWPORT));
    }

    fn dynamic_counts(renderer: &LayeredRenderer) -> CountingPainter {
        let mut painter = CountingPainter::default();
        renderer.dynamic_layer().replay(&mut painter).unwrap();
        painter
    }

    #[test]
    fn test_static_layer_cached_until_revision_changes() {
        let mut editor = Editor::default();
        draw_rect(&mut editor, (10.0, 10.0), (110.0, 60.0));
        let mut renderer = LayeredRenderer::new();

        build(&mut renderer, &editor);
        build(&mut renderer, &editor);
        assert_eq!(renderer.static_rebuilds(), 1);

        editor.wheel(Point::new(100.0, 100.0), Vec2::new(0.0, -1.0));
        build(&mut renderer, &editor);
        assert_eq!(renderer.static_rebuilds(), 2);

        renderer.build_scene(&RenderContext::new(&editor, Size::new(1024.0, 768.0)));
        assert_eq!(renderer.static_rebuilds(), 3);

        renderer.invalidate();
        renderer.build_scene(&RenderContext::new(&editor, Size::new(1024.0, 768.0)));
        assert_eq!(renderer.static_rebuilds(), 4);
    }

    #[test]
    fn test_selected_elements_drawn_in_dynamic_layer() {
        let mut editor = Editor::default();
        draw_rect(&mut editor, (10.0, 10.0), (110.0, 60.0));
        let mut renderer = LayeredRenderer::new();
        build(&mut renderer, &editor);

        // Background and grid only.
        assert_eq!(renderer.static_layer().len(), 2);
        let dynamic = dynamic_counts(&renderer);
        assert_eq!(dynamic.count("fill"), 8);
        assert!(dynamic.count("stroke") > 8);

        click(&mut editor, (500.0, 500.0));
        build(&mut renderer, &editor);
        assert!(renderer.static_layer().len() > 2);
        assert!(renderer.dynamic_layer().is_empty());
    }

    #[test]
    fn test_no_handles_for_multi_selection() {
        let mut editor = Editor::default();
        draw_rect(&mut editor, (0.0, 0.0), (50.0, 50.0));
        draw_rect(&mut editor, (100.0, 0.0), (150.0, 50.0));
        editor.set_tool(ToolKind::Selection);
        editor.pointer_down(Point::new(-20.0, -20.0), MouseButton::Left, Modifiers::default());
        editor.pointer_move(Point::new(200.0, 100.0));

        let mut renderer = LayeredRenderer::new();
        build(&mut renderer, &editor);
        let dynamic = dynamic_counts(&renderer);
        // Marquee fill only.
        assert_eq!(dynamic.count("fill"), 1);

        editor.pointer_up(Point::new(200.0, 100.0));
        build(&mut renderer, &editor);
        assert_eq!(editor.selection().len(), 2);
        assert_eq!(dynamic_counts(&renderer).count("fill"), 0);
    }

    #[test]
    fn test_drag_does_not_rebuild_static_layer() {
        let mut editor = Editor::default();
        draw_rect(&mut editor, (0.0, 0.0), (100.0, 100.0));
        let mut renderer = LayeredRenderer::new();
        build(&mut renderer, &editor);

        editor.pointer_down(Point::new(50.0, 50.0), MouseButton::Left, Modifiers::default());
        build(&mut renderer, &editor);
        for step in 1..=5 {
            editor.pointer_move(Point::new(50.0 + step as f64 * 10.0, 50.0));
            build(&mut renderer, &editor);
        }
        assert_eq!(renderer.static_rebuilds(), 1);
        let first = &renderer.dynamic_layer().commands()[0];
        assert_eq!(first.transform().translation(), Vec2::new(50.0, 0.0));

        editor.pointer_up(Point::new(100.0, 50.0));
        build(&mut renderer, &editor);
        assert_eq!(renderer.static_rebuilds(), 2);
    }

    #[test]
    fn test_grid_follows_scene_and_context() {
        let mut editor = Editor::default();
        let mut renderer = LayeredRenderer::new();
        renderer.build_scene(&RenderContext::new(&editor, VIEWPORT).with_grid(false));
        assert_eq!(renderer.static_layer().len(), 1);

        editor
            .replace_scene(SceneData {
                grid_size: None,
                ..SceneData::default()
            })
            .unwrap();
        build(&mut renderer, &editor);
        assert_eq!(renderer.static_layer().len(), 1);
    }

    #[test]
    fn test_offscreen_elements_culled() {
        let mut editor = Editor::default();
        let far = Element::create(
            roughboard_core::ElementType::Rectangle,
            Point::new(10_000.0, 10_000.0),
            Point::new(10_100.0, 10_100.0),
            &Default::default(),
        );
        editor.insert_element(far);
        let mut renderer = LayeredRenderer::new();
        build(&mut renderer, &editor);
        assert_eq!(renderer.static_layer().len(), 2);
    }

    #[test]
    fn test_editing_text_skipped_and_replay_order() {
        let mut editor = Editor::default();
        let id = editor.insert_element(Element::new(ElementKind::Text(TextShape::default()), Point::new(20.0, 20.0)));
        let mut renderer = LayeredRenderer::new();

        build(&mut renderer, &editor);
        let mut painter = CountingPainter::default();
        renderer.replay(&mut painter).unwrap();
        assert_eq!(painter.calls[0], "fill");
        assert_eq!(painter.count("text"), 1);

        renderer.build_scene(&RenderContext::new(&editor, VIEWPORT).with_editing_element(Some(&id)));
        let mut painter = CountingPainter::default();
        renderer.replay(&mut painter).unwrap();
        assert_eq!(painter.count("text"), 0);
    }

    #[test]
    fn test_painter_error_stops_replay() {
        let mut editor = Editor::default();
        editor.insert_element(Element::new(ElementKind::Text(TextShape::default()), Point::new(20.0, 20.0)));
        let mut renderer = LayeredRenderer::new();
        build(&mut renderer, &editor);

        let mut painter = CountingPainter {
            fail_on_text: true,
            ..Default::default()
        };
        assert!(matches!(renderer.replay(&mut painter), Err(RendererError::RenderFailed(_))));
    }

    #[test]
    fn test_scale_factor_applies_to_transform() {
        let mut editor = Editor::default();
        draw_rect(&mut editor, (10.0, 10.0), (110.0, 60.0));
        click(&mut editor, (500.0, 500.0));
        let mut renderer = LayeredRenderer::new();
        renderer.build_scene(&RenderContext::new(&editor, Size::new(1600.0, 1200.0)).with_scale_factor(2.0));
        let last = renderer.static_layer().commands().last().unwrap();
        assert_eq!(last.transform().translation(), Vec2::new(20.0, 20.0));
    }
}
