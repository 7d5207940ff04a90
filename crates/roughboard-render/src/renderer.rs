//! Renderer trait abstraction.

use crate::display_list::TextRun;
use kurbo::{Affine, BezPath, Rect, Size, Stroke};
use peniko::Color;
use roughboard_core::{Editor, ElementId};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Read-only view of the editor state for this frame.
    pub editor: &'a Editor,
    /// Viewport size in physical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Draw the grid when the scene has a grid size.
    pub show_grid: bool,
    /// Text element currently open in an external editor; skipped when drawing.
    pub editing_element: Option<&'a ElementId>,
}

impl<'a> RenderContext<'a> {
    pub fn new(editor: &'a Editor, viewport_size: Size) -> Self {
        Self {
            editor,
            viewport_size,
            scale_factor: 1.0,
            show_grid: true,
            editing_element: None,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_grid(mut self, show_grid: bool) -> Self {
        self.show_grid = show_grid;
        self
    }

    pub fn with_editing_element(mut self, id: Option<&'a ElementId>) -> Self {
        self.editing_element = id;
        self
    }

    /// World to device pixels.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.scale_factor) * self.editor.camera().transform()
    }

    /// Size of the viewport in CSS pixels.
    pub fn logical_size(&self) -> Size {
        Size::new(
            self.viewport_size.width / self.scale_factor,
            self.viewport_size.height / self.scale_factor,
        )
    }

    pub fn background_color(&self) -> Color {
        self.editor.scene().background_color.into()
    }
}

/// Trait for rendering backends.
///
/// A renderer turns editor state into draw commands once per frame; it never
/// mutates the editor.
pub trait Renderer: Send + Sync {
    /// Build the command buffer for a frame.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color()
    }
}

/// Drawing surface a display list is replayed onto (canvas, GPU scene, test recorder).
pub trait Painter {
    fn fill(&mut self, transform: Affine, path: &BezPath, color: Color) -> RenderResult<()>;

    fn stroke(&mut self, transform: Affine, path: &BezPath, style: &Stroke, color: Color) -> RenderResult<()>;

    fn text(&mut self, transform: Affine, run: &TextRun) -> RenderResult<()>;

    /// Draw the pixels stored under `file_id` into `rect`.
    fn image(&mut self, transform: Affine, rect: Rect, file_id: &str) -> RenderResult<()>;
}
