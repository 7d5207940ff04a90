//! Retained draw commands.

use crate::renderer::{Painter, RenderResult};
use kurbo::{Affine, BezPath, Point, Rect, Stroke};
use peniko::Color;
use roughboard_core::element::TextAlign;

/// One line of text, positioned by the top of its line box.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    /// Anchor of the line: left, centre or right edge per `align`, at the line top.
    pub origin: Point,
    pub font_size: f64,
    /// CSS font stack.
    pub font_family: &'static str,
    pub align: TextAlign,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Fill {
        transform: Affine,
        path: BezPath,
        color: Color,
    },
    Stroke {
        transform: Affine,
        path: BezPath,
        style: Stroke,
        color: Color,
    },
    Text {
        transform: Affine,
        run: TextRun,
    },
    Image {
        transform: Affine,
        rect: Rect,
        file_id: String,
    },
}

impl DrawCommand {
    pub fn transform(&self) -> Affine {
        match self {
            DrawCommand::Fill { transform, .. }
            | DrawCommand::Stroke { transform, .. }
            | DrawCommand::Text { transform, .. }
            | DrawCommand::Image { transform, .. } => *transform,
        }
    }
}

/// Recorded commands for one layer, replayed in order.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn fill(&mut self, transform: Affine, path: BezPath, color: Color) {
        self.commands.push(DrawCommand::Fill { transform, path, color });
    }

    pub fn stroke(&mut self, transform: Affine, path: BezPath, style: Stroke, color: Color) {
        self.commands.push(DrawCommand::Stroke {
            transform,
            path,
            style,
            color,
        });
    }

    pub fn text(&mut self, transform: Affine, run: TextRun) {
        self.commands.push(DrawCommand::Text { transform, run });
    }

    pub fn image(&mut self, transform: Affine, rect: Rect, file_id: impl Into<String>) {
        self.commands.push(DrawCommand::Image {
            transform,
            rect,
            file_id: file_id.into(),
        });
    }

    /// Send every command to `painter`, stopping at the first error.
    pub fn replay(&self, painter: &mut dyn Painter) -> RenderResult<()> {
        for command in &self.commands {
            match command {
                DrawCommand::Fill { transform, path, color } => painter.fill(*transform, path, *color)?,
                DrawCommand::Stroke {
                    transform,
                    path,
                    style,
                    color,
                } => painter.stroke(*transform, path, style, *color)?,
                DrawCommand::Text { transform, run } => painter.text(*transform, run)?,
                DrawCommand::Image {
                    transform,
                    rect,
                    file_id,
                } => painter.image(*transform, *rect, file_id)?,
            }
        }
        Ok(())
    }
}
