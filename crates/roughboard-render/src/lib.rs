//! Roughboard Render Library
//!
//! Turns editor state into retained display lists. A backend implements
//! [`Painter`] and replays the layers built by [`LayeredRenderer`].

mod display_list;
pub mod draw;
mod layers;
mod renderer;

pub use display_list::{DisplayList, DrawCommand, TextRun};
pub use layers::LayeredRenderer;
pub use renderer::{Painter, RenderContext, RenderResult, Renderer, RendererError};
