//! Roughboard Core Library
//!
//! Scene model, hand-drawn geometry and the interaction engine for the
//! roughboard diagram editor. Nothing here depends on a windowing system or
//! GPU; the render crate consumes [`Editor`] state and draws it.

pub mod binding;
pub mod camera;
pub mod config;
pub mod drawable;
pub mod editor;
pub mod element;
pub mod error;
pub mod geometry;
pub mod grouping;
pub mod input;
pub mod scene;
pub mod selection;
pub mod tools;

pub use binding::Binding;
pub use camera::Camera;
pub use config::{BINDING_TOLERANCE, EditorConfig, GRID_SIZE, HIT_TOLERANCE};
pub use drawable::{Drawable, DrawablePart};
pub use editor::{Editor, Mode, SceneObserver};
pub use element::{
    ActiveStyle, Element, ElementId, ElementKind, ElementType, FillStyle, PathEnd, SerializableColor, StyleUpdate,
};
pub use error::{SceneError, SceneResult};
pub use input::{InputEvent, KeyEvent, Modifiers, MouseButton, PointerEvent, PointerQueue};
pub use scene::{Scene, SceneData};
pub use selection::{Handle, HandleKind, Selection, get_handles};
pub use tools::ToolKind;
