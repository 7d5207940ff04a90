//! Pointer and keyboard events, and move coalescing.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    /// Wheel. Negative `delta.y` zooms in.
    Scroll {
        position: Point,
        delta: Vec2,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Scroll { position, .. } => position,
        }
    }

    /// Plain left-button press without modifiers.
    pub fn down(position: Point) -> Self {
        PointerEvent::Down {
            position,
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        }
    }

    pub fn up(position: Point) -> Self {
        PointerEvent::Up {
            position,
            button: MouseButton::Left,
        }
    }
}

/// Keyboard event type. Keys use DOM-style names (`"Escape"`, `"Delete"`, `"r"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Anything the editor consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        InputEvent::Pointer(event)
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}

/// Queue that keeps at most one pending move between other events.
///
/// A move arriving right after another move replaces it, so a frame only
/// processes the latest position. Every other event is kept in order.
#[derive(Debug, Clone, Default)]
pub struct PointerQueue {
    events: VecDeque<InputEvent>,
    coalesced: usize,
}

impl PointerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: impl Into<InputEvent>) {
        let event = event.into();
        if let InputEvent::Pointer(PointerEvent::Move { .. }) = event {
            if let Some(last @ InputEvent::Pointer(PointerEvent::Move { .. })) = self.events.back_mut() {
                *last = event;
                self.coalesced += 1;
                return;
            }
        }
        self.events.push_back(event);
    }

    /// Take every pending event in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of moves dropped in favour of a later one.
    pub fn coalesced(&self) -> usize {
        self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    #[test]
    fn test_moves_coalesce_to_latest() {
        let mut queue = PointerQueue::new();
        queue.push(PointerEvent::down(Point::new(0.0, 0.0)));
        queue.push(mv(1.0, 1.0));
        queue.push(mv(2.0, 2.0));
        queue.push(mv(3.0, 3.0));
        queue.push(PointerEvent::up(Point::new(3.0, 3.0)));

        let events: Vec<InputEvent> = queue.drain().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], InputEvent::Pointer(mv(3.0, 3.0)));
        assert!(matches!(events[2], InputEvent::Pointer(PointerEvent::Up { .. })));
        assert_eq!(queue.coalesced(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_moves_split_by_other_events_are_kept() {
        let mut queue = PointerQueue::new();
        queue.push(mv(1.0, 1.0));
        queue.push(KeyEvent::Pressed("Shift".to_string()));
        queue.push(mv(2.0, 2.0));
        queue.push(PointerEvent::Scroll {
            position: Point::ZERO,
            delta: Vec2::new(0.0, -1.0),
        });
        queue.push(mv(4.0, 4.0));
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_position() {
        assert_eq!(mv(5.0, 6.0).position(), Point::new(5.0, 6.0));
        assert_eq!(PointerEvent::up(Point::new(1.0, 2.0)).position(), Point::new(1.0, 2.0));
    }
}
