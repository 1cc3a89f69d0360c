//! Pointer input for the drawing surface.

use serde::{Deserialize, Serialize};

/// A position in surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / finger up.
    Up,
    /// Pointer left the surface.
    Leave,
}

/// A single pointer event delivered by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Position in surface coordinates. May lie outside the surface.
    pub position: Point,
}

impl PointerEvent {
    /// Pointer pressed at `(x, y)`.
    #[must_use]
    pub const fn down(x: f32, y: f32) -> Self {
        Self::at(PointerPhase::Down, x, y)
    }

    /// Pointer moved to `(x, y)`.
    #[must_use]
    pub const fn moved(x: f32, y: f32) -> Self {
        Self::at(PointerPhase::Move, x, y)
    }

    /// Pointer released at `(x, y)`.
    #[must_use]
    pub const fn up(x: f32, y: f32) -> Self {
        Self::at(PointerPhase::Up, x, y)
    }

    /// Pointer left the surface, last reported at `(x, y)`.
    #[must_use]
    pub const fn leave(x: f32, y: f32) -> Self {
        Self::at(PointerPhase::Leave, x, y)
    }

    const fn at(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            position: Point::new(x, y),
        }
    }
}
