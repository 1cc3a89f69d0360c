//! Tool selection and the pointer-driven drawing state machine.

use serde::{Deserialize, Serialize};

use crate::event::{Point, PointerEvent, PointerPhase};
use crate::raster::{Color, BLACK};
use crate::surface::{ShapeKind, SurfaceState};

/// Default stroke width in pixels.
pub const DEFAULT_STROKE_WIDTH: f32 = 5.0;

/// Smallest stroke width accepted by [`ToolState::set_stroke_width`].
pub const MIN_STROKE_WIDTH: f32 = 1.0;

/// Largest stroke width accepted by [`ToolState::set_stroke_width`].
pub const MAX_STROKE_WIDTH: f32 = 100.0;

/// The drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Freehand strokes committed segment by segment.
    #[default]
    Brush,
    /// Flood fill on pointer down.
    Fill,
    /// Rectangle outline.
    Rectangle,
    /// Circle outline.
    Circle,
    /// Straight line.
    Line,
}

impl Tool {
    /// The overlay shape this tool previews, if it is a shape tool.
    #[must_use]
    pub const fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            Self::Rectangle => Some(ShapeKind::Rectangle),
            Self::Circle => Some(ShapeKind::Circle),
            Self::Line => Some(ShapeKind::Line),
            Self::Brush | Self::Fill => None,
        }
    }
}

/// Interaction phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolPhase {
    /// No stroke or shape in progress.
    Idle,
    /// A stroke or shape is in progress.
    Drawing {
        /// Tool captured at pointer down.
        tool: Tool,
        /// Last brush point, or the shape's starting point.
        anchor: Point,
    },
}

/// What a pointer event did to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEffect {
    /// Nothing changed.
    None,
    /// A stroke or shape began; nothing drawn yet.
    Started,
    /// A brush segment was committed.
    StrokeCommitted,
    /// The overlay preview was redrawn.
    PreviewUpdated,
    /// A shape was committed and the overlay cleared.
    ShapeCommitted,
    /// The interaction ended without committing a shape.
    Ended,
    /// A flood fill recolored this many pixels.
    Filled(usize),
}

/// Active tool, color, stroke width and the in-progress interaction.
#[derive(Debug, Clone)]
pub struct ToolState {
    active_tool: Tool,
    color: Color,
    stroke_width: f32,
    phase: ToolPhase,
    last_in_bounds: Option<Point>,
}

impl Default for ToolState {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolState {
    /// Brush, black, default width, idle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active_tool: Tool::Brush,
            color: BLACK,
            stroke_width: DEFAULT_STROKE_WIDTH,
            phase: ToolPhase::Idle,
            last_in_bounds: None,
        }
    }

    /// Currently selected tool.
    #[must_use]
    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    /// Select a tool. An interaction already in progress keeps its tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.active_tool = tool;
    }

    /// Current color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Set the drawing color.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Current stroke width.
    #[must_use]
    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    /// Set the stroke width, clamped to the supported range.
    pub fn set_stroke_width(&mut self, width: f32) {
        self.stroke_width = if width.is_finite() {
            width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
        } else {
            DEFAULT_STROKE_WIDTH
        };
    }

    /// Current interaction phase.
    #[must_use]
    pub fn phase(&self) -> ToolPhase {
        self.phase
    }

    /// Whether the pointer is down on a stroke or shape.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self.phase, ToolPhase::Drawing { .. })
    }

    /// The anchor of the interaction in progress.
    #[must_use]
    pub fn anchor(&self) -> Option<Point> {
        match self.phase {
            ToolPhase::Drawing { anchor, .. } => Some(anchor),
            ToolPhase::Idle => None,
        }
    }

    /// Dispatch a pointer event against the surface.
    pub fn handle(&mut self, surface: &mut SurfaceState, event: PointerEvent) -> ToolEffect {
        let point = event.position;
        if event.phase != PointerPhase::Down && surface.contains(point) {
            self.last_in_bounds = Some(point);
        }

        match event.phase {
            PointerPhase::Down => self.pointer_down(surface, point),
            PointerPhase::Move => self.pointer_move(surface, point),
            PointerPhase::Up => self.finish(surface, point),
            PointerPhase::Leave => {
                let end = self.last_in_bounds.unwrap_or(point);
                self.finish(surface, end)
            }
        }
    }

    /// Abandon any in-progress interaction without committing it.
    pub fn cancel(&mut self, surface: &mut SurfaceState) {
        if self.is_drawing() {
            surface.clear_overlay();
        }
        self.phase = ToolPhase::Idle;
        self.last_in_bounds = None;
    }

    fn pointer_down(&mut self, surface: &mut SurfaceState, point: Point) -> ToolEffect {
        if self.is_drawing() {
            // A missed up event; close the previous interaction first.
            let end = self.last_in_bounds.unwrap_or(point);
            self.finish(surface, end);
        }
        self.last_in_bounds = surface.contains(point).then_some(point);

        match self.active_tool {
            Tool::Fill => fill_at(surface, point, self.color),
            tool @ (Tool::Brush | Tool::Rectangle | Tool::Circle | Tool::Line) => {
                self.phase = ToolPhase::Drawing {
                    tool,
                    anchor: point,
                };
                ToolEffect::Started
            }
        }
    }

    fn pointer_move(&mut self, surface: &mut SurfaceState, point: Point) -> ToolEffect {
        let ToolPhase::Drawing { tool, anchor } = self.phase else {
            return ToolEffect::None;
        };

        if let Some(kind) = tool.shape_kind() {
            surface.preview_shape(kind, anchor, point, self.color, self.stroke_width);
            return ToolEffect::PreviewUpdated;
        }

        surface.commit_stroke(anchor, point, self.color, self.stroke_width);
        self.phase = ToolPhase::Drawing {
            tool,
            anchor: point,
        };
        ToolEffect::StrokeCommitted
    }

    fn finish(&mut self, surface: &mut SurfaceState, end: Point) -> ToolEffect {
        let ToolPhase::Drawing { tool, anchor } = self.phase else {
            return ToolEffect::None;
        };
        self.phase = ToolPhase::Idle;

        match tool.shape_kind() {
            Some(kind) => {
                surface.commit_shape(kind, anchor, end, self.color, self.stroke_width);
                ToolEffect::ShapeCommitted
            }
            None => {
                surface.clear_overlay();
                ToolEffect::Ended
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fill_at(surface: &mut SurfaceState, point: Point, color: Color) -> ToolEffect {
    if !surface.contains(point) {
        return ToolEffect::Filled(0);
    }
    let filled = surface.flood_fill(point.x.floor() as u32, point.y.floor() as u32, color);
    ToolEffect::Filled(filled)
}
