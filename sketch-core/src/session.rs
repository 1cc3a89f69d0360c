//! A single drawing session: one surface, its tools and its transitions.
//!
//! The session is the only owner of the [`SurfaceState`]. Tool handling and
//! resize transitions borrow it explicitly, so a resize can never interleave
//! with an in-progress stroke.

use crate::error::SketchResult;
use crate::event::PointerEvent;
use crate::ingest::{self, ImportReport};
use crate::raster::Color;
use crate::surface::{Orientation, SurfaceState};
use crate::tool::{Tool, ToolEffect, ToolState};
use crate::transition::{TransitionManager, TransitionOutcome};

/// Drawing session state.
#[derive(Debug, Default)]
pub struct DrawingSession {
    surface: SurfaceState,
    tools: ToolState,
    transitions: TransitionManager,
}

impl DrawingSession {
    /// Start a blank session at the preset size for `orientation`.
    #[must_use]
    pub fn new(orientation: Orientation) -> Self {
        Self {
            surface: SurfaceState::for_orientation(orientation),
            tools: ToolState::new(),
            transitions: TransitionManager::new(),
        }
    }

    /// The drawing surface.
    #[must_use]
    pub fn surface(&self) -> &SurfaceState {
        &self.surface
    }

    /// Tool settings and interaction state.
    #[must_use]
    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    /// Whether immersive mode is active.
    #[must_use]
    pub fn is_immersive(&self) -> bool {
        self.transitions.is_immersive()
    }

    /// Select a tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.set_tool(tool);
    }

    /// Set the drawing color.
    pub fn set_color(&mut self, color: Color) {
        self.tools.set_color(color);
    }

    /// Set the stroke width.
    pub fn set_stroke_width(&mut self, width: f32) {
        self.tools.set_stroke_width(width);
    }

    /// Feed a pointer event to the active tool.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> ToolEffect {
        self.tools.handle(&mut self.surface, event)
    }

    /// Switch orientation. See [`TransitionManager::request_orientation`].
    ///
    /// # Errors
    ///
    /// Returns an error if the drawing cannot be snapshotted.
    pub fn set_orientation(
        &mut self,
        orientation: Orientation,
        confirmed: bool,
    ) -> SketchResult<TransitionOutcome> {
        self.tools.cancel(&mut self.surface);
        self.transitions
            .request_orientation(&mut self.surface, orientation, confirmed)
    }

    /// Flip between landscape and portrait.
    ///
    /// # Errors
    ///
    /// Returns an error if the drawing cannot be snapshotted.
    pub fn toggle_orientation(&mut self, confirmed: bool) -> SketchResult<TransitionOutcome> {
        let next = self.surface.orientation().toggled();
        self.set_orientation(next, confirmed)
    }

    /// Enter immersive mode sized to the measured container.
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or a failed snapshot.
    pub fn enter_immersive(&mut self, width: u32, height: u32) -> SketchResult<TransitionOutcome> {
        self.tools.cancel(&mut self.surface);
        self.transitions
            .enter_immersive(&mut self.surface, width, height)
    }

    /// Leave immersive mode sized to the measured container.
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or a failed snapshot.
    pub fn exit_immersive(&mut self, width: u32, height: u32) -> SketchResult<TransitionOutcome> {
        self.tools.cancel(&mut self.surface);
        self.transitions
            .exit_immersive(&mut self.surface, width, height)
    }

    /// Seed the surface from image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode; the surface is untouched.
    pub fn import_image(&mut self, bytes: &[u8]) -> SketchResult<ImportReport> {
        self.tools.cancel(&mut self.surface);
        ingest::ingest_image(&mut self.surface, bytes, self.transitions.is_immersive())
    }

    /// Seed the surface from an image data URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is malformed or does not decode.
    pub fn import_data_uri(&mut self, uri: &str) -> SketchResult<ImportReport> {
        self.tools.cancel(&mut self.surface);
        ingest::ingest_data_uri(&mut self.surface, uri, self.transitions.is_immersive())
    }

    /// Wipe the drawing, keeping the current dimensions.
    ///
    /// # Errors
    ///
    /// Never fails for a live surface; kept fallible for parity with resizes.
    pub fn clear(&mut self) -> SketchResult<()> {
        self.tools.cancel(&mut self.surface);
        let (width, height) = self.surface.dimensions();
        self.surface.initialize(width, height)
    }

    /// The committed drawing as a PNG data URI, ready for transformation.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn snapshot_data_uri(&self) -> SketchResult<String> {
        self.surface.to_data_uri()
    }
}
