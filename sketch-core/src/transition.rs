//! Resize transitions that preserve the drawing.
//!
//! ## Protocol
//!
//! ```text
//! 1. snapshot committed buffer   (opaque PNG payload)
//! 2. pick new dimensions         (orientation preset | measured container)
//! 3. reinitialize both buffers   (background fill)
//! 4. redraw snapshot aspect-fit  (centered, letterboxed)
//! 5. drop the snapshot           (also on failed redraw; surface stays blank)
//! ```

use crate::codec;
use crate::error::{SketchError, SketchResult};
use crate::raster;
use crate::surface::{Orientation, SurfaceState};

/// Opaque raster payload captured before a buffer reinitialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    encoded: Vec<u8>,
}

impl Snapshot {
    /// Capture the committed buffer of a surface.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::Encode`] if the buffer cannot be encoded.
    pub fn capture(surface: &SurfaceState) -> SketchResult<Self> {
        Ok(Self {
            encoded: surface.to_png_bytes()?,
        })
    }

    /// Wrap an already encoded payload, e.g. a drawing saved by the host.
    #[must_use]
    pub fn from_encoded(encoded: Vec<u8>) -> Self {
        Self { encoded }
    }

    fn redraw_into(&self, surface: &mut SurfaceState) -> SketchResult<()> {
        let image = codec::decode_image(&self.encoded)
            .map_err(|e| SketchError::SnapshotRestore(e.to_string()))?;
        let background = surface.background();
        raster::draw_aspect_fit(surface.committed_mut(), &image, background)
            .map_err(|e| SketchError::SnapshotRestore(e.to_string()))?;
        Ok(())
    }
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The surface was resized.
    Applied {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
        /// Whether the previous drawing was redrawn.
        restored: bool,
    },
    /// The surface holds a drawing; call again with `confirmed = true`.
    NeedsConfirmation,
    /// Nothing to do.
    Unchanged,
}

/// Owns the pending snapshot and the immersive-mode flag.
#[derive(Debug, Default)]
pub struct TransitionManager {
    pending: Option<Snapshot>,
    immersive: bool,
}

impl TransitionManager {
    /// Create a manager in normal (non-immersive) mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether immersive mode is active.
    #[must_use]
    pub fn is_immersive(&self) -> bool {
        self.immersive
    }

    /// The snapshot waiting to be redrawn, if any.
    #[must_use]
    pub fn pending_snapshot(&self) -> Option<&Snapshot> {
        self.pending.as_ref()
    }

    /// Stage a snapshot for the next redraw, replacing any pending one.
    pub fn stage(&mut self, snapshot: Snapshot) {
        if self.pending.replace(snapshot).is_some() {
            tracing::debug!("Replaced pending snapshot");
        }
    }

    /// Switch orientation using the fixed presets.
    ///
    /// A non-blank surface needs `confirmed = true`. Ignored in immersive
    /// mode, where the container drives the dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be captured. The surface is
    /// untouched in that case.
    pub fn request_orientation(
        &mut self,
        surface: &mut SurfaceState,
        orientation: Orientation,
        confirmed: bool,
    ) -> SketchResult<TransitionOutcome> {
        if self.immersive {
            tracing::debug!("Orientation change ignored in immersive mode");
            return Ok(TransitionOutcome::Unchanged);
        }

        if surface.orientation() == orientation {
            return Ok(TransitionOutcome::Unchanged);
        }

        if !confirmed && !surface.is_blank() {
            return Ok(TransitionOutcome::NeedsConfirmation);
        }

        let (width, height) = orientation.preset();
        self.resize_preserving(surface, width, height)
    }

    /// Enter immersive mode at the measured container size.
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or if the snapshot cannot be captured.
    pub fn enter_immersive(
        &mut self,
        surface: &mut SurfaceState,
        width: u32,
        height: u32,
    ) -> SketchResult<TransitionOutcome> {
        let outcome = self.resize_preserving(surface, width, height)?;
        self.immersive = true;
        Ok(outcome)
    }

    /// Leave immersive mode at the measured container size.
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or if the snapshot cannot be captured.
    pub fn exit_immersive(
        &mut self,
        surface: &mut SurfaceState,
        width: u32,
        height: u32,
    ) -> SketchResult<TransitionOutcome> {
        if !self.immersive {
            return Ok(TransitionOutcome::Unchanged);
        }
        let outcome = self.resize_preserving(surface, width, height)?;
        self.immersive = false;
        Ok(outcome)
    }

    /// Redraw the pending snapshot, if any, and clear it.
    ///
    /// Returns `true` if a snapshot was redrawn. A failed redraw discards the
    /// snapshot and leaves the surface blank.
    pub fn restore_pending(&mut self, surface: &mut SurfaceState) -> bool {
        let Some(snapshot) = self.pending.take() else {
            return false;
        };

        match snapshot.redraw_into(surface) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Discarding snapshot after failed redraw: {e}");
                let (width, height) = surface.dimensions();
                // Reset any partial draw back to a clean surface
                if let Err(e) = surface.initialize(width, height) {
                    tracing::warn!("Failed to reset surface: {e}");
                }
                false
            }
        }
    }

    fn resize_preserving(
        &mut self,
        surface: &mut SurfaceState,
        width: u32,
        height: u32,
    ) -> SketchResult<TransitionOutcome> {
        if width == 0 || height == 0 {
            return Err(SketchError::InvalidDimensions { width, height });
        }

        self.stage(Snapshot::capture(surface)?);
        surface.initialize(width, height)?;
        let restored = self.restore_pending(surface);

        tracing::debug!("Surface resized to {width}x{height} (restored: {restored})");
        Ok(TransitionOutcome::Applied {
            width,
            height,
            restored,
        })
    }
}
