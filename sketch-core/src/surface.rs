//! The pixel surface pair: committed strokes plus a transient overlay.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{SketchError, SketchResult};
use crate::event::Point;
use crate::fill;
use crate::raster::{self, Color, TRANSPARENT, WHITE};

/// Fixed surface size for landscape orientation.
pub const LANDSCAPE_PRESET: (u32, u32) = (800, 450);

/// Fixed surface size for portrait orientation.
pub const PORTRAIT_PRESET: (u32, u32) = (450, 800);

/// Surface orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Wider than tall (or square).
    Landscape,
    /// Taller than wide.
    Portrait,
}

impl Orientation {
    /// Orientation implied by a pair of dimensions.
    #[must_use]
    pub const fn for_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    /// Preset surface dimensions for this orientation.
    #[must_use]
    pub const fn preset(self) -> (u32, u32) {
        match self {
            Self::Landscape => LANDSCAPE_PRESET,
            Self::Portrait => PORTRAIT_PRESET,
        }
    }

    /// The other orientation.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Landscape => Self::Portrait,
            Self::Portrait => Self::Landscape,
        }
    }
}

/// Outline shapes that are previewed on the overlay before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle spanning anchor and current corner.
    Rectangle,
    /// Circle centered on the anchor through the current point.
    Circle,
    /// Straight line from anchor to current point.
    Line,
}

/// Drawing surface state.
///
/// Both buffers always share the same dimensions. The overlay is fully
/// transparent except while a shape is being previewed.
#[derive(Debug, Clone)]
pub struct SurfaceState {
    orientation: Orientation,
    background: Color,
    committed: RgbaImage,
    overlay: RgbaImage,
}

impl SurfaceState {
    /// Create a surface with a white background.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::InvalidDimensions`] if either axis is zero.
    pub fn new(width: u32, height: u32) -> SketchResult<Self> {
        Self::with_background(width, height, WHITE)
    }

    /// Create a surface with a custom opaque background.
    ///
    /// The alpha channel of `background` is ignored; the background is
    /// always fully opaque.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::InvalidDimensions`] if either axis is zero.
    pub fn with_background(width: u32, height: u32, background: Color) -> SketchResult<Self> {
        validate_dimensions(width, height)?;
        let mut background = background;
        background.0[3] = u8::MAX;
        Ok(Self {
            orientation: Orientation::for_dimensions(width, height),
            background,
            committed: RgbaImage::from_pixel(width, height, background),
            overlay: RgbaImage::from_pixel(width, height, TRANSPARENT),
        })
    }

    /// Create a surface sized to an orientation preset.
    #[must_use]
    pub fn for_orientation(orientation: Orientation) -> Self {
        let (width, height) = orientation.preset();
        Self {
            orientation,
            background: WHITE,
            committed: RgbaImage::from_pixel(width, height, WHITE),
            overlay: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    /// Reinitialize both buffers at new dimensions.
    ///
    /// The committed buffer is filled with the background and the overlay is
    /// cleared. Orientation follows the new dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::InvalidDimensions`] if either axis is zero. The
    /// surface is left untouched in that case.
    pub fn initialize(&mut self, width: u32, height: u32) -> SketchResult<()> {
        validate_dimensions(width, height)?;
        self.committed = RgbaImage::from_pixel(width, height, self.background);
        self.overlay = RgbaImage::from_pixel(width, height, TRANSPARENT);
        self.orientation = Orientation::for_dimensions(width, height);
        tracing::debug!("Surface initialized at {width}x{height}");
        Ok(())
    }

    /// Surface width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.committed.width()
    }

    /// Surface height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.committed.height()
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.committed.dimensions()
    }

    /// Current orientation.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Background color used for initialization and letterboxing.
    #[must_use]
    pub fn background(&self) -> Color {
        self.background
    }

    /// The committed buffer.
    #[must_use]
    pub fn committed(&self) -> &RgbaImage {
        &self.committed
    }

    /// The overlay buffer.
    #[must_use]
    pub fn overlay(&self) -> &RgbaImage {
        &self.overlay
    }

    pub(crate) fn committed_mut(&mut self) -> &mut RgbaImage {
        &mut self.committed
    }

    /// Whether a point lies inside the surface.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < self.width() as f32
            && point.y < self.height() as f32
    }

    /// Draw a round-capped segment straight into the committed buffer.
    pub fn commit_stroke(&mut self, from: Point, to: Point, color: Color, width: f32) {
        raster::stroke_line(&mut self.committed, from, to, color, width);
    }

    /// Replace the overlay contents with a shape outline.
    pub fn preview_shape(
        &mut self,
        kind: ShapeKind,
        anchor: Point,
        current: Point,
        color: Color,
        width: f32,
    ) {
        self.clear_overlay();
        draw_shape(&mut self.overlay, kind, anchor, current, color, width);
    }

    /// Draw the final shape outline into the committed buffer and clear the overlay.
    pub fn commit_shape(
        &mut self,
        kind: ShapeKind,
        anchor: Point,
        end: Point,
        color: Color,
        width: f32,
    ) {
        draw_shape(&mut self.committed, kind, anchor, end, color, width);
        self.clear_overlay();
    }

    /// Make the overlay fully transparent.
    pub fn clear_overlay(&mut self) {
        raster::fill_all(&mut self.overlay, TRANSPARENT);
    }

    /// Flood fill the committed buffer from `(x, y)`. Returns pixels filled.
    pub fn flood_fill(&mut self, x: u32, y: u32, color: Color) -> usize {
        fill::flood_fill(&mut self.committed, x, y, color)
    }

    /// Whether every committed pixel still equals the background.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.committed.pixels().all(|p| *p == self.background)
    }

    /// Committed buffer with the overlay blended on top.
    #[must_use]
    pub fn composite(&self) -> RgbaImage {
        let mut out = self.committed.clone();
        for (dst, src) in out.pixels_mut().zip(self.overlay.pixels()) {
            if src[3] > 0 {
                raster::blend_pixel(dst, *src, 1.0);
            }
        }
        out
    }

    /// Encode the committed buffer as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::Encode`] if encoding fails.
    pub fn to_png_bytes(&self) -> SketchResult<Vec<u8>> {
        codec::encode_png(&self.committed)
    }

    /// Encode the committed buffer as a `data:image/png;base64,` URI.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::Encode`] if encoding fails.
    pub fn to_data_uri(&self) -> SketchResult<String> {
        Ok(codec::png_data_uri(&self.to_png_bytes()?))
    }
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::for_orientation(Orientation::Landscape)
    }
}

fn validate_dimensions(width: u32, height: u32) -> SketchResult<()> {
    if width == 0 || height == 0 {
        return Err(SketchError::InvalidDimensions { width, height });
    }
    Ok(())
}

fn draw_shape(
    target: &mut RgbaImage,
    kind: ShapeKind,
    anchor: Point,
    current: Point,
    color: Color,
    width: f32,
) {
    match kind {
        ShapeKind::Rectangle => {
            let corners = [
                anchor,
                Point::new(current.x, anchor.y),
                current,
                Point::new(anchor.x, current.y),
            ];
            raster::stroke_polygon(target, &corners, color, width);
        }
        ShapeKind::Circle => {
            raster::stroke_circle(target, anchor, anchor.distance_to(current), color, width);
        }
        ShapeKind::Line => raster::stroke_line(target, anchor, current, color, width),
    }
}
