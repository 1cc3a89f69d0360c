//! Seeding the surface from an external image.

use crate::codec;
use crate::error::SketchResult;
use crate::raster;
use crate::surface::SurfaceState;

/// Longest axis, in pixels, an imported image may size the surface to.
pub const MAX_IMPORT_DIMENSION: u32 = 1024;

/// Summary of an image import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Decoded image size.
    pub natural: (u32, u32),
    /// Bounded size derived from the natural size.
    pub target: (u32, u32),
    /// Whether the surface itself was resized to `target`.
    pub surface_resized: bool,
}

/// Bound `(width, height)` so the longer axis is at most `max`, keeping aspect ratio.
///
/// The shorter axis is floored and never drops below 1. Sizes already within
/// the bound are returned unchanged.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bounded_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let width = width.max(1);
    let height = height.max(1);
    let max = max.max(1);
    if width <= max && height <= max {
        return (width, height);
    }

    if width >= height {
        let scaled = (f64::from(height) * f64::from(max) / f64::from(width)).floor() as u32;
        (max, scaled.max(1))
    } else {
        let scaled = (f64::from(width) * f64::from(max) / f64::from(height)).floor() as u32;
        (scaled.max(1), max)
    }
}

/// Decode `bytes` and draw them onto the surface, aspect-fit.
///
/// Outside immersive mode the surface is first resized to the bounded image
/// size (which also sets its orientation). In immersive mode the surface
/// keeps its dimensions and the image is letterboxed into it.
///
/// # Errors
///
/// Returns [`crate::SketchError::Decode`] if the bytes are not an image. The
/// surface is not modified in that case.
pub fn ingest_image(
    surface: &mut SurfaceState,
    bytes: &[u8],
    immersive: bool,
) -> SketchResult<ImportReport> {
    let image = codec::decode_image(bytes)?;
    let natural = image.dimensions();
    let target = bounded_dimensions(natural.0, natural.1, MAX_IMPORT_DIMENSION);

    let (width, height) = if immersive {
        surface.dimensions()
    } else {
        target
    };
    surface.initialize(width, height)?;

    let background = surface.background();
    raster::draw_aspect_fit(surface.committed_mut(), &image, background)?;

    tracing::info!(
        "Imported {}x{} image into {}x{} surface",
        natural.0,
        natural.1,
        width,
        height
    );

    Ok(ImportReport {
        natural,
        target,
        surface_resized: !immersive,
    })
}

/// Like [`ingest_image`], taking a base64 data URI.
///
/// # Errors
///
/// Returns an error if the URI is malformed or does not carry an image.
pub fn ingest_data_uri(
    surface: &mut SurfaceState,
    uri: &str,
    immersive: bool,
) -> SketchResult<ImportReport> {
    let parsed = codec::parse_data_uri(uri)?;
    ingest_image(surface, &parsed.bytes, immersive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::BLACK;
    use crate::surface::Orientation;
    use image::RgbaImage;

    fn png(width: u32, height: u32) -> Vec<u8> {
        codec::encode_png(&RgbaImage::from_pixel(width, height, BLACK)).expect("encode")
    }

    #[test]
    fn test_bounded_dimensions() {
        assert_eq!(bounded_dimensions(2048, 1024, 1024), (1024, 512));
        assert_eq!(bounded_dimensions(1000, 3000, 1024), (341, 1024));
        assert_eq!(bounded_dimensions(640, 480, 1024), (640, 480));
        assert_eq!(bounded_dimensions(5000, 1, 1024), (1024, 1));
        assert_eq!(bounded_dimensions(0, 0, 1024), (1, 1));
    }

    #[test]
    fn test_ingest_resizes_surface_outside_immersive() {
        let mut surface = SurfaceState::default();
        let report = ingest_image(&mut surface, &png(300, 600), false).expect("ingest");

        assert_eq!(report.natural, (300, 600));
        assert!(report.surface_resized);
        assert_eq!(surface.dimensions(), (300, 600));
        assert_eq!(surface.orientation(), Orientation::Portrait);
        assert_eq!(*surface.committed().get_pixel(150, 300), BLACK);
    }

    #[test]
    fn test_ingest_keeps_dimensions_in_immersive() {
        let mut surface = SurfaceState::new(400, 200).expect("surface");
        let report = ingest_image(&mut surface, &png(100, 100), true).expect("ingest");

        assert!(!report.surface_resized);
        assert_eq!(surface.dimensions(), (400, 200));
        // Square image letterboxed horizontally
        assert_eq!(*surface.committed().get_pixel(200, 100), BLACK);
        assert_eq!(*surface.committed().get_pixel(10, 100), surface.background());
    }

    #[test]
    fn test_decode_failure_leaves_surface_untouched() {
        let mut surface = SurfaceState::new(50, 50).expect("surface");
        surface.commit_stroke(
            crate::Point::new(0.0, 0.0),
            crate::Point::new(49.0, 49.0),
            BLACK,
            3.0,
        );
        let before = surface.committed().clone();

        assert!(ingest_image(&mut surface, b"not an image", false).is_err());
        assert_eq!(surface.committed(), &before);
        assert_eq!(surface.dimensions(), (50, 50));
    }

    #[test]
    fn test_ingest_data_uri() {
        let mut surface = SurfaceState::default();
        let uri = codec::png_data_uri(&png(20, 10));
        ingest_data_uri(&mut surface, &uri, false).expect("ingest");
        assert_eq!(surface.dimensions(), (20, 10));
    }
}
