//! Immediate-mode rasterization into RGBA buffers.
//!
//! Strokes are rendered from a distance field: every pixel whose center lies
//! within half the stroke width of the geometry is covered, with a one pixel
//! anti-aliased falloff. Caps and joins are round because the field is the
//! distance to the nearest point of the geometry.

use std::ops::Range;

use image::{imageops, Rgba, RgbaImage};

use crate::error::{SketchError, SketchResult};
use crate::event::Point;

/// RGBA color with straight (non-premultiplied) alpha.
pub type Color = Rgba<u8>;

/// Opaque white, the default surface background.
pub const WHITE: Color = Rgba([255, 255, 255, 255]);

/// Opaque black, the default brush color.
pub const BLACK: Color = Rgba([0, 0, 0, 255]);

/// Fully transparent pixel.
pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// Blend `src` over `dst` using source-over, scaled by `coverage` (0..=1).
pub fn blend_pixel(dst: &mut Color, src: Color, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return;
    }

    let src_alpha = f32::from(src[3]) / 255.0 * coverage;
    if src_alpha >= 1.0 {
        *dst = src;
        return;
    }

    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= f32::EPSILON {
        *dst = TRANSPARENT;
        return;
    }

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let value = (f32::from(src[channel]) * src_alpha
            + f32::from(dst[channel]) * dst_alpha * (1.0 - src_alpha))
            / out_alpha;
        out[channel] = to_channel(value);
    }
    out[3] = to_channel(out_alpha * 255.0);
    *dst = Rgba(out);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Shortest distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f32::EPSILON {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Pixel index range covering `lo..hi`, clipped to `0..limit`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn span(lo: f32, hi: f32, limit: u32) -> Range<u32> {
    let limit_f = limit as f32;
    let start = lo.floor().clamp(0.0, limit_f) as u32;
    let end = hi.ceil().clamp(0.0, limit_f) as u32;
    start..end.max(start)
}

/// Axis-aligned bounds of the stroked geometry, before padding.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Point,
    max: Point,
}

impl Bounds {
    fn of(points: &[Point]) -> Self {
        let mut min = Point::new(f32::MAX, f32::MAX);
        let mut max = Point::new(f32::MIN, f32::MIN);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }
}

#[allow(clippy::cast_precision_loss)]
fn stroke_field<F>(image: &mut RgbaImage, bounds: Bounds, color: Color, width: f32, distance: F)
where
    F: Fn(Point) -> f32,
{
    let half = (width / 2.0).max(0.5);
    let pad = half + 1.0;
    let (w, h) = image.dimensions();

    for y in span(bounds.min.y - pad, bounds.max.y + pad, h) {
        for x in span(bounds.min.x - pad, bounds.max.x + pad, w) {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let coverage = half + 0.5 - distance(center);
            if coverage > 0.0 {
                blend_pixel(image.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

/// Stroke a single segment with round caps.
pub fn stroke_line(image: &mut RgbaImage, from: Point, to: Point, color: Color, width: f32) {
    stroke_field(image, Bounds::of(&[from, to]), color, width, |p| {
        segment_distance(p, from, to)
    });
}

/// Stroke a closed polygon outline with round joins.
pub fn stroke_polygon(image: &mut RgbaImage, points: &[Point], color: Color, width: f32) {
    if points.is_empty() {
        return;
    }
    stroke_field(image, Bounds::of(points), color, width, |p| {
        points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| segment_distance(p, *a, *b))
            .fold(f32::MAX, f32::min)
    });
}

/// Stroke a circle outline.
pub fn stroke_circle(image: &mut RgbaImage, center: Point, radius: f32, color: Color, width: f32) {
    let radius = radius.abs();
    let bounds = Bounds {
        min: Point::new(center.x - radius, center.y - radius),
        max: Point::new(center.x + radius, center.y + radius),
    };
    stroke_field(image, bounds, color, width, |p| {
        (p.distance_to(center) - radius).abs()
    });
}

/// Overwrite every pixel with `color`.
pub fn fill_all(image: &mut RgbaImage, color: Color) {
    for pixel in image.pixels_mut() {
        *pixel = color;
    }
}

/// Placement of a source raster inside a destination after aspect-fit scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRect {
    /// Left offset in destination pixels.
    pub x: u32,
    /// Top offset in destination pixels.
    pub y: u32,
    /// Scaled width.
    pub width: u32,
    /// Scaled height.
    pub height: u32,
}

/// Largest uncropped placement of `src` inside `dst`, centered.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn aspect_fit(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> FitRect {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return FitRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    let scale = (f64::from(dst_width) / f64::from(src_width))
        .min(f64::from(dst_height) / f64::from(src_height));
    let width = ((f64::from(src_width) * scale).round() as u32).clamp(1, dst_width);
    let height = ((f64::from(src_height) * scale).round() as u32).clamp(1, dst_height);

    FitRect {
        x: (dst_width - width) / 2,
        y: (dst_height - height) / 2,
        width,
        height,
    }
}

/// Draw `src` into `dst` aspect-fit and centered, letterboxing with `background`.
///
/// # Errors
///
/// Returns [`SketchError::InvalidDimensions`] if either raster is empty.
pub fn draw_aspect_fit(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    background: Color,
) -> SketchResult<FitRect> {
    let (src_width, src_height) = src.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(SketchError::InvalidDimensions {
            width: src_width,
            height: src_height,
        });
    }
    let (dst_width, dst_height) = dst.dimensions();
    if dst_width == 0 || dst_height == 0 {
        return Err(SketchError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }

    let rect = aspect_fit(src_width, src_height, dst_width, dst_height);
    fill_all(dst, background);

    if (rect.width, rect.height) == (src_width, src_height) {
        imageops::overlay(dst, src, i64::from(rect.x), i64::from(rect.y));
    } else {
        let scaled = imageops::resize(
            src,
            rect.width,
            rect.height,
            imageops::FilterType::Triangle,
        );
        imageops::overlay(dst, &scaled, i64::from(rect.x), i64::from(rect.y));
    }

    Ok(rect)
}
