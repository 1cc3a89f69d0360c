//! 4-connected flood fill over the committed buffer.
//!
//! Matching is exact on all four channels. Anti-aliased edge pixels differ
//! from the region color, so they stop the fill. Diagonal neighbours are
//! never visited, which keeps fills from leaking through one pixel wide
//! diagonal lines.

use std::collections::VecDeque;

use image::RgbaImage;

use crate::raster::Color;

/// Fill the region containing `(x, y)` with `fill`. Returns pixels filled.
///
/// A seed outside the image, or a seed already equal to `fill`, is a no-op.
pub fn flood_fill(image: &mut RgbaImage, x: u32, y: u32, fill: Color) -> usize {
    let (width, height) = image.dimensions();
    if x >= width || y >= height {
        return 0;
    }

    let target = *image.get_pixel(x, y);
    if target == fill {
        return 0;
    }

    // Recoloring on enqueue doubles as the visited set: a filled pixel no
    // longer equals `target`.
    let mut queue = VecDeque::new();
    image.put_pixel(x, y, fill);
    queue.push_back((x, y));
    let mut filled = 1;

    while let Some((px, py)) = queue.pop_front() {
        let neighbours = [
            px.checked_sub(1).map(|nx| (nx, py)),
            (px + 1 < width).then_some((px + 1, py)),
            py.checked_sub(1).map(|ny| (px, ny)),
            (py + 1 < height).then_some((px, py + 1)),
        ];

        for (nx, ny) in neighbours.into_iter().flatten() {
            if *image.get_pixel(nx, ny) == target {
                image.put_pixel(nx, ny, fill);
                queue.push_back((nx, ny));
                filled += 1;
            }
        }
    }

    tracing::trace!("Flood fill from ({x}, {y}) recolored {filled} pixels");
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BLACK, WHITE};
    use image::Rgba;
    use proptest::prelude::*;

    const RED: Color = Rgba([255, 0, 0, 255]);

    fn outlined_square(size: u32) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(size, size, WHITE);
        for i in 0..size {
            image.put_pixel(i, 0, BLACK);
            image.put_pixel(i, size - 1, BLACK);
            image.put_pixel(0, i, BLACK);
            image.put_pixel(size - 1, i, BLACK);
        }
        image
    }

    #[test]
    fn test_uniform_buffer_fills_completely() {
        let mut image = RgbaImage::from_pixel(100, 100, WHITE);
        let filled = flood_fill(&mut image, 0, 0, BLACK);

        assert_eq!(filled, 100 * 100);
        assert!(image.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_outline_contains_fill() {
        let mut image = outlined_square(20);
        let filled = flood_fill(&mut image, 10, 10, RED);

        assert_eq!(filled, 18 * 18);
        for (x, y, pixel) in image.enumerate_pixels() {
            let on_border = x == 0 || y == 0 || x == 19 || y == 19;
            if on_border {
                assert_eq!(*pixel, BLACK, "outline pixel ({x}, {y}) changed");
            } else {
                assert_eq!(*pixel, RED, "interior pixel ({x}, {y}) not filled");
            }
        }
    }

    #[test]
    fn test_same_color_is_noop() {
        let mut image = outlined_square(10);
        let before = image.clone();
        assert_eq!(flood_fill(&mut image, 5, 5, WHITE), 0);
        assert_eq!(image, before);
    }

    #[test]
    fn test_out_of_bounds_seed_is_noop() {
        let mut image = RgbaImage::from_pixel(4, 4, WHITE);
        assert_eq!(flood_fill(&mut image, 4, 0, BLACK), 0);
        assert_eq!(flood_fill(&mut image, 0, 99, BLACK), 0);
        assert!(image.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_diagonal_gap_does_not_leak() {
        // A one pixel diagonal line splits the buffer in two.
        let mut image = RgbaImage::from_pixel(8, 8, WHITE);
        for i in 0..8 {
            image.put_pixel(i, i, BLACK);
        }
        flood_fill(&mut image, 7, 0, RED);

        assert_eq!(*image.get_pixel(0, 7), WHITE);
        assert_eq!(*image.get_pixel(6, 0), RED);
        assert_eq!(*image.get_pixel(3, 3), BLACK);
    }

    #[test]
    fn test_alpha_channel_difference_is_a_barrier() {
        let mut image = RgbaImage::from_pixel(5, 1, WHITE);
        image.put_pixel(2, 0, Rgba([255, 255, 255, 254]));
        flood_fill(&mut image, 0, 0, RED);

        assert_eq!(*image.get_pixel(1, 0), RED);
        assert_eq!(*image.get_pixel(3, 0), WHITE);
    }

    proptest! {
        #[test]
        fn fill_never_crosses_differing_pixels(
            cells in proptest::collection::vec(any::<bool>(), 64),
            seed_x in 0u32..8,
            seed_y in 0u32..8,
        ) {
            let mut image = RgbaImage::from_fn(8, 8, |x, y| {
                if cells[(y * 8 + x) as usize] { BLACK } else { WHITE }
            });
            let before = image.clone();
            let target = *before.get_pixel(seed_x, seed_y);
            let filled = flood_fill(&mut image, seed_x, seed_y, RED);

            let mut changed = 0;
            for (x, y, pixel) in image.enumerate_pixels() {
                let original = *before.get_pixel(x, y);
                if *pixel != original {
                    changed += 1;
                    prop_assert_eq!(original, target);
                    prop_assert_eq!(*pixel, RED);
                }
            }
            prop_assert_eq!(changed, filled);
        }

        #[test]
        fn fill_with_seed_color_is_noop(
            cells in proptest::collection::vec(any::<bool>(), 36),
            seed_x in 0u32..6,
            seed_y in 0u32..6,
        ) {
            let mut image = RgbaImage::from_fn(6, 6, |x, y| {
                if cells[(y * 6 + x) as usize] { BLACK } else { WHITE }
            });
            let before = image.clone();
            let seed_color = *image.get_pixel(seed_x, seed_y);

            prop_assert_eq!(flood_fill(&mut image, seed_x, seed_y, seed_color), 0);
            prop_assert_eq!(image, before);
        }
    }
}
