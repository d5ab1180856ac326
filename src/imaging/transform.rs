//! Pixel transform stage: geometry and color adjustments.
//!
//! | Operation | Implementation |
//! |---|---|
//! | Rotate 90/180/270 (clockwise) | `image::imageops::rotate90/180/270` |
//! | Flip horizontal / vertical | `image::imageops::flip_*_in_place` |
//! | Brightness → contrast → saturation | per-pixel, rows in parallel with rayon |
//! | Blur (preview only) | `image::imageops::blur` |
//!
//! Geometry runs before color: rotation first, then flips. All functions are
//! total over well-formed rasters.

use super::params::{FilterSettings, TransformState};
use super::raster::RasterImage;
use image::imageops;
use rayon::prelude::*;

/// Rotate then flip `image` according to `transform`.
///
/// A clockwise quarter turn moves source pixel `(x, y)` to
/// `(height - 1 - y, x)` and swaps width and height.
pub fn apply_transform(image: RasterImage, transform: TransformState) -> RasterImage {
    if transform.is_identity() {
        return image;
    }
    let rgba = image.into_rgba();
    let mut rotated = match transform.quarter_turns() {
        1 => imageops::rotate90(&rgba),
        2 => imageops::rotate180(&rgba),
        3 => imageops::rotate270(&rgba),
        _ => rgba,
    };
    if transform.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut rotated);
    }
    if transform.flip_vertical {
        imageops::flip_vertical_in_place(&mut rotated);
    }
    RasterImage::from_rgba(rotated)
}

/// Per-channel multipliers derived from [`FilterSettings`].
#[derive(Debug, Clone, Copy)]
struct ColorFactors {
    brightness: f32,
    contrast: f32,
    saturation: f32,
}

impl From<&FilterSettings> for ColorFactors {
    fn from(filters: &FilterSettings) -> Self {
        Self {
            brightness: filters.brightness / 100.0,
            contrast: filters.contrast / 100.0,
            saturation: filters.saturation / 100.0,
        }
    }
}

/// Apply brightness, contrast and saturation to one RGB triple.
fn adjust_rgb(rgb: [u8; 3], factors: ColorFactors) -> [u8; 3] {
    let [mut r, mut g, mut b] = rgb.map(f32::from);

    for c in [&mut r, &mut g, &mut b] {
        *c = (*c * factors.brightness).clamp(0.0, 255.0);
        *c = ((*c - 128.0) * factors.contrast + 128.0).clamp(0.0, 255.0);
    }

    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
    let s = factors.saturation;
    [r, g, b].map(|c| (luma * (1.0 - s) + c * s).clamp(0.0, 255.0).round() as u8)
}

/// Apply color filters in place. Alpha is never touched.
///
/// Identity settings (all 100%) return without touching the buffer.
pub fn apply_filters(image: &mut RasterImage, filters: &FilterSettings) {
    if filters.is_identity() || image.is_empty() {
        return;
    }
    let factors = ColorFactors::from(filters);
    let stride = image.width() as usize * 4;

    image.pixels_mut().par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let [r, g, b] = adjust_rgb([px[0], px[1], px[2]], factors);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    });
}

/// Gaussian blur for previews.
///
/// Never part of the encoded output: the optimizer keeps blur as a
/// display-only effect.
pub fn apply_blur(image: &RasterImage, radius: f32) -> RasterImage {
    if radius <= 0.0 || image.is_empty() {
        return image.clone();
    }
    RasterImage::from_rgba(imageops::blur(image.as_rgba(), radius))
}
