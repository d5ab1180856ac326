//! Shared test utilities for the quantum-optimizer test suite.
//!
//! Deterministic raster fixtures plus helpers that put encoded images on
//! disk for the batch and session tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let image = gradient_raster(64, 48);
//! let tmp = write_png_fixtures(&[("photo", &image)]);
//! assert!(tmp.path().join("photo.png").exists());
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::imaging::RasterImage;
use crate::imaging::{ImageBackend, OutputFormat, Quality, RustBackend};

// =========================================================================
// Raster fixtures
// =========================================================================

/// Smooth gradient: red follows x, green follows y, blue mixes both.
///
/// Every pixel in a row (and every pixel in a column) is distinct for
/// widths and heights up to 256, which makes geometry tests exact.
pub fn gradient_raster(width: u32, height: u32) -> RasterImage {
    let span = |n: u32| (n.saturating_sub(1)).max(1);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[
                (x * 255 / span(width)) as u8,
                (y * 255 / span(height)) as u8,
                ((x + y) % 256) as u8,
                255,
            ]);
        }
    }
    RasterImage::new(width, height, pixels).unwrap()
}

/// Opaque pseudo-random noise from a fixed-seed LCG.
///
/// High entropy, so lossy encoders respond strongly to quality.
pub fn noisy_raster(width: u32, height: u32) -> RasterImage {
    let mut state: u32 = 0x2545_f491;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 24) as u8
    };
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for _ in 0..width as usize * height as usize {
        pixels.extend_from_slice(&[next(), next(), next(), 255]);
    }
    RasterImage::new(width, height, pixels).unwrap()
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Encode `image` as PNG with the real backend.
pub fn encode_png_bytes(image: &RasterImage) -> Vec<u8> {
    RustBackend::new()
        .encode(image, OutputFormat::Png, Quality::default())
        .unwrap()
}

/// Encode `image` as JPEG at `percent` quality with the real backend.
pub fn encode_jpeg_bytes(image: &RasterImage, percent: u32) -> Vec<u8> {
    RustBackend::new()
        .encode(image, OutputFormat::Jpeg, Quality::from_percent(percent))
        .unwrap()
}

/// Write each `(stem, image)` as `<stem>.png` into a fresh temp directory.
pub fn write_png_fixtures(images: &[(&str, &RasterImage)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (stem, image) in images {
        write_png(&tmp.path().join(format!("{stem}.png")), image);
    }
    tmp
}

/// Write `image` as PNG to `path`, creating parent directories.
pub fn write_png(path: &Path, image: &RasterImage) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, encode_png_bytes(image)).unwrap();
}
