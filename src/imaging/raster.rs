//! In-memory RGBA raster shared by every pipeline stage.

use image::{DynamicImage, RgbaImage};

/// A width×height grid of RGBA8 samples, row-major, top to bottom.
///
/// Backed by [`RgbaImage`], so the `len == width * height * 4` invariant is
/// held by construction; [`RasterImage::new`] checks it for raw buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage(RgbaImage);

impl RasterImage {
    /// Wrap a raw sample buffer. Returns `None` unless the length is exactly
    /// `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if pixels.len() != expected {
            return None;
        }
        RgbaImage::from_raw(width, height, pixels).map(Self)
    }

    /// An image filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self(image)
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self(image.into_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Flat RGBA samples.
    pub fn pixels(&self) -> &[u8] {
        self.0.as_raw()
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Sample at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.0.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.0
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.0.clone())
    }
}
