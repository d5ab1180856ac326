//! Encode stage: raster to compressed bytes, tagged with what produced them.

use super::backend::{BackendError, ImageBackend};
use super::params::{OutputFormat, Quality};
use super::raster::RasterImage;

/// A finished encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub format: OutputFormat,
    /// Quality the bytes were produced at. Lossless formats report it but
    /// do not use it.
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn from_bytes(
        image: &RasterImage,
        format: OutputFormat,
        quality: Quality,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            format,
            quality,
            width: image.width(),
            height: image.height(),
            bytes,
        }
    }

    /// Exact encoded byte length.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode `image` once at `quality`.
pub fn encode_image(
    backend: &impl ImageBackend,
    image: &RasterImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<EncodedImage, BackendError> {
    let bytes = backend.encode(image, format, quality)?;
    Ok(EncodedImage::from_bytes(image, format, quality, bytes))
}
