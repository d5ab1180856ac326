//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: identify, decode, encode, and a capability query for output
//! formats.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust with everything
//! statically linked. Tests use the mock in [`tests`] to drive the pipeline
//! with a predictable size model.

use super::params::{OutputFormat, Quality};
use super::raster::RasterImage;
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    EncodeFailed(String),
    #[error("Output format not supported by this build: {0}")]
    UnsupportedFormat(OutputFormat),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Container format detected from the magic bytes, if recognised.
    pub format: Option<ImageFormat>,
}

/// Trait for image codec backends.
///
/// Every backend must implement all four operations so the pipeline is
/// backend-agnostic. `Sync` so batch runs can share one backend across
/// rayon workers.
pub trait ImageBackend: Sync {
    /// Read dimensions and container format without a full decode.
    fn identify(&self, bytes: &[u8]) -> Result<ImageInfo, BackendError>;

    /// Decode an encoded file into an RGBA raster.
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, BackendError>;

    /// Encode a raster. Lossless formats ignore `quality`.
    ///
    /// Fails with [`BackendError::UnsupportedFormat`] when `supports(format)`
    /// is false, and with [`BackendError::EncodeFailed`] when the codec
    /// rejects the buffer (e.g. zero dimensions).
    fn encode(
        &self,
        image: &RasterImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;

    /// Whether this backend can produce `format`.
    fn supports(&self, format: OutputFormat) -> bool;
}
