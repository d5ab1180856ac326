//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take an
//! [`OptimizeRequest`], compute parameters, and call the stages in pipeline
//! order: resize → rotate → flip → filters → watermark → encode (or the
//! target-size search) → alternates.

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::calculations::calculate_output_dimensions;
use super::convert::{ConversionReport, convert_formats};
use super::encode::{EncodedImage, encode_image};
use super::overlay::apply_watermark;
use super::params::OptimizeRequest;
use super::raster::RasterImage;
use super::search::{Probe, search_target_size};
use super::transform::{apply_blur, apply_filters, apply_transform};
use image::imageops::{self, FilterType};
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("No image loaded")]
    NoImage,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, OptimizeError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, bytes: &[u8]) -> Result<(u32, u32)> {
    let ImageInfo { width, height, .. } = backend.identify(bytes)?;
    Ok((width, height))
}

/// Decode file bytes into a raster.
pub fn load_image(backend: &impl ImageBackend, bytes: &[u8]) -> Result<RasterImage> {
    if bytes.is_empty() {
        return Err(OptimizeError::NoImage);
    }
    Ok(backend.decode(bytes)?)
}

/// Scale `image` to the request's dimensions with Lanczos3.
///
/// Returns the input untouched when no resize is needed.
pub fn resize(image: RasterImage, request: &OptimizeRequest) -> RasterImage {
    let (width, height) = calculate_output_dimensions(
        image.dimensions(),
        request.width,
        request.height,
        request.keep_aspect,
    );
    if (width, height) == image.dimensions() || image.is_empty() {
        return image;
    }
    RasterImage::from_rgba(imageops::resize(
        image.as_rgba(),
        width,
        height,
        FilterType::Lanczos3,
    ))
}

/// Run the pixel pipeline on a copy of `source`: everything up to encode.
pub fn render(source: &RasterImage, request: &OptimizeRequest) -> RasterImage {
    let resized = resize(source.clone(), request);
    let mut image = apply_transform(resized, request.transform);
    apply_filters(&mut image, &request.filters);
    apply_watermark(&mut image, request.watermark.as_ref());
    image
}

/// [`render`] plus the display-only blur.
pub fn render_preview(source: &RasterImage, request: &OptimizeRequest) -> RasterImage {
    let rendered = render(source, request);
    apply_blur(&rendered, request.filters.blur)
}

/// Result of one optimize run.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    /// The rendered raster the bytes were encoded from.
    pub image: RasterImage,
    pub encoded: EncodedImage,
    /// False only when a target size was requested and not met.
    pub achieved: bool,
    /// Every encode attempt; a single entry when no target size was set.
    pub probes: Vec<Probe>,
    /// Size of the input file, when known.
    pub original_size: Option<u64>,
}

impl OptimizeOutcome {
    pub fn size(&self) -> u64 {
        self.encoded.len()
    }
}

/// Render and encode `source` per `request`.
///
/// With a target size the quality search drives repeated encodes starting at
/// `request.quality`; otherwise a single encode runs at that quality.
pub fn optimize(
    backend: &impl ImageBackend,
    source: &RasterImage,
    request: &OptimizeRequest,
) -> Result<OptimizeOutcome> {
    let image = render(source, request);

    let (encoded, achieved, probes) = match request.target_size {
        Some(target) => {
            let outcome = search_target_size(
                backend,
                &image,
                request.format,
                request.quality,
                target.bytes(),
                &request.limits,
            )?;
            let encoded =
                EncodedImage::from_bytes(&image, request.format, outcome.quality, outcome.bytes);
            (encoded, outcome.achieved, outcome.probes)
        }
        None => {
            let encoded = encode_image(backend, &image, request.format, request.quality)?;
            let probe = Probe {
                quality: request.quality.factor(),
                size: encoded.len(),
            };
            (encoded, true, vec![probe])
        }
    };

    debug!(
        "optimized to {}x{} {} at quality {} ({} bytes, {} probes)",
        encoded.width,
        encoded.height,
        encoded.format.label(),
        encoded.quality.percent(),
        encoded.len(),
        probes.len()
    );

    Ok(OptimizeOutcome {
        image,
        encoded,
        achieved,
        probes,
        original_size: None,
    })
}

/// Produce the request's alternate formats from an optimized raster.
pub fn alternates(
    backend: &impl ImageBackend,
    outcome: &OptimizeOutcome,
    request: &OptimizeRequest,
) -> Result<ConversionReport> {
    Ok(convert_formats(
        backend,
        &outcome.image,
        request.format,
        &request.alternates,
    )?)
}
