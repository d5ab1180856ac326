//! Pure Rust codec backend with no system dependencies.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::with_guessed_format` + `into_dimensions` |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::load_from_memory` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 1–100) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) + RGB quantization below quality 100 |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6), `avif` feature only |
//!
//! The `image` crate only ships a lossless WebP encoder. To keep WebP output
//! size responsive to the quality factor (the target-size search needs that),
//! colour channels are quantized to fewer levels before encoding when
//! quality is below 100.

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::params::{OutputFormat, Quality};
use super::raster::RasterImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Speed preset handed to rav1e; 6 trades a little size for much faster encodes.
#[cfg(feature = "avif")]
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    formats: Vec<OutputFormat>,
}

impl RustBackend {
    /// A backend offering every output format compiled into this build.
    pub fn new() -> Self {
        Self {
            formats: OutputFormat::ALL
                .into_iter()
                .filter(|f| compiled_in(*f))
                .collect(),
        }
    }

    /// A backend restricted to `formats` (intersected with what is compiled in).
    ///
    /// Useful to mimic a host without a given codec.
    pub fn with_formats(formats: &[OutputFormat]) -> Self {
        Self {
            formats: formats.iter().copied().filter(|f| compiled_in(*f)).collect(),
        }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn compiled_in(format: OutputFormat) -> bool {
    match format {
        OutputFormat::Avif => cfg!(feature = "avif"),
        _ => true,
    }
}

fn encode_error(format: OutputFormat, err: image::ImageError) -> BackendError {
    BackendError::EncodeFailed(format!("{} encode failed: {}", format.label(), err))
}

/// RGB samples of `image` composited over opaque black.
///
/// JPEG has no alpha channel; transparent areas come out black, as a
/// browser canvas export does.
fn flatten_on_black(image: &RasterImage) -> Vec<u8> {
    image
        .pixels()
        .chunks_exact(4)
        .flat_map(|px| {
            let alpha = px[3] as u16;
            [0, 1, 2].map(|i| ((px[i] as u16 * alpha + 127) / 255) as u8)
        })
        .collect()
}

fn encode_jpeg(image: &RasterImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = flatten_on_black(image);
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.percent())
        .write_image(&rgb, image.width(), image.height(), ExtendedColorType::Rgb8)
        .map_err(|e| encode_error(OutputFormat::Jpeg, e))?;
    Ok(buffer)
}

fn encode_png(image: &RasterImage) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.pixels(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| encode_error(OutputFormat::Png, e))?;
    Ok(buffer)
}

fn encode_webp(image: &RasterImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut pixels = image.pixels().to_vec();
    quantize_rgb(&mut pixels, quality.percent());
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .encode(
            &pixels,
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| encode_error(OutputFormat::WebP, e))?;
    Ok(buffer)
}

#[cfg(feature = "avif")]
fn encode_avif(image: &RasterImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    image::codecs::avif::AvifEncoder::new_with_speed_quality(
        &mut buffer,
        AVIF_SPEED,
        quality.percent(),
    )
    .write_image(
        image.pixels(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )
    .map_err(|e| encode_error(OutputFormat::Avif, e))?;
    Ok(buffer)
}

#[cfg(not(feature = "avif"))]
fn encode_avif(_image: &RasterImage, _quality: Quality) -> Result<Vec<u8>, BackendError> {
    Err(BackendError::UnsupportedFormat(OutputFormat::Avif))
}

/// Reduce RGB channels to a palette sized by `quality`. Alpha is left alone.
///
/// Levels grow quadratically with quality, so high settings stay close to
/// the source while low ones collapse colours aggressively.
fn quantize_rgb(pixels: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let levels = quantization_levels(quality);
    let step = 255.0 / (levels as f32 - 1.0);
    for px in pixels.chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            let bucket = (f32::from(*c) / step).round();
            *c = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn quantization_levels(quality: u8) -> u16 {
    let q = f32::from(quality.clamp(1, 100)) / 100.0;
    (2.0 + q * q * 254.0).round().clamp(2.0, 256.0) as u16
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<ImageInfo, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format();
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, BackendError> {
        image::load_from_memory(bytes)
            .map(RasterImage::from_dynamic)
            .map_err(|e| BackendError::Decode(format!("Failed to decode image: {}", e)))
    }

    fn encode(
        &self,
        image: &RasterImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        if !self.supports(format) {
            return Err(BackendError::UnsupportedFormat(format));
        }
        if image.is_empty() {
            return Err(BackendError::EncodeFailed(format!(
                "cannot encode a {}x{} image",
                image.width(),
                image.height()
            )));
        }
        match format {
            OutputFormat::Jpeg => encode_jpeg(image, quality),
            OutputFormat::Png => encode_png(image),
            OutputFormat::WebP => encode_webp(image, quality),
            OutputFormat::Avif => encode_avif(image, quality),
        }
    }

    fn supports(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}
