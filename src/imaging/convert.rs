//! Format conversion stage: companion encodes of the final raster.
//!
//! Each alternate format is encoded once at its fixed default quality
//! ([`OutputFormat::default_quality`]); there is no target-size search here.
//! Formats the backend cannot produce are skipped with a warning and do not
//! stop their siblings. Any other encoder error fails the whole call.

use super::backend::{BackendError, ImageBackend};
use super::encode::{EncodedImage, encode_image};
use super::params::OutputFormat;
use super::raster::RasterImage;
use log::warn;
use rayon::prelude::*;

/// A format that was requested but not produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFormat {
    pub format: OutputFormat,
    pub reason: String,
}

/// Results of one conversion call, in request order.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub outputs: Vec<EncodedImage>,
    pub skipped: Vec<SkippedFormat>,
}

/// Encode `image` into each of `formats`.
///
/// Duplicates are dropped (first occurrence wins) and so is `primary`, which
/// the caller has already encoded. Encodes run in parallel on the rayon pool.
pub fn convert_formats(
    backend: &impl ImageBackend,
    image: &RasterImage,
    primary: OutputFormat,
    formats: &[OutputFormat],
) -> Result<ConversionReport, BackendError> {
    let mut wanted: Vec<OutputFormat> = Vec::with_capacity(formats.len());
    for &format in formats {
        if format != primary && !wanted.contains(&format) {
            wanted.push(format);
        }
    }

    let results: Vec<(OutputFormat, Result<EncodedImage, BackendError>)> = wanted
        .par_iter()
        .map(|&format| {
            (
                format,
                encode_image(backend, image, format, format.default_quality()),
            )
        })
        .collect();

    let mut report = ConversionReport::default();
    for (format, result) in results {
        match result {
            Ok(encoded) => report.outputs.push(encoded),
            Err(BackendError::UnsupportedFormat(_)) => {
                warn!("Skipping {}: not supported by this backend", format.label());
                report.skipped.push(SkippedFormat {
                    format,
                    reason: "format not supported by this build".to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}
