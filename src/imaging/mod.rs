//! Image re-encoding pipeline: pure Rust, statically linked codecs.
//!
//! | Stage | Crate / function |
//! |---|---|
//! | **Identify / decode** | `image::ImageReader`, `image::load_from_memory` |
//! | **Resize** | `image::imageops::resize` (Lanczos3) |
//! | **Pixel transform** | `imageops::rotate*` / `flip_*`, rayon per-row filters |
//! | **Overlay** | `font8x8` bitmap glyphs, "over" blending |
//! | **Encode** | JPEG, PNG, WebP, AVIF (feature `avif`) encoders from `image` |
//! | **Target-size search** | damped quality step over repeated encodes |
//! | **Format conversion** | independent encodes on the rayon pool |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension, layout and quality math
//! - **Parameters**: Data structures describing what to do
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Stages**: transform, overlay, encode, search, convert
//! - **Operations**: High-level functions chaining the stages

pub mod backend;
mod calculations;
pub mod convert;
pub mod encode;
pub mod operations;
mod overlay;
mod params;
mod raster;
pub mod rust_backend;
pub mod search;
mod transform;

pub use backend::{BackendError, ImageBackend, ImageInfo};
pub use calculations::{calculate_output_dimensions, savings_percent};
pub use convert::{ConversionReport, SkippedFormat, convert_formats};
pub use encode::{EncodedImage, encode_image};
pub use operations::{
    OptimizeError, OptimizeOutcome, alternates, get_dimensions, load_image, optimize, render,
    render_preview,
};
pub use overlay::apply_watermark;
pub use params::{
    Anchor, FilterSettings, OptimizeRequest, OutputFormat, ParseFormatError,
    ParseTargetSizeError, Quality, SearchLimits, SizeUnit, TargetSize, TransformState,
    WatermarkSpec,
};
pub use raster::RasterImage;
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use search::{Probe, SearchOutcome, TargetSizeSearchState, search_target_size};
pub use transform::{apply_blur, apply_filters, apply_transform};
