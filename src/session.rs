//! Interactive optimize session.
//!
//! A [`Session`] holds one loaded image plus the settings a user builds up
//! by rotating, flipping, and adjusting sliders. Nothing is rendered as a
//! side effect of a setting change: [`Session::preview`],
//! [`Session::optimize`] and [`Session::downloads`] each take a snapshot of
//! the settings ([`Session::request`]) and run the pipeline on demand.
//!
//! ```text
//! load ─→ rotate / flip / set_* ─→ preview ─→ optimize ─→ downloads
//!              ↑                      │
//!              └──────── reset ───────┘
//! ```

use crate::imaging::{
    EncodedImage, FilterSettings, ImageBackend, OptimizeError, OptimizeOutcome, OptimizeRequest,
    OutputFormat, Probe, Quality, RasterImage, SearchLimits, SkippedFormat, TargetSize,
    WatermarkSpec, alternates, load_image, optimize, render_preview,
};
use crate::naming::optimized_file_name;
use log::info;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, OptimizeError>;

#[derive(Debug, Clone)]
struct LoadedImage {
    name: String,
    image: RasterImage,
    original_size: u64,
}

/// One loaded image and the settings that will be applied to it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    loaded: Option<LoadedImage>,
    settings: OptimizeRequest,
    defaults: OptimizeRequest,
}

/// A named file ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub encoded: EncodedImage,
}

impl Download {
    pub fn mime(&self) -> &'static str {
        self.encoded.format.mime()
    }

    pub fn len(&self) -> u64 {
        self.encoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    /// Write the bytes into `dir` under [`Self::file_name`].
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.encoded.bytes)?;
        Ok(path)
    }
}

/// Everything one optimize produces for saving.
#[derive(Debug, Clone)]
pub struct DownloadBundle {
    pub primary: Download,
    pub alternates: Vec<Download>,
    pub skipped: Vec<SkippedFormat>,
    /// False when a target size was requested and not met.
    pub achieved: bool,
    pub probes: Vec<Probe>,
    pub original_size: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose settings (and reset target) start from `defaults`.
    pub fn with_defaults(defaults: OptimizeRequest) -> Self {
        Self {
            loaded: None,
            settings: defaults.clone(),
            defaults,
        }
    }

    /// Decode `bytes` and make it the current image.
    ///
    /// Replaces any previous image and keeps the settings. On failure the
    /// session is left as it was.
    pub fn load(&mut self, backend: &impl ImageBackend, name: &str, bytes: &[u8]) -> Result<()> {
        let image = load_image(backend, bytes)?;
        info!(
            "Loaded {} ({}x{}, {} bytes)",
            name,
            image.width(),
            image.height(),
            bytes.len()
        );
        self.loaded = Some(LoadedImage {
            name: name.to_string(),
            image,
            original_size: bytes.len() as u64,
        });
        Ok(())
    }

    pub fn has_image(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.name.as_str())
    }

    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.loaded.as_ref().map(|l| l.image.dimensions())
    }

    pub fn original_size(&self) -> Option<u64> {
        self.loaded.as_ref().map(|l| l.original_size)
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    pub fn rotate_clockwise(&mut self) {
        self.settings.transform.rotate_clockwise();
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.settings.transform.rotate_counter_clockwise();
    }

    pub fn flip_horizontal(&mut self) {
        self.settings.transform.toggle_flip_horizontal();
    }

    pub fn flip_vertical(&mut self) {
        self.settings.transform.toggle_flip_vertical();
    }

    pub fn set_dimensions(&mut self, width: Option<u32>, height: Option<u32>) {
        self.settings.width = width;
        self.settings.height = height;
    }

    pub fn set_keep_aspect(&mut self, keep_aspect: bool) {
        self.settings.keep_aspect = keep_aspect;
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.settings.quality = quality;
    }

    pub fn set_filters(&mut self, filters: FilterSettings) {
        self.settings.filters = filters;
    }

    pub fn set_watermark(&mut self, watermark: Option<WatermarkSpec>) {
        self.settings.watermark = watermark;
    }

    pub fn set_target_size(&mut self, target: Option<TargetSize>) {
        self.settings.target_size = target;
    }

    pub fn set_search_limits(&mut self, limits: SearchLimits) {
        self.settings.limits = limits;
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.settings.format = format;
    }

    pub fn set_alternate_formats(&mut self, formats: Vec<OutputFormat>) {
        self.settings.alternates = formats;
    }

    /// Restore the default settings. The loaded image stays.
    pub fn reset(&mut self) {
        self.settings = self.defaults.clone();
    }

    /// Snapshot of the current settings.
    pub fn request(&self) -> OptimizeRequest {
        self.settings.clone()
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    fn loaded(&self) -> Result<&LoadedImage> {
        self.loaded.as_ref().ok_or(OptimizeError::NoImage)
    }

    /// Render the current settings for display, blur included.
    pub fn preview(&self) -> Result<RasterImage> {
        let loaded = self.loaded()?;
        Ok(render_preview(&loaded.image, &self.settings))
    }

    /// Render and encode with the current settings.
    pub fn optimize(&self, backend: &impl ImageBackend) -> Result<OptimizeOutcome> {
        let loaded = self.loaded()?;
        let mut outcome = optimize(backend, &loaded.image, &self.settings)?;
        outcome.original_size = Some(loaded.original_size);
        Ok(outcome)
    }

    /// Optimize, then produce the alternate formats, all named for saving.
    pub fn downloads(&self, backend: &impl ImageBackend) -> Result<DownloadBundle> {
        let loaded = self.loaded()?;
        let request = self.request();
        let outcome = self.optimize(backend)?;
        let report = alternates(backend, &outcome, &request)?;

        let named = |encoded: EncodedImage| Download {
            file_name: optimized_file_name(&loaded.name, encoded.format),
            encoded,
        };
        Ok(DownloadBundle {
            primary: named(outcome.encoded),
            alternates: report.outputs.into_iter().map(named).collect(),
            skipped: report.skipped,
            achieved: outcome.achieved,
            probes: outcome.probes,
            original_size: loaded.original_size,
        })
    }
}
