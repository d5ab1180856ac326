//! Optimizer configuration module.
//!
//! Handles loading, validating, and merging `quantum-optimizer.toml` files.
//! Configuration is layered: stock defaults are overridden by the user's
//! config file, which is in turn overridden by command-line flags.
//!
//! ```text
//! stock defaults  →  quantum-optimizer.toml  →  CLI flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "jpeg"          # jpeg | png | webp | avif
//! also = []                # alternate formats, e.g. ["png", "webp"]
//! quality = 80             # 1-100
//! # width = 1920           # omit to keep the source size
//! # height = 1080
//! keep_aspect = true
//!
//! [adjustments]
//! brightness = 100         # percent, 100 = unchanged
//! contrast = 100
//! saturation = 100
//! blur = 0                 # preview only
//!
//! [transform]
//! rotation = 0             # 0, 90, 180, 270 (clockwise)
//! flip_horizontal = false
//! flip_vertical = false
//!
//! [watermark]
//! enabled = false
//! text = ""
//! opacity = 50             # percent
//! position = "bottom-right"
//!
//! [target_size]
//! enabled = false
//! value = 500
//! unit = "kb"              # bytes | kb | mb
//!
//! [search]
//! max_attempts = 10
//! min_quality = 10         # percent
//!
//! [processing]
//! max_processes = 4        # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [output]
//! format = "webp"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    Anchor, FilterSettings, OptimizeRequest, OutputFormat, Quality, SearchLimits, SizeUnit,
    TargetSize, TransformState, WatermarkSpec,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "quantum-optimizer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Optimizer configuration loaded from `quantum-optimizer.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Output format, size and quality.
    pub output: OutputConfig,
    /// Color adjustments.
    pub adjustments: AdjustmentsConfig,
    /// Rotation and flips.
    pub transform: TransformConfig,
    pub watermark: WatermarkConfig,
    pub target_size: TargetSizeConfig,
    /// Bounds for the target-size search.
    pub search: SearchConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl OptimizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.width == Some(0) || self.output.height == Some(0) {
            return Err(ConfigError::Validation(
                "output.width and output.height must be positive".into(),
            ));
        }
        if self.transform.rotation % 90 != 0 {
            return Err(ConfigError::Validation(
                "transform.rotation must be a multiple of 90".into(),
            ));
        }
        if self.watermark.opacity > 100 {
            return Err(ConfigError::Validation(
                "watermark.opacity must be 0-100".into(),
            ));
        }
        if !(self.target_size.value.is_finite() && self.target_size.value > 0.0) {
            return Err(ConfigError::Validation(
                "target_size.value must be greater than 0".into(),
            ));
        }
        if self.search.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "search.max_attempts must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.search.min_quality) {
            return Err(ConfigError::Validation(
                "search.min_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// The pipeline request these settings describe.
    pub fn to_request(&self) -> OptimizeRequest {
        let transform = TransformState::from_degrees(self.transform.rotation)
            .unwrap_or_default()
            .with_flips(
                self.transform.flip_horizontal,
                self.transform.flip_vertical,
            );
        OptimizeRequest {
            width: self.output.width,
            height: self.output.height,
            keep_aspect: self.output.keep_aspect,
            quality: Quality::from_percent(self.output.quality),
            format: self.output.format,
            alternates: self.output.also.clone(),
            transform,
            filters: FilterSettings {
                brightness: self.adjustments.brightness,
                contrast: self.adjustments.contrast,
                saturation: self.adjustments.saturation,
                blur: self.adjustments.blur,
            },
            watermark: self.watermark.enabled.then(|| {
                WatermarkSpec::new(
                    self.watermark.text.clone(),
                    self.watermark.opacity,
                    self.watermark.position,
                )
            }),
            target_size: self
                .target_size
                .enabled
                .then(|| TargetSize::new(self.target_size.value, self.target_size.unit)),
            limits: SearchLimits::new(
                self.search.max_attempts,
                Quality::from_percent(self.search.min_quality),
            ),
        }
    }
}

/// Output format, dimensions and quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Primary output format.
    pub format: OutputFormat,
    /// Alternate formats produced alongside the primary file.
    pub also: Vec<OutputFormat>,
    /// Encoding quality (1 = worst, 100 = best). Ignored by PNG.
    pub quality: u32,
    /// Output width in pixels. When absent, the source width is kept or
    /// derived from `height`.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Preserve the source aspect ratio when resizing.
    pub keep_aspect: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            also: Vec::new(),
            quality: 80,
            width: None,
            height: None,
            keep_aspect: true,
        }
    }
}

/// Color adjustments in percent; 100 leaves the image unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjustmentsConfig {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Blur radius in pixels. Applied to previews only, never to output files.
    pub blur: f32,
}

impl Default for AdjustmentsConfig {
    fn default() -> Self {
        let filters = FilterSettings::default();
        Self {
            brightness: filters.brightness,
            contrast: filters.contrast,
            saturation: filters.saturation,
            blur: filters.blur,
        }
    }
}

/// Rotation and flips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// Clockwise rotation in degrees; a multiple of 90.
    pub rotation: u32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

/// Text watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub enabled: bool,
    pub text: String,
    /// Opacity in percent (0-100).
    pub opacity: u32,
    pub position: Anchor,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            opacity: 50,
            position: Anchor::BottomRight,
        }
    }
}

/// Target output size. When enabled, quality is searched downward from
/// `output.quality` until the file fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSizeConfig {
    pub enabled: bool,
    pub value: f64,
    pub unit: SizeUnit,
}

impl Default for TargetSizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            value: 500.0,
            unit: SizeUnit::Kb,
        }
    }
}

/// Bounds for the target-size search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Maximum number of encode attempts.
    pub max_attempts: u32,
    /// Lowest quality (percent) the search may reach.
    pub min_quality: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let limits = SearchLimits::default();
        Self {
            max_attempts: limits.max_attempts,
            min_quality: limits.min_quality.percent() as u32,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Command-line values that override the config file.
///
/// Every `None` (or `false` for switches) leaves the config value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<OutputFormat>,
    pub also: Option<Vec<OutputFormat>>,
    pub quality: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub no_keep_aspect: bool,
    pub rotation: Option<u32>,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub blur: Option<f32>,
    /// Setting a text also enables the watermark.
    pub watermark: Option<String>,
    pub watermark_opacity: Option<u32>,
    pub watermark_position: Option<Anchor>,
    /// Setting a target also enables target-size mode.
    pub target_size: Option<TargetSize>,
    pub max_processes: Option<usize>,
}

impl Overrides {
    /// Express the overrides as a sparse TOML table for [`merge_toml`].
    pub fn to_toml(&self) -> Result<toml::Value, ConfigError> {
        let mut root = toml::Table::new();
        let mut set = |section: &str, key: &str, value: toml::Value| {
            let table = root
                .entry(section)
                .or_insert(toml::Value::Table(toml::Table::new()));
            if let toml::Value::Table(table) = table {
                table.insert(key.to_string(), value);
            }
        };

        if let Some(format) = self.format {
            set("output", "format", toml::Value::try_from(format)?);
        }
        if let Some(also) = &self.also {
            set("output", "also", toml::Value::try_from(also)?);
        }
        if let Some(quality) = self.quality {
            set("output", "quality", toml::Value::Integer(quality.into()));
        }
        if let Some(width) = self.width {
            set("output", "width", toml::Value::Integer(width.into()));
        }
        if let Some(height) = self.height {
            set("output", "height", toml::Value::Integer(height.into()));
        }
        if self.no_keep_aspect {
            set("output", "keep_aspect", toml::Value::Boolean(false));
        }
        if let Some(rotation) = self.rotation {
            set("transform", "rotation", toml::Value::Integer(rotation.into()));
        }
        if self.flip_horizontal {
            set("transform", "flip_horizontal", toml::Value::Boolean(true));
        }
        if self.flip_vertical {
            set("transform", "flip_vertical", toml::Value::Boolean(true));
        }
        for (key, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("blur", self.blur),
        ] {
            if let Some(v) = value {
                set("adjustments", key, toml::Value::Float(v.into()));
            }
        }
        if let Some(text) = &self.watermark {
            set("watermark", "enabled", toml::Value::Boolean(true));
            set("watermark", "text", toml::Value::String(text.clone()));
        }
        if let Some(opacity) = self.watermark_opacity {
            set("watermark", "opacity", toml::Value::Integer(opacity.into()));
        }
        if let Some(position) = self.watermark_position {
            set("watermark", "position", toml::Value::try_from(position)?);
        }
        if let Some(target) = self.target_size {
            set("target_size", "enabled", toml::Value::Boolean(true));
            set("target_size", "value", toml::Value::Float(target.value));
            set("target_size", "unit", toml::Value::try_from(target.unit)?);
        }
        if let Some(n) = self.max_processes {
            set(
                "processing",
                "max_processes",
                toml::Value::Integer(n.try_into().unwrap_or(i64::MAX)),
            );
        }
        Ok(toml::Value::Table(root))
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(OptimizerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays in order onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<OptimizerConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: OptimizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `quantum-optimizer.toml` from the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<OptimizerConfig, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILE_NAME))?;
    resolve_config(stock_defaults_value()?, overlay)
}

/// Load an explicitly named config file; unlike [`load_config`] the file
/// must exist.
pub fn load_config_file(path: &Path) -> Result<OptimizerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value()?, Some(overlay))
}

/// Resolve the config the CLI runs with.
///
/// Layers, lowest first: stock defaults, then the config file, then the
/// command-line overrides. An explicit `config_path` must exist; without
/// one, `quantum-optimizer.toml` in `dir` is used when present.
pub fn load_layered(
    dir: &Path,
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<OptimizerConfig, ConfigError> {
    let file = match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => load_raw_config(&dir.join(CONFIG_FILE_NAME))?,
    };
    let layers = file.into_iter().chain(Some(overrides.to_toml()?));
    resolve_config(stock_defaults_value()?, layers)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quantum Optimizer Configuration
# ===============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./quantum-optimizer.toml, or from the path given
# with --config. Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Primary output format: "jpeg", "png", "webp" or "avif".
format = "jpeg"

# Alternate formats written next to the primary file, e.g. ["png", "webp"].
# Each is encoded once at its own default quality. Formats this build
# cannot produce are skipped with a warning.
also = []

# Encoding quality (1 = worst, 100 = best). PNG ignores it.
quality = 80

# Output size in pixels. Omit both to keep the source size. With
# keep_aspect, setting one derives the other and setting both fits the
# image inside the box.
# width = 1920
# height = 1080
keep_aspect = true

# ---------------------------------------------------------------------------
# Adjustments (percent, 100 = unchanged)
# ---------------------------------------------------------------------------
[adjustments]
brightness = 100
contrast = 100
saturation = 100

# Blur radius in pixels. Shown in previews only; never written to files.
blur = 0

# ---------------------------------------------------------------------------
# Transform
# ---------------------------------------------------------------------------
[transform]
# Clockwise rotation in degrees: 0, 90, 180 or 270.
rotation = 0
flip_horizontal = false
flip_vertical = false

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
enabled = false
text = ""

# Opacity in percent (0-100).
opacity = 50

# "top-left", "top-right", "bottom-left", "bottom-right" or "center".
position = "bottom-right"

# ---------------------------------------------------------------------------
# Target size
# ---------------------------------------------------------------------------
[target_size]
# When enabled, quality is lowered from output.quality until the file fits.
enabled = false
value = 500

# "bytes", "kb" or "mb" (1 kb = 1024 bytes).
unit = "kb"

# ---------------------------------------------------------------------------
# Target-size search
# ---------------------------------------------------------------------------
[search]
# Maximum number of encode attempts per file.
max_attempts = 10

# Lowest quality (percent) the search may reach.
min_quality = 10

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(toml_str: &str) -> Result<OptimizerConfig, toml::de::Error> {
        toml::from_str(toml_str)
    }

    #[test]
    fn default_config_output_settings() {
        let config = OptimizerConfig::default();
        assert_eq!(config.output.format, OutputFormat::Jpeg);
        assert_eq!(config.output.quality, 80);
        assert!(config.output.keep_aspect);
        assert!(config.output.also.is_empty());
    }

    #[test]
    fn default_config_search_settings() {
        let config = OptimizerConfig::default();
        assert_eq!(config.search.max_attempts, 10);
        assert_eq!(config.search.min_quality, 10);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse(
            r#"
[output]
format = "webp"
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, OutputFormat::WebP);
        // Other values come from defaults
        assert_eq!(config.output.quality, 80);
        assert_eq!(config.adjustments.brightness, 100.0);
    }

    #[test]
    fn parse_integer_adjustments() {
        let config = parse(
            r#"
[adjustments]
brightness = 120
contrast = 90.5
"#,
        )
        .unwrap();
        assert_eq!(config.adjustments.brightness, 120.0);
        assert_eq!(config.adjustments.contrast, 90.5);
    }

    #[test]
    fn parse_format_aliases_and_lists() {
        let config = parse(
            r#"
[output]
format = "jpg"
also = ["png", "avif"]
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, OutputFormat::Jpeg);
        assert_eq!(config.output.also, vec![OutputFormat::Png, OutputFormat::Avif]);
    }

    #[test]
    fn parse_watermark_position() {
        let config = parse(
            r#"
[watermark]
enabled = true
text = "© me"
position = "top-left"
"#,
        )
        .unwrap();
        assert_eq!(config.watermark.position, Anchor::TopLeft);
    }

    // =========================================================================
    // to_request tests
    // =========================================================================

    #[test]
    fn default_config_maps_to_default_request() {
        assert_eq!(
            OptimizerConfig::default().to_request(),
            OptimizeRequest::default()
        );
    }

    #[test]
    fn to_request_maps_every_section() {
        let config = parse(
            r#"
[output]
format = "png"
also = ["webp"]
quality = 60
width = 800
keep_aspect = false

[adjustments]
saturation = 0
blur = 2

[transform]
rotation = 270
flip_vertical = true

[watermark]
enabled = true
text = "draft"
opacity = 30
position = "center"

[target_size]
enabled = true
value = 1.5
unit = "mb"

[search]
max_attempts = 4
min_quality = 20
"#,
        )
        .unwrap();
        let request = config.to_request();

        assert_eq!(request.format, OutputFormat::Png);
        assert_eq!(request.alternates, vec![OutputFormat::WebP]);
        assert_eq!(request.quality, Quality::from_percent(60));
        assert_eq!((request.width, request.height), (Some(800), None));
        assert!(!request.keep_aspect);
        assert_eq!(request.filters.saturation, 0.0);
        assert_eq!(request.filters.blur, 2.0);
        assert_eq!(request.transform.degrees(), 270);
        assert!(request.transform.flip_vertical);
        assert!(!request.transform.flip_horizontal);
        assert_eq!(
            request.watermark,
            Some(WatermarkSpec::new("draft", 30, Anchor::Center))
        );
        assert_eq!(request.target_size.unwrap().bytes(), 1_572_864);
        assert_eq!(request.limits.max_attempts, 4);
        assert_eq!(request.limits.min_quality, Quality::from_percent(20));
    }

    #[test]
    fn disabled_sections_map_to_none() {
        let config = parse(
            r#"
[watermark]
text = "ignored"

[target_size]
value = 10
"#,
        )
        .unwrap();
        let request = config.to_request();
        assert!(request.watermark.is_none());
        assert!(request.target_size.is_none());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, OptimizerConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[output]
quality = 55

[processing]
max_processes = 2
"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.output.quality, 55);
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.output.format, OutputFormat::Jpeg);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not [valid toml").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_file_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_file_reads_named_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[transform]\nrotation = 180\n").unwrap();
        assert_eq!(load_config_file(&path).unwrap().transform.rotation, 180);
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn default_processing_config() {
        let config = ProcessingConfig::default();
        assert_eq!(config.max_processes, None);
    }

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[output]
format = "jpeg"
quality = 90
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
quality = 70
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("quality").unwrap().as_integer(), Some(70));
        // format preserved from base
        assert_eq!(output.get("format").unwrap().as_str(), Some("jpeg"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"also = ["png", "webp"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"also = ["avif"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("also").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn merge_toml_three_layers() {
        let stock: toml::Value = toml::from_str(
            r#"
[output]
quality = 80
format = "jpeg"
"#,
        )
        .unwrap();
        let file: toml::Value = toml::from_str(
            r#"
[output]
quality = 85
"#,
        )
        .unwrap();
        let cli: toml::Value = toml::from_str(
            r#"
[output]
quality = 70
"#,
        )
        .unwrap();

        let merged = merge_toml(merge_toml(stock, file), cli);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("quality").unwrap().as_integer(), Some(70));
        assert_eq!(output.get("format").unwrap().as_str(), Some("jpeg"));
    }

    // =========================================================================
    // Overrides tests
    // =========================================================================

    #[test]
    fn empty_overrides_are_empty_table() {
        let value = Overrides::default().to_toml().unwrap();
        assert!(value.as_table().unwrap().is_empty());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file: toml::Value = toml::from_str(
            r#"
[output]
quality = 90
format = "png"
"#,
        )
        .unwrap();
        let overrides = Overrides {
            quality: Some(40),
            rotation: Some(90),
            brightness: Some(120.0),
            ..Overrides::default()
        };
        let config = resolve_config(
            stock_defaults_value().unwrap(),
            [file, overrides.to_toml().unwrap()],
        )
        .unwrap();
        assert_eq!(config.output.quality, 40);
        assert_eq!(config.output.format, OutputFormat::Png);
        assert_eq!(config.transform.rotation, 90);
        assert_eq!(config.adjustments.brightness, 120.0);
    }

    #[test]
    fn watermark_text_override_enables_watermark() {
        let overrides = Overrides {
            watermark: Some("© studio".to_string()),
            watermark_position: Some(Anchor::TopRight),
            ..Overrides::default()
        };
        let config =
            resolve_config(stock_defaults_value().unwrap(), Some(overrides.to_toml().unwrap()))
                .unwrap();
        assert!(config.watermark.enabled);
        assert_eq!(config.watermark.text, "© studio");
        assert_eq!(config.watermark.position, Anchor::TopRight);
    }

    #[test]
    fn target_size_override_enables_search() {
        let overrides = Overrides {
            target_size: Some("200KB".parse().unwrap()),
            format: Some(OutputFormat::WebP),
            also: Some(vec![OutputFormat::Png]),
            ..Overrides::default()
        };
        let config =
            resolve_config(stock_defaults_value().unwrap(), Some(overrides.to_toml().unwrap()))
                .unwrap();
        assert!(config.target_size.enabled);
        assert_eq!(config.target_size.unit, SizeUnit::Kb);
        assert_eq!(config.to_request().target_size.unwrap().bytes(), 204_800);
        assert_eq!(config.output.also, vec![OutputFormat::Png]);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let overrides = Overrides {
            rotation: Some(45),
            ..Overrides::default()
        };
        let result =
            resolve_config(stock_defaults_value().unwrap(), Some(overrides.to_toml().unwrap()));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn layered_uses_directory_file_then_overrides() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[output]\nquality = 60\nformat = \"webp\"\n",
        )
        .unwrap();
        let overrides = Overrides {
            quality: Some(30),
            ..Overrides::default()
        };
        let config = load_layered(tmp.path(), None, &overrides).unwrap();
        assert_eq!(config.output.quality, 30);
        assert_eq!(config.output.format, OutputFormat::WebP);
    }

    #[test]
    fn layered_explicit_file_replaces_directory_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[output]\nquality = 60\n").unwrap();
        let explicit = tmp.path().join("other.toml");
        fs::write(&explicit, "[search]\nmax_attempts = 3\n").unwrap();

        let config = load_layered(tmp.path(), Some(&explicit), &Overrides::default()).unwrap();
        assert_eq!(config.output.quality, 80);
        assert_eq!(config.search.max_attempts, 3);
    }

    #[test]
    fn layered_missing_explicit_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_layered(
            tmp.path(),
            Some(&tmp.path().join("missing.toml")),
            &Overrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result = parse(
            r#"
[output]
qualty = 90
"#,
        );
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result = parse(
            r#"
[outptu]
quality = 90
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let result = parse(
            r#"
[output]
format = "gif"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[watermark]
colour = "red"
"#,
        )
        .unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    fn validation_error(toml_str: &str) -> bool {
        let config = parse(toml_str).unwrap();
        matches!(config.validate(), Err(ConfigError::Validation(_)))
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_boundaries() {
        assert!(!validation_error("[output]\nquality = 1"));
        assert!(!validation_error("[output]\nquality = 100"));
        assert!(validation_error("[output]\nquality = 0"));
        assert!(validation_error("[output]\nquality = 101"));
    }

    #[test]
    fn validate_zero_width() {
        assert!(validation_error("[output]\nwidth = 0"));
    }

    #[test]
    fn validate_rotation_multiple_of_90() {
        assert!(!validation_error("[transform]\nrotation = 450"));
        assert!(validation_error("[transform]\nrotation = 100"));
    }

    #[test]
    fn validate_opacity_range() {
        assert!(validation_error("[watermark]\nopacity = 101"));
    }

    #[test]
    fn validate_target_value_positive() {
        assert!(validation_error("[target_size]\nvalue = 0"));
        assert!(validation_error("[target_size]\nvalue = -5"));
    }

    #[test]
    fn validate_search_bounds() {
        assert!(validation_error("[search]\nmax_attempts = 0"));
        assert!(validation_error("[search]\nmin_quality = 0"));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[output]\nquality = 150\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // load_raw_config / resolve_config tests
    // =========================================================================

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_raw_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value().unwrap(), None::<toml::Value>).unwrap();
        assert_eq!(config, OptimizerConfig::default());
    }

    // =========================================================================
    // Stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let value: Result<toml::Value, _> = toml::from_str(stock_config_toml());
        assert!(value.is_ok(), "stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: OptimizerConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, OptimizerConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value().unwrap();
        let table = value.as_table().unwrap();
        for section in [
            "output",
            "adjustments",
            "transform",
            "watermark",
            "target_size",
            "search",
            "processing",
        ] {
            assert!(table.contains_key(section), "missing section {section}");
        }
    }
}
