//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the caller (a [`Session`](crate::session::Session) or the
//! CLI) and the pipeline stages in [`operations`](super::operations), which do
//! the actual pixel work through a [`backend`](super::backend).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality factor in (0, 1]. Clamped on construction.
//! - [`OutputFormat`]: The fixed set of containers the encoder can produce.
//! - [`TargetSize`]: A requested output size such as `500 KB`.
//! - [`SearchLimits`]: Attempt cap and quality floor for the target-size search.
//! - [`TransformState`]: Quarter-turn rotation plus horizontal/vertical flips.
//! - [`FilterSettings`]: Brightness, contrast, saturation (and preview-only blur).
//! - [`WatermarkSpec`]: Overlay text, opacity and [`Anchor`].
//! - [`OptimizeRequest`]: Immutable snapshot of all of the above for one run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality factor for lossy image encoding, in (0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quality(f32);

impl Quality {
    /// Smallest factor a quality can hold; keeps the value strictly positive.
    pub const MIN: f32 = 0.01;

    pub fn new(factor: f32) -> Self {
        if factor.is_nan() {
            return Self::default();
        }
        Self(factor.clamp(Self::MIN, 1.0))
    }

    /// Build from a 0–100 slider value.
    pub fn from_percent(percent: u32) -> Self {
        Self::new(percent as f32 / 100.0)
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    /// Integer quality for encoders that take 1–100.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.8)
    }
}

/// Output container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::WebP,
        OutputFormat::Avif,
    ];

    /// Lossless formats ignore the quality factor entirely.
    pub fn is_lossless(self) -> bool {
        matches!(self, OutputFormat::Png)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Avif => "AVIF",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// Quality used when this format is produced as an alternate download.
    ///
    /// Mirrors what a browser canvas picks when no quality is passed:
    /// 0.92 for JPEG, 0.8 for WebP. PNG ignores it.
    pub fn default_quality(self) -> Quality {
        match self {
            OutputFormat::Jpeg => Quality::new(0.92),
            OutputFormat::Png => Quality::new(1.0),
            OutputFormat::WebP | OutputFormat::Avif => Quality::new(0.8),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported output format: {0}")]
pub struct ParseFormatError(String);

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// Unit attached to a [`TargetSize`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    #[serde(alias = "b", alias = "B")]
    Bytes,
    #[serde(alias = "KB")]
    Kb,
    #[serde(alias = "MB")]
    Mb,
}

impl SizeUnit {
    pub fn multiplier(self) -> f64 {
        match self {
            SizeUnit::Bytes => 1.0,
            SizeUnit::Kb => 1024.0,
            SizeUnit::Mb => 1024.0 * 1024.0,
        }
    }
}

/// A requested output size, e.g. `1.5 MB`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSize {
    pub value: f64,
    pub unit: SizeUnit,
}

impl TargetSize {
    pub fn new(value: f64, unit: SizeUnit) -> Self {
        Self { value, unit }
    }

    /// Resolved byte budget. Never below one byte.
    pub fn bytes(self) -> u64 {
        let raw = (self.value * self.unit.multiplier()).round();
        if raw.is_finite() && raw >= 1.0 {
            raw as u64
        } else {
            1
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseTargetSizeError {
    #[error("target size is empty")]
    Empty,
    #[error("invalid target size number: {0}")]
    Number(String),
    #[error("unknown size unit: {0} (expected bytes, KB or MB)")]
    Unit(String),
    #[error("target size must be greater than zero")]
    NotPositive,
}

impl FromStr for TargetSize {
    type Err = ParseTargetSizeError;

    /// Parses `"2048"`, `"500KB"`, `"1.5 mb"`, `"300 bytes"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseTargetSizeError::Empty);
        }
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value: f64 = number
            .parse()
            .map_err(|_| ParseTargetSizeError::Number(number.to_string()))?;
        if value <= 0.0 {
            return Err(ParseTargetSizeError::NotPositive);
        }
        let unit = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "b" | "byte" | "bytes" => SizeUnit::Bytes,
            "k" | "kb" | "kib" => SizeUnit::Kb,
            "m" | "mb" | "mib" => SizeUnit::Mb,
            other => return Err(ParseTargetSizeError::Unit(other.to_string())),
        };
        Ok(TargetSize::new(value, unit))
    }
}

/// Bounds for the target-size search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    /// Maximum number of encode probes.
    pub max_attempts: u32,
    /// Quality floor; the search never probes below it.
    pub min_quality: Quality,
}

impl SearchLimits {
    pub fn new(max_attempts: u32, min_quality: Quality) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_quality,
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::new(10, Quality::new(0.1))
    }
}

/// Rotation and flips applied to the raster.
///
/// Rotation is stored as clockwise quarter turns (0–3). Flips apply after
/// rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformState {
    quarter_turns: u8,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl TransformState {
    /// Build from degrees; only multiples of 90 are accepted.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        (degrees % 90 == 0).then(|| Self {
            quarter_turns: ((degrees / 90) % 4) as u8,
            ..Self::default()
        })
    }

    pub fn quarter_turns(self) -> u8 {
        self.quarter_turns
    }

    pub fn degrees(self) -> u32 {
        self.quarter_turns as u32 * 90
    }

    pub fn rotate_clockwise(&mut self) {
        self.quarter_turns = (self.quarter_turns + 1) % 4;
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.quarter_turns = (self.quarter_turns + 3) % 4;
    }

    pub fn toggle_flip_horizontal(&mut self) {
        self.flip_horizontal = !self.flip_horizontal;
    }

    pub fn toggle_flip_vertical(&mut self) {
        self.flip_vertical = !self.flip_vertical;
    }

    pub fn is_identity(self) -> bool {
        self.quarter_turns == 0 && !self.flip_horizontal && !self.flip_vertical
    }

    /// Same rotation with the given flips.
    pub fn with_flips(self, horizontal: bool, vertical: bool) -> Self {
        Self {
            flip_horizontal: horizontal,
            flip_vertical: vertical,
            ..self
        }
    }
}

/// Per-pixel color adjustments, in percent (100 = identity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Blur radius in pixels. Applied to previews only, never to encoded output.
    pub blur: f32,
}

impl FilterSettings {
    /// True when brightness, contrast and saturation leave pixels untouched.
    ///
    /// Blur is not considered: it never reaches the encoded output.
    pub fn is_identity(&self) -> bool {
        self.brightness == 100.0 && self.contrast == 100.0 && self.saturation == 100.0
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            blur: 0.0,
        }
    }
}

/// Where the watermark is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Anchor::TopLeft),
            "top-right" => Ok(Anchor::TopRight),
            "bottom-left" => Ok(Anchor::BottomLeft),
            "bottom-right" => Ok(Anchor::BottomRight),
            "center" | "centre" => Ok(Anchor::Center),
            other => Err(format!("unknown watermark position: {other}")),
        }
    }
}

/// Text watermark composited onto the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub text: String,
    /// Opacity in percent; values above 100 are treated as 100.
    pub opacity: u32,
    pub anchor: Anchor,
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>, opacity: u32, anchor: Anchor) -> Self {
        Self {
            text: text.into(),
            opacity: opacity.min(100),
            anchor,
        }
    }

    /// A watermark with no visible effect.
    pub fn is_noop(&self) -> bool {
        self.text.trim().is_empty() || self.opacity == 0
    }
}

/// Everything one optimize run needs, captured at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRequest {
    /// Requested output width; `None` keeps the source width (or derives it).
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Preserve the source aspect ratio when resizing.
    pub keep_aspect: bool,
    pub quality: Quality,
    pub format: OutputFormat,
    /// Companion formats produced alongside the primary download.
    pub alternates: Vec<OutputFormat>,
    pub transform: TransformState,
    pub filters: FilterSettings,
    pub watermark: Option<WatermarkSpec>,
    pub target_size: Option<TargetSize>,
    pub limits: SearchLimits,
}

impl Default for OptimizeRequest {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            keep_aspect: true,
            quality: Quality::default(),
            format: OutputFormat::Jpeg,
            alternates: Vec::new(),
            transform: TransformState::default(),
            filters: FilterSettings::default(),
            watermark: None,
            target_size: None,
            limits: SearchLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0.0).factor(), Quality::MIN);
        assert_eq!(Quality::new(0.5).factor(), 0.5);
        assert_eq!(Quality::new(1.5).factor(), 1.0);
        assert_eq!(Quality::new(f32::NAN), Quality::default());
    }

    #[test]
    fn quality_percent_roundtrip() {
        assert_eq!(Quality::from_percent(80).percent(), 80);
        assert_eq!(Quality::from_percent(0).percent(), 1);
        assert_eq!(Quality::from_percent(250).percent(), 100);
    }

    #[test]
    fn format_parse_accepts_aliases() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(" webp ".parse::<OutputFormat>().unwrap(), OutputFormat::WebP);
        assert!("tga".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn only_png_is_lossless() {
        let lossless: Vec<_> = OutputFormat::ALL
            .into_iter()
            .filter(|f| f.is_lossless())
            .collect();
        assert_eq!(lossless, vec![OutputFormat::Png]);
    }

    #[test]
    fn target_size_parses_units() {
        assert_eq!("2048".parse::<TargetSize>().unwrap().bytes(), 2048);
        assert_eq!("1KB".parse::<TargetSize>().unwrap().bytes(), 1024);
        assert_eq!("1.5 mb".parse::<TargetSize>().unwrap().bytes(), 1_572_864);
        assert_eq!("300 bytes".parse::<TargetSize>().unwrap().bytes(), 300);
    }

    #[test]
    fn target_size_rejects_garbage() {
        assert_eq!("".parse::<TargetSize>(), Err(ParseTargetSizeError::Empty));
        assert_eq!(
            "0kb".parse::<TargetSize>(),
            Err(ParseTargetSizeError::NotPositive)
        );
        assert!(matches!(
            "12 parsecs".parse::<TargetSize>(),
            Err(ParseTargetSizeError::Unit(_))
        ));
        assert!(matches!(
            "kb".parse::<TargetSize>(),
            Err(ParseTargetSizeError::Number(_))
        ));
    }

    #[test]
    fn target_size_bytes_never_zero() {
        assert_eq!(TargetSize::new(0.1, SizeUnit::Bytes).bytes(), 1);
    }

    #[test]
    fn transform_rotation_wraps() {
        let mut t = TransformState::default();
        for _ in 0..5 {
            t.rotate_clockwise();
        }
        assert_eq!(t.degrees(), 90);
        t.rotate_counter_clockwise();
        t.rotate_counter_clockwise();
        assert_eq!(t.degrees(), 270);
    }

    #[test]
    fn transform_from_degrees() {
        assert_eq!(TransformState::from_degrees(180).unwrap().quarter_turns(), 2);
        assert_eq!(TransformState::from_degrees(450).unwrap().degrees(), 90);
        assert!(TransformState::from_degrees(45).is_none());
    }

    #[test]
    fn filter_identity_ignores_blur() {
        let filters = FilterSettings {
            blur: 4.0,
            ..FilterSettings::default()
        };
        assert!(filters.is_identity());
    }

    #[test]
    fn watermark_noop_conditions() {
        assert!(WatermarkSpec::new("   ", 50, Anchor::Center).is_noop());
        assert!(WatermarkSpec::new("(c) me", 0, Anchor::Center).is_noop());
        assert!(!WatermarkSpec::new("(c) me", 40, Anchor::Center).is_noop());
        assert_eq!(WatermarkSpec::new("x", 300, Anchor::Center).opacity, 100);
    }

    #[test]
    fn anchor_parse() {
        assert_eq!("top_left".parse::<Anchor>().unwrap(), Anchor::TopLeft);
        assert_eq!("Center".parse::<Anchor>().unwrap(), Anchor::Center);
        assert!("middle".parse::<Anchor>().is_err());
    }
}
