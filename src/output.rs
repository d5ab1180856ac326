//! CLI output formatting for the optimizer.
//!
//! # Output Format
//!
//! ## Optimize
//!
//! ```text
//! Optimizing 2 files
//!     001 dawn.png
//!         Source: photos/dawn.png
//!         1920x1080 → 1280x720
//!         JPEG: dawn-optimized.jpg (245.3 KB, 61.2% smaller)
//!         WebP: dawn-optimized.webp (180 KB, 71.5% smaller)
//!         AVIF: skipped (not supported)
//!     002 dusk.png
//!         Source: photos/dusk.png
//!         1024x768
//!         JPEG: dusk-optimized.jpg (512 KB, 12% larger)
//!         Target 400 KB: not met after 10 attempts (best at quality 10)
//!
//! Optimized 2 files: 2.1 MB → 757.3 KB (64.8% smaller)
//! 1 target not met
//! ```
//!
//! ## Info
//!
//! ```text
//! photos/dawn.png
//!     Format: PNG
//!     Dimensions: 1920x1080
//!     Size: 1.5 MB
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport, FileSummary};
use crate::imaging::{ImageInfo, OutputFormat, savings_percent};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable byte count, 1024-based.
///
/// ```text
/// 0        → 0 Bytes
/// 1536     → 1.5 KB
/// 2097152  → 2 MB
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Savings of `optimized` relative to `original`, as display text.
///
/// ```text
/// 61.2% smaller
/// 12% larger
/// same size
/// ```
pub fn format_savings(original: u64, optimized: u64) -> String {
    let percent = savings_percent(original, optimized);
    let magnitude = format!("{:.1}", percent.abs());
    let magnitude = magnitude.trim_end_matches(".0");
    if magnitude == "0" {
        "same size".to_string()
    } else if percent > 0.0 {
        format!("{}% smaller", magnitude)
    } else {
        format!("{}% larger", magnitude)
    }
}

fn format_dimensions((width, height): (u32, u32)) -> String {
    format!("{}x{}", width, height)
}

fn file_name_of(source: &str) -> &str {
    source.rsplit(['/', '\\']).next().unwrap_or(source)
}

// ============================================================================
// Optimize output
// ============================================================================

fn format_file_summary(index: usize, summary: &FileSummary) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "{}{} {}",
        indent(1),
        format_index(index),
        file_name_of(&summary.source)
    ));
    lines.push(format!("{}Source: {}", indent(2), summary.source));

    if summary.source_dimensions == summary.output_dimensions {
        lines.push(format!(
            "{}{}",
            indent(2),
            format_dimensions(summary.output_dimensions)
        ));
    } else {
        lines.push(format!(
            "{}{} \u{2192} {}",
            indent(2),
            format_dimensions(summary.source_dimensions),
            format_dimensions(summary.output_dimensions)
        ));
    }

    for output in &summary.outputs {
        lines.push(format!(
            "{}{}: {} ({}, {})",
            indent(2),
            output.format.label(),
            output.file_name,
            format_file_size(output.size),
            format_savings(summary.original_size, output.size)
        ));
    }
    for format in &summary.skipped {
        lines.push(format!(
            "{}{}: skipped (not supported)",
            indent(2),
            format.label()
        ));
    }

    if let (Some(target), false) = (summary.target_size, summary.achieved) {
        lines.push(format!(
            "{}Target {}: not met after {} attempts (best at quality {})",
            indent(2),
            format_file_size(target),
            summary.probes.len(),
            summary.quality
        ));
    }
    lines
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { file_count } => {
            let noun = if *file_count == 1 { "file" } else { "files" };
            vec![format!("Optimizing {} {}", file_count, noun)]
        }
        BatchEvent::FileOptimized { index, summary } => format_file_summary(*index, summary),
        BatchEvent::FileFailed {
            index,
            source,
            error,
        } => vec![
            format!(
                "{}{} {}",
                indent(1),
                format_index(*index),
                file_name_of(source)
            ),
            format!("{}Source: {}", indent(2), source),
            format!("{}Failed: {}", indent(2), error),
        ],
    }
}

/// Format the closing totals of a batch run.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![String::new()];
    let count = report.files.len();
    let noun = if count == 1 { "file" } else { "files" };
    let original = report.total_original();
    let optimized = report.total_optimized();
    lines.push(format!(
        "Optimized {} {}: {} \u{2192} {} ({})",
        count,
        noun,
        format_file_size(original),
        format_file_size(optimized),
        format_savings(original, optimized)
    ));

    let missed = report.targets_missed();
    if missed > 0 {
        let noun = if missed == 1 { "target" } else { "targets" };
        lines.push(format!("{} {} not met", missed, noun));
    }
    if !report.failures.is_empty() {
        lines.push(format!("{} failed", report.failures.len()));
    }
    lines
}

pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Info output
// ============================================================================

/// Format what the decoder reports about one input file.
pub fn format_info(source: &str, info: &ImageInfo, file_size: u64) -> Vec<String> {
    let format = info
        .format
        .map(|f| format!("{:?}", f).to_uppercase())
        .unwrap_or_else(|| "unknown".to_string());
    vec![
        source.to_string(),
        format!("{}Format: {}", indent(1), format),
        format!(
            "{}Dimensions: {}",
            indent(1),
            format_dimensions((info.width, info.height))
        ),
        format!("{}Size: {}", indent(1), format_file_size(file_size)),
    ]
}

pub fn print_info(source: &str, info: &ImageInfo, file_size: u64) {
    for line in format_info(source, info, file_size) {
        println!("{}", line);
    }
}

/// Format which output formats this build can encode.
pub fn format_supported_formats(supported: &[OutputFormat]) -> Vec<String> {
    let labels: Vec<&str> = OutputFormat::ALL
        .iter()
        .filter(|f| supported.contains(f))
        .map(|f| f.label())
        .collect();
    vec![format!("Encoders: {}", labels.join(", "))]
}
