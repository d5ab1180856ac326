//! Download filenames for optimized images.
//!
//! Every output is named `<stem>-optimized.<ext>`, where the stem comes from
//! the input file name and the extension from the output format:
//! - `Holiday Photo.png` as JPEG → `Holiday-Photo-optimized.jpg`
//! - `scan.tiff` as WebP → `scan-optimized.webp`
//! - `.png` as PNG → `png-optimized.png` (a dotfile keeps its name as the stem)
//! - `  .jpg` as PNG → `image-optimized.png`

use crate::imaging::OutputFormat;

/// Suffix inserted between the stem and the extension.
pub const OPTIMIZED_SUFFIX: &str = "-optimized";

/// Stem used when the input name has nothing usable left.
pub const FALLBACK_STEM: &str = "image";

/// Strip any directory part and the final extension from `name`.
///
/// Handles both `/` and `\` separators so names coming from other
/// platforms behave the same.
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => base.trim_start_matches('.'),
        Some(dot) => &base[..dot],
    }
}

/// Make a stem safe to use as a filename.
///
/// Runs of whitespace become a single `-`, path separators and control
/// characters are dropped, and an empty result falls back to `image`.
pub fn sanitize_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for ch in stem.trim().chars() {
        if ch.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if matches!(ch, '/' | '\\' | ':' | '\0') || ch.is_control() {
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push(ch);
    }
    if out.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        out
    }
}

/// Name for `source_name` re-encoded as `format`.
pub fn optimized_file_name(source_name: &str, format: OutputFormat) -> String {
    format!(
        "{}{}.{}",
        sanitize_stem(file_stem(source_name)),
        OPTIMIZED_SUFFIX,
        format.extension()
    )
}
