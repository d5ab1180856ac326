//! Pure calculation functions for the optimize pipeline.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Anchor;

/// Calculate output dimensions for a resize request.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `width` / `height` - Requested dimensions; `None` means "not set"
/// * `keep_aspect` - Preserve the source aspect ratio
///
/// # Returns
/// * `(width, height)` - Output dimensions, never zero on either axis
///
/// With `keep_aspect`, a single requested edge derives the other, and two
/// requested edges define a box the output fits inside.
pub fn calculate_output_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    keep_aspect: bool,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }
    let aspect = src_w as f64 / src_h as f64;

    let (w, h) = match (width, height, keep_aspect) {
        (None, None, _) => (src_w, src_h),
        (Some(w), Some(h), false) => (w, h),
        (Some(w), None, false) => (w, src_h),
        (None, Some(h), false) => (src_w, h),
        (Some(w), None, true) => (w, (w as f64 / aspect).round() as u32),
        (None, Some(h), true) => ((h as f64 * aspect).round() as u32, h),
        (Some(w), Some(h), true) => {
            if w as f64 / h as f64 > aspect {
                // Box is wider than the source: height is the constraint
                ((h as f64 * aspect).round() as u32, h)
            } else {
                (w, (w as f64 / aspect).round() as u32)
            }
        }
    };

    (w.max(1), h.max(1))
}

/// Next quality factor in the target-size search.
///
/// Scales the current quality by `target / size`, damped to avoid overshoot:
/// 0.8 when the encode is more than twice the target, otherwise 0.9. Never
/// returns less than `floor`.
pub fn damped_quality_step(quality: f32, size: u64, target: u64, floor: f32) -> f32 {
    if size == 0 {
        return quality;
    }
    let ratio = target as f64 / size as f64;
    let damping = if size > target.saturating_mul(2) {
        0.8
    } else {
        0.9
    };
    ((quality as f64 * ratio * damping) as f32).max(floor)
}

/// Size and placement metrics for a watermark string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkLayout {
    /// Nearest-neighbour scale applied to the 8x8 glyphs.
    pub scale: u32,
    /// Rendered text width in pixels.
    pub text_width: u32,
    /// Rendered text height in pixels.
    pub text_height: u32,
    /// Inset from the anchored edges.
    pub padding: u32,
}

/// Glyph cell size of the bitmap font.
pub const GLYPH_SIZE: u32 = 8;

/// Lay out `char_count` glyphs for an image of the given width.
///
/// Font size is 4% of the image width (at least one glyph cell), padding is
/// 2% of the width.
pub fn calculate_watermark_layout(image_width: u32, char_count: usize) -> WatermarkLayout {
    let font_size = ((image_width as f64 * 0.04).round() as u32).max(GLYPH_SIZE);
    let scale = (font_size / GLYPH_SIZE).max(1);
    let cell = GLYPH_SIZE * scale;
    WatermarkLayout {
        scale,
        text_width: cell * char_count as u32,
        text_height: cell,
        padding: (image_width as f64 * 0.02).round() as u32,
    }
}

/// Top-left origin of the watermark text box for an anchor.
///
/// Coordinates may be negative when the text is larger than the image; the
/// overlay clips.
pub fn calculate_anchor_origin(
    anchor: Anchor,
    image: (u32, u32),
    text: (u32, u32),
    padding: u32,
) -> (i64, i64) {
    let (img_w, img_h) = (image.0 as i64, image.1 as i64);
    let (txt_w, txt_h) = (text.0 as i64, text.1 as i64);
    let pad = padding as i64;

    match anchor {
        Anchor::TopLeft => (pad, pad),
        Anchor::TopRight => (img_w - txt_w - pad, pad),
        Anchor::BottomLeft => (pad, img_h - txt_h - pad),
        Anchor::BottomRight => (img_w - txt_w - pad, img_h - txt_h - pad),
        Anchor::Center => ((img_w - txt_w) / 2, (img_h - txt_h) / 2),
    }
}

/// Percentage saved going from `original` to `optimized` bytes.
///
/// Negative when the output grew.
pub fn savings_percent(original: u64, optimized: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - optimized as f64) / original as f64 * 100.0
}
