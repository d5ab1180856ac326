//! Overlay stage: semi-transparent text watermark.
//!
//! Text is drawn with the 8x8 `font8x8` bitmap glyphs, scaled
//! nearest-neighbour so the font size tracks the image width. The fill is
//! white, composited with the standard "over" operator at the requested
//! opacity. Placement comes from
//! [`calculate_anchor_origin`](super::calculations::calculate_anchor_origin).

use super::calculations::{GLYPH_SIZE, calculate_anchor_origin, calculate_watermark_layout};
use super::params::WatermarkSpec;
use super::raster::RasterImage;
use font8x8::{BASIC_FONTS, UnicodeFonts};

const FILL: [u8; 3] = [255, 255, 255];

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Porter-Duff "over" of the white fill at `alpha` onto one RGBA pixel.
///
/// Colour is weighted by the destination's own alpha, so transparent
/// pixels take the pure fill colour instead of darkening towards black.
fn blend_over(px: &mut [u8], alpha: f32) {
    let below = px[3] as f32 / 255.0;
    let out = alpha + below * (1.0 - alpha);
    if out <= 0.0 {
        return;
    }
    for (c, fill) in px.iter_mut().take(3).zip(FILL) {
        let blended = (fill as f32 * alpha + *c as f32 * below * (1.0 - alpha)) / out;
        *c = blended.round().clamp(0.0, 255.0) as u8;
    }
    px[3] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Composite `spec` onto `image` in place.
///
/// No-op when `spec` is `None`, the text is blank, or the opacity is zero.
pub fn apply_watermark(image: &mut RasterImage, spec: Option<&WatermarkSpec>) {
    let Some(spec) = spec else { return };
    if spec.is_noop() || image.is_empty() {
        return;
    }

    let text = spec.text.trim();
    let glyphs: Vec<[u8; 8]> = text.chars().map(glyph).collect();
    let (img_w, img_h) = image.dimensions();
    let layout = calculate_watermark_layout(img_w, glyphs.len());
    let (origin_x, origin_y) = calculate_anchor_origin(
        spec.anchor,
        (img_w, img_h),
        (layout.text_width, layout.text_height),
        layout.padding,
    );

    let alpha = (spec.opacity.min(100) as f32 / 100.0 * 255.0).round() / 255.0;
    let stride = img_w as usize * 4;
    let cell = (GLYPH_SIZE * layout.scale) as i64;
    let scale = layout.scale as i64;
    let pixels = image.pixels_mut();

    for (index, rows) in glyphs.iter().enumerate() {
        let glyph_x = origin_x + index as i64 * cell;
        for (row, &bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let base_x = glyph_x + col as i64 * scale;
                let base_y = origin_y + row as i64 * scale;
                for dy in 0..scale {
                    let y = base_y + dy;
                    if y < 0 || y >= img_h as i64 {
                        continue;
                    }
                    for dx in 0..scale {
                        let x = base_x + dx;
                        if x < 0 || x >= img_w as i64 {
                            continue;
                        }
                        let idx = y as usize * stride + x as usize * 4;
                        blend_over(&mut pixels[idx..idx + 4], alpha);
                    }
                }
            }
        }
    }
}
