//! Single-line text composition
//!
//! Lays the glyphs of a string out along one baseline, the same way
//! [`Font::measure_string`] walks it, and blends their coverage into one
//! RGBA bitmap tinted with a colour.

use crate::bitmap::{alloc_zeroed, Rgb, TextBitmap, RGBA_BYTES};
use crate::engine::GlyphIndex;
use crate::fixed;
use crate::font::Font;
use crate::Result;

impl Font {
    /// Render `text` into a `width x height` bitmap from [`Font::measure_string`]
    ///
    /// Every pixel carries `color` in R, G and B; A is the glyph coverage,
    /// with overlapping glyphs keeping the larger value. Glyphs that fail to
    /// render are skipped, and coverage outside the measured box is clipped.
    pub fn render_text(&mut self, text: &str, color: Rgb) -> Result<TextBitmap> {
        let bounds = self.measure_string(text);
        let width = bounds.width.max(0) as u32;
        let height = bounds.height.max(0) as u32;
        let baseline = bounds.baseline_height;

        let mut buffer = alloc_zeroed(width, height)?;
        if buffer.is_empty() {
            return Ok(TextBitmap {
                width,
                height,
                baseline,
                buffer,
            });
        }
        for px in buffer.chunks_exact_mut(RGBA_BYTES) {
            px[..3].copy_from_slice(&[color.r, color.g, color.b]);
        }

        let face = self.face_mut();
        let mut pen_x: i64 = 0;
        let mut prev: Option<GlyphIndex> = None;

        for c in text.chars() {
            let index = face.char_index(c);
            if let Some(prev) = prev {
                if index != 0 {
                    pen_x += fixed::floor_px(face.kerning(prev, index)) as i64;
                }
            }

            let slot = match face.render(index) {
                Ok(slot) => slot,
                Err(e) => {
                    tracing::debug!("Skipping {:?} while composing: {}", c, e);
                    continue;
                }
            };

            let left = pen_x + fixed::floor_px(slot.metrics.hori_bearing_x) as i64;
            let top = baseline as i64 - fixed::floor_px(slot.metrics.hori_bearing_y) as i64;
            for y in 0..slot.bitmap.rows {
                let dst_y = top + y as i64;
                if dst_y < 0 || dst_y >= height as i64 {
                    continue;
                }
                let Some(row) = slot.bitmap.row(y) else {
                    break;
                };
                for (x, &coverage) in row.iter().enumerate() {
                    let dst_x = left + x as i64;
                    if dst_x < 0 || dst_x >= width as i64 {
                        continue;
                    }
                    let idx = (dst_y as usize * width as usize + dst_x as usize) * RGBA_BYTES + 3;
                    buffer[idx] = buffer[idx].max(coverage);
                }
            }

            pen_x += fixed::floor_px(slot.metrics.advance_x) as i64;
            prev = Some(index);
        }

        Ok(TextBitmap {
            width,
            height,
            baseline,
            buffer,
        })
    }
}
