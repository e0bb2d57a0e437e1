//! Sized fonts
//!
//! A [`Font`] owns one loaded face plus the ascender/descender cached for its
//! current pixel size. Fonts are opened through an [`Engine`](crate::Engine)
//! and released when dropped.

use crate::bitmap::{CoverageBitmap, GlyphBitmap};
use crate::config::MeasureMode;
use crate::engine::{check_pixel_size, FaceBackend, GlyphIndex, SizeMetrics};
use crate::fixed;
use crate::{Result, TextError};

/// A loaded face at a fixed pixel size
///
/// Every glyph operation takes `&mut self`: a font is used from one thread at
/// a time. Wrap it in a lock to share it.
pub struct Font {
    face: Box<dyn FaceBackend>,
    pixel_size: u32,
    /// Whole pixels above the baseline
    ascender: i32,
    /// Whole pixels below the baseline, as a magnitude
    descender: u32,
    measure_mode: MeasureMode,
}

impl Font {
    pub(crate) fn new(mut face: Box<dyn FaceBackend>, pixel_size: u32, measure_mode: MeasureMode) -> Self {
        face.set_pixel_size(pixel_size);
        let (ascender, descender) = cached_extents(face.size_metrics());
        Self {
            face,
            pixel_size,
            ascender,
            descender,
            measure_mode,
        }
    }

    /// Re-apply a pixel size; later measurements and renders use it
    pub fn set_font_size(&mut self, pixel_size: u32) -> Result<()> {
        check_pixel_size(pixel_size)?;
        self.face.set_pixel_size(pixel_size);
        self.pixel_size = pixel_size;
        (self.ascender, self.descender) = cached_extents(self.face.size_metrics());
        tracing::debug!(
            "Font resized to {}px (ascender {}, descender {})",
            pixel_size,
            self.ascender,
            self.descender
        );
        Ok(())
    }

    /// Current pixel size
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Ascender in whole pixels
    pub fn ascender(&self) -> i32 {
        self.ascender
    }

    /// Descender in whole pixels (non-negative magnitude)
    pub fn descender(&self) -> u32 {
        self.descender
    }

    /// Ascender plus descender in whole pixels
    pub fn line_height(&self) -> i32 {
        self.ascender + self.descender as i32
    }

    /// 26.6 metrics for the current size
    pub fn size_metrics(&self) -> SizeMetrics {
        self.face.size_metrics()
    }

    /// Glyph loading used by [`Font::measure_string`]
    pub fn measure_mode(&self) -> MeasureMode {
        self.measure_mode
    }

    pub fn set_measure_mode(&mut self, mode: MeasureMode) {
        self.measure_mode = mode;
    }

    /// Family name, if the face carries one
    pub fn family_name(&self) -> Option<&str> {
        self.face.family_name()
    }

    /// Number of glyphs in the face
    pub fn glyph_count(&self) -> u32 {
        self.face.glyph_count()
    }

    /// Glyph index for a character, `None` if the face has no mapping
    pub fn glyph_index(&mut self, c: char) -> Option<GlyphIndex> {
        match self.face.char_index(c) {
            0 => None,
            index => Some(index),
        }
    }

    pub(crate) fn face_mut(&mut self) -> &mut dyn FaceBackend {
        self.face.as_mut()
    }

    /// Render one code point into a packed RGBA glyph
    ///
    /// Every output pixel has R, G, B and A equal to the source coverage.
    /// Outline-less glyphs (space) give a 0x0 glyph with an empty buffer.
    pub fn render_glyph(&mut self, codepoint: char) -> Result<GlyphBitmap> {
        let index = self.glyph_index(codepoint).ok_or(TextError::GlyphNotFound(codepoint))?;
        let slot = self
            .face
            .render(index)
            .map_err(|source| TextError::RenderFailed { codepoint, source })?;

        // A box with no area (e.g. 2x0 for a space) is reported as 0x0
        let bitmap = if slot.bitmap.is_empty() {
            CoverageBitmap::default()
        } else {
            slot.bitmap
        };
        let buffer = bitmap.to_rgba()?;
        Ok(GlyphBitmap {
            pitch: bitmap.pitch,
            width: bitmap.width,
            height: bitmap.rows,
            bearing_x: fixed::floor_px(slot.metrics.hori_bearing_x),
            bearing_y: fixed::floor_px(slot.metrics.hori_bearing_y),
            advance: fixed::floor_px(slot.metrics.advance_x),
            buffer,
        })
    }
}

fn cached_extents(metrics: SizeMetrics) -> (i32, u32) {
    (
        fixed::floor_px(metrics.ascender),
        fixed::floor_px(metrics.descender).unsigned_abs(),
    )
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("family_name", &self.face.family_name())
            .field("pixel_size", &self.pixel_size)
            .field("ascender", &self.ascender)
            .field("descender", &self.descender)
            .finish()
    }
}
