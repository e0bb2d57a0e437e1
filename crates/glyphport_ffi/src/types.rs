//! `#[repr(C)]` values exchanged with the host
//!
//! Buffers handed out in [`GlyphMetrics`] and [`BitmapResult`] come from the
//! Rust global allocator and are only ever released by the matching
//! `glyphport_free_*` call, which nulls the pointer so a second free of the
//! same struct is a no-op.

use glyphport_text::{GlyphBitmap, MeasureResult, TextBitmap};
use std::ptr;

/// A rendered glyph, packed RGBA with R=G=B=A=coverage
#[repr(C)]
#[derive(Debug)]
pub struct GlyphMetrics {
    /// Row stride reported by the rasterizer (sign preserved)
    pub pitch: i32,
    pub width: u32,
    pub height: u32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance: i32,
    /// `width * height * 4` bytes, null for empty glyphs
    pub buffer: *mut u8,
    pub buffer_len: usize,
}

impl GlyphMetrics {
    pub const fn empty() -> Self {
        Self {
            pitch: 0,
            width: 0,
            height: 0,
            bearing_x: 0,
            bearing_y: 0,
            advance: 0,
            buffer: ptr::null_mut(),
            buffer_len: 0,
        }
    }

    /// Hand a glyph's buffer over to the host
    pub fn from_glyph(glyph: GlyphBitmap) -> Self {
        let (buffer, buffer_len) = into_raw_buffer(glyph.buffer);
        Self {
            pitch: glyph.pitch,
            width: glyph.width,
            height: glyph.height,
            bearing_x: glyph.bearing_x,
            bearing_y: glyph.bearing_y,
            advance: glyph.advance,
            buffer,
            buffer_len,
        }
    }

    /// Borrow the pixel data
    ///
    /// # Safety
    ///
    /// `buffer`/`buffer_len` must be as produced by [`GlyphMetrics::from_glyph`].
    pub unsafe fn pixels(&self) -> &[u8] {
        if self.buffer.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.buffer, self.buffer_len)
        }
    }

    /// Free the buffer and null it
    ///
    /// # Safety
    ///
    /// `buffer`/`buffer_len` must be as produced by [`GlyphMetrics::from_glyph`],
    /// or null.
    pub unsafe fn release(&mut self) {
        free_raw_buffer(self.buffer, self.buffer_len);
        self.buffer = ptr::null_mut();
        self.buffer_len = 0;
    }
}

/// A composed line of text, packed RGBA
#[repr(C)]
#[derive(Debug)]
pub struct BitmapResult {
    pub buffer: *mut u8,
    pub width: u32,
    pub height: u32,
    /// Distance from the top row to the baseline
    pub baseline: i32,
    pub buffer_len: usize,
}

impl BitmapResult {
    pub const fn empty() -> Self {
        Self {
            buffer: ptr::null_mut(),
            width: 0,
            height: 0,
            baseline: 0,
            buffer_len: 0,
        }
    }

    pub fn from_text(text: TextBitmap) -> Self {
        let (buffer, buffer_len) = into_raw_buffer(text.buffer);
        Self {
            buffer,
            width: text.width,
            height: text.height,
            baseline: text.baseline,
            buffer_len,
        }
    }

    /// # Safety
    ///
    /// `buffer`/`buffer_len` must be as produced by [`BitmapResult::from_text`],
    /// or null.
    pub unsafe fn release(&mut self) {
        free_raw_buffer(self.buffer, self.buffer_len);
        self.buffer = ptr::null_mut();
        self.buffer_len = 0;
    }
}

/// String bounds in whole pixels
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextExtent {
    pub width: i32,
    pub height: i32,
    pub baseline_height: i32,
    /// Code points left out because their glyph failed to load
    pub skipped: u32,
}

impl From<MeasureResult> for TextExtent {
    fn from(m: MeasureResult) -> Self {
        Self {
            width: m.width,
            height: m.height,
            baseline_height: m.baseline_height,
            skipped: m.skipped.min(u32::MAX as usize) as u32,
        }
    }
}

/// Cached per-size face metrics
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontMetrics {
    pub pixel_size: u32,
    pub ascender: i32,
    /// Non-negative magnitude
    pub descender: u32,
    pub line_height: i32,
    pub glyph_count: u32,
}

fn into_raw_buffer(buffer: Vec<u8>) -> (*mut u8, usize) {
    if buffer.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let boxed = buffer.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed) as *mut u8, len)
}

unsafe fn free_raw_buffer(buffer: *mut u8, len: usize) {
    if buffer.is_null() {
        return;
    }
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(buffer, len)));
}
