//! Coverage and RGBA bitmaps
//!
//! The rasterizer hands out single-channel coverage bitmaps whose rows are
//! `pitch` bytes apart. A negative pitch means the rows are stored bottom-up.
//! Everything handed to callers is a tightly packed, top-down RGBA buffer.

use crate::{Result, TextError};

/// Bytes per RGBA pixel
pub const RGBA_BYTES: usize = 4;

/// Single-channel (one byte per pixel) glyph coverage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageBitmap {
    /// Pixels per row
    pub width: u32,
    /// Number of rows
    pub rows: u32,
    /// Signed byte distance between rows; negative for bottom-up storage
    pub pitch: i32,
    /// Raw storage, `rows * |pitch|` bytes
    pub buffer: Vec<u8>,
}

impl CoverageBitmap {
    /// Tightly packed, top-down coverage
    pub fn packed(width: u32, rows: u32, buffer: Vec<u8>) -> Self {
        Self {
            width,
            rows,
            pitch: width as i32,
            buffer,
        }
    }

    /// Whether the bitmap has no pixels (e.g. a space)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.rows == 0
    }

    /// Coverage of visual row `y` (0 = top), honoring the pitch sign
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.rows {
            return None;
        }
        let stride = self.pitch.unsigned_abs() as usize;
        let line = if self.pitch >= 0 {
            y as usize
        } else {
            (self.rows - 1 - y) as usize
        };
        let start = line.checked_mul(stride)?;
        let end = start.checked_add(self.width as usize)?;
        self.buffer.get(start..end)
    }

    /// Coverage byte at `(x, y)`
    pub fn coverage(&self, x: u32, y: u32) -> Option<u8> {
        self.row(y).and_then(|row| row.get(x as usize).copied())
    }

    /// Replicate every coverage byte into R, G, B and A of a packed buffer
    ///
    /// Output byte values equal the input coverage exactly.
    pub fn to_rgba(&self) -> Result<Vec<u8>> {
        let row_bytes = self.width as usize * RGBA_BYTES;
        let mut out = alloc_zeroed(self.width, self.rows)?;
        if out.is_empty() {
            return Ok(out);
        }

        for (y, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
            let src = self.row(y as u32).ok_or(TextError::MalformedBitmap {
                row: y as u32,
                width: self.width,
                pitch: self.pitch,
            })?;
            for (px, &alpha) in dst.chunks_exact_mut(RGBA_BYTES).zip(src) {
                px.fill(alpha);
            }
        }

        Ok(out)
    }
}

/// Allocate a zeroed `width * height * 4` buffer, reporting failure instead of aborting
pub(crate) fn alloc_zeroed(width: u32, height: u32) -> Result<Vec<u8>> {
    let bytes = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(RGBA_BYTES))
        .ok_or(TextError::Allocation { bytes: usize::MAX })?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|_| TextError::Allocation { bytes })?;
    buffer.resize(bytes, 0);
    Ok(buffer)
}

/// A rendered glyph in packed RGBA, ready to hand to a host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Row stride reported by the rasterizer (sign preserved)
    pub pitch: i32,
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Offset from pen origin to the bitmap's left edge
    pub bearing_x: i32,
    /// Offset from baseline to the bitmap's top edge
    pub bearing_y: i32,
    /// Horizontal pen advance in whole pixels
    pub advance: i32,
    /// `width * height * 4` bytes, R=G=B=A=coverage
    pub buffer: Vec<u8>,
}

impl GlyphBitmap {
    /// RGBA bytes of row `y`, `None` past the last row
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let row_bytes = self.width as usize * RGBA_BYTES;
        let start = y as usize * row_bytes;
        self.buffer.get(start..start + row_bytes)
    }
}

/// An opaque RGB colour used to tint composed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` or `#RRGGBB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// A single line of text composed into packed RGBA
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBitmap {
    pub width: u32,
    pub height: u32,
    /// Distance from the top row to the baseline
    pub baseline: i32,
    /// `width * height * 4` bytes, RGB = tint, A = coverage
    pub buffer: Vec<u8>,
}

impl TextBitmap {
    /// Alpha channel at `(x, y)`, `None` outside the bitmap
    pub fn alpha(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * RGBA_BYTES + 3;
        self.buffer.get(idx).copied()
    }
}
