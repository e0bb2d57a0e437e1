//! Diagnostic 32-bit BMP dumps
//!
//! Uncompressed `BITMAPINFOHEADER` files, rows stored bottom-up, four bytes
//! per pixel. Coverage bitmaps are written with the coverage replicated into
//! every byte of the pixel.

use crate::bitmap::{CoverageBitmap, TextBitmap, RGBA_BYTES};
use crate::{Result, TextError};
use std::path::Path;

/// File header (14) plus info header (40)
pub const HEADER_SIZE: u32 = 54;

/// 72 DPI-equivalent resolution written by common encoders (2835 px/m)
const PIXELS_PER_METER: i32 = 2835;

/// Encode a coverage bitmap, honoring its pitch sign
pub fn encode_coverage(bitmap: &CoverageBitmap) -> Result<Vec<u8>> {
    encode_rgba(bitmap.width, bitmap.rows, &bitmap.to_rgba()?)
}

/// Encode a packed top-down RGBA buffer; pixels are stored as B, G, R, A
pub fn encode_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>> {
    let image_size = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(RGBA_BYTES))
        .filter(|&n| n <= (u32::MAX - HEADER_SIZE) as usize)
        .ok_or(TextError::Allocation { bytes: usize::MAX })?;
    if rgba.len() != image_size {
        return Err(TextError::MalformedBitmap {
            row: 0,
            width,
            pitch: (width as usize * RGBA_BYTES) as i32,
        });
    }

    let mut out = Vec::new();
    out.try_reserve_exact(HEADER_SIZE as usize + image_size)
        .map_err(|_| TextError::Allocation { bytes: image_size })?;

    // BITMAPFILEHEADER
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(HEADER_SIZE + image_size as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&HEADER_SIZE.to_le_bytes());

    // BITMAPINFOHEADER
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    // Positive height: rows run bottom-up
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    let row_bytes = width as usize * RGBA_BYTES;
    if row_bytes > 0 {
        for row in rgba.chunks_exact(row_bytes).rev() {
            for px in row.chunks_exact(RGBA_BYTES) {
                out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
    }

    Ok(out)
}

/// Write a coverage bitmap to `path`
pub fn save_glyph_bitmap(bitmap: &CoverageBitmap, path: &Path) -> Result<()> {
    let bytes = encode_coverage(bitmap)?;
    std::fs::write(path, bytes)?;
    tracing::debug!("Wrote {}x{} glyph dump to {}", bitmap.width, bitmap.rows, path.display());
    Ok(())
}

/// Write a packed RGBA buffer to `path`
pub fn save_rgba(width: u32, height: u32, rgba: &[u8], path: &Path) -> Result<()> {
    let bytes = encode_rgba(width, height, rgba)?;
    std::fs::write(path, bytes)?;
    tracing::debug!("Wrote {}x{} bitmap dump to {}", width, height, path.display());
    Ok(())
}

impl TextBitmap {
    /// Write the composed text to `path` as BMP
    pub fn save_bmp(&self, path: &Path) -> Result<()> {
        save_rgba(self.width, self.height, &self.buffer, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, rows: u32, pitch: i32) -> CoverageBitmap {
        let stride = pitch.unsigned_abs() as usize;
        let mut buffer = vec![0u8; stride * rows as usize];
        for y in 0..rows {
            let line = (if pitch >= 0 { y } else { rows - 1 - y }) as usize;
            for x in 0..width {
                buffer[line * stride + x as usize] = (y * 40 + x * 7) as u8;
            }
        }
        CoverageBitmap {
            width,
            rows,
            pitch,
            buffer,
        }
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_coverage(&ramp(3, 2, 3)).unwrap();
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(u32_at(&bytes, 2), 54 + 24);
        assert_eq!(u32_at(&bytes, 6), 0);
        assert_eq!(u32_at(&bytes, 10), 54);
        assert_eq!(u32_at(&bytes, 14), 40);
        assert_eq!(u32_at(&bytes, 18), 3);
        assert_eq!(u32_at(&bytes, 22), 2);
        assert_eq!(u16::from_le_bytes([bytes[26], bytes[27]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 32);
        assert_eq!(u32_at(&bytes, 30), 0);
        assert_eq!(u32_at(&bytes, 34), 24);
        assert_eq!(u32_at(&bytes, 38), 2835);
        assert_eq!(u32_at(&bytes, 42), 2835);
        assert_eq!(u32_at(&bytes, 46), 0);
        assert_eq!(u32_at(&bytes, 50), 0);
        assert_eq!(bytes.len(), 78);
    }

    #[test]
    fn test_rows_written_bottom_up() {
        let bytes = encode_coverage(&ramp(2, 2, 2)).unwrap();
        // First stored row is the bottom visual row (y = 1)
        assert_eq!(&bytes[54..58], &[40; 4]);
        assert_eq!(&bytes[62..66], &[0; 4]);
    }

    #[test]
    fn test_rgba_written_as_bgra() {
        let bytes = encode_rgba(1, 1, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&bytes[54..], &[3, 2, 1, 4]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(encode_rgba(2, 2, &[0; 15]).is_err());
    }

    #[test]
    fn test_round_trip_through_image_decoder() {
        for bitmap in [ramp(5, 4, 5), ramp(5, 4, 8), ramp(5, 4, -6)] {
            let bytes = encode_coverage(&bitmap).unwrap();
            let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Bmp)
                .unwrap()
                .to_rgba8();
            assert_eq!(decoded.dimensions(), (5, 4));
            for y in 0..4 {
                for x in 0..5 {
                    let expected = bitmap.coverage(x, y).unwrap();
                    let px = decoded.get_pixel(x, y).0;
                    assert_eq!(&px[..3], &[expected; 3], "pixel ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_save_glyph_bitmap_writes_file() {
        let path = std::env::temp_dir().join(format!("glyphport-bmp-{}.bmp", std::process::id()));
        let bitmap = ramp(4, 3, 4);
        save_glyph_bitmap(&bitmap, &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(written, encode_coverage(&bitmap).unwrap());
    }

    #[test]
    fn test_empty_bitmap_has_header_only() {
        let bytes = encode_coverage(&CoverageBitmap::default()).unwrap();
        assert_eq!(bytes.len(), 54);
    }
}
