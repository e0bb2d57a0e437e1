//! 26.6 fixed-point helpers
//!
//! Engine metrics are carried as `i64` values with six fractional bits
//! (1/64 pixel), the way the rasterizer reports them.

/// One whole pixel in 26.6 units
pub const ONE: i64 = 64;

/// Floor a 26.6 value to whole pixels (arithmetic shift, floors negatives)
///
/// Results outside the `i32` range saturate.
#[inline]
pub fn floor_px(value: i64) -> i32 {
    (value >> 6).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Convert whole pixels to 26.6
#[inline]
pub fn from_px(px: i32) -> i64 {
    px as i64 * ONE
}

/// Round a pixel value to the nearest 1/64
#[inline]
pub fn round_26_6(px: f32) -> i64 {
    (px * ONE as f32).round() as i64
}

/// Grid-fit a pixel value down to a whole pixel, in 26.6
#[inline]
pub fn floor_26_6(px: f32) -> i64 {
    px.floor() as i64 * ONE
}

/// Grid-fit a pixel value up to a whole pixel, in 26.6
#[inline]
pub fn ceil_26_6(px: f32) -> i64 {
    px.ceil() as i64 * ONE
}

/// Round a 26.6 value to the nearest whole pixel, staying in 26.6
#[inline]
pub fn pix_round(value: i64) -> i64 {
    (value + 32) & !63
}
