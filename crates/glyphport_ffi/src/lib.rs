//! Flat C ABI over `glyphport_text`
//!
//! # Lifecycle
//!
//! ```text
//! glyphport_init()                       (optional, idempotent)
//!        │
//!        ▼
//! glyphport_create_font(path, px, &h)    engine starts lazily on first use
//!        │
//!        ├── glyphport_measure_string(h, ...)
//!        ├── glyphport_render_glyph(h, cp, &g)  ──► glyphport_free_glyph(&g)
//!        ├── glyphport_render_text(h, ...)      ──► glyphport_free_bitmap(&b)
//!        ▼
//! glyphport_dispose_font(h)
//!        │
//!        ▼
//! glyphport_shutdown()                   drops every live font
//! ```
//!
//! Every function returns a [`Status`]; on failure the message is available
//! from [`glyphport_last_error`] on the same thread. Panics never cross the
//! boundary. Handles are `u64` table keys, so any call on a disposed handle
//! fails with [`Status::InvalidHandle`].
//!
//! # Host side (C#)
//!
//! ```csharp
//! [DllImport("glyphport_ffi")] static extern int glyphport_create_font(string path, uint size, out ulong handle);
//! [DllImport("glyphport_ffi")] static extern int glyphport_render_glyph(ulong handle, uint codepoint, out GlyphMetrics glyph);
//! [DllImport("glyphport_ffi")] static extern void glyphport_free_glyph(ref GlyphMetrics glyph);
//! ```

pub mod registry;
pub mod status;
pub mod types;

pub use status::{glyphport_last_error, FfiError, FfiResult, Status};
pub use types::{BitmapResult, FontMetrics, GlyphMetrics, TextExtent};

use glyphport_text::{bmp, Engine, Font, RasterConfig, Rgb};
use status::guard;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

/// Pass as a length to read a string up to its NUL terminator
pub const GLYPHPORT_NUL_TERMINATED: usize = usize::MAX;

/// Register a font opened by a Rust host and return its handle
pub fn register_font(font: Font) -> u64 {
    registry::insert(font)
}

fn engine() -> &'static Engine {
    Engine::global()
}

fn init_logging() {
    static LOGGING: Once = Once::new();
    LOGGING.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_env("GLYPHPORT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
        // The host may already own the global subscriber
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}

unsafe fn out_ref<'a, T>(ptr: *mut T, name: &'static str) -> FfiResult<&'a mut T> {
    ptr.as_mut().ok_or(FfiError::NullArgument(name))
}

unsafe fn c_path<'a>(ptr: *const c_char, name: &'static str) -> FfiResult<&'a Path> {
    if ptr.is_null() {
        return Err(FfiError::NullArgument(name));
    }
    let s = CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| FfiError::InvalidUtf8(name))?;
    Ok(Path::new(s))
}

unsafe fn utf8_text<'a>(ptr: *const u8, len: usize) -> FfiResult<&'a str> {
    if len == 0 {
        return Ok("");
    }
    if ptr.is_null() {
        return Err(FfiError::NullArgument("text"));
    }
    let bytes = if len == GLYPHPORT_NUL_TERMINATED {
        CStr::from_ptr(ptr as *const c_char).to_bytes()
    } else {
        std::slice::from_raw_parts(ptr, len)
    };
    std::str::from_utf8(bytes).map_err(|_| FfiError::InvalidUtf8("text"))
}

unsafe fn utf16_units<'a>(ptr: *const u16, len: usize) -> FfiResult<&'a [u16]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(FfiError::NullArgument("text"));
    }
    let len = if len == GLYPHPORT_NUL_TERMINATED {
        (0..).take_while(|&i| *ptr.add(i) != 0).count()
    } else {
        len
    };
    Ok(std::slice::from_raw_parts(ptr, len))
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Initialize logging and the rasterization engine
///
/// Safe to call any number of times; also restarts an engine closed by
/// [`glyphport_shutdown`]. Log filtering follows `GLYPHPORT_LOG`
/// (default `warn`).
#[no_mangle]
pub extern "C" fn glyphport_init() -> Status {
    guard("glyphport_init", || {
        init_logging();
        Engine::init_global(RasterConfig::default());
        Ok(())
    })
}

/// Drop every live font and close the engine
///
/// Outstanding glyph and bitmap buffers stay valid and must still be freed.
/// Creating fonts fails with [`Status::EngineInit`] until [`glyphport_init`]
/// is called again.
#[no_mangle]
pub extern "C" fn glyphport_shutdown() -> Status {
    guard("glyphport_shutdown", || {
        let released = registry::clear();
        engine().shutdown();
        tracing::debug!("Shutdown released {} fonts", released);
        Ok(())
    })
}

/// Load the font at `path` (UTF-8, NUL-terminated) at `pixel_size` pixels
///
/// # Safety
///
/// `path` must be a valid C string; `out_handle` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_create_font(
    path: *const c_char,
    pixel_size: u32,
    out_handle: *mut u64,
) -> Status {
    guard("glyphport_create_font", || {
        let out = out_ref(out_handle, "out_handle")?;
        *out = 0;
        let path = c_path(path, "path")?;
        let font = engine().open(path, pixel_size)?;
        *out = registry::insert(font);
        Ok(())
    })
}

/// Re-apply a pixel size to a live font
#[no_mangle]
pub extern "C" fn glyphport_set_font_size(handle: u64, pixel_size: u32) -> Status {
    guard("glyphport_set_font_size", || {
        registry::with_font(handle, |font| Ok(font.set_font_size(pixel_size)?))
    })
}

/// Read the cached metrics of a live font
///
/// # Safety
///
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_font_metrics(handle: u64, out: *mut FontMetrics) -> Status {
    guard("glyphport_font_metrics", || {
        let out = out_ref(out, "out")?;
        *out = registry::with_font(handle, |font| {
            Ok(FontMetrics {
                pixel_size: font.pixel_size(),
                ascender: font.ascender(),
                descender: font.descender(),
                line_height: font.line_height(),
                glyph_count: font.glyph_count(),
            })
        })?;
        Ok(())
    })
}

/// Release a font; the handle is invalid afterwards
#[no_mangle]
pub extern "C" fn glyphport_dispose_font(handle: u64) -> Status {
    guard("glyphport_dispose_font", || registry::remove(handle))
}

// ============================================================================
// Measurement
// ============================================================================

/// Measure `len` bytes of UTF-8 text as one line
///
/// # Safety
///
/// `text` must be valid for `len` bytes (or NUL-terminated when `len` is
/// [`GLYPHPORT_NUL_TERMINATED`]); `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_measure_string(
    handle: u64,
    text: *const u8,
    len: usize,
    out: *mut TextExtent,
) -> Status {
    guard("glyphport_measure_string", || {
        let out = out_ref(out, "out")?;
        let text = utf8_text(text, len)?;
        *out = registry::with_font(handle, |font| Ok(font.measure_string(text).into()))?;
        Ok(())
    })
}

/// Measure `len` UTF-16 code units as one line
///
/// Unpaired surrogates measure as U+FFFD.
///
/// # Safety
///
/// `text` must be valid for `len` units (or NUL-terminated when `len` is
/// [`GLYPHPORT_NUL_TERMINATED`]); `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_measure_string_utf16(
    handle: u64,
    text: *const u16,
    len: usize,
    out: *mut TextExtent,
) -> Status {
    guard("glyphport_measure_string_utf16", || {
        let out = out_ref(out, "out")?;
        let units = utf16_units(text, len)?;
        let chars = char::decode_utf16(units.iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER));
        *out = registry::with_font(handle, |font| Ok(font.measure_chars(chars).into()))?;
        Ok(())
    })
}

// ============================================================================
// Rendering
// ============================================================================

/// Render one code point into `out`
///
/// On success the caller owns `out.buffer` and must release it with
/// [`glyphport_free_glyph`]. On failure `out` is left empty.
///
/// # Safety
///
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_render_glyph(
    handle: u64,
    codepoint: u32,
    out: *mut GlyphMetrics,
) -> Status {
    guard("glyphport_render_glyph", || {
        let out = out_ref(out, "out")?;
        *out = GlyphMetrics::empty();
        let codepoint = char::from_u32(codepoint)
            .ok_or(glyphport_text::TextError::GlyphNotFound(char::REPLACEMENT_CHARACTER))?;
        let glyph = registry::with_font(handle, |font| Ok(font.render_glyph(codepoint)?))?;
        *out = GlyphMetrics::from_glyph(glyph);
        Ok(())
    })
}

/// Release a glyph buffer from [`glyphport_render_glyph`]
///
/// Nulls `glyph.buffer`, so freeing the same struct twice is harmless.
///
/// # Safety
///
/// `glyph` must be null or point to a `GlyphMetrics` filled by
/// [`glyphport_render_glyph`] (or already freed).
#[no_mangle]
pub unsafe extern "C" fn glyphport_free_glyph(glyph: *mut GlyphMetrics) {
    if let Some(glyph) = glyph.as_mut() {
        glyph.release();
    }
}

/// Compose `len` bytes of UTF-8 text into one RGBA bitmap tinted `(r, g, b)`
///
/// On success the caller owns `out.buffer` and must release it with
/// [`glyphport_free_bitmap`].
///
/// # Safety
///
/// `text` as for [`glyphport_measure_string`]; `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn glyphport_render_text(
    handle: u64,
    text: *const u8,
    len: usize,
    r: u8,
    g: u8,
    b: u8,
    out: *mut BitmapResult,
) -> Status {
    guard("glyphport_render_text", || {
        let out = out_ref(out, "out")?;
        *out = BitmapResult::empty();
        let text = utf8_text(text, len)?;
        let bitmap = registry::with_font(handle, |font| Ok(font.render_text(text, Rgb::new(r, g, b))?))?;
        *out = BitmapResult::from_text(bitmap);
        Ok(())
    })
}

/// Release a bitmap from [`glyphport_render_text`]
///
/// # Safety
///
/// `bitmap` must be null or point to a `BitmapResult` filled by
/// [`glyphport_render_text`] (or already freed).
#[no_mangle]
pub unsafe extern "C" fn glyphport_free_bitmap(bitmap: *mut BitmapResult) {
    if let Some(bitmap) = bitmap.as_mut() {
        bitmap.release();
    }
}

/// Write a rendered glyph to `path` as a 32-bit BMP
///
/// # Safety
///
/// `glyph` must point to a live `GlyphMetrics` from [`glyphport_render_glyph`];
/// `path` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn glyphport_save_glyph_bitmap(
    glyph: *const GlyphMetrics,
    path: *const c_char,
) -> Status {
    guard("glyphport_save_glyph_bitmap", || {
        let glyph = glyph.as_ref().ok_or(FfiError::NullArgument("glyph"))?;
        let path = c_path(path, "path")?;
        bmp::save_rgba(glyph.width, glyph.height, glyph.pixels(), path)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphport_text::testing::{MockFace, MockGlyph};

    fn mock_handle() -> u64 {
        face_handle(MockFace::monospace())
    }

    fn face_handle(face: MockFace) -> u64 {
        let font = Engine::default().open_backend(Box::new(face), 16).unwrap();
        register_font(font)
    }

    #[test]
    fn test_measure_utf8_and_utf16_agree() {
        let handle = mock_handle();
        let text = "Hi there";
        let units: Vec<u16> = text.encode_utf16().collect();

        let mut a = TextExtent::default();
        let mut b = TextExtent::default();
        unsafe {
            assert_eq!(glyphport_measure_string(handle, text.as_ptr(), text.len(), &mut a), Status::Ok);
            assert_eq!(
                glyphport_measure_string_utf16(handle, units.as_ptr(), units.len(), &mut b),
                Status::Ok
            );
        }
        assert_eq!(a, b);
        assert_eq!(a.width, 64);
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_nul_terminated_inputs() {
        let handle = mock_handle();
        let utf8 = b"abc\0";
        let utf16 = [b'a' as u16, b'b' as u16, 0];
        let mut a = TextExtent::default();
        let mut b = TextExtent::default();
        unsafe {
            glyphport_measure_string(handle, utf8.as_ptr(), GLYPHPORT_NUL_TERMINATED, &mut a);
            glyphport_measure_string_utf16(handle, utf16.as_ptr(), GLYPHPORT_NUL_TERMINATED, &mut b);
        }
        assert_eq!(a.width, 24);
        assert_eq!(b.width, 16);
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_unpaired_surrogate_measures_as_replacement() {
        let handle = mock_handle();
        // 'A', lone high surrogate: replacement char is unmapped -> .notdef
        let units = [b'A' as u16, 0xD800];
        let mut out = TextExtent::default();
        let status = unsafe { glyphport_measure_string_utf16(handle, units.as_ptr(), 2, &mut out) };
        assert_eq!(status, Status::Ok);
        assert_eq!(out.width, 16);
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let handle = mock_handle();
        let bytes = [0x61, 0xFF];
        let mut out = TextExtent::default();
        let status = unsafe { glyphport_measure_string(handle, bytes.as_ptr(), 2, &mut out) };
        assert_eq!(status, Status::InvalidUtf8);
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_null_out_pointer_rejected() {
        let handle = mock_handle();
        let status = unsafe { glyphport_render_glyph(handle, 'A' as u32, std::ptr::null_mut()) };
        assert_eq!(status, Status::NullArgument);
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_invalid_codepoint_is_glyph_not_found() {
        let handle = mock_handle();
        let mut glyph = GlyphMetrics::empty();
        let status = unsafe { glyphport_render_glyph(handle, 0xD800, &mut glyph) };
        assert_eq!(status, Status::GlyphNotFound);
        assert!(glyph.buffer.is_null());
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_font_metrics() {
        let handle = mock_handle();
        let mut metrics = FontMetrics::default();
        assert_eq!(unsafe { glyphport_font_metrics(handle, &mut metrics) }, Status::Ok);
        assert_eq!(metrics.pixel_size, 16);
        assert_eq!(metrics.ascender, 13);
        assert_eq!(metrics.descender, 4);
        assert_eq!(metrics.line_height, 17);

        assert_eq!(glyphport_set_font_size(handle, 32), Status::Ok);
        unsafe { glyphport_font_metrics(handle, &mut metrics) };
        assert_eq!(metrics.ascender, 26);
        assert_eq!(glyphport_set_font_size(handle, 0), Status::InvalidPixelSize);
        glyphport_dispose_font(handle);
    }

    fn last_error() -> String {
        let mut buf = [0 as c_char; 512];
        unsafe { glyphport_last_error(buf.as_mut_ptr(), buf.len()) };
        unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_create_font_missing_file() {
        let path = std::ffi::CString::new("/nonexistent/glyphport/missing.ttf").unwrap();
        let mut handle = 7u64;
        let status = unsafe { glyphport_create_font(path.as_ptr(), 16, &mut handle) };
        assert_eq!(status, Status::FaceLoad);
        assert_eq!(handle, 0);
        assert!(last_error().contains("missing.ttf"));
    }

    #[test]
    fn test_create_font_null_arguments() {
        let path = std::ffi::CString::new("font.ttf").unwrap();
        let mut handle = 0u64;
        let status = unsafe { glyphport_create_font(std::ptr::null(), 16, &mut handle) };
        assert_eq!(status, Status::NullArgument);
        assert!(last_error().contains("path"));
        let status = unsafe { glyphport_create_font(path.as_ptr(), 16, std::ptr::null_mut()) };
        assert_eq!(status, Status::NullArgument);
    }

    #[test]
    fn test_disposed_handle_is_rejected_everywhere() {
        let handle = mock_handle();
        assert_eq!(glyphport_dispose_font(handle), Status::Ok);

        let mut glyph = GlyphMetrics::empty();
        let mut extent = TextExtent::default();
        unsafe {
            assert_eq!(glyphport_render_glyph(handle, 'A' as u32, &mut glyph), Status::InvalidHandle);
            assert_eq!(glyphport_measure_string(handle, b"A".as_ptr(), 1, &mut extent), Status::InvalidHandle);
        }
        assert_eq!(glyphport_set_font_size(handle, 12), Status::InvalidHandle);
        assert_eq!(glyphport_dispose_font(handle), Status::InvalidHandle);
        assert_eq!(glyphport_dispose_font(0), Status::InvalidHandle);
    }

    #[test]
    fn test_render_glyph_replicates_coverage() {
        let handle = mock_handle();
        let mut glyph = GlyphMetrics::empty();
        assert_eq!(unsafe { glyphport_render_glyph(handle, 'A' as u32, &mut glyph) }, Status::Ok);
        assert_eq!((glyph.width, glyph.height), (6, 11));
        assert_eq!((glyph.bearing_x, glyph.bearing_y, glyph.advance), (1, 11, 8));
        assert_eq!(glyph.buffer_len, 6 * 11 * 4);

        let pixels = unsafe { glyph.pixels() };
        let expected = glyphport_text::testing::pattern_value(1, 2, 3);
        let at = (3 * 6 + 2) * 4;
        assert_eq!(&pixels[at..at + 4], &[expected; 4]);

        unsafe {
            glyphport_free_glyph(&mut glyph);
            assert!(glyph.buffer.is_null());
            glyphport_free_glyph(&mut glyph);
            glyphport_free_glyph(std::ptr::null_mut());
        }
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_render_space_gives_empty_buffer() {
        let handle = mock_handle();
        let mut glyph = GlyphMetrics::empty();
        assert_eq!(unsafe { glyphport_render_glyph(handle, ' ' as u32, &mut glyph) }, Status::Ok);
        assert!(glyph.buffer.is_null());
        assert_eq!(glyph.advance, 8);
        unsafe { glyphport_free_glyph(&mut glyph) };
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_render_free_loop() {
        let handle = mock_handle();
        for i in 0..10_000u32 {
            let c = b'a' as u32 + i % 26;
            let mut glyph = GlyphMetrics::empty();
            assert_eq!(unsafe { glyphport_render_glyph(handle, c, &mut glyph) }, Status::Ok);
            unsafe { glyphport_free_glyph(&mut glyph) };
        }
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_render_text_matches_measure() {
        let handle = mock_handle();
        let text = "Ag";
        let mut extent = TextExtent::default();
        let mut bitmap = BitmapResult::empty();
        unsafe {
            glyphport_measure_string(handle, text.as_ptr(), text.len(), &mut extent);
            assert_eq!(
                glyphport_render_text(handle, text.as_ptr(), text.len(), 255, 0, 0, &mut bitmap),
                Status::Ok
            );
        }
        assert_eq!(bitmap.width as i32, extent.width);
        assert_eq!(bitmap.height as i32, extent.height);
        assert_eq!(bitmap.baseline, extent.baseline_height);
        assert_eq!(bitmap.buffer_len, (bitmap.width * bitmap.height * 4) as usize);

        unsafe {
            glyphport_free_bitmap(&mut bitmap);
            glyphport_free_bitmap(&mut bitmap);
        }
        assert!(bitmap.buffer.is_null());
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_save_glyph_bitmap() {
        let handle = mock_handle();
        let mut glyph = GlyphMetrics::empty();
        unsafe { glyphport_render_glyph(handle, 'A' as u32, &mut glyph) };

        let path = std::env::temp_dir().join(format!("glyphport_ffi_{}.bmp", std::process::id()));
        let c_path = std::ffi::CString::new(path.to_str().unwrap()).unwrap();
        assert_eq!(unsafe { glyphport_save_glyph_bitmap(&glyph, c_path.as_ptr()) }, Status::Ok);

        let image = image::open(&path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (6, 11));
        let v = glyphport_text::testing::pattern_value(1, 0, 10);
        assert_eq!(image.get_pixel(0, 10).0, [v, v, v]);

        let _ = std::fs::remove_file(&path);
        unsafe {
            assert_eq!(glyphport_save_glyph_bitmap(std::ptr::null(), c_path.as_ptr()), Status::NullArgument);
            glyphport_free_glyph(&mut glyph);
        }
        glyphport_dispose_font(handle);
    }

    #[test]
    fn test_panic_in_one_font_leaves_others_working() {
        let panicking = face_handle(MockFace::monospace().with_panic('X'));
        let healthy = mock_handle();
        let mut extent = TextExtent::default();

        unsafe {
            assert_eq!(glyphport_measure_string(panicking, b"X".as_ptr(), 1, &mut extent), Status::Panic);
            assert!(last_error().contains("panicked"));
            assert_eq!(glyphport_measure_string(healthy, b"AB".as_ptr(), 2, &mut extent), Status::Ok);
            assert_eq!(glyphport_measure_string(panicking, b"AB".as_ptr(), 2, &mut extent), Status::Ok);
        }
        assert_eq!(extent.width, 16);
        assert_eq!(glyphport_dispose_font(panicking), Status::Ok);
        assert_eq!(glyphport_dispose_font(healthy), Status::Ok);
    }

    #[test]
    fn test_huge_advances_saturate_width() {
        let face = MockFace::new(16).with_glyph('A', MockGlyph::new(1, 1_500_000_000));
        let handle = face_handle(face);
        let mut extent = TextExtent::default();
        let status = unsafe { glyphport_measure_string(handle, b"AA".as_ptr(), 2, &mut extent) };
        assert_eq!(status, Status::Ok);
        assert_eq!(extent.width, i32::MAX);
        assert_eq!(glyphport_dispose_font(handle), Status::Ok);
    }
}
