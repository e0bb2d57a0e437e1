//! Rasterization engine context and the face backend seam
//!
//! [`FaceBackend`] is the whole surface the rest of the crate needs from a
//! rasterizer: pixel-size configuration, char to glyph lookup, metric
//! loading, coverage rendering, kerning and size metrics. All metric values
//! crossing this trait are 26.6 fixed point.
//!
//! [`Engine`] is the explicit context that opens faces. A process-wide
//! instance is available through [`Engine::global`]; it is created at most
//! once, even under concurrent first use, and can be closed with
//! [`Engine::shutdown`].

use crate::bitmap::CoverageBitmap;
use crate::config::RasterConfig;
use crate::font::Font;
use crate::rasterizer::SwashFace;
use crate::{Result, TextError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;
use thiserror::Error;

/// Glyph index inside a face. Index 0 means "no mapping".
pub type GlyphIndex = u32;

/// Global engine singleton
static GLOBAL_ENGINE: OnceLock<Engine> = OnceLock::new();

/// Per-size face metrics in 26.6
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeMetrics {
    /// Distance from baseline to the top of the face (positive)
    pub ascender: i64,
    /// Distance from baseline to the bottom of the face (typically negative)
    pub descender: i64,
    /// Baseline-to-baseline distance
    pub height: i64,
}

/// Metrics of one loaded glyph in 26.6
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotMetrics {
    pub width: i64,
    pub height: i64,
    pub hori_bearing_x: i64,
    pub hori_bearing_y: i64,
    pub advance_x: i64,
}

/// A rendered glyph: its metrics plus the coverage bitmap
#[derive(Debug, Clone)]
pub struct RenderedSlot {
    pub metrics: SlotMetrics,
    pub bitmap: CoverageBitmap,
}

/// Errors a backend reports while loading a single glyph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlyphLoadError {
    #[error("glyph index {0} is out of range for this face")]
    OutOfRange(GlyphIndex),

    #[error("font data can no longer be parsed")]
    FaceUnavailable,

    #[error("glyph {0} produced a non-coverage image")]
    NotCoverage(GlyphIndex),

    #[error("glyph {0} could not be loaded")]
    Broken(GlyphIndex),
}

/// A loaded font face, as seen through the rasterizer
///
/// Implementations keep their own per-face state (current size, scaler
/// caches). A backend is used from one thread at a time.
pub trait FaceBackend: Send {
    /// Set the raster size to `pixel_size` pixels square
    fn set_pixel_size(&mut self, pixel_size: u32);

    /// Ascender/descender/height for the current size
    fn size_metrics(&self) -> SizeMetrics;

    /// Map a character to a glyph index; 0 if the face has no mapping
    fn char_index(&mut self, c: char) -> GlyphIndex;

    /// Load a glyph's metrics without rasterizing it
    fn load_metrics(&mut self, glyph: GlyphIndex) -> std::result::Result<SlotMetrics, GlyphLoadError>;

    /// Load and rasterize a glyph into an 8-bit coverage bitmap
    fn render(&mut self, glyph: GlyphIndex) -> std::result::Result<RenderedSlot, GlyphLoadError>;

    /// Horizontal kerning between two glyphs in 26.6, rounded to whole pixels
    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> i64;

    /// Family name, if the face carries one
    fn family_name(&self) -> Option<&str> {
        None
    }

    /// Number of glyphs in the face
    fn glyph_count(&self) -> u32;
}

/// Rasterization engine context
#[derive(Debug)]
pub struct Engine {
    config: RasterConfig,
    running: AtomicBool,
    faces_opened: AtomicUsize,
}

impl Engine {
    /// Create an engine with explicit settings
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(true),
            faces_opened: AtomicUsize::new(0),
        }
    }

    /// Initialize the process-wide engine with the given settings
    ///
    /// Only the first call installs `config`; later calls return the existing
    /// engine, restarting it if it was shut down.
    pub fn init_global(config: RasterConfig) -> &'static Engine {
        let mut installed = false;
        let engine = GLOBAL_ENGINE.get_or_init(|| {
            installed = true;
            Engine::new(config)
        });
        if installed {
            tracing::debug!("Rasterization engine initialized: {:?}", engine.config);
        } else {
            tracing::debug!("Rasterization engine already initialized");
            engine.running.store(true, Ordering::Release);
        }
        engine
    }

    /// Get the process-wide engine, creating it with default settings on first use
    pub fn global() -> &'static Engine {
        GLOBAL_ENGINE.get_or_init(|| {
            tracing::debug!("Rasterization engine initialized with defaults");
            Engine::new(RasterConfig::default())
        })
    }

    /// Close the engine; opening faces fails until [`Engine::restart`]
    ///
    /// Fonts already opened stay usable, they own their face data.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::debug!(
                "Rasterization engine shut down after opening {} faces",
                self.faces_opened.load(Ordering::Relaxed)
            );
        }
    }

    /// Reopen a shut down engine
    pub fn restart(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Whether the engine currently accepts new faces
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Engine settings
    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Number of faces opened over the engine's lifetime
    pub fn faces_opened(&self) -> usize {
        self.faces_opened.load(Ordering::Relaxed)
    }

    /// Load the face at `path` and size it to `pixel_size`
    pub fn open(&self, path: &Path, pixel_size: u32) -> Result<Font> {
        self.ensure_running()?;
        check_pixel_size(pixel_size)?;

        let data = std::fs::read(path).map_err(|e| TextError::FaceLoad {
            path: path.to_path_buf(),
            reason: format!("Failed to read file: {}", e),
        })?;
        let face = SwashFace::from_data(data, &self.config).map_err(|reason| TextError::FaceLoad {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::debug!("Loaded face {:?} from {}", face.family_name(), path.display());
        self.open_backend(Box::new(face), pixel_size)
    }

    /// Load a face from an in-memory font blob
    pub fn open_memory(&self, data: Vec<u8>, pixel_size: u32) -> Result<Font> {
        self.ensure_running()?;
        check_pixel_size(pixel_size)?;

        let face = SwashFace::from_data(data, &self.config).map_err(|reason| TextError::FaceLoad {
            path: "<memory>".into(),
            reason,
        })?;
        self.open_backend(Box::new(face), pixel_size)
    }

    /// Wrap an already loaded backend into a sized [`Font`]
    pub fn open_backend(&self, face: Box<dyn FaceBackend>, pixel_size: u32) -> Result<Font> {
        self.ensure_running()?;
        check_pixel_size(pixel_size)?;

        let font = Font::new(face, pixel_size, self.config.measure_mode);
        self.faces_opened.fetch_add(1, Ordering::Relaxed);
        Ok(font)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(TextError::EngineInit("engine has been shut down".to_string()))
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(RasterConfig::default())
    }
}

pub(crate) fn check_pixel_size(pixel_size: u32) -> Result<()> {
    // Larger sizes overflow 26.6 metric arithmetic in the scaler
    if pixel_size == 0 || pixel_size > u16::MAX as u32 {
        Err(TextError::InvalidPixelSize(pixel_size))
    } else {
        Ok(())
    }
}
