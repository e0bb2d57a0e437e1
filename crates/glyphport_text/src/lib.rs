//! Glyph measurement and rasterization for embedding hosts
//!
//! This crate provides:
//! - Face loading through an explicit [`Engine`] context (TTF/OTF via ttf-parser)
//! - Glyph rasterization to coverage bitmaps (swash)
//! - Coverage to packed RGBA conversion with signed-pitch row handling
//! - String measurement with kerning
//! - Single-line text composition into tinted RGBA bitmaps
//! - A diagnostic 32-bit BMP writer

pub mod bitmap;
pub mod bmp;
pub mod compose;
pub mod config;
pub mod engine;
pub mod fixed;
pub mod font;
pub mod measure;
pub mod rasterizer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bitmap::{CoverageBitmap, GlyphBitmap, Rgb, TextBitmap};
pub use config::{MeasureMode, RasterConfig};
pub use engine::{Engine, FaceBackend, GlyphIndex, GlyphLoadError, SizeMetrics, SlotMetrics, RenderedSlot};
pub use font::Font;
pub use measure::MeasureResult;
pub use rasterizer::SwashFace;

use std::path::PathBuf;
use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Rasterization engine unavailable: {0}")]
    EngineInit(String),

    #[error("Failed to load font {path:?}: {reason}")]
    FaceLoad { path: PathBuf, reason: String },

    #[error("Invalid pixel size: {0}")]
    InvalidPixelSize(u32),

    #[error("Glyph not found for codepoint: {0:?}")]
    GlyphNotFound(char),

    #[error("Failed to render glyph for {codepoint:?}")]
    RenderFailed {
        codepoint: char,
        #[source]
        source: GlyphLoadError,
    },

    #[error("Coverage bitmap is shorter than its descriptor (row {row}, width {width}, pitch {pitch})")]
    MalformedBitmap { row: u32, width: u32, pitch: i32 },

    #[error("Failed to allocate {bytes} bytes for a bitmap")]
    Allocation { bytes: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextError>;
