//! Table-driven face backend
//!
//! [`MockFace`] answers every [`FaceBackend`] call from tables built in code,
//! so measurement, kerning and pitch handling can be checked against exact
//! expected values without a font file. Metrics are given at a base pixel
//! size and scale linearly with the size set on the face.

use crate::bitmap::CoverageBitmap;
use crate::engine::{FaceBackend, GlyphIndex, GlyphLoadError, RenderedSlot, SizeMetrics, SlotMetrics};
use crate::fixed;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One glyph of a [`MockFace`]
#[derive(Debug, Clone)]
pub struct MockGlyph {
    index: GlyphIndex,
    metrics: SlotMetrics,
    coverage: CoverageBitmap,
}

impl MockGlyph {
    /// An outline-less glyph with the given index and advance (pixels)
    pub fn new(index: GlyphIndex, advance: i32) -> Self {
        Self {
            index,
            metrics: SlotMetrics {
                advance_x: fixed::from_px(advance),
                ..SlotMetrics::default()
            },
            coverage: CoverageBitmap::default(),
        }
    }

    /// Give the glyph a `width x height` box at the given bearings (pixels)
    ///
    /// The coverage is a deterministic non-zero pattern, tightly packed.
    pub fn with_box(mut self, bearing_x: i32, bearing_y: i32, width: u32, height: u32) -> Self {
        self.metrics.hori_bearing_x = fixed::from_px(bearing_x);
        self.metrics.hori_bearing_y = fixed::from_px(bearing_y);
        self.metrics.width = fixed::from_px(width as i32);
        self.metrics.height = fixed::from_px(height as i32);
        self.coverage = pattern(self.index, width, height, width as i32);
        self
    }

    /// Re-lay the coverage with a padded or bottom-up row stride
    pub fn with_pitch(mut self, pitch: i32) -> Self {
        assert!(
            pitch.unsigned_abs() >= self.coverage.width,
            "pitch must cover the row width"
        );
        self.coverage = pattern(self.index, self.coverage.width, self.coverage.rows, pitch);
        self
    }

    /// Override the 26.6 metrics, keeping the coverage
    pub fn with_metrics(mut self, metrics: SlotMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Coverage as the backend hands it out
    pub fn coverage(&self) -> &CoverageBitmap {
        &self.coverage
    }
}

/// Coverage at visual `(x, y)` of glyph `index`; never zero
pub fn pattern_value(index: GlyphIndex, x: u32, y: u32) -> u8 {
    ((x * 37 + y * 11 + index * 7) % 255 + 1) as u8
}

fn pattern(index: GlyphIndex, width: u32, rows: u32, pitch: i32) -> CoverageBitmap {
    let stride = pitch.unsigned_abs() as usize;
    let mut buffer = vec![0u8; stride * rows as usize];
    for y in 0..rows {
        let line = (if pitch >= 0 { y } else { rows - 1 - y }) as usize;
        for x in 0..width {
            buffer[line * stride + x as usize] = pattern_value(index, x, y);
        }
    }
    CoverageBitmap {
        width,
        rows,
        pitch,
        buffer,
    }
}

/// Face backend driven by in-memory tables
#[derive(Debug, Clone)]
pub struct MockFace {
    base_size: u32,
    pixel_size: u32,
    ascender: i64,
    descender: i64,
    cmap: FxHashMap<char, GlyphIndex>,
    glyphs: FxHashMap<GlyphIndex, MockGlyph>,
    kerning: FxHashMap<(GlyphIndex, GlyphIndex), i64>,
    broken: FxHashSet<GlyphIndex>,
    panicking: FxHashSet<GlyphIndex>,
    renders: Arc<AtomicUsize>,
}

impl MockFace {
    /// An empty face whose metrics are expressed at `base_size` pixels
    pub fn new(base_size: u32) -> Self {
        Self {
            base_size,
            pixel_size: base_size,
            ascender: 0,
            descender: 0,
            cmap: FxHashMap::default(),
            glyphs: FxHashMap::default(),
            kerning: FxHashMap::default(),
            broken: FxHashSet::default(),
            panicking: FxHashSet::default(),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A 16px monospace face: ASCII letters, digits and space, 8px advances
    ///
    /// Letters are 6x11 boxes sitting on the baseline, except `g j p q y`
    /// which drop 3px below it. Ascender 13px, descender 4px. Glyph 0 is a
    /// `.notdef` box with the same advance.
    pub fn monospace() -> Self {
        let mut face = Self::new(16).with_extents(13 * 64, -4 * 64);
        face.glyphs
            .insert(0, MockGlyph::new(0, 8).with_box(1, 11, 6, 11));

        let mut index = 1;
        for c in ('A'..='Z').chain('a'..='z').chain('0'..='9') {
            let bearing_y = if "gjpqy".contains(c) { 8 } else { 11 };
            face = face.with_glyph(c, MockGlyph::new(index, 8).with_box(1, bearing_y, 6, 11));
            index += 1;
        }
        face.with_glyph(' ', MockGlyph::new(index, 8))
    }

    /// Set ascender/descender in 26.6 at the base size
    pub fn with_extents(mut self, ascender: i64, descender: i64) -> Self {
        self.ascender = ascender;
        self.descender = descender;
        self
    }

    /// Map `c` to `glyph`
    pub fn with_glyph(mut self, c: char, glyph: MockGlyph) -> Self {
        self.cmap.insert(c, glyph.index);
        self.glyphs.insert(glyph.index, glyph);
        self
    }

    /// Kerning between two mapped characters, in whole pixels at the base size
    pub fn with_kerning(mut self, left: char, right: char, px: i32) -> Self {
        let pair = (self.cmap[&left], self.cmap[&right]);
        self.kerning.insert(pair, fixed::from_px(px));
        self
    }

    /// Keep `c` mapped but make every load of its glyph fail
    pub fn with_broken(mut self, c: char) -> Self {
        let index = self.cmap[&c];
        self.broken.insert(index);
        self
    }

    /// Keep `c` mapped but panic on every load of its glyph
    pub fn with_panic(mut self, c: char) -> Self {
        let index = self.cmap[&c];
        self.panicking.insert(index);
        self
    }

    /// Counter of `render` calls, shared with clones of this face
    pub fn render_counter(&self) -> Arc<AtomicUsize> {
        self.renders.clone()
    }

    fn scaled(&self, value: i64) -> i64 {
        value * self.pixel_size as i64 / self.base_size as i64
    }

    fn glyph(&self, glyph: GlyphIndex) -> Result<&MockGlyph, GlyphLoadError> {
        if self.panicking.contains(&glyph) {
            panic!("mock glyph {} panicked on load", glyph);
        }
        if self.broken.contains(&glyph) {
            return Err(GlyphLoadError::Broken(glyph));
        }
        self.glyphs.get(&glyph).ok_or(GlyphLoadError::OutOfRange(glyph))
    }
}

impl FaceBackend for MockFace {
    fn set_pixel_size(&mut self, pixel_size: u32) {
        self.pixel_size = pixel_size;
    }

    fn size_metrics(&self) -> SizeMetrics {
        let ascender = self.scaled(self.ascender);
        let descender = self.scaled(self.descender);
        SizeMetrics {
            ascender,
            descender,
            height: ascender - descender,
        }
    }

    fn char_index(&mut self, c: char) -> GlyphIndex {
        self.cmap.get(&c).copied().unwrap_or(0)
    }

    fn load_metrics(&mut self, glyph: GlyphIndex) -> Result<SlotMetrics, GlyphLoadError> {
        let metrics = self.glyph(glyph)?.metrics;
        Ok(SlotMetrics {
            width: self.scaled(metrics.width),
            height: self.scaled(metrics.height),
            hori_bearing_x: self.scaled(metrics.hori_bearing_x),
            hori_bearing_y: self.scaled(metrics.hori_bearing_y),
            advance_x: self.scaled(metrics.advance_x),
        })
    }

    fn render(&mut self, glyph: GlyphIndex) -> Result<RenderedSlot, GlyphLoadError> {
        self.renders.fetch_add(1, Ordering::Relaxed);
        let metrics = self.load_metrics(glyph)?;
        let bitmap = self.glyph(glyph)?.coverage.clone();
        Ok(RenderedSlot { metrics, bitmap })
    }

    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> i64 {
        self.kerning
            .get(&(left, right))
            .map(|&k| self.scaled(k))
            .unwrap_or(0)
    }

    fn family_name(&self) -> Option<&str> {
        Some("Mock")
    }

    fn glyph_count(&self) -> u32 {
        self.glyphs.len() as u32
    }
}
