//! Face backend over ttf-parser and swash
//!
//! ttf-parser reads the face-wide tables once at load time (names, vertical
//! extents, kern). Per-glyph work goes through swash: cmap and advances from
//! its metrics proxies, and the hinted outline from its scaler. Glyph metrics
//! and coverage are both taken from the grid-fitted box of that one hinted
//! outline, so measuring with or without rasterizing gives the same numbers.

use crate::bitmap::CoverageBitmap;
use crate::config::RasterConfig;
use crate::engine::{FaceBackend, GlyphIndex, GlyphLoadError, RenderedSlot, SizeMetrics, SlotMetrics};
use crate::fixed;
use rustc_hash::FxHashMap;
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Mask, Origin, Scratch, Vector};
use swash::{CacheKey, FontRef};
use ttf_parser::GlyphId;

/// A parsed font face rendered through swash
pub struct SwashFace {
    /// Raw font data
    data: Vec<u8>,
    /// Offset of the table directory inside `data` (non-zero for TTC members)
    offset: u32,
    /// Swash cache identity of this face
    key: CacheKey,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    glyph_count: u16,
    family_name: Option<String>,
    pixel_size: u32,
    hinting: bool,
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
    /// Reusable rasterizer buffers
    scratch: Scratch,
    /// char -> glyph id, including misses (0)
    index_cache: FxHashMap<char, u16>,
}

/// Whole-pixel box of a scaled outline, y up from the baseline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PixelBox {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl PixelBox {
    fn width(&self) -> u32 {
        (self.x1 as i64 - self.x0 as i64).max(0) as u32
    }

    fn height(&self) -> u32 {
        (self.y1 as i64 - self.y0 as i64).max(0) as u32
    }

    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl SwashFace {
    /// Parse a face from raw TTF/OTF/TTC data
    pub fn from_data(data: Vec<u8>, config: &RasterConfig) -> Result<Self, String> {
        let face_index = config.face_index;

        let face = ttf_parser::Face::parse(&data, face_index).map_err(|e| format!("{}", e))?;
        let font = FontRef::from_index(&data, face_index as usize)
            .ok_or_else(|| "face is not supported by the rasterizer".to_string())?;
        if face.units_per_em() == 0 {
            return Err("face reports zero units per em".to_string());
        }

        let family_name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::FAMILY)
            .find_map(|n| n.to_string());

        let (offset, key) = (font.offset, font.key);
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let line_gap = face.line_gap();
        let glyph_count = face.number_of_glyphs();

        Ok(Self {
            data,
            offset,
            key,
            units_per_em,
            ascender,
            descender,
            line_gap,
            glyph_count,
            family_name,
            pixel_size: 0,
            hinting: config.hinting,
            scale_context: ScaleContext::new(),
            scratch: Scratch::new(),
            index_cache: FxHashMap::default(),
        })
    }

    /// Transient swash reference; builds no new cache key
    fn font_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    /// Font units to pixels at the current size
    fn scale(&self) -> f32 {
        self.pixel_size as f32 / self.units_per_em as f32
    }

    fn glyph_id(&self, glyph: GlyphIndex) -> Result<u16, GlyphLoadError> {
        u16::try_from(glyph)
            .ok()
            .filter(|&id| id < self.glyph_count)
            .ok_or(GlyphLoadError::OutOfRange(glyph))
    }

    /// Rounded linear advance in 26.6
    fn advance(&self, id: u16) -> i64 {
        let advance = self
            .font_ref()
            .glyph_metrics(&[])
            .scale(self.pixel_size as f32)
            .advance_width(id);
        fixed::pix_round(fixed::round_26_6(advance))
    }

    /// Scale one glyph and take its metrics, plus coverage when `rasterize`
    ///
    /// Outline faces report the grid-fitted box of the hinted outline, and
    /// coverage is rendered into exactly that box. Bitmap-only faces report
    /// the placement of the best-fitting strike.
    fn scale_glyph(&mut self, glyph: GlyphIndex, rasterize: bool) -> Result<RenderedSlot, GlyphLoadError> {
        let id = self.glyph_id(glyph)?;
        let advance_x = self.advance(id);

        let font = FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        };
        let mut scaler = self
            .scale_context
            .builder(font)
            .size(self.pixel_size as f32)
            .hint(self.hinting)
            .build();

        if !scaler.has_outlines() {
            let mut render = Render::new(&[Source::Bitmap(StrikeWith::BestFit)]);
            render.format(Format::Alpha);
            let Some(image) = render.render(&mut scaler, id) else {
                return Ok(RenderedSlot {
                    metrics: SlotMetrics {
                        advance_x,
                        ..SlotMetrics::default()
                    },
                    bitmap: CoverageBitmap::default(),
                });
            };
            if !matches!(image.content, Content::Mask) {
                return Err(GlyphLoadError::NotCoverage(glyph));
            }
            let placement = image.placement;
            let bbox = PixelBox {
                x0: placement.left,
                y0: placement.top - placement.height as i32,
                x1: placement.left + placement.width as i32,
                y1: placement.top,
            };
            let bitmap = if bbox.is_empty() || !rasterize {
                CoverageBitmap::default()
            } else {
                CoverageBitmap::packed(placement.width, placement.height, image.data)
            };
            return Ok(RenderedSlot {
                metrics: box_metrics(bbox, advance_x),
                bitmap,
            });
        }

        // Glyphs without contours (space) come back empty or not at all
        let outline = scaler.scale_outline(id);
        let bbox = match &outline {
            Some(outline) => {
                let bounds = outline.bounds();
                if bounds.is_empty() {
                    PixelBox::default()
                } else {
                    PixelBox {
                        x0: bounds.min.x.floor() as i32,
                        y0: bounds.min.y.floor() as i32,
                        x1: bounds.max.x.ceil() as i32,
                        y1: bounds.max.y.ceil() as i32,
                    }
                }
            }
            None => PixelBox::default(),
        };
        let metrics = box_metrics(bbox, advance_x);

        let bitmap = match outline {
            Some(outline) if rasterize && !bbox.is_empty() => {
                let (width, height) = (bbox.width(), bbox.height());
                let (coverage, _) = Mask::with_scratch(outline.path(), &mut self.scratch)
                    .format(Format::Alpha)
                    .origin(Origin::BottomLeft)
                    .offset(Vector::new(-bbox.x0 as f32, -bbox.y0 as f32))
                    .size(width, height)
                    .render();
                CoverageBitmap::packed(width, height, coverage)
            }
            _ => CoverageBitmap::default(),
        };

        Ok(RenderedSlot { metrics, bitmap })
    }
}

/// Slot metrics for a pixel box; an empty box has zero extents
fn box_metrics(bbox: PixelBox, advance_x: i64) -> SlotMetrics {
    if bbox.is_empty() {
        return SlotMetrics {
            advance_x,
            ..SlotMetrics::default()
        };
    }
    SlotMetrics {
        width: fixed::from_px(bbox.width() as i32),
        height: fixed::from_px(bbox.height() as i32),
        hori_bearing_x: fixed::from_px(bbox.x0),
        hori_bearing_y: fixed::from_px(bbox.y1),
        advance_x,
    }
}

impl FaceBackend for SwashFace {
    fn set_pixel_size(&mut self, pixel_size: u32) {
        self.pixel_size = pixel_size;
    }

    fn size_metrics(&self) -> SizeMetrics {
        let scale = self.scale();
        let ascender = fixed::ceil_26_6(self.ascender as f32 * scale);
        let descender = fixed::floor_26_6(self.descender as f32 * scale);
        let line_gap = self.line_gap as f32 * scale;
        SizeMetrics {
            ascender,
            descender,
            height: fixed::pix_round(ascender - descender + fixed::round_26_6(line_gap)),
        }
    }

    fn char_index(&mut self, c: char) -> GlyphIndex {
        if let Some(&id) = self.index_cache.get(&c) {
            return id as GlyphIndex;
        }
        let id = self.font_ref().charmap().map(c);
        self.index_cache.insert(c, id);
        id as GlyphIndex
    }

    fn load_metrics(&mut self, glyph: GlyphIndex) -> Result<SlotMetrics, GlyphLoadError> {
        self.scale_glyph(glyph, false).map(|slot| slot.metrics)
    }

    fn render(&mut self, glyph: GlyphIndex) -> Result<RenderedSlot, GlyphLoadError> {
        self.scale_glyph(glyph, true)
    }

    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> i64 {
        let (Ok(left), Ok(right)) = (self.glyph_id(left), self.glyph_id(right)) else {
            return 0;
        };
        let Some(kern) = self
            .font_ref()
            .table(swash::tag_from_bytes(b"kern"))
            .and_then(ttf_parser::kern::Table::parse)
        else {
            return 0;
        };

        for subtable in kern.subtables {
            if !subtable.horizontal || subtable.variable {
                continue;
            }
            if let Some(k) = subtable.glyphs_kerning(GlyphId(left), GlyphId(right)) {
                return fixed::pix_round(fixed::round_26_6(k as f32 * self.scale()));
            }
        }
        0
    }

    fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    fn glyph_count(&self) -> u32 {
        self.glyph_count as u32
    }
}

impl std::fmt::Debug for SwashFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashFace")
            .field("family_name", &self.family_name)
            .field("offset", &self.offset)
            .field("glyph_count", &self.glyph_count)
            .field("pixel_size", &self.pixel_size)
            .finish()
    }
}
