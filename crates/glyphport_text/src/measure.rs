//! Single-line string measurement
//!
//! Walks the code points of a string, adding kerning and advances and
//! tracking the tallest ascent and deepest descent among the glyphs.

use crate::config::MeasureMode;
use crate::engine::GlyphIndex;
use crate::fixed;
use crate::font::Font;

/// Bounds of a measured string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasureResult {
    /// Sum of advances and kerning, in whole pixels (saturating)
    pub width: i32,
    /// Max ascent plus max descent, in whole pixels
    pub height: i32,
    /// Max ascent among the glyphs, in whole pixels
    pub baseline_height: i32,
    /// Code points whose glyph failed to load and were left out
    pub skipped: usize,
}

impl Font {
    /// Measure `text` as a single line
    ///
    /// Glyphs that fail to load add no advance, never become the kerning
    /// partner of the next glyph, and are counted in
    /// [`MeasureResult::skipped`]. Unmapped code points measure as
    /// the face's `.notdef` glyph.
    pub fn measure_string(&mut self, text: &str) -> MeasureResult {
        self.measure_chars(text.chars())
    }

    /// Measure a sequence of code points as a single line
    pub fn measure_chars(&mut self, text: impl IntoIterator<Item = char>) -> MeasureResult {
        let mode = self.measure_mode();
        let face = self.face_mut();

        let mut total_width: i64 = 0;
        let mut max_ascent: i64 = 0;
        let mut max_descent: i64 = 0;
        let mut baseline_height: i32 = 0;
        let mut skipped = 0;
        let mut prev: Option<GlyphIndex> = None;

        for c in text {
            let index = face.char_index(c);

            if let Some(prev) = prev {
                if index != 0 {
                    total_width += fixed::floor_px(face.kerning(prev, index)) as i64;
                }
            }

            let loaded = match mode {
                MeasureMode::Metrics => face.load_metrics(index),
                MeasureMode::Render => face.render(index).map(|slot| slot.metrics),
            };
            let metrics = match loaded {
                Ok(metrics) => metrics,
                Err(e) => {
                    tracing::debug!("Skipping {:?} while measuring: {}", c, e);
                    skipped += 1;
                    continue;
                }
            };

            total_width += fixed::floor_px(metrics.advance_x) as i64;
            max_ascent = max_ascent.max(metrics.hori_bearing_y);
            max_descent = max_descent.max(metrics.height - metrics.hori_bearing_y);
            baseline_height = baseline_height.max(fixed::floor_px(metrics.hori_bearing_y));
            prev = Some(index);
        }

        MeasureResult {
            width: total_width.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            height: fixed::floor_px(max_ascent + max_descent),
            baseline_height,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MeasureMode;
    use crate::engine::{Engine, SlotMetrics};
    use crate::font::Font;
    use crate::testing::{MockFace, MockGlyph};
    use crate::MeasureResult;
    use std::sync::atomic::Ordering;

    fn open(face: MockFace) -> Font {
        Engine::default().open_backend(Box::new(face), 16).unwrap()
    }

    /// 'A' (index 1): advance 10, bearing_y 12, height 12
    /// 'V' (index 2): advance 9,  bearing_y 12, height 12
    /// 'g' (index 3): advance 8,  bearing_y 7,  height 10
    fn kerned() -> MockFace {
        MockFace::new(16)
            .with_extents(14 * 64, -4 * 64)
            .with_glyph('A', MockGlyph::new(1, 10).with_box(0, 12, 10, 12))
            .with_glyph('V', MockGlyph::new(2, 9).with_box(0, 12, 9, 12))
            .with_glyph('g', MockGlyph::new(3, 8).with_box(1, 7, 6, 10))
            .with_kerning('A', 'V', -2)
    }

    #[test]
    fn test_empty_string() {
        let mut font = open(MockFace::monospace());
        assert_eq!(font.measure_string(""), MeasureResult::default());
    }

    #[test]
    fn test_single_glyph_width_is_its_advance() {
        let mut font = open(kerned());
        let m = font.measure_string("A");
        assert_eq!(m.width, 10);
        assert_eq!(m.height, 12);
        assert_eq!(m.baseline_height, 12);
    }

    #[test]
    fn test_monospace_widths_add_up() {
        let mut font = open(MockFace::monospace());
        let a = font.measure_string("Hello").width;
        let b = font.measure_string("World").width;
        assert_eq!(font.measure_string("HelloWorld").width, a + b);
        assert_eq!(a, 40);
    }

    #[test]
    fn test_kerning_applied_between_pairs() {
        let mut font = open(kerned());
        let a = font.measure_string("A").width;
        let v = font.measure_string("V").width;
        assert_eq!(font.measure_string("AV").width, a + v - 2);
        // Kerning is directional
        assert_eq!(font.measure_string("VA").width, a + v);
    }

    #[test]
    fn test_height_combines_max_ascent_and_descent() {
        let mut font = open(kerned());
        let m = font.measure_string("Ag");
        // ascent 12 from 'A', descent 10 - 7 = 3 from 'g'
        assert_eq!(m.height, 15);
        assert_eq!(m.baseline_height, 12);
    }

    #[test]
    fn test_height_uses_unshifted_fixed_point() {
        // ascent 7.5px, descent 2.75px: 10.25px floors to 10, not 7 + 2
        let glyph = MockGlyph::new(1, 8).with_metrics(SlotMetrics {
            width: 256,
            height: 656,
            hori_bearing_x: 0,
            hori_bearing_y: 480,
            advance_x: 512,
        });
        let mut font = open(MockFace::new(16).with_glyph('a', glyph));
        let m = font.measure_string("a");
        assert_eq!(m.height, 10);
        assert_eq!(m.baseline_height, 7);
    }

    #[test]
    fn test_broken_glyph_is_skipped() {
        let mut font = open(kerned().with_broken('V'));
        let m = font.measure_string("AVA");
        // The (A, V) kerning lands before the load of 'V' fails
        assert_eq!(m.width, 10 - 2 + 10);
        assert_eq!(m.skipped, 1);
    }

    #[test]
    fn test_skipped_glyph_does_not_break_kerning_chain() {
        // The broken 'W' never becomes the previous glyph, so 'V' still
        // kerns against 'A'
        let face = kerned().with_glyph('W', MockGlyph::new(4, 9)).with_broken('W');
        let mut font = open(face);
        let m = font.measure_string("AWV");
        assert_eq!(m.width, 10 + 9 - 2);
        assert_eq!(m.skipped, 1);
    }

    #[test]
    fn test_unmapped_codepoint_measures_as_notdef() {
        let mut font = open(MockFace::monospace());
        assert_eq!(font.measure_string("A\u{4E2D}").width, 16);
    }

    #[test]
    fn test_unmapped_codepoint_without_notdef_is_skipped() {
        let mut font = open(kerned());
        let m = font.measure_string("A\u{4E2D}");
        assert_eq!(m.width, 10);
        assert_eq!(m.skipped, 1);
    }

    #[test]
    fn test_metrics_mode_never_renders() {
        let face = MockFace::monospace();
        let renders = face.render_counter();
        let mut font = open(face);

        font.measure_string("metrics only");
        assert_eq!(renders.load(Ordering::Relaxed), 0);

        font.set_measure_mode(MeasureMode::Render);
        let rendered = font.measure_string("metrics only");
        assert_eq!(renders.load(Ordering::Relaxed), 12);

        font.set_measure_mode(MeasureMode::Metrics);
        assert_eq!(font.measure_string("metrics only"), rendered);
    }

    #[test]
    fn test_measurement_follows_font_size() {
        let mut font = open(MockFace::monospace());
        let small = font.measure_string("abc");
        font.set_font_size(32).unwrap();
        let large = font.measure_string("abc");
        assert_eq!(large.width, small.width * 2);
        assert_eq!(large.height, small.height * 2);
    }

    #[test]
    fn test_width_saturates_instead_of_overflowing() {
        let face = MockFace::new(16).with_glyph('A', MockGlyph::new(1, 1_500_000_000));
        let mut font = open(face);
        assert_eq!(font.measure_string("A").width, 1_500_000_000);
        assert_eq!(font.measure_string("AAA").width, i32::MAX);
    }
}
