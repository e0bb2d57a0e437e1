//! Rasterization settings shared by every face an [`Engine`](crate::Engine) opens

use serde::{Deserialize, Serialize};

/// How glyphs are loaded while measuring a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureMode {
    /// Load metrics only, no coverage bitmap is produced
    #[default]
    Metrics,
    /// Fully rasterize every glyph and discard the bitmap
    Render,
}

/// Engine-wide rasterization settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Face index inside the font file (TTC collections)
    pub face_index: u32,
    /// Apply the outline hinter when rendering coverage bitmaps
    pub hinting: bool,
    /// Glyph loading used by string measurement
    pub measure_mode: MeasureMode,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            face_index: 0,
            hinting: true,
            measure_mode: MeasureMode::Metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RasterConfig = toml::from_str("measure_mode = \"render\"").unwrap();
        assert_eq!(config.measure_mode, MeasureMode::Render);
        assert_eq!(config.face_index, 0);
        assert!(config.hinting);
    }

    #[test]
    fn test_empty_config() {
        let config: RasterConfig = toml::from_str("").unwrap();
        assert_eq!(config, RasterConfig::default());
    }
}
