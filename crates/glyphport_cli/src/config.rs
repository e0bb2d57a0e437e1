//! `glyphport.toml` handling
//!
//! ```toml
//! [raster]
//! hinting = true
//! measure_mode = "metrics"   # or "render"
//!
//! [defaults]
//! pixel_size = 16
//! color = "000000"
//! ```

use anyhow::{Context, Result};
use glyphport_text::{RasterConfig, Rgb};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "glyphport.toml";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GlyphportConfig {
    #[serde(default)]
    pub raster: RasterConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Fallbacks for options not given on the command line
#[derive(Debug, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,
    /// Text tint as `RRGGBB`
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_pixel_size() -> u32 {
    16
}

fn default_color() -> String {
    "000000".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            pixel_size: default_pixel_size(),
            color: default_color(),
        }
    }
}

impl GlyphportConfig {
    /// Load `path`, or defaults when the implicit config file is absent
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !path.exists() {
            if explicit {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: GlyphportConfig = toml::from_str(content)?;
        config.default_color()?;
        Ok(config)
    }

    /// The configured tint
    pub fn default_color(&self) -> Result<Rgb> {
        parse_color(&self.defaults.color)
    }
}

pub fn parse_color(hex: &str) -> Result<Rgb> {
    Rgb::from_hex(hex).with_context(|| format!("Invalid color '{}', expected RRGGBB", hex))
}
