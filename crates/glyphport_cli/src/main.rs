//! Glyphport CLI
//!
//! Measure strings and dump glyphs or text lines from a font file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glyphport_text::{bmp, Engine, Font};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{GlyphportConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "glyphport")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Glyph measurement and rasterization tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure a string as a single line
    Measure {
        /// Font file (TTF/OTF)
        font: PathBuf,

        /// Text to measure
        text: String,

        /// Pixel size
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// Render one character to a BMP
    Render {
        /// Font file (TTF/OTF)
        font: PathBuf,

        /// Character to render
        char: String,

        /// Pixel size
        #[arg(short, long)]
        size: Option<u32>,

        /// Output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a line of text to a BMP
    Text {
        /// Font file (TTF/OTF)
        font: PathBuf,

        /// Text to render
        text: String,

        /// Pixel size
        #[arg(short, long)]
        size: Option<u32>,

        /// Text color as RRGGBB
        #[arg(short, long)]
        color: Option<String>,

        /// Output path
        #[arg(short, long, default_value = "text.bmp")]
        output: PathBuf,
    },

    /// Show face metrics
    Info {
        /// Font file (TTF/OTF)
        font: PathBuf,

        /// Pixel size
        #[arg(short, long)]
        size: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => GlyphportConfig::load(path, true)?,
        None => GlyphportConfig::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
    };
    debug!("Using {:?}", config);

    let engine = Engine::new(config.raster.clone());

    match cli.command {
        Commands::Measure { font, text, size } => cmd_measure(&engine, &config, &font, &text, size),

        Commands::Render {
            font,
            char,
            size,
            output,
        } => cmd_render(&engine, &config, &font, &char, size, output),

        Commands::Text {
            font,
            text,
            size,
            color,
            output,
        } => cmd_text(&engine, &config, &font, &text, size, color.as_deref(), &output),

        Commands::Info { font, size } => cmd_info(&engine, &config, &font, size),
    }
}

fn open_font(engine: &Engine, config: &GlyphportConfig, path: &Path, size: Option<u32>) -> Result<Font> {
    let size = size.unwrap_or(config.defaults.pixel_size);
    engine
        .open(path, size)
        .with_context(|| format!("Failed to open {} at {}px", path.display(), size))
}

fn cmd_measure(
    engine: &Engine,
    config: &GlyphportConfig,
    path: &Path,
    text: &str,
    size: Option<u32>,
) -> Result<()> {
    let mut font = open_font(engine, config, path, size)?;
    let m = font.measure_string(text);

    if m.skipped > 0 {
        warn!("{} characters failed to load and were skipped", m.skipped);
    }
    println!("width:    {}", m.width);
    println!("height:   {}", m.height);
    println!("baseline: {}", m.baseline_height);
    Ok(())
}

fn cmd_render(
    engine: &Engine,
    config: &GlyphportConfig,
    path: &Path,
    text: &str,
    size: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut chars = text.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        anyhow::bail!("Expected exactly one character, got '{}'", text);
    };

    let mut font = open_font(engine, config, path, size)?;
    let glyph = font
        .render_glyph(c)
        .with_context(|| format!("Failed to render {:?}", c))?;

    println!(
        "{:?}: {}x{} bearing ({}, {}) advance {}",
        c, glyph.width, glyph.height, glyph.bearing_x, glyph.bearing_y, glyph.advance
    );
    if glyph.buffer.is_empty() {
        info!("Glyph has no pixels, nothing written");
        return Ok(());
    }

    let output = output.unwrap_or_else(|| PathBuf::from(format!("glyph_U+{:04X}.bmp", c as u32)));
    bmp::save_rgba(glyph.width, glyph.height, &glyph.buffer, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

fn cmd_text(
    engine: &Engine,
    config: &GlyphportConfig,
    path: &Path,
    text: &str,
    size: Option<u32>,
    color: Option<&str>,
    output: &Path,
) -> Result<()> {
    let color = match color {
        Some(hex) => config::parse_color(hex)?,
        None => config.default_color()?,
    };

    let mut font = open_font(engine, config, path, size)?;
    let bitmap = font.render_text(text, color)?;

    println!("{}x{} baseline {}", bitmap.width, bitmap.height, bitmap.baseline);
    if bitmap.buffer.is_empty() {
        info!("Text has no pixels, nothing written");
        return Ok(());
    }

    bitmap
        .save_bmp(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

fn cmd_info(engine: &Engine, config: &GlyphportConfig, path: &Path, size: Option<u32>) -> Result<()> {
    let font = open_font(engine, config, path, size)?;

    println!("Font: {}", path.display());
    println!("  Family:      {}", font.family_name().unwrap_or("(unnamed)"));
    println!("  Glyphs:      {}", font.glyph_count());
    println!("  Pixel size:  {}", font.pixel_size());
    println!("  Ascender:    {}", font.ascender());
    println!("  Descender:   {}", font.descender());
    println!("  Line height: {}", font.line_height());
    println!("  Measuring:   {:?}", font.measure_mode());
    Ok(())
}
