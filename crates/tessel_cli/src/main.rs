//! Tessel CLI
//!
//! Lays out one piece of text against a dynamic glyph atlas and prints a
//! JSON summary. Fonts come from a file, the system font database, or a
//! built-in synthetic face for runs without any fonts installed.

mod config;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tessel_text::{
    FontAsset, FontId, FontRegistry, RenderMode, SwashRasterizer, SyntheticFace,
    SyntheticRasterizer, TextContext, TextLayoutEngine,
};

use config::TesselConfig;
use summary::Summary;

/// Lay out text against a dynamic glyph atlas
#[derive(Parser, Debug)]
#[command(name = "tessel")]
#[command(about = "Lay out text against a dynamic glyph atlas")]
#[command(version)]
struct Args {
    /// Text to lay out (overrides the config)
    text: Option<String>,

    /// Config file or directory holding tessel.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Font family (overrides the config)
    #[arg(short, long)]
    font: Option<String>,

    /// Point size (overrides the config)
    #[arg(short, long)]
    size: Option<f32>,

    /// Box width (overrides the config)
    #[arg(long)]
    width: Option<f32>,

    /// Box height (overrides the config)
    #[arg(long)]
    height: Option<f32>,

    /// Use the built-in synthetic face instead of real fonts
    #[arg(long)]
    synthetic: bool,

    /// Write each atlas surface as <prefix>-<n>.png
    #[arg(long)]
    dump_atlas: Option<PathBuf>,

    /// Pretty-print the JSON summary
    #[arg(long)]
    pretty: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TesselConfig::load(path)?,
        None => TesselConfig::default(),
    };
    if let Some(text) = args.text {
        config.job.text = text;
    }
    if let Some(font) = args.font {
        config.job.font_family = Some(font);
        config.job.font_path = None;
    }
    if let Some(size) = args.size {
        config.job.font_size = size;
    }
    if args.width.is_some() {
        config.job.width = args.width;
    }
    if args.height.is_some() {
        config.job.height = args.height;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let mut ctx = TextContext::new(config.text.clone());
    let font = if args.synthetic {
        let asset = FontAsset::from_source(
            "Synthetic",
            Box::new(SyntheticRasterizer::new(demo_face())),
            &config.text.atlas,
        )?;
        ctx.add_font(asset)
    } else {
        load_fonts(&mut ctx, &config)?
    };

    let options = config.job.to_options(font)?;
    tracing::info!(
        "Laying out {} chars at {}pt",
        config.job.text.chars().count(),
        options.font_size
    );
    let result = TextLayoutEngine::new()
        .layout(&mut ctx, &config.job.text, &options)
        .context("Layout failed")?;

    let asset = ctx.font(font).context("Primary font disappeared")?;
    let summary = Summary::new(&result, asset);
    let json = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{}", json);

    if let Some(prefix) = &args.dump_atlas {
        dump_atlas(asset, prefix)?;
    }

    Ok(())
}

/// Load the primary font and any configured fallbacks
fn load_fonts(ctx: &mut TextContext, config: &TesselConfig) -> Result<FontId> {
    let atlas = &config.text.atlas;
    let mut registry = FontRegistry::new();

    let primary = if let Some(path) = &config.job.font_path {
        let rasterizer = SwashRasterizer::from_file(path, 0)
            .with_context(|| format!("Failed to open font {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("font")
            .to_string();
        FontAsset::from_source(&name, Box::new(rasterizer), atlas)?
    } else {
        let family = config
            .job
            .font_family
            .clone()
            .or_else(|| config.text.default_font_family.clone())
            .context("No font configured; set job.font_family, job.font_path or use --synthetic")?;
        registry
            .create_asset(&family, 400, false, atlas)
            .with_context(|| format!("Failed to load font '{}'", family))?
    };
    let font = ctx.add_font(primary);

    for family in &config.text.fallback_font_families {
        match registry.create_asset(family, 400, false, atlas) {
            Ok(asset) => {
                let id = ctx.add_font(asset);
                ctx.push_global_fallback(id);
                tracing::debug!("Fallback font '{}' loaded", family);
            }
            Err(err) => tracing::warn!("Skipping fallback font '{}': {}", family, err),
        }
    }

    Ok(font)
}

/// Printable ASCII with a few features to exercise
fn demo_face() -> SyntheticFace {
    let printable: String = ('!'..='~').collect();
    SyntheticFace::new("Synthetic")
        .with_glyphs(&printable, 550.0)
        .with_glyph(' ', 250.0)
        .with_glyph('\u{2026}', 800.0)
        .with_ligature("fi", 900.0)
        .with_kerning('A', 'V', -80.0)
}

fn dump_atlas(font: &FontAsset, prefix: &Path) -> Result<()> {
    for (index, surface) in font.atlas().surfaces().iter().enumerate() {
        let path = PathBuf::from(format!("{}-{}.png", prefix.display(), index));
        let (width, height) = (surface.width(), surface.height());
        let pixels = surface.pixels().to_vec();
        match surface.render_mode() {
            RenderMode::Alpha8 => image::GrayImage::from_raw(width, height, pixels)
                .context("Surface size does not match its pixels")?
                .save(&path),
            RenderMode::Rgba => image::RgbaImage::from_raw(width, height, pixels)
                .context("Surface size does not match its pixels")?
                .save(&path),
        }
        .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
    }
    Ok(())
}
