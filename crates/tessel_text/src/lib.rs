//! Dynamic glyph atlas cache and text layout for Tessel
//!
//! This crate provides:
//! - Glyph atlas packing across growable bitmap surfaces
//! - Glyph/character tables with on-demand rasterization
//! - OpenType feature tables (ligatures, kerning, mark positioning)
//! - Code point resolution through font fallback chains
//! - Text layout (line breaking, justification, overflow, auto-size)
//!
//! # Ownership
//!
//! There are no global registries. A [`TextContext`] owns every font and
//! sprite asset plus the active [`TextSettings`]; layout and resolution take
//! it by reference:
//!
//! ```ignore
//! use tessel_text::{TextContext, TextLayoutEngine, LayoutOptions};
//!
//! let mut ctx = TextContext::default();
//! let font = ctx.add_font(asset);
//! let result = TextLayoutEngine::new().layout(&mut ctx, "Hello", &LayoutOptions::new(font))?;
//! ```

pub mod atlas;
pub mod context;
pub mod fallback;
pub mod features;
pub mod font_asset;
pub mod glyph;
pub mod layout;
pub mod rasterizer;
pub mod registry;
pub mod richtext;
pub mod settings;
pub mod sprite;
pub mod store;
pub mod swash_backend;
pub mod synthetic;
pub mod unicode;

pub use atlas::{AtlasSurface, GlyphAtlas, GlyphRect, PackingMode, RenderMode, UvRect};
pub use context::{FontId, SpriteId, TextContext};
pub use fallback::{Resolution, VisitedSet};
pub use features::{
    Anchor, FontFeatureTable, LigatureRecord, MarkAdjustmentRecord, PairAdjustmentRecord,
    ValueRecord,
};
pub use font_asset::{AddCharactersOutcome, AtlasPopulationMode, FontAsset};
pub use glyph::{
    AssetRef, Character, FaceInfo, FontStyles, FontWeight, Glyph, GlyphMetrics, TextElement,
    VariantKey,
};
pub use layout::{
    AutoSizeOptions, AutoSizeReport, CharacterInfo, Extents, HorizontalAlignment,
    LayoutDiagnostic, LayoutOptions, LayoutResult, LineInfo, Margins, MaterialReference,
    OverflowMode, PageInfo, Point, TextLayoutEngine, VerticalAlignment, WordInfo,
};
pub use rasterizer::{
    FeatureKind, FeatureRecords, GlyphFormat, GlyphRasterizer, LoadFlags, RasterizedGlyph,
};
pub use registry::{FontRegistry, FontSource, GenericFont};
pub use richtext::{Color, RichText};
pub use settings::{AtlasSettings, TextSettings};
pub use sprite::{SpriteAsset, SpriteGlyph};
pub use swash_backend::SwashRasterizer;
pub use synthetic::{SyntheticFace, SyntheticRasterizer};
pub use unicode::LineBreakRules;

use thiserror::Error;

/// Text atlas and layout errors
///
/// Layout itself never fails on degraded text; these surface from the atlas,
/// the dynamic-add path and configuration loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    #[error("Atlas capacity exhausted, cannot place {width}x{height} glyph")]
    CapacityExhausted { width: u32, height: u32 },

    #[error("Code point U+{0:04X} is not present in the font source")]
    GlyphNotInSource(u32),

    #[error("Failed to load font face: {0}")]
    FaceLoadFailure(String),

    #[error("Auto-size gave up after {iterations} iterations")]
    AutoSizeIterationExceeded { iterations: u32 },

    #[error("Line breaking exceeded its restore limit at element {index}")]
    RecursionGuardTripped { index: usize },

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid font data")]
    InvalidFontData,

    #[error("Unknown font asset")]
    UnknownFont,

    #[error("Unknown sprite asset")]
    UnknownSprite,

    #[error("Invalid settings: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, TextError>;
