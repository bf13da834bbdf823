//! Rasterizer backend interface
//!
//! A font asset talks to its backing font resource only through
//! [`GlyphRasterizer`]: load a face at a sampling size, map code points to
//! glyph indices, rasterize single glyphs and extract OpenType feature
//! records. Packing the resulting bitmaps is the atlas's job.

use crate::features::{LigatureRecord, MarkAdjustmentRecord, PairAdjustmentRecord};
use crate::glyph::{FaceInfo, GlyphMetrics};
use crate::Result;

/// Format of the rasterized glyph bitmap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GlyphFormat {
    /// Single-channel alpha (grayscale)
    #[default]
    Alpha,
    /// RGBA color (for color emoji)
    Rgba,
}

/// Rasterized glyph bitmap with metrics in atlas pixels
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// Font-local glyph index
    pub index: u32,
    pub metrics: GlyphMetrics,
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Pixel data (8-bit alpha or 32-bit RGBA, row-major)
    pub bitmap: Vec<u8>,
    pub format: GlyphFormat,
}

impl RasterizedGlyph {
    /// A glyph with an advance but no bitmap
    pub fn empty(index: u32, metrics: GlyphMetrics) -> Self {
        Self {
            index,
            metrics,
            width: 0,
            height: 0,
            bitmap: Vec::new(),
            format: GlyphFormat::Alpha,
        }
    }
}

/// Glyph loading flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadFlags(u8);

impl LoadFlags {
    pub const DEFAULT: Self = Self(0);
    /// Prefer color sources (COLR, CBDT, sbix) and produce RGBA
    pub const COLOR: Self = Self(1);
    /// Skip hinting
    pub const NO_HINTING: Self = Self(1 << 1);
    /// Metrics only, no bitmap
    pub const METRICS_ONLY: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for LoadFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::ops::BitOr for LoadFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// OpenType feature lookup kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// GSUB `liga`
    Ligature,
    /// GPOS `kern`
    PairAdjustment,
    /// GPOS `mark`
    MarkToBase,
    /// GPOS `mkmk`
    MarkToMark,
}

/// Records of one feature kind
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureRecords {
    Ligatures(Vec<LigatureRecord>),
    PairAdjustments(Vec<PairAdjustmentRecord>),
    MarkToBase(Vec<MarkAdjustmentRecord>),
    MarkToMark(Vec<MarkAdjustmentRecord>),
}

impl FeatureRecords {
    /// An empty record list of the given kind
    pub fn empty(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Ligature => FeatureRecords::Ligatures(Vec::new()),
            FeatureKind::PairAdjustment => FeatureRecords::PairAdjustments(Vec::new()),
            FeatureKind::MarkToBase => FeatureRecords::MarkToBase(Vec::new()),
            FeatureKind::MarkToMark => FeatureRecords::MarkToMark(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureRecords::Ligatures(r) => r.len(),
            FeatureRecords::PairAdjustments(r) => r.len(),
            FeatureRecords::MarkToBase(r) | FeatureRecords::MarkToMark(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backing font resource of a dynamic font asset
///
/// Implementations are single-threaded per font resource; a face must be
/// loaded before any other call.
pub trait GlyphRasterizer: Send {
    /// Identity of the backing resource (file path, family name, ...)
    fn identity(&self) -> &str;

    /// Load the face at `point_size`, returning its metrics in pixels
    fn load_face(&mut self, point_size: f32, face_index: u32) -> Result<FaceInfo>;

    /// Glyph index for a code point; 0 when the face has no glyph
    fn glyph_index(&mut self, codepoint: u32) -> u32;

    /// Rasterize one glyph at the loaded point size
    fn rasterize(&mut self, glyph_index: u32, flags: LoadFlags) -> Result<RasterizedGlyph>;

    /// Feature records whose glyphs all belong to `glyphs`
    ///
    /// Ligature output glyphs are exempt: a record only needs its
    /// components in the set.
    fn feature_records(&mut self, kind: FeatureKind, glyphs: &[u32]) -> FeatureRecords;
}
