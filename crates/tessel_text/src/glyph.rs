//! Glyph data model
//!
//! Face metrics, glyphs, characters and the tagged [`TextElement`] variant
//! the layout engine consumes. All metrics are in atlas pixels at the face's
//! sampling point size; layout rescales them to the requested font size.

use crate::atlas::GlyphRect;
use crate::context::{FontId, SpriteId};

/// Face-level metrics, refreshed whenever the face is (re)loaded
#[derive(Debug, Clone, PartialEq)]
pub struct FaceInfo {
    /// Family name reported by the face
    pub family_name: String,
    /// Style name reported by the face ("Regular", "Bold Italic", ...)
    pub style_name: String,
    /// Index of the face inside a collection file
    pub face_index: u32,
    /// Point size the atlas glyphs were sampled at
    pub point_size: f32,
    /// Design units per em
    pub units_per_em: u16,
    /// Face scale applied on top of point size (1.0 for regular faces)
    pub scale: f32,
    /// Distance between consecutive baselines
    pub line_height: f32,
    /// Ascender line relative to the baseline (positive)
    pub ascent_line: f32,
    /// Cap height relative to the baseline
    pub cap_line: f32,
    /// x-height relative to the baseline
    pub mean_line: f32,
    /// Baseline position (always 0 for loaded faces)
    pub baseline: f32,
    /// Descender line relative to the baseline (negative)
    pub descent_line: f32,
    pub superscript_offset: f32,
    pub superscript_size: f32,
    pub subscript_offset: f32,
    pub subscript_size: f32,
    pub underline_offset: f32,
    pub underline_thickness: f32,
    pub strikethrough_offset: f32,
    /// Width of a single tab column
    pub tab_width: f32,
}

impl FaceInfo {
    /// Scale from design units to atlas pixels
    pub fn design_scale(&self) -> f32 {
        if self.units_per_em == 0 {
            return 1.0;
        }
        self.point_size / self.units_per_em as f32
    }

    /// Gap between the descender of one line and the ascender of the next
    pub fn line_gap(&self) -> f32 {
        (self.line_height - (self.ascent_line - self.descent_line)).max(0.0)
    }
}

impl Default for FaceInfo {
    fn default() -> Self {
        Self {
            family_name: String::new(),
            style_name: String::from("Regular"),
            face_index: 0,
            point_size: 90.0,
            units_per_em: 1000,
            scale: 1.0,
            line_height: 108.0,
            ascent_line: 81.0,
            cap_line: 63.0,
            mean_line: 45.0,
            baseline: 0.0,
            descent_line: -27.0,
            superscript_offset: 81.0,
            superscript_size: 0.5,
            subscript_offset: -27.0,
            subscript_size: 0.5,
            underline_offset: -9.0,
            underline_thickness: 4.5,
            strikethrough_offset: 18.0,
            tab_width: 22.5,
        }
    }
}

/// Placement metrics of a single glyph
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphMetrics {
    pub width: f32,
    pub height: f32,
    /// Offset from the pen position to the left edge of the bitmap
    pub horizontal_bearing_x: f32,
    /// Offset from the baseline to the top edge of the bitmap
    pub horizontal_bearing_y: f32,
    pub horizontal_advance: f32,
}

impl GlyphMetrics {
    pub fn new(width: f32, height: f32, bearing_x: f32, bearing_y: f32, advance: f32) -> Self {
        Self {
            width,
            height,
            horizontal_bearing_x: bearing_x,
            horizontal_bearing_y: bearing_y,
            horizontal_advance: advance,
        }
    }
}

/// A rasterized (or placeholder) glyph
///
/// Created once per glyph index; its atlas rectangle never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Font-local glyph index (distinct from any code point)
    pub index: u32,
    pub metrics: GlyphMetrics,
    /// Location inside the atlas surface
    pub rect: GlyphRect,
    pub scale: f32,
    /// Index of the atlas surface holding the bitmap
    pub atlas_index: usize,
}

impl Glyph {
    pub fn new(index: u32, metrics: GlyphMetrics, rect: GlyphRect) -> Self {
        Self {
            index,
            metrics,
            rect,
            scale: 1.0,
            atlas_index: 0,
        }
    }

    /// Whether the glyph has no bitmap (spaces, control placeholders)
    pub fn is_empty(&self) -> bool {
        self.rect.width == 0 || self.rect.height == 0
    }
}

/// Code point → glyph mapping entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Character {
    pub unicode: u32,
    pub glyph_index: u32,
    pub scale: f32,
}

impl Character {
    pub fn new(unicode: u32, glyph_index: u32) -> Self {
        Self {
            unicode,
            glyph_index,
            scale: 1.0,
        }
    }
}

/// Requested font style bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FontStyles(u8);

impl FontStyles {
    pub const NORMAL: Self = Self(0);
    pub const BOLD: Self = Self(1);
    pub const ITALIC: Self = Self(1 << 1);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn is_bold(self) -> bool {
        self.contains(Self::BOLD)
    }

    pub fn is_italic(self) -> bool {
        self.contains(Self::ITALIC)
    }
}

impl std::ops::BitOr for FontStyles {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// CSS-style font weight (100-900)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const THIN: Self = Self(100);
    pub const LIGHT: Self = Self(300);
    pub const REGULAR: Self = Self(400);
    pub const MEDIUM: Self = Self(500);
    pub const SEMI_BOLD: Self = Self(600);
    pub const BOLD: Self = Self(700);
    pub const BLACK: Self = Self(900);

    /// Slot in a font asset's weight table (1..=9)
    pub fn slot(self) -> usize {
        (self.0 / 100).clamp(1, 9) as usize
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::REGULAR
    }
}

/// Composite lookup key for style-variant characters
///
/// Layout: `alternate << 40 | weight slot << 36 | style bits << 32 | code point`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey(pub u64);

impl VariantKey {
    pub fn new(unicode: u32, styles: FontStyles, weight: FontWeight, alternate: bool) -> Self {
        let key = (alternate as u64) << 40
            | (weight.slot() as u64) << 36
            | (styles.bits() as u64 & 0xF) << 32
            | unicode as u64;
        Self(key)
    }

    pub fn unicode(self) -> u32 {
        self.0 as u32
    }
}

/// Reference to the asset that owns a text element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Font(FontId),
    Sprite(SpriteId),
}

/// A resolved element, either a font character or a sprite
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextElement {
    Character {
        font: FontId,
        character: Character,
        glyph: Glyph,
    },
    Sprite {
        sprite: SpriteId,
        unicode: u32,
        glyph: Glyph,
        scale: f32,
    },
}

impl TextElement {
    pub fn asset(&self) -> AssetRef {
        match self {
            TextElement::Character { font, .. } => AssetRef::Font(*font),
            TextElement::Sprite { sprite, .. } => AssetRef::Sprite(*sprite),
        }
    }

    pub fn unicode(&self) -> u32 {
        match self {
            TextElement::Character { character, .. } => character.unicode,
            TextElement::Sprite { unicode, .. } => *unicode,
        }
    }

    pub fn glyph(&self) -> &Glyph {
        match self {
            TextElement::Character { glyph, .. } | TextElement::Sprite { glyph, .. } => glyph,
        }
    }

    /// Element scale multiplied by the glyph's own scale
    pub fn scale(&self) -> f32 {
        match self {
            TextElement::Character {
                character, glyph, ..
            } => character.scale * glyph.scale,
            TextElement::Sprite { scale, glyph, .. } => scale * glyph.scale,
        }
    }

    pub fn font(&self) -> Option<FontId> {
        match self {
            TextElement::Character { font, .. } => Some(*font),
            TextElement::Sprite { .. } => None,
        }
    }

    pub fn is_sprite(&self) -> bool {
        matches!(self, TextElement::Sprite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_styles_bits() {
        let mut styles = FontStyles::NORMAL;
        assert!(!styles.is_bold());
        styles.insert(FontStyles::BOLD);
        styles.insert(FontStyles::ITALIC);
        assert!(styles.is_bold() && styles.is_italic());
        styles.remove(FontStyles::BOLD);
        assert!(!styles.is_bold());
        assert_eq!(FontStyles::BOLD | FontStyles::ITALIC, {
            let mut s = FontStyles::BOLD;
            s.insert(FontStyles::ITALIC);
            s
        });
    }

    #[test]
    fn test_weight_slot_clamped() {
        assert_eq!(FontWeight(50).slot(), 1);
        assert_eq!(FontWeight::REGULAR.slot(), 4);
        assert_eq!(FontWeight::BOLD.slot(), 7);
        assert_eq!(FontWeight(1200).slot(), 9);
    }

    #[test]
    fn test_variant_key_distinguishes_styles() {
        let plain = VariantKey::new(0x41, FontStyles::NORMAL, FontWeight::REGULAR, false);
        let bold = VariantKey::new(0x41, FontStyles::BOLD, FontWeight::BOLD, false);
        let alt = VariantKey::new(0x41, FontStyles::BOLD, FontWeight::BOLD, true);
        assert_ne!(plain, bold);
        assert_ne!(bold, alt);
        assert_eq!(alt.unicode(), 0x41);
    }

    #[test]
    fn test_face_design_scale() {
        let face = FaceInfo {
            point_size: 100.0,
            units_per_em: 1000,
            ..Default::default()
        };
        assert!((face.design_scale() - 0.1).abs() < f32::EPSILON);
    }
}
