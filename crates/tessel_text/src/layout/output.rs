//! Layout output records
//!
//! Produced fresh by every layout call and handed to the renderer
//! read-only. Coordinates are pixels with y growing downwards from the top
//! left of the box.

use crate::atlas::UvRect;
use crate::glyph::{AssetRef, FontStyles, TextElement};
use crate::layout::options::HorizontalAlignment;
use crate::richtext::Color;
use crate::TextError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis aligned bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub min: Point,
    pub max: Point,
}

impl Extents {
    /// Inverted bounds that any `include` call replaces
    pub const EMPTY: Self = Self {
        min: Point::new(f32::INFINITY, f32::INFINITY),
        max: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn width(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.max.x - self.min.x
        }
    }

    pub fn height(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.max.y - self.min.y
        }
    }
}

impl Default for Extents {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One laid out character
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterInfo {
    /// Code point from the source text
    pub unicode: u32,
    /// Index of the source unit this record came from
    pub source_index: usize,
    pub element: Option<TextElement>,
    pub style: FontStyles,
    pub color: Color,
    pub point_size: f32,
    /// Atlas pixels to layout pixels
    pub scale: f32,

    /// Pen position at the start of the character
    pub origin: f32,
    pub x_advance: f32,
    pub baseline: f32,
    pub ascender: f32,
    pub descender: f32,
    /// Kerning or mark placement applied on top of the pen position
    pub x_offset: f32,
    pub y_offset: f32,

    pub top_left: Point,
    pub bottom_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub uv: UvRect,
    /// Glyph scale for the shader; negative when bold is synthesized
    pub packed_scale: f32,
    pub material_index: usize,

    pub line_index: usize,
    pub word_index: Option<usize>,
    pub page_index: usize,
    pub visible: bool,
}

impl CharacterInfo {
    pub fn asset(&self) -> Option<AssetRef> {
        self.element.as_ref().map(TextElement::asset)
    }

    /// Right edge of the inked glyph box in pen coordinates
    pub(crate) fn ink_right(&self) -> f32 {
        match &self.element {
            Some(element) if self.visible => {
                let m = &element.glyph().metrics;
                self.origin + self.x_offset + (m.horizontal_bearing_x + m.width) * self.scale
            }
            _ => self.origin + self.x_advance,
        }
    }

    pub(crate) fn ink_left(&self) -> f32 {
        match &self.element {
            Some(element) if self.visible => {
                let bearing = element.glyph().metrics.horizontal_bearing_x;
                self.origin + self.x_offset + bearing * self.scale
            }
            _ => self.origin,
        }
    }

    /// Fill the quad corners from pen position, offsets and metrics
    pub(crate) fn compute_quad(&mut self, italic_slant: f32) {
        let Some(element) = &self.element else {
            let p = Point::new(self.origin, self.baseline);
            self.top_left = p;
            self.bottom_left = p;
            self.top_right = p;
            self.bottom_right = p;
            return;
        };
        let m = &element.glyph().metrics;
        let s = self.scale;
        let left = self.origin + self.x_offset + m.horizontal_bearing_x * s;
        let right = left + m.width * s;
        let top = self.baseline - self.y_offset - m.horizontal_bearing_y * s;
        let bottom = top + m.height * s;

        // Shear around the baseline
        let shear = |y: f32| (self.baseline - y) * italic_slant;
        self.top_left = Point::new(left + shear(top), top);
        self.top_right = Point::new(right + shear(top), top);
        self.bottom_left = Point::new(left + shear(bottom), bottom);
        self.bottom_right = Point::new(right + shear(bottom), bottom);
    }

    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        self.origin += dx;
        self.baseline += dy;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    pub first_char: usize,
    /// Exclusive
    pub end_char: usize,
    pub first_visible_char: Option<usize>,
    pub last_visible_char: Option<usize>,
    pub visible_character_count: usize,
    pub space_count: usize,
    pub word_count: usize,
    /// Pen advance up to the last visible character
    pub width: f32,
    /// Width available to the line
    pub available_width: f32,
    pub ascender: f32,
    pub descender: f32,
    pub baseline: f32,
    pub line_height: f32,
    pub alignment: HorizontalAlignment,
    pub page_index: usize,
    /// Ends with a paragraph break
    pub ends_paragraph: bool,
    pub extents: Extents,
}

impl LineInfo {
    pub fn character_count(&self) -> usize {
        self.end_char - self.first_char
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordInfo {
    pub first_char: usize,
    /// Exclusive
    pub end_char: usize,
    pub line_index: usize,
}

impl WordInfo {
    pub fn character_count(&self) -> usize {
        self.end_char - self.first_char
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub first_char: usize,
    pub end_char: usize,
    pub first_line: usize,
    pub end_line: usize,
    pub ascender: f32,
    pub descender: f32,
}

/// One draw batch: an asset and one of its atlas surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialReference {
    pub asset: AssetRef,
    pub atlas_index: usize,
    pub material_hash: u64,
    pub reference_count: usize,
}

/// Recoverable problems met while laying out
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutDiagnostic {
    /// Code point replaced by a placeholder, or dropped when `replacement`
    /// is `None`
    MissingCharacter { unicode: u32, replacement: Option<u32> },
    /// Sprite tag without a matching sprite
    UnknownSprite { source_index: usize },
    /// Auto-size accepted its best size at the iteration cap
    AutoSizeIterationExceeded { iterations: u32 },
    /// Line breaking stopped rewinding and truncated the text
    RecursionGuardTripped { index: usize },
}

impl LayoutDiagnostic {
    /// The error this diagnostic stands for, where one exists
    pub fn to_error(&self) -> Option<TextError> {
        match *self {
            LayoutDiagnostic::MissingCharacter { unicode, .. } => {
                Some(TextError::GlyphNotInSource(unicode))
            }
            LayoutDiagnostic::UnknownSprite { .. } => Some(TextError::UnknownSprite),
            LayoutDiagnostic::AutoSizeIterationExceeded { iterations } => {
                Some(TextError::AutoSizeIterationExceeded { iterations })
            }
            LayoutDiagnostic::RecursionGuardTripped { index } => {
                Some(TextError::RecursionGuardTripped { index })
            }
        }
    }
}

/// What the auto-size search settled on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoSizeReport {
    pub font_size: f32,
    pub line_spacing: f32,
    pub width_percent: f32,
    pub iterations: u32,
    /// Size bounds narrowed to within epsilon, or the first size tried fit
    pub converged: bool,
}

/// Everything the renderer needs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutResult {
    pub characters: Vec<CharacterInfo>,
    pub lines: Vec<LineInfo>,
    pub words: Vec<WordInfo>,
    pub pages: Vec<PageInfo>,
    pub materials: Vec<MaterialReference>,
    /// Bounds of every visible quad
    pub mesh_extents: Extents,
    /// Point size of the primary font after auto-size
    pub font_size_used: f32,
    pub is_truncated: bool,
    /// First source unit not laid out when overflow is linked
    pub linked_overflow_index: Option<usize>,
    /// Code points that had to be replaced or dropped
    pub missing_characters: Vec<u32>,
    pub diagnostics: Vec<LayoutDiagnostic>,
    pub auto_size: Option<AutoSizeReport>,
    /// Size the text wants: widest line and total line height
    pub preferred_width: f32,
    pub preferred_height: f32,
}

impl LayoutResult {
    pub fn visible_characters(&self) -> impl Iterator<Item = &CharacterInfo> {
        self.characters.iter().filter(|c| c.visible)
    }

    pub fn visible_character_count(&self) -> usize {
        self.visible_characters().count()
    }

    /// Visible text, for tests and debugging
    pub fn visible_text(&self) -> String {
        self.visible_characters()
            .filter_map(|c| char::from_u32(c.unicode))
            .collect()
    }

    /// Text of one line, including whitespace
    pub fn line_text(&self, line: usize) -> String {
        self.lines
            .get(line)
            .map(|info| {
                self.characters[info.first_char..info.end_char]
                    .iter()
                    .filter_map(|c| char::from_u32(c.unicode))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_include() {
        let mut e = Extents::EMPTY;
        assert!(e.is_empty());
        assert_eq!(e.width(), 0.0);
        e.include(Point::new(1.0, 2.0));
        e.include(Point::new(-3.0, 5.0));
        assert_eq!(e.min, Point::new(-3.0, 2.0));
        assert_eq!(e.max, Point::new(1.0, 5.0));
        assert_eq!(e.width(), 4.0);
        assert_eq!(e.height(), 3.0);
    }

    #[test]
    fn test_diagnostic_errors() {
        let d = LayoutDiagnostic::AutoSizeIterationExceeded { iterations: 4 };
        assert_eq!(
            d.to_error(),
            Some(TextError::AutoSizeIterationExceeded { iterations: 4 })
        );
    }
}
