//! Layout options

use crate::context::FontId;
use crate::glyph::{FontStyles, FontWeight};
use crate::richtext::Color;

/// What happens when text does not fit the box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowMode {
    /// Let text run past the box
    #[default]
    Overflow,
    /// Cut the text at the first line that does not fit
    Truncate,
    /// Replace the tail with an ellipsis
    Ellipsis,
    /// Stop and hand the remainder to a successor layout
    Linked,
    /// Continue on a new page
    Page,
}

/// Horizontal alignment per line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    /// Center on the inked extents rather than advances
    Geometry,
    /// Spread slack across gaps; the last line of a paragraph stays left
    Justified,
    /// Justify every line including the last
    Flush,
}

/// Vertical placement of the text block inside the box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
    /// First baseline sits on the top margin
    Baseline,
}

/// Box margins in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }
}

/// Auto-size search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoSizeOptions {
    pub min_size: f32,
    pub max_size: f32,
    /// Lowest line spacing adjustment (1/100 em) the search may use
    pub line_spacing_floor: f32,
    /// Lowest character width (percent of normal) the search may use
    pub min_width_percent: f32,
    /// Iteration cap; the settings cap applies when lower
    pub max_iterations: u32,
}

impl Default for AutoSizeOptions {
    fn default() -> Self {
        Self {
            min_size: 18.0,
            max_size: 72.0,
            line_spacing_floor: 0.0,
            min_width_percent: 100.0,
            max_iterations: 100,
        }
    }
}

/// Options for laying out one block of text
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Primary font
    pub font: FontId,
    /// Point size (pixels)
    pub font_size: f32,
    /// Box width; `None` never wraps
    pub width: Option<f32>,
    /// Box height; `None` never overflows vertically
    pub height: Option<f32>,
    pub margins: Margins,
    pub wrapping: bool,
    /// Prefer a mid-word break over a word break that leaves the line
    /// shorter than this fraction of the width
    pub wrapping_ratio: f32,
    pub overflow: OverflowMode,
    pub alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    /// Extra spacing between characters, 1/100 em
    pub character_spacing: f32,
    /// Extra spacing added to separators, 1/100 em
    pub word_spacing: f32,
    /// Extra spacing between lines, 1/100 em
    pub line_spacing: f32,
    /// Extra spacing after paragraph ends, 1/100 em
    pub paragraph_spacing: f32,
    /// Share of justification slack spread over characters instead of gaps
    pub justified_character_ratio: f32,
    /// Tab stop interval in tab widths
    pub tab_size: f32,
    pub styles: FontStyles,
    pub weight: FontWeight,
    pub color: Color,
    /// Parse rich text tags
    pub rich_text: bool,
    /// Decode HTML entities before parsing
    pub decode_html_entities: bool,
    pub right_to_left: bool,
    /// Page shown when overflow is [`OverflowMode::Page`]
    pub page_to_display: usize,
    pub auto_size: Option<AutoSizeOptions>,
}

impl LayoutOptions {
    pub fn new(font: FontId) -> Self {
        Self {
            font,
            font_size: 36.0,
            width: None,
            height: None,
            margins: Margins::default(),
            wrapping: true,
            wrapping_ratio: 0.0,
            overflow: OverflowMode::Overflow,
            alignment: HorizontalAlignment::Left,
            vertical_alignment: VerticalAlignment::Top,
            character_spacing: 0.0,
            word_spacing: 0.0,
            line_spacing: 0.0,
            paragraph_spacing: 0.0,
            justified_character_ratio: 0.0,
            tab_size: 4.0,
            styles: FontStyles::NORMAL,
            weight: FontWeight::REGULAR,
            color: Color::WHITE,
            rich_text: true,
            decode_html_entities: false,
            right_to_left: false,
            page_to_display: 0,
            auto_size: None,
        }
    }

    pub fn with_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_box(mut self, width: Option<f32>, height: Option<f32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowMode) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_wrapping(mut self, wrapping: bool) -> Self {
        self.wrapping = wrapping;
        self
    }

    pub fn with_auto_size(mut self, auto_size: AutoSizeOptions) -> Self {
        self.auto_size = Some(auto_size);
        self
    }

    /// Width available to lines, infinite when unbounded
    pub(crate) fn content_width(&self) -> f32 {
        match self.width {
            Some(width) => (width - self.margins.left - self.margins.right).max(0.0),
            None => f32::INFINITY,
        }
    }

    pub(crate) fn content_height(&self) -> f32 {
        match self.height {
            Some(height) => (height - self.margins.top - self.margins.bottom).max(0.0),
            None => f32::INFINITY,
        }
    }
}
