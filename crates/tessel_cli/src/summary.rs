//! JSON report of a layout result

use serde::Serialize;

use tessel_text::{FontAsset, LayoutResult};

#[derive(Debug, Serialize)]
pub struct Summary {
    pub font_size: f32,
    pub character_count: usize,
    pub visible_character_count: usize,
    pub truncated: bool,
    pub linked_overflow_index: Option<usize>,
    pub preferred_width: f32,
    pub preferred_height: f32,
    pub lines: Vec<LineSummary>,
    pub pages: usize,
    pub materials: usize,
    pub missing: Vec<String>,
    pub diagnostics: Vec<String>,
    pub auto_size: Option<AutoSizeSummary>,
    pub atlas: AtlasSummary,
}

#[derive(Debug, Serialize)]
pub struct LineSummary {
    pub text: String,
    pub width: f32,
    pub baseline: f32,
    pub page: usize,
}

#[derive(Debug, Serialize)]
pub struct AutoSizeSummary {
    pub font_size: f32,
    pub line_spacing: f32,
    pub width_percent: f32,
    pub iterations: u32,
    pub converged: bool,
}

#[derive(Debug, Serialize)]
pub struct AtlasSummary {
    pub surfaces: usize,
    pub glyphs: usize,
    pub occupancy: Vec<f32>,
}

impl Summary {
    pub fn new(result: &LayoutResult, font: &FontAsset) -> Self {
        let lines = result
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| LineSummary {
                text: result.line_text(index),
                width: line.width,
                baseline: line.baseline,
                page: line.page_index,
            })
            .collect();

        let diagnostics = result
            .diagnostics
            .iter()
            .map(|d| match d.to_error() {
                Some(err) => err.to_string(),
                None => format!("{:?}", d),
            })
            .collect();

        Self {
            font_size: result.font_size_used,
            character_count: result.characters.len(),
            visible_character_count: result.visible_character_count(),
            truncated: result.is_truncated,
            linked_overflow_index: result.linked_overflow_index,
            preferred_width: result.preferred_width,
            preferred_height: result.preferred_height,
            lines,
            pages: result.pages.len(),
            materials: result.materials.len(),
            missing: result
                .missing_characters
                .iter()
                .map(|cp| format!("U+{:04X}", cp))
                .collect(),
            diagnostics,
            auto_size: result.auto_size.map(|report| AutoSizeSummary {
                font_size: report.font_size,
                line_spacing: report.line_spacing,
                width_percent: report.width_percent,
                iterations: report.iterations,
                converged: report.converged,
            }),
            atlas: AtlasSummary {
                surfaces: font.atlas().surface_count(),
                glyphs: font.store().glyph_count(),
                occupancy: font.atlas().surfaces().iter().map(|s| s.occupancy()).collect(),
            },
        }
    }
}
