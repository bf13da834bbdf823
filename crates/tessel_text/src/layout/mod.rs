//! Text layout engine
//!
//! Turns a string into positioned characters, lines, words and pages:
//!
//! 1. Optional HTML entity decoding and rich text parsing
//! 2. Resolution and shaping ([`shaping`])
//! 3. One layout pass, or an auto-size search over passes ([`pass`], [`autosize`])
//! 4. Alignment, justification, quads and materials

pub mod autosize;
pub mod cursor;
pub mod justify;
pub mod options;
pub mod output;
pub mod pass;
pub mod shaping;

use std::borrow::Cow;

use crate::context::TextContext;
use crate::richtext;
use crate::{Result, TextError};

pub use options::{
    AutoSizeOptions, HorizontalAlignment, LayoutOptions, Margins, OverflowMode, VerticalAlignment,
};
pub use output::{
    AutoSizeReport, CharacterInfo, Extents, LayoutDiagnostic, LayoutResult, LineInfo,
    MaterialReference, PageInfo, Point, WordInfo,
};

use pass::{LayoutPass, PassOutput, PassParams};
use shaping::ShapedText;

/// Text layout engine
///
/// Stateless between calls; all caches live in the [`TextContext`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextLayoutEngine;

impl TextLayoutEngine {
    /// Create a new layout engine
    pub fn new() -> Self {
        Self
    }

    /// Layout text with the given options
    ///
    /// Glyphs missing from the atlas are added on the way, which is why the
    /// context is borrowed mutably. Degraded text (missing glyphs, overflow)
    /// is reported through [`LayoutResult::diagnostics`], never as an error.
    pub fn layout(
        &self,
        ctx: &mut TextContext,
        text: &str,
        options: &LayoutOptions,
    ) -> Result<LayoutResult> {
        self.layout_from(ctx, text, 0, options)
    }

    /// Layout text starting at parsed unit `first_unit`
    ///
    /// Used to continue linked overflow: pass the previous result's
    /// [`LayoutResult::linked_overflow_index`] with the same text.
    pub fn layout_from(
        &self,
        ctx: &mut TextContext,
        text: &str,
        first_unit: usize,
        options: &LayoutOptions,
    ) -> Result<LayoutResult> {
        if ctx.font(options.font).is_none() {
            return Err(TextError::UnknownFont);
        }

        let text: Cow<'_, str> = if options.decode_html_entities {
            html_escape::decode_html_entities(text)
        } else {
            Cow::Borrowed(text)
        };
        let rich = richtext::parse(&text, options.rich_text);
        let shaped = shaping::shape(ctx, &rich, options);

        let ctx: &TextContext = ctx;
        let base = PassParams::from_options(options);
        let (output, params, auto_size, auto_diagnostic) = match &options.auto_size {
            Some(auto) => {
                let cap = ctx.settings().auto_size_max_iterations;
                let found = autosize::search(
                    |params| LayoutPass::new(ctx, &shaped, options, params, first_unit, true).run(),
                    base,
                    auto,
                    cap,
                );
                (found.output, found.params, Some(found.report), found.diagnostic)
            }
            None => {
                let output = LayoutPass::new(ctx, &shaped, options, base, first_unit, false).run();
                (output, base, None, None)
            }
        };

        let mut result = finalize(ctx, &shaped, options, output);
        result.font_size_used = params.font_size;
        result.auto_size = auto_size;
        result.diagnostics.extend(auto_diagnostic);

        tracing::debug!(
            "Laid out {} characters in {} lines at size {:.2}",
            result.characters.len(),
            result.lines.len(),
            result.font_size_used
        );
        Ok(result)
    }
}

fn finalize(
    ctx: &TextContext,
    shaped: &ShapedText,
    options: &LayoutOptions,
    output: PassOutput,
) -> LayoutResult {
    let PassOutput {
        mut characters,
        mut lines,
        is_truncated,
        linked_overflow_index,
        diagnostics,
        ..
    } = output;

    if options.overflow == OverflowMode::Page {
        for info in characters.iter_mut() {
            if info.page_index != options.page_to_display {
                info.visible = false;
            }
        }
    }

    justify::align_lines(&mut characters, &mut lines, options);
    justify::align_vertically(&mut characters, &mut lines, options);
    let words = justify::build_words(&mut characters, &mut lines);

    let mut materials: Vec<MaterialReference> = Vec::new();
    let mut mesh_extents = Extents::EMPTY;
    for info in characters.iter_mut() {
        let slant = match shaped.units.get(info.source_index) {
            Some(unit) if unit.synthesize_italic && info.unicode == unit.unicode => info
                .element
                .as_ref()
                .and_then(|e| e.font())
                .and_then(|font| ctx.font(font))
                .map(|f| f.italic_slant)
                .unwrap_or(0.0),
            _ => 0.0,
        };
        info.compute_quad(slant);

        let Some(element) = info.element.as_ref() else {
            continue;
        };
        if !info.visible {
            continue;
        }
        mesh_extents.include(info.top_left);
        mesh_extents.include(info.top_right);
        mesh_extents.include(info.bottom_left);
        mesh_extents.include(info.bottom_right);

        let asset = element.asset();
        let atlas_index = element.glyph().atlas_index;
        info.material_index = match materials
            .iter()
            .position(|m| m.asset == asset && m.atlas_index == atlas_index)
        {
            Some(index) => index,
            None => {
                materials.push(MaterialReference {
                    asset,
                    atlas_index,
                    material_hash: ctx.material_hash(asset).unwrap_or(0),
                    reference_count: 0,
                });
                materials.len() - 1
            }
        };
        materials[info.material_index].reference_count += 1;
    }

    let pages = build_pages(&lines);
    let widest = lines.iter().map(|l| l.width).fold(0.0, f32::max);
    let preferred_width = widest + options.margins.left + options.margins.right;
    let preferred_height = match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => {
            (last.baseline - last.descender) - (first.baseline - first.ascender)
                + options.margins.top
                + options.margins.bottom
        }
        _ => 0.0,
    };

    let mut all_diagnostics = shaped.diagnostics.clone();
    all_diagnostics.extend(diagnostics);

    LayoutResult {
        characters,
        lines,
        words,
        pages,
        materials,
        mesh_extents,
        font_size_used: options.font_size,
        is_truncated,
        linked_overflow_index,
        missing_characters: shaped.missing.clone(),
        diagnostics: all_diagnostics,
        auto_size: None,
        preferred_width,
        preferred_height,
    }
}

/// Group consecutive lines sharing a page index
fn build_pages(lines: &[LineInfo]) -> Vec<PageInfo> {
    let mut pages: Vec<PageInfo> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        match pages.last_mut() {
            Some(page) if lines[page.first_line].page_index == line.page_index => {
                page.end_char = line.end_char;
                page.end_line = index + 1;
                page.ascender = page.ascender.max(line.ascender);
                page.descender = page.descender.min(line.descender);
            }
            _ => pages.push(PageInfo {
                first_char: line.first_char,
                end_char: line.end_char,
                first_line: index,
                end_line: index + 1,
                ascender: line.ascender,
                descender: line.descender,
            }),
        }
    }
    pages
}
