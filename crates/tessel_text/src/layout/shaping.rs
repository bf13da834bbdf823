//! Resolution and shaping ahead of the layout pass
//!
//! Resolves every parsed unit to a text element, collapses ligatures and
//! classifies marks. The result does not depend on point size, so
//! auto-size can rerun the pass without resolving again.

use crate::context::{FontId, SpriteId, TextContext};
use crate::fallback::{self, Resolution, VisitedSet};
use crate::features::PairAdjustmentRecord;
use crate::glyph::{FontStyles, TextElement};
use crate::layout::options::LayoutOptions;
use crate::layout::output::LayoutDiagnostic;
use crate::richtext::{RichText, TextUnit, UnitContent, UnitStyle};
use crate::unicode;

/// A resolved unit ready for placement
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedUnit {
    pub source_index: usize,
    /// Code point from the source text, not the substitute
    pub unicode: u32,
    pub element: Option<TextElement>,
    /// Font the unit asked for
    pub font: FontId,
    pub style: UnitStyle,
    pub styles: FontStyles,
    pub synthesize_bold: bool,
    pub synthesize_italic: bool,
    /// Folded into a preceding ligature
    pub consumed: bool,
    pub is_mark: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShapedText {
    pub units: Vec<ShapedUnit>,
    pub ellipsis: Option<TextElement>,
    pub missing: Vec<u32>,
    pub diagnostics: Vec<LayoutDiagnostic>,
}

/// Resolve and shape parsed text
pub fn shape(ctx: &mut TextContext, rich: &RichText, options: &LayoutOptions) -> ShapedText {
    let mut shaped = ShapedText::default();
    let mut visited = VisitedSet::new();

    for (source_index, unit) in rich.units.iter().enumerate() {
        let shaped_unit = resolve_unit(
            ctx,
            rich,
            unit,
            source_index,
            options,
            &mut visited,
            &mut shaped,
        );
        shaped.units.push(shaped_unit);
    }

    apply_ligatures(ctx, &mut shaped.units);

    let ellipsis = ctx.settings().ellipsis_codepoint;
    shaped.ellipsis = match fallback::resolve(
        ctx,
        options.font,
        ellipsis,
        options.styles,
        options.weight,
        &mut visited,
    ) {
        Resolution::Found { element, .. } => Some(element),
        _ => None,
    };

    shaped
}

fn resolve_unit(
    ctx: &mut TextContext,
    rich: &RichText,
    unit: &TextUnit,
    source_index: usize,
    options: &LayoutOptions,
    visited: &mut VisitedSet,
    shaped: &mut ShapedText,
) -> ShapedUnit {
    let font = unit
        .style
        .font
        .and_then(|i| rich.font_names.get(i))
        .and_then(|name| ctx.font_by_name(name))
        .unwrap_or(options.font);

    let styles = options.styles | unit.style.styles;
    let weight = options.weight.max(unit.style.weight);
    let unicode = unit.unicode();

    let mut out = ShapedUnit {
        source_index,
        unicode,
        element: None,
        font,
        style: unit.style,
        styles,
        synthesize_bold: false,
        synthesize_italic: false,
        consumed: false,
        is_mark: false,
    };

    match unit.content {
        UnitContent::Char(cp) => {
            match fallback::resolve(ctx, font, cp, styles, weight, visited) {
                Resolution::Found {
                    element,
                    alternate_typeface,
                } => {
                    out.element = Some(element);
                    out.synthesize_bold = styles.is_bold() && !alternate_typeface;
                    out.synthesize_italic = styles.is_italic() && !alternate_typeface;
                }
                Resolution::Placeholder { element, requested } => {
                    out.element = Some(element);
                    note_missing(shaped, requested, Some(element.unicode()));
                }
                Resolution::Unresolved { requested } => {
                    note_missing(shaped, requested, None);
                }
            }
            out.is_mark = unicode::is_combining_mark(cp);
        }
        UnitContent::SpriteIndex(index) => {
            out.element = find_sprite(ctx, |asset| asset.by_index(index).cloned());
        }
        UnitContent::SpriteName(name) => {
            let name = rich.sprite_names.get(name).map(String::as_str).unwrap_or_default();
            out.element = find_sprite(ctx, |asset| asset.by_name(name).map(|(_, s)| s.clone()));
        }
    }

    if out.element.is_none() && !matches!(unit.content, UnitContent::Char(_)) {
        shaped
            .diagnostics
            .push(LayoutDiagnostic::UnknownSprite { source_index });
    }

    out
}

fn note_missing(shaped: &mut ShapedText, unicode: u32, replacement: Option<u32>) {
    if !shaped.missing.contains(&unicode) {
        shaped.missing.push(unicode);
    }
    shaped
        .diagnostics
        .push(LayoutDiagnostic::MissingCharacter { unicode, replacement });
}

/// Search the default sprite asset and its fallbacks
fn find_sprite(
    ctx: &TextContext,
    find: impl Fn(&crate::sprite::SpriteAsset) -> Option<crate::sprite::SpriteGlyph>,
) -> Option<TextElement> {
    let mut seen: Vec<SpriteId> = Vec::new();
    let mut queue = vec![ctx.default_sprite()?];

    while let Some(id) = queue.pop() {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        let Some(asset) = ctx.sprite(id) else {
            continue;
        };
        if let Some(sprite) = find(asset) {
            return Some(TextElement::Sprite {
                sprite: id,
                unicode: sprite.unicode.unwrap_or(0xFFFC),
                glyph: sprite.glyph,
                scale: sprite.scale,
            });
        }
        queue.extend(asset.fallback_sprites.iter().rev().copied());
    }
    None
}

/// Collapse ligature spans within runs of one font.
///
/// The first unit of a match takes the ligature glyph; the rest of the span,
/// skipped ignorable units included, is marked consumed in place.
pub fn apply_ligatures(ctx: &TextContext, units: &mut [ShapedUnit]) {
    let mut run_start = 0;
    while run_start < units.len() {
        let Some(font) = units[run_start].element.as_ref().and_then(TextElement::font) else {
            run_start += 1;
            continue;
        };
        let mut run_end = run_start + 1;
        while run_end < units.len()
            && units[run_end].element.as_ref().and_then(TextElement::font) == Some(font)
        {
            run_end += 1;
        }

        if let Some(asset) = ctx.font(font) {
            if asset.features().ligature_count() > 0 {
                let run = &mut units[run_start..run_end];
                let glyphs: Vec<u32> = run
                    .iter()
                    .map(|u| u.element.as_ref().map(|e| e.glyph().index).unwrap_or(0))
                    .collect();

                let mut i = 0;
                while i < run.len() {
                    let matched = asset.features().match_ligature(&glyphs, i, |pos| {
                        unicode::is_ignorable_for_ligature(run[pos].unicode)
                    });
                    let Some(matched) = matched else {
                        i += 1;
                        continue;
                    };
                    let Some(glyph) = asset.glyph(matched.ligature).copied() else {
                        i += 1;
                        continue;
                    };
                    if let Some(TextElement::Character { glyph: g, .. }) = run[i].element.as_mut() {
                        *g = glyph;
                    }
                    for unit in &mut run[i + 1..matched.end] {
                        unit.consumed = true;
                    }
                    tracing::trace!(
                        "Ligature glyph {} replaces units {}..{}",
                        matched.ligature,
                        run[i].source_index,
                        run[matched.end - 1].source_index
                    );
                    i = matched.end;
                }
            }
        }

        run_start = run_end;
    }
}

/// Kerning between two adjacent characters of the same font
pub fn pair_adjustment(
    ctx: &TextContext,
    prev: &TextElement,
    current: &TextElement,
) -> Option<PairAdjustmentRecord> {
    let (
        TextElement::Character { font: a, glyph: first, .. },
        TextElement::Character { font: b, glyph: second, .. },
    ) = (prev, current)
    else {
        return None;
    };
    if a != b {
        return None;
    }
    ctx.font(*a)?
        .features()
        .pair_adjustment(first.index, second.index)
        .copied()
}

/// Anchor offset (design units) placing `mark` on `base`
///
/// `base_is_mark` selects the mark-to-mark table.
pub fn mark_offset(
    ctx: &TextContext,
    base: &TextElement,
    mark: &TextElement,
    base_is_mark: bool,
) -> Option<(f32, f32)> {
    let (
        TextElement::Character { font: a, glyph: base_glyph, .. },
        TextElement::Character { font: b, glyph: mark_glyph, .. },
    ) = (base, mark)
    else {
        return None;
    };
    if a != b {
        return None;
    }
    let features = ctx.font(*a)?.features();
    let record = if base_is_mark {
        features.mark_to_mark(base_glyph.index, mark_glyph.index)
    } else {
        features.mark_to_base(base_glyph.index, mark_glyph.index)
    }?;
    Some(record.offset())
}
