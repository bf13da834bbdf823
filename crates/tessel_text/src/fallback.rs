//! Code point resolution through fallback chains
//!
//! Search order for one code point:
//! 1. alternate typeface for bold/italic/weight requests (cached per asset)
//! 2. the font's own tables
//! 3. the font's rasterizer, if dynamic
//! 4. a small substitution map (no-break space → space, non-breaking
//!    hyphens → hyphen-minus)
//! 5. the font's fallback list (recursively), the global fallback list,
//!    the default font
//! 6. the default sprite asset and its fallbacks
//!
//! Each font or sprite instance is visited at most once per query. When
//! nothing matches, the configured missing-glyph code point, space, or
//! end-of-text stands in, whichever resolves first.

use rustc_hash::FxHashSet;

use crate::context::{FontId, SpriteId, TextContext};
use crate::glyph::{FontStyles, FontWeight, TextElement, VariantKey};
use crate::unicode;
use crate::TextError;

/// Substitutes tried when the font lacks a code point
const SUBSTITUTIONS: &[(u32, u32)] = &[
    (unicode::NO_BREAK_SPACE, unicode::SPACE),
    (0x202F, unicode::SPACE),
    (unicode::SOFT_HYPHEN, unicode::HYPHEN_MINUS),
    (0x2011, unicode::HYPHEN_MINUS),
];

pub fn substitute(unicode: u32) -> Option<u32> {
    SUBSTITUTIONS
        .iter()
        .find(|(from, _)| *from == unicode)
        .map(|(_, to)| *to)
}

/// Assets already searched during one top-level query
///
/// Owned by the caller and reset at the start of every query.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    fonts: FxHashSet<FontId>,
    sprites: FxHashSet<SpriteId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.fonts.clear();
        self.sprites.clear();
    }

    /// Mark a font visited; false if it already was
    pub fn visit_font(&mut self, font: FontId) -> bool {
        self.fonts.insert(font)
    }

    pub fn visit_sprite(&mut self, sprite: SpriteId) -> bool {
        self.sprites.insert(sprite)
    }

    pub fn contains_font(&self, font: FontId) -> bool {
        self.fonts.contains(&font)
    }
}

/// Result of resolving one code point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Found in the requested font, a fallback or a sprite
    Found {
        element: TextElement,
        /// Came from an alternate typeface, so no style synthesis is needed
        alternate_typeface: bool,
    },
    /// Nothing carries the code point; a placeholder stands in
    Placeholder { element: TextElement, requested: u32 },
    /// Not even a placeholder resolves
    Unresolved { requested: u32 },
}

impl Resolution {
    pub fn element(&self) -> Option<&TextElement> {
        match self {
            Resolution::Found { element, .. } | Resolution::Placeholder { element, .. } => {
                Some(element)
            }
            Resolution::Unresolved { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Resolve a code point starting at `font`
pub fn resolve(
    ctx: &mut TextContext,
    font: FontId,
    unicode: u32,
    styles: FontStyles,
    weight: FontWeight,
    visited: &mut VisitedSet,
) -> Resolution {
    visited.clear();

    let styled = resolve_styled(ctx, font, unicode, styles, weight, visited);
    if let Some((element, alternate_typeface)) = styled {
        return Resolution::Found {
            element,
            alternate_typeface,
        };
    }

    if let Some(element) = search_chain(ctx, font, unicode, visited) {
        return Resolution::Found {
            element,
            alternate_typeface: false,
        };
    }

    if let Some(element) = search_sprites(ctx, unicode, visited) {
        return Resolution::Found {
            element,
            alternate_typeface: false,
        };
    }

    resolve_placeholder(ctx, font, unicode, visited)
}

/// Resolve, substituting the placeholder when needed
pub fn resolve_or_placeholder(
    ctx: &mut TextContext,
    font: FontId,
    unicode: u32,
    visited: &mut VisitedSet,
) -> Option<TextElement> {
    resolve(
        ctx,
        font,
        unicode,
        FontStyles::NORMAL,
        FontWeight::REGULAR,
        visited,
    )
    .element()
    .copied()
}

/// Whether every code point of `text` resolves through `font`'s chain.
///
/// Returns the code points that do not, in order of first appearance.
pub fn has_characters(
    ctx: &mut TextContext,
    font: FontId,
    text: &str,
    search_fallbacks: bool,
) -> (bool, Vec<u32>) {
    let mut missing = Vec::new();
    let mut visited = VisitedSet::new();

    for c in text.chars() {
        let cp = c as u32;
        if missing.contains(&cp) {
            continue;
        }
        visited.clear();
        let found = if search_fallbacks {
            search_chain(ctx, font, cp, &mut visited).is_some()
        } else {
            visited.visit_font(font);
            lookup_in_font(ctx, font, cp).is_some()
        };
        if !found {
            missing.push(cp);
        }
    }

    (missing.is_empty(), missing)
}

/// Alternate typeface lookup for styled requests
fn resolve_styled(
    ctx: &mut TextContext,
    font: FontId,
    unicode: u32,
    styles: FontStyles,
    weight: FontWeight,
    visited: &mut VisitedSet,
) -> Option<(TextElement, bool)> {
    let italic = styles.is_italic();
    let effective_weight = if styles.is_bold() && weight < FontWeight::BOLD {
        FontWeight::BOLD
    } else {
        weight
    };
    if !italic && effective_weight == FontWeight::REGULAR {
        return None;
    }

    let key = VariantKey::new(unicode, styles, effective_weight, true);
    let asset = ctx.font(font)?;
    if let Some(element) = asset.cached_variant(key) {
        return Some((element, true));
    }

    let alternate = asset
        .weight_typeface(effective_weight, italic)
        .filter(|alt| *alt != font)?;
    if !visited.visit_font(alternate) {
        return None;
    }

    let element = lookup_in_font(ctx, alternate, unicode)?;
    if let Some(asset) = ctx.font_mut(font) {
        asset.cache_variant(key, element);
    }
    Some((element, true))
}

/// Depth-first walk: font, its fallbacks, global fallbacks, default font
fn search_chain(
    ctx: &mut TextContext,
    font: FontId,
    unicode: u32,
    visited: &mut VisitedSet,
) -> Option<TextElement> {
    if let Some(element) = search_font(ctx, font, unicode, visited) {
        return Some(element);
    }

    let globals = ctx.global_fallbacks().to_vec();
    for fallback in globals {
        if let Some(element) = search_font(ctx, fallback, unicode, visited) {
            return Some(element);
        }
    }

    let default_font = ctx.default_font()?;
    search_font(ctx, default_font, unicode, visited)
}

fn search_font(
    ctx: &mut TextContext,
    font: FontId,
    unicode: u32,
    visited: &mut VisitedSet,
) -> Option<TextElement> {
    if !visited.visit_font(font) {
        return None;
    }

    if let Some(element) = lookup_in_font(ctx, font, unicode) {
        return Some(element);
    }

    let fallbacks = ctx.font(font)?.fallback_fonts.clone();
    fallbacks
        .into_iter()
        .find_map(|fallback| search_font(ctx, fallback, unicode, visited))
}

/// Local tables, then the rasterizer, then the substitution map
fn lookup_in_font(ctx: &mut TextContext, font: FontId, unicode: u32) -> Option<TextElement> {
    let asset = ctx.font_mut(font)?;

    if let Some((character, glyph)) = asset.lookup(unicode) {
        return Some(TextElement::Character {
            font,
            character,
            glyph,
        });
    }

    if asset.is_dynamic() {
        match asset.try_add_character(unicode) {
            Ok(_) => {
                let (character, glyph) = asset.lookup(unicode)?;
                return Some(TextElement::Character {
                    font,
                    character,
                    glyph,
                });
            }
            Err(TextError::GlyphNotInSource(_)) => {}
            Err(err) => {
                tracing::debug!(
                    "U+{:04X} unavailable in '{}': {}",
                    unicode,
                    asset.name(),
                    err
                );
            }
        }
    }

    let replacement = substitute(unicode)?;
    let (character, glyph) = match asset.lookup(replacement) {
        Some(found) => found,
        None => {
            asset.try_add_character(replacement).ok()?;
            asset.lookup(replacement)?
        }
    };
    Some(TextElement::Character {
        font,
        character,
        glyph,
    })
}

/// Default sprite asset and its fallbacks
fn search_sprites(
    ctx: &TextContext,
    unicode: u32,
    visited: &mut VisitedSet,
) -> Option<TextElement> {
    let mut stack = vec![ctx.default_sprite()?];

    while let Some(id) = stack.pop() {
        if !visited.visit_sprite(id) {
            continue;
        }
        let Some(asset) = ctx.sprite(id) else {
            continue;
        };
        if let Some((_, sprite)) = asset.by_unicode(unicode) {
            return Some(TextElement::Sprite {
                sprite: id,
                unicode,
                glyph: sprite.glyph,
                scale: sprite.scale,
            });
        }
        stack.extend(asset.fallback_sprites.iter().rev().copied());
    }

    None
}

fn resolve_placeholder(
    ctx: &mut TextContext,
    font: FontId,
    requested: u32,
    visited: &mut VisitedSet,
) -> Resolution {
    let missing_glyph = ctx.settings().missing_glyph_codepoint;
    let warn = ctx.settings().warnings_enabled;

    for candidate in [missing_glyph, unicode::SPACE, unicode::END_OF_TEXT] {
        visited.clear();
        if let Some(element) = search_chain(ctx, font, candidate, visited) {
            if warn {
                tracing::warn!(
                    "Character U+{:04X} not found in '{}' or its fallbacks; replaced by U+{:04X}",
                    requested,
                    ctx.font(font).map(|f| f.name()).unwrap_or("<unknown>"),
                    candidate
                );
            }
            return Resolution::Placeholder { element, requested };
        }
    }

    if warn {
        tracing::warn!("Character U+{:04X} cannot be resolved", requested);
    }
    Resolution::Unresolved { requested }
}

#[cfg(test)]
mod tests {
    use crate::atlas::GlyphRect;
    use crate::font_asset::FontAsset;
    use crate::glyph::{FaceInfo, Glyph, GlyphMetrics};
    use crate::settings::AtlasSettings;
    use crate::sprite::{SpriteAsset, SpriteGlyph};
    use crate::synthetic::{SyntheticFace, SyntheticRasterizer};
    use super::*;

    fn atlas() -> AtlasSettings {
        AtlasSettings {
            width: 512,
            height: 512,
            padding: 1,
            sampling_point_size: 100.0,
            ..Default::default()
        }
    }

    fn font(name: &str, chars: &str) -> FontAsset {
        let face = SyntheticFace::new(name).with_glyphs(chars, 500.0);
        FontAsset::from_source(name, Box::new(SyntheticRasterizer::new(face)), &atlas()).unwrap()
    }

    fn owner(element: &TextElement) -> FontId {
        element.font().unwrap()
    }

    fn resolve_regular(
        ctx: &mut TextContext,
        font: FontId,
        unicode: u32,
        visited: &mut VisitedSet,
    ) -> Resolution {
        resolve(ctx, font, unicode, FontStyles::NORMAL, FontWeight::REGULAR, visited)
    }

    #[test]
    fn test_local_then_dynamic() {
        let mut ctx = TextContext::default();
        let main = ctx.add_font(font("Main", "ab"));
        let mut visited = VisitedSet::new();
        let r = resolve_regular(&mut ctx, main, 'a' as u32, &mut visited);
        assert!(r.is_found());
        assert!(ctx.font(main).unwrap().has_character('a' as u32));
    }

    #[test]
    fn test_fallback_order() {
        let mut ctx = TextContext::default();
        let main = ctx.add_font(font("Main", "a"));
        let own = ctx.add_font(font("Own", "x"));
        let global = ctx.add_font(font("Global", "xy"));
        ctx.font_mut(main).unwrap().fallback_fonts.push(own);
        ctx.push_global_fallback(global);

        let mut visited = VisitedSet::new();
        let x = resolve_or_placeholder(&mut ctx, main, 'x' as u32, &mut visited).unwrap();
        assert_eq!(owner(&x), own);
        let y = resolve_or_placeholder(&mut ctx, main, 'y' as u32, &mut visited).unwrap();
        assert_eq!(owner(&y), global);
    }

    #[test]
    fn test_cyclic_fallbacks_terminate() {
        let mut ctx = TextContext::default();
        let a = ctx.add_font(font("A", "a"));
        let b = ctx.add_font(font("B", "b"));
        ctx.font_mut(a).unwrap().fallback_fonts.push(b);
        ctx.font_mut(b).unwrap().fallback_fonts.push(a);

        let mut visited = VisitedSet::new();
        let r = resolve_regular(&mut ctx, a, 'q' as u32, &mut visited);
        // No missing glyph or space in either font; ETX placeholder resolves.
        match r {
            Resolution::Placeholder { element, requested } => {
                assert_eq!(requested, 'q' as u32);
                assert_eq!(element.unicode(), unicode::END_OF_TEXT);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_substitution_map() {
        let mut ctx = TextContext::default();
        let main = ctx.add_font(font("Main", " -"));
        let mut visited = VisitedSet::new();
        let nbsp =
            resolve_or_placeholder(&mut ctx, main, unicode::NO_BREAK_SPACE, &mut visited).unwrap();
        assert_eq!(nbsp.unicode(), unicode::SPACE);
        let shy =
            resolve_or_placeholder(&mut ctx, main, unicode::SOFT_HYPHEN, &mut visited).unwrap();
        assert_eq!(shy.unicode(), unicode::HYPHEN_MINUS);
    }

    #[test]
    fn test_missing_glyph_placeholder_preferred() {
        let mut ctx = TextContext::default();
        let main = ctx.add_font(font("Main", "a \u{2423}"));
        let mut visited = VisitedSet::new();
        let r = resolve_regular(&mut ctx, main, 'z' as u32, &mut visited);
        assert_eq!(r.element().unwrap().unicode(), 0x2423);
    }

    #[test]
    fn test_alternate_typeface_cached() {
        let mut ctx = TextContext::default();
        let regular = ctx.add_font(font("Regular", "a"));
        let bold = ctx.add_font(font("Bold", "a"));
        ctx.font_mut(regular)
            .unwrap()
            .set_weight_typeface(FontWeight::BOLD, false, bold);

        let mut visited = VisitedSet::new();
        let (styles, weight) = (FontStyles::BOLD, FontWeight::REGULAR);
        let r = resolve(&mut ctx, regular, 'a' as u32, styles, weight, &mut visited);
        match r {
            Resolution::Found { element, alternate_typeface } => {
                assert!(alternate_typeface);
                assert_eq!(owner(&element), bold);
            }
            other => panic!("unexpected {other:?}"),
        }
        let key = VariantKey::new('a' as u32, FontStyles::BOLD, FontWeight::BOLD, true);
        assert!(ctx.font(regular).unwrap().cached_variant(key).is_some());

        let plain = resolve_regular(&mut ctx, regular, 'a' as u32, &mut visited);
        assert_eq!(owner(plain.element().unwrap()), regular);
    }

    #[test]
    fn test_default_sprite_after_fonts() {
        let mut ctx = TextContext::default();
        let main = ctx.add_font(font("Main", "a"));
        let mut sheet = SpriteAsset::new("emoji", FaceInfo::default(), 128, 128);
        sheet.add_sprite(SpriteGlyph::new(
            "smile",
            Some(0x1F600),
            Glyph::new(
                0,
                GlyphMetrics::new(32.0, 32.0, 0.0, 28.0, 32.0),
                GlyphRect::new(0, 0, 32, 32),
            ),
        ));
        let sprite = ctx.add_sprite(sheet);

        let mut visited = VisitedSet::new();
        let r = resolve_regular(&mut ctx, main, 0x1F600, &mut visited);
        assert_eq!(r.element().unwrap().asset(), crate::glyph::AssetRef::Sprite(sprite));
    }

    #[test]
    fn test_has_characters_across_chain() {
        let mut ctx = TextContext::default();
        let main = ctx.add_font(font("Main", "ab"));
        let other = ctx.add_font(font("Other", "c"));
        ctx.font_mut(main).unwrap().fallback_fonts.push(other);

        assert_eq!(has_characters(&mut ctx, main, "abc", true), (true, vec![]));
        assert_eq!(
            has_characters(&mut ctx, main, "abcz", false),
            (false, vec!['c' as u32, 'z' as u32])
        );
    }
}
