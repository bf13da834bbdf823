//! Rasterizer backend over real font data
//!
//! swash renders glyphs and reports face metrics; ttf-parser walks the
//! GSUB/GPOS lookups referenced by the `liga`, `kern`, `mark` and `mkmk`
//! features to produce feature records.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use lru::LruCache;
use rustc_hash::FxHashSet;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;
use ttf_parser::gpos::{PairAdjustment, PositioningSubtable};
use ttf_parser::gsub::SubstitutionSubtable;
use ttf_parser::opentype_layout::LayoutTable;
use ttf_parser::{GlyphId, Tag};

use crate::features::{
    Anchor, LigatureRecord, MarkAdjustmentRecord, PairAdjustmentRecord, ValueRecord,
};
use crate::glyph::{FaceInfo, GlyphMetrics};
use crate::rasterizer::{
    FeatureKind, FeatureRecords, GlyphFormat, GlyphRasterizer, LoadFlags, RasterizedGlyph,
};
use crate::registry::FontSource;
use crate::{Result, TextError};

const CMAP_CACHE_SIZE: usize = 1024;

/// Glyph rasterizer using swash
pub struct SwashRasterizer {
    identity: String,
    data: Arc<Vec<u8>>,
    face_index: u32,
    point_size: Option<f32>,
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
    cmap_cache: LruCache<u32, u32>,
}

impl SwashRasterizer {
    /// Wrap font bytes; fails if the face does not parse
    pub fn from_data(identity: &str, data: Arc<Vec<u8>>, face_index: u32) -> Result<Self> {
        ttf_parser::Face::parse(&data, face_index)
            .map_err(|e| TextError::FontParseError(e.to_string()))?;
        let cache_size = NonZeroUsize::new(CMAP_CACHE_SIZE).ok_or(TextError::InvalidFontData)?;

        Ok(Self {
            identity: identity.to_string(),
            data,
            face_index,
            point_size: None,
            scale_context: ScaleContext::new(),
            cmap_cache: LruCache::new(cache_size),
        })
    }

    pub fn from_source(source: &FontSource) -> Result<Self> {
        Self::from_data(&source.family_name, Arc::clone(&source.data), source.face_index)
    }

    /// Read a font file from disk
    pub fn from_file(path: &Path, face_index: u32) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            TextError::FaceLoadFailure(format!("Failed to read font file {:?}: {}", path, e))
        })?;
        Self::from_data(&path.display().to_string(), Arc::new(data), face_index)
    }

    fn swash_font(&self) -> Result<swash::FontRef<'_>> {
        swash::FontRef::from_index(&self.data, self.face_index as usize)
            .ok_or(TextError::InvalidFontData)
    }

    fn parse_face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.face_index).ok()
    }
}

impl GlyphRasterizer for SwashRasterizer {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn load_face(&mut self, point_size: f32, face_index: u32) -> Result<FaceInfo> {
        if face_index != self.face_index {
            self.face_index = face_index;
            self.cmap_cache.clear();
        }

        let font = self.swash_font()?;
        let metrics = font.metrics(&[]);
        if metrics.units_per_em == 0 {
            return Err(TextError::FaceLoadFailure(format!(
                "'{}' reports zero units per em",
                self.identity
            )));
        }
        let scale = point_size / metrics.units_per_em as f32;
        let space = font.charmap().map(' ');
        let space_advance = font.glyph_metrics(&[]).advance_width(space) * scale;

        let (family_name, style_name) = self
            .parse_face()
            .map(|face| {
                let name = |id: u16| {
                    face.names()
                        .into_iter()
                        .filter(|n| n.name_id == id && n.is_unicode())
                        .find_map(|n| n.to_string())
                };
                (
                    name(ttf_parser::name_id::FAMILY).unwrap_or_else(|| self.identity.clone()),
                    name(ttf_parser::name_id::SUBFAMILY).unwrap_or_else(|| "Regular".to_string()),
                )
            })
            .unwrap_or_else(|| (self.identity.clone(), "Regular".to_string()));

        let ascent = metrics.ascent * scale;
        let descent = -metrics.descent * scale;

        self.point_size = Some(point_size);
        Ok(FaceInfo {
            family_name,
            style_name,
            face_index,
            point_size,
            units_per_em: metrics.units_per_em,
            scale: 1.0,
            line_height: (metrics.ascent + metrics.descent + metrics.leading) * scale,
            ascent_line: ascent,
            cap_line: metrics.cap_height * scale,
            mean_line: metrics.x_height * scale,
            baseline: 0.0,
            descent_line: descent,
            superscript_offset: ascent,
            superscript_size: 0.5,
            subscript_offset: descent,
            subscript_size: 0.5,
            underline_offset: metrics.underline_offset * scale,
            underline_thickness: metrics.stroke_size * scale,
            strikethrough_offset: metrics.strikeout_offset * scale,
            tab_width: space_advance,
        })
    }

    fn glyph_index(&mut self, codepoint: u32) -> u32 {
        if let Some(index) = self.cmap_cache.get(&codepoint) {
            return *index;
        }
        let index = match self.swash_font() {
            Ok(font) => font.charmap().map(codepoint) as u32,
            Err(_) => 0,
        };
        self.cmap_cache.put(codepoint, index);
        index
    }

    fn rasterize(&mut self, glyph_index: u32, flags: LoadFlags) -> Result<RasterizedGlyph> {
        let point_size = self
            .point_size
            .ok_or_else(|| TextError::FaceLoadFailure("face not loaded".to_string()))?;
        let glyph_id = u16::try_from(glyph_index).map_err(|_| TextError::InvalidFontData)?;
        let font = swash::FontRef::from_index(&self.data, self.face_index as usize)
            .ok_or(TextError::InvalidFontData)?;

        let scale = point_size / font.metrics(&[]).units_per_em.max(1) as f32;
        let advance = font.glyph_metrics(&[]).advance_width(glyph_id) * scale;

        if flags.contains(LoadFlags::METRICS_ONLY) {
            return Ok(RasterizedGlyph::empty(
                glyph_index,
                GlyphMetrics::new(0.0, 0.0, 0.0, 0.0, advance),
            ));
        }

        let mut scaler = self
            .scale_context
            .builder(font)
            .size(point_size)
            .hint(!flags.contains(LoadFlags::NO_HINTING))
            .build();

        let color = flags.contains(LoadFlags::COLOR);
        let mut render = if color {
            Render::new(&[
                Source::ColorBitmap(StrikeWith::BestFit),
                Source::ColorOutline(0),
                Source::Outline,
            ])
        } else {
            Render::new(&[
                Source::ColorOutline(0),
                Source::ColorBitmap(StrikeWith::BestFit),
                Source::Outline,
            ])
        };
        render.format(if color { Format::Subpixel } else { Format::Alpha });

        let Some(image) = render.render(&mut scaler, glyph_id) else {
            // Empty glyph (like space) - no bitmap but has advance
            return Ok(RasterizedGlyph::empty(
                glyph_index,
                GlyphMetrics::new(0.0, 0.0, 0.0, 0.0, advance),
            ));
        };

        let width = image.placement.width;
        let height = image.placement.height;
        let metrics = GlyphMetrics::new(
            width as f32,
            height as f32,
            image.placement.left as f32,
            image.placement.top as f32,
            advance,
        );

        let rgba_len = (width * height * 4) as usize;
        let (bitmap, format) = match (color, image.data.len() == rgba_len) {
            (true, true) => (image.data, GlyphFormat::Rgba),
            // Fallback: convert grayscale to RGBA
            (true, false) => (
                image
                    .data
                    .iter()
                    .flat_map(|&alpha| [255, 255, 255, alpha])
                    .collect(),
                GlyphFormat::Rgba,
            ),
            (false, _) => (image.data, GlyphFormat::Alpha),
        };

        Ok(RasterizedGlyph {
            index: glyph_index,
            metrics,
            width,
            height,
            bitmap,
            format,
        })
    }

    fn feature_records(&mut self, kind: FeatureKind, glyphs: &[u32]) -> FeatureRecords {
        let Some(face) = self.parse_face() else {
            return FeatureRecords::empty(kind);
        };
        let set: FxHashSet<u16> = glyphs
            .iter()
            .filter_map(|g| u16::try_from(*g).ok())
            .collect();
        let mut sorted: Vec<u16> = set.iter().copied().collect();
        sorted.sort_unstable();

        let tables = face.tables();
        match kind {
            FeatureKind::Ligature => FeatureRecords::Ligatures(
                tables
                    .gsub
                    .as_ref()
                    .map(|gsub| ligature_records(gsub, &set, &sorted))
                    .unwrap_or_default(),
            ),
            FeatureKind::PairAdjustment => FeatureRecords::PairAdjustments(
                tables
                    .gpos
                    .as_ref()
                    .map(|gpos| pair_records(gpos, &sorted))
                    .unwrap_or_default(),
            ),
            FeatureKind::MarkToBase => FeatureRecords::MarkToBase(
                tables
                    .gpos
                    .as_ref()
                    .map(|gpos| mark_records(gpos, &sorted, false))
                    .unwrap_or_default(),
            ),
            FeatureKind::MarkToMark => FeatureRecords::MarkToMark(
                tables
                    .gpos
                    .as_ref()
                    .map(|gpos| mark_records(gpos, &sorted, true))
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Lookup indices referenced by any feature with one of `tags`, in order
fn feature_lookups(table: &LayoutTable<'_>, tags: &[&[u8; 4]]) -> Vec<u16> {
    let tags: Vec<Tag> = tags.iter().map(|t| Tag::from_bytes(t)).collect();
    let mut indices: Vec<u16> = table
        .features
        .into_iter()
        .filter(|feature| tags.contains(&feature.tag))
        .flat_map(|feature| feature.lookup_indices.into_iter())
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn ligature_records(
    gsub: &LayoutTable<'_>,
    set: &FxHashSet<u16>,
    sorted: &[u16],
) -> Vec<LigatureRecord> {
    let mut records = Vec::new();

    for lookup_index in feature_lookups(gsub, &[b"liga", b"rlig"]) {
        let Some(lookup) = gsub.lookups.get(lookup_index) else {
            continue;
        };
        for subtable in lookup.subtables.into_iter::<SubstitutionSubtable>() {
            let SubstitutionSubtable::Ligature(subst) = subtable else {
                continue;
            };
            for &first in sorted {
                let Some(set_index) = subst.coverage.get(GlyphId(first)) else {
                    continue;
                };
                let Some(ligature_set) = subst.ligature_sets.get(set_index) else {
                    continue;
                };
                for ligature in ligature_set {
                    if !ligature.components.into_iter().all(|g| set.contains(&g.0)) {
                        continue;
                    }
                    let mut components = vec![first as u32];
                    components.extend(ligature.components.into_iter().map(|g| g.0 as u32));
                    records.push(LigatureRecord::new(&components, ligature.glyph.0 as u32));
                }
            }
        }
    }

    records
}

fn value_record(value: &ttf_parser::gpos::ValueRecord<'_>) -> ValueRecord {
    ValueRecord::new(
        value.x_placement as f32,
        value.y_placement as f32,
        value.x_advance as f32,
        value.y_advance as f32,
    )
}

fn pair_records(gpos: &LayoutTable<'_>, sorted: &[u16]) -> Vec<PairAdjustmentRecord> {
    let mut records = Vec::new();

    for lookup_index in feature_lookups(gpos, &[b"kern"]) {
        let Some(lookup) = gpos.lookups.get(lookup_index) else {
            continue;
        };
        for subtable in lookup.subtables.into_iter::<PositioningSubtable>() {
            let PositioningSubtable::Pair(pair) = subtable else {
                continue;
            };
            for &first in sorted {
                let pairs: Vec<(u16, ValueRecord, ValueRecord)> = match &pair {
                    PairAdjustment::Format1 { coverage, sets } => {
                        let Some(pair_set) = coverage.get(GlyphId(first)).and_then(|i| sets.get(i))
                        else {
                            continue;
                        };
                        sorted
                            .iter()
                            .filter_map(|&second| {
                                pair_set
                                    .get(GlyphId(second))
                                    .map(|(a, b)| (second, value_record(&a), value_record(&b)))
                            })
                            .collect()
                    }
                    PairAdjustment::Format2 {
                        coverage,
                        classes,
                        matrix,
                    } => {
                        if coverage.get(GlyphId(first)).is_none() {
                            continue;
                        }
                        let first_class = classes.0.get(GlyphId(first));
                        sorted
                            .iter()
                            .filter_map(|&second| {
                                let second_class = classes.1.get(GlyphId(second));
                                matrix
                                    .get((first_class, second_class))
                                    .map(|(a, b)| (second, value_record(&a), value_record(&b)))
                            })
                            .collect()
                    }
                };

                for (second, a, b) in pairs {
                    if a.is_zero() && b.is_zero() {
                        continue;
                    }
                    records.push(PairAdjustmentRecord::new(first as u32, a, second as u32, b));
                }
            }
        }
    }

    records
}

fn mark_records(
    gpos: &LayoutTable<'_>,
    sorted: &[u16],
    mark_to_mark: bool,
) -> Vec<MarkAdjustmentRecord> {
    let mut records = Vec::new();
    let tag: &[u8; 4] = if mark_to_mark { b"mkmk" } else { b"mark" };

    for lookup_index in feature_lookups(gpos, &[tag]) {
        let Some(lookup) = gpos.lookups.get(lookup_index) else {
            continue;
        };
        for subtable in lookup.subtables.into_iter::<PositioningSubtable>() {
            let (mark_coverage, base_coverage, marks, anchors) = match subtable {
                PositioningSubtable::MarkToBase(t) if !mark_to_mark => {
                    (t.mark_coverage, t.base_coverage, t.marks, t.anchors)
                }
                PositioningSubtable::MarkToMark(t) if mark_to_mark => {
                    (t.mark1_coverage, t.mark2_coverage, t.marks, t.mark2_matrix)
                }
                _ => continue,
            };

            for &mark in sorted {
                let Some((class, mark_anchor)) = mark_coverage
                    .get(GlyphId(mark))
                    .and_then(|i| marks.get(i))
                else {
                    continue;
                };
                for &base in sorted {
                    if base == mark && !mark_to_mark {
                        continue;
                    }
                    let Some(base_anchor) = base_coverage
                        .get(GlyphId(base))
                        .and_then(|i| anchors.get(i, class))
                    else {
                        continue;
                    };
                    records.push(MarkAdjustmentRecord::new(
                        base as u32,
                        Anchor::new(base_anchor.x as f32, base_anchor.y as f32),
                        mark as u32,
                        Anchor::new(mark_anchor.x as f32, mark_anchor.y as f32),
                    ));
                }
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage_data() {
        let result = SwashRasterizer::from_data("garbage", Arc::new(vec![0u8; 64]), 0);
        assert!(matches!(result, Err(TextError::FontParseError(_))));
    }

    #[test]
    fn test_missing_file_is_face_load_failure() {
        let result = SwashRasterizer::from_file(Path::new("/nonexistent/font.ttf"), 0);
        assert!(matches!(result, Err(TextError::FaceLoadFailure(_))));
    }

    #[test]
    fn test_system_font_round_trip() {
        use crate::registry::{FontRegistry, GenericFont};

        let mut registry = FontRegistry::new();
        let source = match registry.load_generic_with_style(GenericFont::SansSerif, 400, false) {
            Ok(source) => source,
            Err(_) => {
                println!("No fonts available - skipping test (CI environment)");
                return;
            }
        };
        let mut raster = SwashRasterizer::from_source(&source).unwrap();
        let face = raster.load_face(48.0, source.face_index).unwrap();
        assert!(face.ascent_line > 0.0);
        assert!(face.descent_line <= 0.0);

        let index = raster.glyph_index('A' as u32);
        assert_ne!(index, 0);
        let glyph = raster.rasterize(index, LoadFlags::DEFAULT).unwrap();
        assert!(glyph.width > 0 && glyph.height > 0);
        assert_eq!(glyph.bitmap.len(), (glyph.width * glyph.height) as usize);
    }
}
