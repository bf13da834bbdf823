//! In-memory rasterizer backend
//!
//! A face described entirely in code: code points, advances in design
//! units, and feature records. Glyph bitmaps are solid boxes. Useful for
//! deterministic layout without system fonts, and for the CLI's
//! `--synthetic` mode.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::{
    Anchor, LigatureRecord, MarkAdjustmentRecord, PairAdjustmentRecord, ValueRecord,
};
use crate::glyph::{FaceInfo, GlyphMetrics};
use crate::rasterizer::{
    FeatureKind, FeatureRecords, GlyphFormat, GlyphRasterizer, LoadFlags, RasterizedGlyph,
};
use crate::unicode;
use crate::{Result, TextError};

#[derive(Debug, Clone)]
struct SyntheticGlyph {
    codepoint: Option<u32>,
    advance: f32,
}

/// Face description for [`SyntheticRasterizer`]
#[derive(Debug, Clone)]
pub struct SyntheticFace {
    pub family_name: String,
    pub units_per_em: u16,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
    glyphs: Vec<SyntheticGlyph>,
    cmap: FxHashMap<u32, u32>,
    ligatures: Vec<LigatureRecord>,
    pairs: Vec<PairAdjustmentRecord>,
    mark_to_base: Vec<MarkAdjustmentRecord>,
    mark_to_mark: Vec<MarkAdjustmentRecord>,
    fail_load: bool,
}

impl SyntheticFace {
    /// Empty face: 1000 units per em, ascender 800, descender -200
    pub fn new(family_name: &str) -> Self {
        Self {
            family_name: family_name.to_string(),
            units_per_em: 1000,
            ascender: 800.0,
            descender: -200.0,
            line_gap: 0.0,
            // Index 0 is .notdef
            glyphs: vec![SyntheticGlyph {
                codepoint: None,
                advance: 500.0,
            }],
            cmap: FxHashMap::default(),
            ligatures: Vec::new(),
            pairs: Vec::new(),
            mark_to_base: Vec::new(),
            mark_to_mark: Vec::new(),
            fail_load: false,
        }
    }

    /// Add a glyph and return its index; `None` leaves it unmapped
    pub fn add_glyph(&mut self, codepoint: Option<u32>, advance: f32) -> u32 {
        let index = self.glyphs.len() as u32;
        self.glyphs.push(SyntheticGlyph { codepoint, advance });
        if let Some(cp) = codepoint {
            self.cmap.entry(cp).or_insert(index);
        }
        index
    }

    pub fn with_glyph(mut self, c: char, advance: f32) -> Self {
        self.add_glyph(Some(c as u32), advance);
        self
    }

    /// Map every char of `chars` with the same advance
    pub fn with_glyphs(mut self, chars: &str, advance: f32) -> Self {
        for c in chars.chars() {
            self.add_glyph(Some(c as u32), advance);
        }
        self
    }

    /// Add an unmapped ligature glyph substituting the chars of `components`
    pub fn with_ligature(mut self, components: &str, advance: f32) -> Self {
        let indices: Vec<u32> = components
            .chars()
            .map(|c| self.glyph_index_of(c))
            .collect();
        let ligature = self.add_glyph(None, advance);
        self.ligatures.push(LigatureRecord::new(&indices, ligature));
        self
    }

    /// Kern the pair `first`,`second` by adjusting the first advance
    pub fn with_kerning(self, first: char, second: char, x_advance: f32) -> Self {
        let record = PairAdjustmentRecord::new(
            self.glyph_index_of(first),
            ValueRecord::new(0.0, 0.0, x_advance, 0.0),
            self.glyph_index_of(second),
            ValueRecord::default(),
        );
        self.with_pair_adjustment(record)
    }

    pub fn with_pair_adjustment(mut self, record: PairAdjustmentRecord) -> Self {
        self.pairs.push(record);
        self
    }

    pub fn with_mark_to_base(
        mut self,
        base: char,
        base_anchor: (f32, f32),
        mark: char,
        mark_anchor: (f32, f32),
    ) -> Self {
        let record = MarkAdjustmentRecord::new(
            self.glyph_index_of(base),
            Anchor::new(base_anchor.0, base_anchor.1),
            self.glyph_index_of(mark),
            Anchor::new(mark_anchor.0, mark_anchor.1),
        );
        self.mark_to_base.push(record);
        self
    }

    pub fn with_mark_to_mark(
        mut self,
        base_mark: char,
        base_anchor: (f32, f32),
        mark: char,
        mark_anchor: (f32, f32),
    ) -> Self {
        let record = MarkAdjustmentRecord::new(
            self.glyph_index_of(base_mark),
            Anchor::new(base_anchor.0, base_anchor.1),
            self.glyph_index_of(mark),
            Anchor::new(mark_anchor.0, mark_anchor.1),
        );
        self.mark_to_mark.push(record);
        self
    }

    /// Make every `load_face` call fail
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Glyph index of a mapped char, 0 if unmapped
    pub fn glyph_index_of(&self, c: char) -> u32 {
        self.cmap.get(&(c as u32)).copied().unwrap_or(0)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

/// [`GlyphRasterizer`] over a [`SyntheticFace`]
#[derive(Debug)]
pub struct SyntheticRasterizer {
    face: SyntheticFace,
    point_size: Option<f32>,
    queries: Arc<AtomicUsize>,
}

impl SyntheticRasterizer {
    pub fn new(face: SyntheticFace) -> Self {
        Self {
            face,
            point_size: None,
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `glyph_index` calls
    pub fn query_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.queries)
    }

    fn scale(&self) -> f32 {
        self.point_size.unwrap_or(0.0) / self.face.units_per_em.max(1) as f32
    }
}

impl GlyphRasterizer for SyntheticRasterizer {
    fn identity(&self) -> &str {
        &self.face.family_name
    }

    fn load_face(&mut self, point_size: f32, face_index: u32) -> Result<FaceInfo> {
        if self.face.fail_load {
            return Err(TextError::FaceLoadFailure(format!(
                "synthetic face '{}' refuses to load",
                self.face.family_name
            )));
        }
        self.point_size = Some(point_size);
        let s = self.scale();
        let face = &self.face;
        let space_advance = face
            .cmap
            .get(&unicode::SPACE)
            .and_then(|&i| face.glyphs.get(i as usize))
            .map(|g| g.advance)
            .unwrap_or(face.units_per_em as f32 / 4.0);

        Ok(FaceInfo {
            family_name: face.family_name.clone(),
            style_name: "Regular".to_string(),
            face_index,
            point_size,
            units_per_em: face.units_per_em,
            scale: 1.0,
            line_height: (face.ascender - face.descender + face.line_gap) * s,
            ascent_line: face.ascender * s,
            cap_line: face.ascender * 0.7 * s,
            mean_line: face.ascender * 0.5 * s,
            baseline: 0.0,
            descent_line: face.descender * s,
            superscript_offset: face.ascender * s,
            superscript_size: 0.5,
            subscript_offset: face.descender * s,
            subscript_size: 0.5,
            underline_offset: face.descender * 0.5 * s,
            underline_thickness: face.units_per_em as f32 * 0.05 * s,
            strikethrough_offset: face.ascender * 0.25 * s,
            tab_width: space_advance * s,
        })
    }

    fn glyph_index(&mut self, codepoint: u32) -> u32 {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.face.cmap.get(&codepoint).copied().unwrap_or(0)
    }

    fn rasterize(&mut self, glyph_index: u32, flags: LoadFlags) -> Result<RasterizedGlyph> {
        if self.point_size.is_none() {
            return Err(TextError::FaceLoadFailure("face not loaded".into()));
        }
        let s = self.scale();
        let glyph = self
            .face
            .glyphs
            .get(glyph_index as usize)
            .ok_or(TextError::InvalidFontData)?;

        let advance = glyph.advance * s;
        let blank = glyph
            .codepoint
            .map(|cp| unicode::is_breaking_whitespace(cp) || unicode::is_non_breaking(cp))
            .unwrap_or(false);

        if blank || flags.contains(LoadFlags::METRICS_ONLY) {
            return Ok(RasterizedGlyph::empty(
                glyph_index,
                GlyphMetrics::new(0.0, 0.0, 0.0, 0.0, advance),
            ));
        }

        let width = (advance.ceil() as u32).max(1);
        let height = ((self.face.ascender * 0.7 * s).ceil() as u32).max(1);
        let metrics = GlyphMetrics::new(width as f32, height as f32, 0.0, height as f32, advance);
        let (bitmap, format) = if flags.contains(LoadFlags::COLOR) {
            (vec![255u8; (width * height * 4) as usize], GlyphFormat::Rgba)
        } else {
            (vec![255u8; (width * height) as usize], GlyphFormat::Alpha)
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
        let set: FxHashSet<u32> = glyphs.iter().copied().collect();
        let face = &self.face;

        match kind {
            FeatureKind::Ligature => FeatureRecords::Ligatures(
                face.ligatures
                    .iter()
                    .filter(|r| r.components.iter().all(|g| set.contains(g)))
                    .cloned()
                    .collect(),
            ),
            FeatureKind::PairAdjustment => FeatureRecords::PairAdjustments(
                face.pairs
                    .iter()
                    .filter(|r| set.contains(&r.first_glyph) && set.contains(&r.second_glyph))
                    .copied()
                    .collect(),
            ),
            FeatureKind::MarkToBase => FeatureRecords::MarkToBase(
                face.mark_to_base
                    .iter()
                    .filter(|r| set.contains(&r.base_glyph) && set.contains(&r.mark_glyph))
                    .copied()
                    .collect(),
            ),
            FeatureKind::MarkToMark => FeatureRecords::MarkToMark(
                face.mark_to_mark
                    .iter()
                    .filter(|r| set.contains(&r.base_glyph) && set.contains(&r.mark_glyph))
                    .copied()
                    .collect(),
            ),
        }
    }
}
