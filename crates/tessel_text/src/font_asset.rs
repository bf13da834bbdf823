//! Font assets
//!
//! A font asset bundles face metrics, glyph/character tables, feature tables
//! and an atlas. Static assets only serve what their tables contain. Dynamic
//! assets own a [`GlyphRasterizer`] and grow their tables and atlas on
//! demand.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::atlas::GlyphAtlas;
use crate::context::FontId;
use crate::features::FontFeatureTable;
use crate::glyph::{Character, FaceInfo, FontWeight, Glyph, TextElement, VariantKey};
use crate::rasterizer::{FeatureKind, GlyphRasterizer, LoadFlags, RasterizedGlyph};
use crate::settings::AtlasSettings;
use crate::store::GlyphStore;
use crate::{Result, TextError};

const FEATURE_KINDS: [FeatureKind; 4] = [
    FeatureKind::Ligature,
    FeatureKind::PairAdjustment,
    FeatureKind::MarkToBase,
    FeatureKind::MarkToMark,
];

/// Stable 64-bit hash of an asset name
pub fn name_hash(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

/// How a font asset's atlas gets populated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AtlasPopulationMode {
    /// Tables are fixed; nothing is rasterized at runtime
    Static,
    /// Missing glyphs are rasterized and packed on demand
    #[default]
    Dynamic,
}

/// Alternate typefaces for one weight slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightTypefaces {
    pub regular: Option<FontId>,
    pub italic: Option<FontId>,
}

/// Outcome of a batch dynamic add
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddCharactersOutcome {
    pub all_added: bool,
    /// Code points that could not be added, in request order
    pub missing: Vec<u32>,
}

/// Glyph cache for one font face
pub struct FontAsset {
    name: String,
    hash_code: u64,
    material_hash: u64,
    face_info: FaceInfo,
    store: GlyphStore,
    features: FontFeatureTable,
    atlas: GlyphAtlas,
    population_mode: AtlasPopulationMode,
    source: Option<Box<dyn GlyphRasterizer>>,
    face_loaded: bool,
    sampling_point_size: f32,
    load_flags: LoadFlags,
    /// Searched in order when a code point is missing
    pub fallback_fonts: Vec<FontId>,
    weight_table: [WeightTypefaces; 10],
    variant_cache: FxHashMap<VariantKey, TextElement>,
    missing_unicodes: FxHashSet<u32>,
    /// Extra advance for synthesized bold, in 1/100 em
    pub bold_spacing: f32,
    /// Horizontal shear for synthesized italic, per unit of glyph height
    pub italic_slant: f32,
}

impl FontAsset {
    /// Dynamic asset over a rasterizer; the face loads on first use
    pub fn new_dynamic(
        name: &str,
        source: Box<dyn GlyphRasterizer>,
        atlas: &AtlasSettings,
    ) -> Self {
        let mut asset = Self::empty(name, FaceInfo::default(), atlas_from_settings(atlas));
        asset.population_mode = AtlasPopulationMode::Dynamic;
        asset.sampling_point_size = atlas.sampling_point_size;
        asset.source = Some(source);
        asset
    }

    /// Dynamic asset with its face loaded up front
    pub fn from_source(
        name: &str,
        source: Box<dyn GlyphRasterizer>,
        atlas: &AtlasSettings,
    ) -> Result<Self> {
        let mut asset = Self::new_dynamic(name, source, atlas);
        asset.load_face()?;
        Ok(asset)
    }

    /// Static asset from persisted tables
    pub fn from_tables(
        name: &str,
        face_info: FaceInfo,
        glyphs: Vec<Glyph>,
        characters: Vec<Character>,
    ) -> Self {
        let atlas = GlyphAtlas::new(
            AtlasSettings::default().width,
            AtlasSettings::default().height,
            0,
            Default::default(),
        );
        let mut asset = Self::empty(name, face_info, atlas);
        asset.store = GlyphStore::from_tables(glyphs, characters);
        asset.population_mode = AtlasPopulationMode::Static;
        asset.face_loaded = true;
        asset.store.initialize(&asset.face_info);
        asset
    }

    fn empty(name: &str, face_info: FaceInfo, atlas: GlyphAtlas) -> Self {
        Self {
            name: name.to_string(),
            hash_code: name_hash(name),
            material_hash: name_hash(&format!("{name}:material")),
            face_info,
            store: GlyphStore::new(),
            features: FontFeatureTable::new(),
            atlas,
            population_mode: AtlasPopulationMode::Static,
            source: None,
            face_loaded: false,
            sampling_point_size: 90.0,
            load_flags: LoadFlags::DEFAULT,
            fallback_fonts: Vec::new(),
            weight_table: [WeightTypefaces::default(); 10],
            variant_cache: FxHashMap::default(),
            missing_unicodes: FxHashSet::default(),
            bold_spacing: 7.0,
            italic_slant: 0.35,
        }
    }

    /// Replace the feature tables (persisted static assets)
    pub fn with_features(mut self, features: FontFeatureTable) -> Self {
        self.features = features;
        self
    }

    pub fn with_load_flags(mut self, flags: LoadFlags) -> Self {
        self.load_flags = flags;
        self
    }

    /// (Re)load the face and rebuild the lookup dictionaries.
    ///
    /// On failure the previous state is left untouched.
    pub fn load_face(&mut self) -> Result<&FaceInfo> {
        let Some(source) = self.source.as_mut() else {
            return Ok(&self.face_info);
        };
        let face_index = self.face_info.face_index;
        let face_info = source.load_face(self.sampling_point_size, face_index)?;
        tracing::debug!(
            "Loaded face '{}' ({} {}) at {}pt",
            self.name,
            face_info.family_name,
            face_info.style_name,
            face_info.point_size
        );
        self.face_info = face_info;
        self.face_loaded = true;
        self.store.initialize(&self.face_info);
        Ok(&self.face_info)
    }

    fn ensure_face(&mut self) -> Result<()> {
        if !self.face_loaded {
            self.load_face()?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash_code(&self) -> u64 {
        self.hash_code
    }

    pub fn material_hash(&self) -> u64 {
        self.material_hash
    }

    pub fn face_info(&self) -> &FaceInfo {
        &self.face_info
    }

    pub fn store(&self) -> &GlyphStore {
        &self.store
    }

    pub fn features(&self) -> &FontFeatureTable {
        &self.features
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut GlyphAtlas {
        &mut self.atlas
    }

    pub fn population_mode(&self) -> AtlasPopulationMode {
        self.population_mode
    }

    pub fn is_dynamic(&self) -> bool {
        self.population_mode == AtlasPopulationMode::Dynamic && self.source.is_some()
    }

    /// Code points confirmed absent from the backing resource
    pub fn missing_unicodes(&self) -> &FxHashSet<u32> {
        &self.missing_unicodes
    }

    pub fn has_character(&self, unicode: u32) -> bool {
        self.store.has_character(unicode)
    }

    /// Local lookup without touching the rasterizer
    pub fn lookup(&self, unicode: u32) -> Option<(Character, Glyph)> {
        self.store.lookup(unicode)
    }

    pub fn glyph(&self, index: u32) -> Option<&Glyph> {
        self.store.glyph(index)
    }

    /// Register an alternate typeface for a weight
    pub fn set_weight_typeface(&mut self, weight: FontWeight, italic: bool, font: FontId) {
        let slot = &mut self.weight_table[weight.slot()];
        if italic {
            slot.italic = Some(font);
        } else {
            slot.regular = Some(font);
        }
    }

    pub fn weight_typeface(&self, weight: FontWeight, italic: bool) -> Option<FontId> {
        let slot = &self.weight_table[weight.slot()];
        if italic {
            slot.italic
        } else {
            slot.regular
        }
    }

    pub fn cached_variant(&self, key: VariantKey) -> Option<TextElement> {
        self.variant_cache.get(&key).copied()
    }

    pub fn cache_variant(&mut self, key: VariantKey, element: TextElement) {
        self.variant_cache.entry(key).or_insert(element);
    }

    /// Drop references to a removed font
    pub fn forget_font(&mut self, font: FontId) {
        self.fallback_fonts.retain(|f| *f != font);
        for slot in &mut self.weight_table {
            if slot.regular == Some(font) {
                slot.regular = None;
            }
            if slot.italic == Some(font) {
                slot.italic = None;
            }
        }
        self.variant_cache.retain(|_, e| e.font() != Some(font));
    }

    /// Add one code point through the rasterizer.
    ///
    /// Already present code points succeed without work. Code points the
    /// source lacks are remembered and fail fast afterwards.
    pub fn try_add_character(&mut self, unicode: u32) -> Result<Character> {
        if let Some(character) = self.store.character(unicode) {
            return Ok(*character);
        }
        if !self.is_dynamic() || self.missing_unicodes.contains(&unicode) {
            return Err(TextError::GlyphNotInSource(unicode));
        }
        self.ensure_face()?;

        let glyph_index = self.query_glyph_index(unicode)?;
        if !self.store.has_glyph(glyph_index) {
            let raster = self.rasterize(glyph_index)?;
            let glyph = self.atlas.place(&raster)?;
            self.store.add_glyph(glyph);
            self.update_features(&[glyph_index]);
        }

        self.store.add_character(unicode, glyph_index);
        tracing::trace!(
            "Added U+{:04X} as glyph {} to '{}'",
            unicode,
            glyph_index,
            self.name
        );
        Ok(Character::new(unicode, glyph_index))
    }

    /// Add a batch of code points, packing new glyphs together
    pub fn try_add_characters(&mut self, unicodes: &[u32]) -> AddCharactersOutcome {
        let mut outcome = AddCharactersOutcome {
            all_added: true,
            missing: Vec::new(),
        };
        let fail = |outcome: &mut AddCharactersOutcome, cp: u32| {
            outcome.all_added = false;
            if !outcome.missing.contains(&cp) {
                outcome.missing.push(cp);
            }
        };

        let mut pending: Vec<(u32, u32)> = Vec::new();
        let mut seen = FxHashSet::default();

        for &unicode in unicodes {
            if !seen.insert(unicode) || self.store.has_character(unicode) {
                continue;
            }
            if !self.is_dynamic() || self.missing_unicodes.contains(&unicode) {
                fail(&mut outcome, unicode);
                continue;
            }
            if let Err(err) = self.ensure_face() {
                tracing::warn!("Cannot add characters to '{}': {}", self.name, err);
                fail(&mut outcome, unicode);
                continue;
            }
            match self.query_glyph_index(unicode) {
                Ok(index) if self.store.has_glyph(index) => {
                    self.store.add_character(unicode, index);
                }
                Ok(index) => pending.push((unicode, index)),
                Err(_) => fail(&mut outcome, unicode),
            }
        }

        let mut rasters: Vec<RasterizedGlyph> = Vec::new();
        for &(_, index) in &pending {
            if rasters.iter().any(|r| r.index == index) {
                continue;
            }
            match self.rasterize(index) {
                Ok(raster) => rasters.push(raster),
                Err(err) => tracing::warn!("Failed to rasterize glyph {}: {}", index, err),
            }
        }

        let (_, glyphs) = self.atlas.pack_glyphs(&rasters);
        let new_indices: Vec<u32> = glyphs.iter().map(|g| g.index).collect();
        for glyph in glyphs {
            self.store.add_glyph(glyph);
        }

        for (unicode, index) in pending {
            if self.store.has_glyph(index) {
                self.store.add_character(unicode, index);
            } else {
                fail(&mut outcome, unicode);
            }
        }

        if !new_indices.is_empty() {
            self.update_features(&new_indices);
        }

        outcome
    }

    /// Local check over a string, optionally adding what is missing
    pub fn has_characters(&mut self, text: &str, try_add: bool) -> AddCharactersOutcome {
        let unicodes: Vec<u32> = text.chars().map(|c| c as u32).collect();
        if try_add && self.is_dynamic() {
            return self.try_add_characters(&unicodes);
        }
        let mut missing: Vec<u32> = Vec::new();
        for cp in unicodes {
            if !self.store.has_character(cp) && !missing.contains(&cp) {
                missing.push(cp);
            }
        }
        AddCharactersOutcome {
            all_added: missing.is_empty(),
            missing,
        }
    }

    /// Reset a dynamic asset to an empty atlas and tables
    pub fn clear_dynamic_data(&mut self) {
        if self.population_mode != AtlasPopulationMode::Dynamic {
            tracing::warn!("'{}' is static; nothing to clear", self.name);
            return;
        }
        self.store.clear();
        self.features.clear();
        self.atlas.clear();
        self.variant_cache.clear();
        self.missing_unicodes.clear();
        self.store.initialize(&self.face_info);
    }

    fn query_glyph_index(&mut self, unicode: u32) -> Result<u32> {
        let source = self.source.as_mut().ok_or(TextError::GlyphNotInSource(unicode))?;
        let index = source.glyph_index(unicode);
        if index == 0 {
            self.missing_unicodes.insert(unicode);
            return Err(TextError::GlyphNotInSource(unicode));
        }
        Ok(index)
    }

    fn rasterize(&mut self, glyph_index: u32) -> Result<RasterizedGlyph> {
        let flags = self.load_flags;
        let source = self.source.as_mut().ok_or(TextError::InvalidFontData)?;
        source.rasterize(glyph_index, flags)
    }

    /// Pull feature records touching the new glyphs, then make sure every
    /// ligature output glyph is in the atlas.
    fn update_features(&mut self, new_indices: &[u32]) {
        let all = self.store.glyph_indices();
        let Some(source) = self.source.as_mut() else {
            return;
        };

        for kind in FEATURE_KINDS {
            let records = source.feature_records(kind, &all);
            let added = self.features.import(records);
            if added > 0 {
                tracing::trace!("'{}': {} new {:?} records", self.name, added, kind);
            }
        }

        let outputs: Vec<u32> = self
            .features
            .ligatures()
            .map(|r| r.ligature)
            .filter(|g| !self.store.has_glyph(*g))
            .collect();

        for index in outputs {
            let placed = self
                .rasterize(index)
                .and_then(|raster| self.atlas.place(&raster));
            match placed {
                Ok(glyph) => {
                    self.store.add_glyph(glyph);
                }
                Err(err) => tracing::warn!("Ligature glyph {} not added: {}", index, err),
            }
        }

        tracing::trace!("Feature update for {} new glyph(s)", new_indices.len());
    }
}

impl std::fmt::Debug for FontAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAsset")
            .field("name", &self.name)
            .field("population_mode", &self.population_mode)
            .field("glyphs", &self.store.glyph_count())
            .field("characters", &self.store.character_count())
            .field("surfaces", &self.atlas.surface_count())
            .finish()
    }
}

fn atlas_from_settings(settings: &AtlasSettings) -> GlyphAtlas {
    GlyphAtlas::new(
        settings.width,
        settings.height,
        settings.padding,
        settings.render_mode,
    )
    .with_multi_atlas(settings.multi_atlas, settings.max_surfaces)
    .with_packing_mode(settings.packing_mode)
}

#[cfg(test)]
mod tests {
    use crate::synthetic::{SyntheticFace, SyntheticRasterizer};
    use std::sync::atomic::Ordering;
    use super::*;

    fn settings() -> AtlasSettings {
        AtlasSettings {
            width: 256,
            height: 256,
            padding: 1,
            sampling_point_size: 100.0,
            ..Default::default()
        }
    }

    fn face() -> SyntheticFace {
        SyntheticFace::new("Synth")
            .with_glyph(' ', 250.0)
            .with_glyphs("abcfi", 500.0)
            .with_ligature("fi", 600.0)
    }

    fn dynamic_asset() -> FontAsset {
        let rasterizer = Box::new(SyntheticRasterizer::new(face()));
        FontAsset::from_source("Synth", rasterizer, &settings()).unwrap()
    }

    #[test]
    fn test_dynamic_add_round_trip() {
        let mut asset = dynamic_asset();
        let outcome = asset.try_add_characters(&['a' as u32, 'b' as u32, 'z' as u32]);
        assert!(!outcome.all_added);
        assert_eq!(outcome.missing, vec!['z' as u32]);
        assert!(asset.has_character('a' as u32));
        assert!(asset.has_character('b' as u32));
        assert!(!asset.has_character('z' as u32));
        assert!(asset.missing_unicodes().contains(&('z' as u32)));
    }

    #[test]
    fn test_missing_cache_skips_rasterizer() {
        let raster = SyntheticRasterizer::new(face());
        let counter = raster.query_counter();
        let mut asset = FontAsset::from_source("Synth", Box::new(raster), &settings()).unwrap();

        assert!(asset.try_add_character('z' as u32).is_err());
        assert!(asset.try_add_character('z' as u32).is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_ligature_output_glyph_added_with_components() {
        let mut asset = dynamic_asset();
        asset.try_add_characters(&['f' as u32, 'i' as u32]);
        let f = asset.lookup('f' as u32).unwrap().0.glyph_index;
        let i = asset.lookup('i' as u32).unwrap().0.glyph_index;
        let m = asset.features().match_ligature(&[f, i], 0, |_| false).unwrap();
        assert!(asset.glyph(m.ligature).is_some());
    }

    #[test]
    fn test_face_load_failure_is_per_call() {
        let raster = SyntheticRasterizer::new(SyntheticFace::new("Broken").failing_load());
        let mut asset = FontAsset::new_dynamic("Broken", Box::new(raster), &settings());
        assert!(matches!(
            asset.try_add_character('a' as u32),
            Err(TextError::FaceLoadFailure(_))
        ));
        // Not cached as missing: the face may load later.
        assert!(asset.missing_unicodes().is_empty());
    }

    #[test]
    fn test_capacity_exhaustion_reports_missing() {
        let tiny = AtlasSettings {
            width: 40,
            height: 40,
            padding: 0,
            multi_atlas: false,
            sampling_point_size: 100.0,
            ..Default::default()
        };
        let raster = SyntheticRasterizer::new(face());
        let mut asset = FontAsset::from_source("Synth", Box::new(raster), &tiny).unwrap();
        // Each glyph is 50px wide, wider than the atlas.
        let outcome = asset.try_add_characters(&['a' as u32]);
        assert!(!outcome.all_added);
        assert!(!asset.missing_unicodes().contains(&('a' as u32)));
    }

    #[test]
    fn test_static_asset_never_rasterizes() {
        let mut asset =
            FontAsset::from_tables("Static", FaceInfo::default(), Vec::new(), Vec::new());
        assert!(matches!(
            asset.try_add_character('a' as u32),
            Err(TextError::GlyphNotInSource(0x61))
        ));
        // Placeholders are always present.
        assert!(asset.has_character(0x0A));
    }

    #[test]
    fn test_clear_dynamic_data() {
        let mut asset = dynamic_asset();
        asset.try_add_characters(&['a' as u32, 'f' as u32, 'i' as u32]);
        assert!(asset.store().glyph_count() > 0);
        asset.clear_dynamic_data();
        assert_eq!(asset.store().glyph_count(), 0);
        assert!(asset.features().is_empty());
        assert_eq!(asset.atlas().surface_count(), 1);
        assert!(asset.has_character(0x09));
        assert!(asset.try_add_character('a' as u32).is_ok());
    }

    #[test]
    fn test_has_characters_without_adding() {
        let mut asset = dynamic_asset();
        let outcome = asset.has_characters("ab", false);
        assert!(!outcome.all_added);
        assert_eq!(outcome.missing.len(), 2);
        assert!(asset.has_characters("ab", true).all_added);
        assert!(asset.has_characters("ab", false).all_added);
    }
}
