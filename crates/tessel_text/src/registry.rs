//! Font registry for system font discovery and caching
//!
//! Uses fontdb to discover system fonts by name or generic category and
//! hands out their bytes for [`SwashRasterizer`](crate::SwashRasterizer)
//! backed font assets.

use std::path::Path;
use std::sync::Arc;

use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use rustc_hash::FxHashMap;

use crate::font_asset::FontAsset;
use crate::settings::AtlasSettings;
use crate::swash_backend::SwashRasterizer;
use crate::{Result, TextError};

/// Generic font category for fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GenericFont {
    /// Default system UI font
    #[default]
    System,
    /// Monospace font for code
    Monospace,
    /// Serif font
    Serif,
    /// Sans-serif font
    SansSerif,
}

impl GenericFont {
    fn family(self) -> Family<'static> {
        match self {
            GenericFont::System | GenericFont::SansSerif => Family::SansSerif,
            GenericFont::Monospace => Family::Monospace,
            GenericFont::Serif => Family::Serif,
        }
    }
}

/// Raw font data plus the face to use inside it
#[derive(Debug, Clone)]
pub struct FontSource {
    pub family_name: String,
    pub data: Arc<Vec<u8>>,
    pub face_index: u32,
}

/// Font registry that discovers and caches system fonts
pub struct FontRegistry {
    /// fontdb database containing all known fonts
    db: Database,
    /// Cached sources (Some = found, None = not found)
    sources: FxHashMap<String, Option<FontSource>>,
}

fn cache_key(name: &str, weight: u16, italic: bool) -> String {
    format!("{}:w{}:{}", name, weight, if italic { "i" } else { "n" })
}

impl FontRegistry {
    /// Create a registry over the system fonts
    pub fn new() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("Font registry found {} faces", db.len());
        Self {
            db,
            sources: FxHashMap::default(),
        }
    }

    /// Create a registry with no fonts at all
    pub fn empty() -> Self {
        Self {
            db: Database::new(),
            sources: FxHashMap::default(),
        }
    }

    /// Make a font file available by family name
    pub fn load_font_file(&mut self, path: &Path) -> Result<()> {
        self.db.load_font_file(path).map_err(|e| {
            TextError::FaceLoadFailure(format!("Failed to read font file {:?}: {}", path, e))
        })
    }

    /// Load a font by family name with a weight and italic style
    pub fn load_font_with_style(
        &mut self,
        name: &str,
        weight: u16,
        italic: bool,
    ) -> Result<FontSource> {
        let key = cache_key(name, weight, italic);
        self.query_cached(key, Family::Name(name), weight, italic)
            .ok_or_else(|| {
                TextError::FaceLoadFailure(format!(
                    "Font '{}' (weight={}, italic={}) not found",
                    name, weight, italic
                ))
            })
    }

    /// Load a generic font category with a weight and italic style
    pub fn load_generic_with_style(
        &mut self,
        generic: GenericFont,
        weight: u16,
        italic: bool,
    ) -> Result<FontSource> {
        let key = cache_key(&format!("__generic_{:?}", generic), weight, italic);
        self.query_cached(key, generic.family(), weight, italic)
            .ok_or_else(|| {
                TextError::FaceLoadFailure(format!(
                    "Generic font {:?} (weight={}, italic={}) not found",
                    generic, weight, italic
                ))
            })
    }

    /// Named font, falling back to a generic category with the same style
    pub fn load_with_fallback(
        &mut self,
        name: Option<&str>,
        generic: GenericFont,
        weight: u16,
        italic: bool,
    ) -> Result<FontSource> {
        if let Some(name) = name {
            let already_tried = self.sources.contains_key(&cache_key(name, weight, italic));
            if let Ok(source) = self.load_font_with_style(name, weight, italic) {
                return Ok(source);
            }
            // Only warn on the first failure for this font
            if !already_tried {
                tracing::warn!(
                    "Font '{}' (weight={}, italic={}) not found, falling back to {:?}",
                    name,
                    weight,
                    italic,
                    generic
                );
            }
        }
        self.load_generic_with_style(generic, weight, italic)
    }

    /// Build a dynamic font asset for a family
    pub fn create_asset(
        &mut self,
        name: &str,
        weight: u16,
        italic: bool,
        atlas: &AtlasSettings,
    ) -> Result<FontAsset> {
        let source = self.load_font_with_style(name, weight, italic)?;
        let rasterizer = SwashRasterizer::from_source(&source)?;
        FontAsset::from_source(name, Box::new(rasterizer), atlas)
    }

    /// List available font families
    pub fn list_families(&self) -> Vec<String> {
        let mut families: Vec<String> = self
            .db
            .faces()
            .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .collect();

        families.sort();
        families.dedup();
        families
    }

    /// Check if a font is available
    pub fn has_font(&self, name: &str) -> bool {
        let query = Query {
            families: &[Family::Name(name)],
            weight: Weight::NORMAL,
            style: Style::Normal,
            stretch: Stretch::Normal,
        };
        self.db.query(&query).is_some()
    }

    fn query_cached(
        &mut self,
        key: String,
        family: Family<'_>,
        weight: u16,
        italic: bool,
    ) -> Option<FontSource> {
        // Check cache first (includes failed lookups as None)
        if let Some(cached) = self.sources.get(&key) {
            return cached.clone();
        }

        let families = [family];
        let mut query = Query {
            families: &families,
            weight: Weight(weight),
            style: if italic { Style::Italic } else { Style::Normal },
            stretch: Stretch::Normal,
        };
        let mut id = self.db.query(&query);
        // Try with Oblique if Italic wasn't found
        if id.is_none() && italic {
            query.style = Style::Oblique;
            id = self.db.query(&query);
        }

        let source = id.and_then(|id| match self.load_by_id(id) {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::warn!("Failed to load font {}: {}", key, e);
                None
            }
        });
        self.sources.insert(key, source.clone());
        source
    }

    fn load_by_id(&self, id: fontdb::ID) -> Result<FontSource> {
        let family_name = self
            .db
            .face(id)
            .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_default();
        let (src, face_index) = self
            .db
            .face_source(id)
            .ok_or_else(|| TextError::FaceLoadFailure("Font source not found".to_string()))?;

        let data = match src {
            Source::File(path) => std::fs::read(&path).map_err(|e| {
                TextError::FaceLoadFailure(format!("Failed to read font file {:?}: {}", path, e))
            })?,
            Source::Binary(arc) => arc.as_ref().as_ref().to_vec(),
            Source::SharedFile(_path, data) => data.as_ref().as_ref().to_vec(),
        };

        Ok(FontSource {
            family_name,
            data: Arc::new(data),
            face_index,
        })
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_caches_misses() {
        let mut registry = FontRegistry::empty();
        assert!(registry.load_font_with_style("Nope", 400, false).is_err());
        assert!(registry.sources.contains_key("Nope:w400:n"));
        assert!(matches!(
            registry.load_font_with_style("Nope", 400, false),
            Err(TextError::FaceLoadFailure(_))
        ));
        assert!(registry.list_families().is_empty());
    }

    #[test]
    fn test_fallback_to_generic() {
        let mut registry = FontRegistry::new();
        // May be empty in minimal CI environments without fonts
        let missing = Some("Definitely Not A Font");
        match registry.load_with_fallback(missing, GenericFont::SansSerif, 400, false) {
            Ok(source) => assert!(!source.data.is_empty()),
            Err(e) => println!("No generic fonts available ({e}) - skipping"),
        }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("Inter", 700, true), "Inter:w700:i");
        assert_eq!(cache_key("Inter", 400, false), "Inter:w400:n");
    }
}
