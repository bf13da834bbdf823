//! Sprite assets
//!
//! Inline images (emoji, icons) addressed by code point, name or index.
//! A sprite asset behaves like a font whose glyphs are pre-packed into a
//! single texture.

use rustc_hash::FxHashMap;

use crate::context::SpriteId;
use crate::glyph::{FaceInfo, Glyph};

/// One sprite within a sprite sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteGlyph {
    pub name: String,
    /// Code point the sprite stands in for, if any
    pub unicode: Option<u32>,
    pub glyph: Glyph,
    pub scale: f32,
}

impl SpriteGlyph {
    pub fn new(name: &str, unicode: Option<u32>, glyph: Glyph) -> Self {
        Self {
            name: name.to_string(),
            unicode,
            glyph,
            scale: 1.0,
        }
    }
}

/// Sprite sheet with lookups by code point and name
#[derive(Debug, Clone)]
pub struct SpriteAsset {
    name: String,
    hash_code: u64,
    material_hash: u64,
    face_info: FaceInfo,
    texture_size: (u32, u32),
    sprites: Vec<SpriteGlyph>,
    unicode_lookup: FxHashMap<u32, usize>,
    name_lookup: FxHashMap<String, usize>,
    /// Searched in order when a lookup misses
    pub fallback_sprites: Vec<SpriteId>,
}

impl SpriteAsset {
    pub fn new(name: &str, face_info: FaceInfo, texture_width: u32, texture_height: u32) -> Self {
        Self {
            name: name.to_string(),
            hash_code: crate::font_asset::name_hash(name),
            material_hash: crate::font_asset::name_hash(&format!("{name}:material")),
            face_info,
            texture_size: (texture_width, texture_height),
            sprites: Vec::new(),
            unicode_lookup: FxHashMap::default(),
            name_lookup: FxHashMap::default(),
            fallback_sprites: Vec::new(),
        }
    }

    /// Append a sprite; false if its name or code point is taken
    pub fn add_sprite(&mut self, sprite: SpriteGlyph) -> bool {
        if self.name_lookup.contains_key(&sprite.name) {
            return false;
        }
        if let Some(cp) = sprite.unicode {
            if self.unicode_lookup.contains_key(&cp) {
                return false;
            }
        }

        let index = self.sprites.len();
        self.name_lookup.insert(sprite.name.clone(), index);
        if let Some(cp) = sprite.unicode {
            self.unicode_lookup.insert(cp, index);
        }
        self.sprites.push(sprite);
        true
    }

    pub fn by_index(&self, index: usize) -> Option<&SpriteGlyph> {
        self.sprites.get(index)
    }

    pub fn by_unicode(&self, unicode: u32) -> Option<(usize, &SpriteGlyph)> {
        let index = *self.unicode_lookup.get(&unicode)?;
        Some((index, &self.sprites[index]))
    }

    pub fn by_name(&self, name: &str) -> Option<(usize, &SpriteGlyph)> {
        let index = *self.name_lookup.get(name)?;
        Some((index, &self.sprites[index]))
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

    pub fn texture_size(&self) -> (u32, u32) {
        self.texture_size
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
