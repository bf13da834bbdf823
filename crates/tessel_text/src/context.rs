//! Text context
//!
//! Owns every font and sprite asset plus the settings. Nothing in the crate
//! keeps global state; resolution and layout borrow a context.

use slotmap::{new_key_type, SlotMap};

use crate::font_asset::FontAsset;
use crate::glyph::{AssetRef, FaceInfo};
use crate::settings::TextSettings;
use crate::sprite::SpriteAsset;
use crate::unicode::LineBreakRules;

new_key_type! {
    /// Handle to a font asset owned by a [`TextContext`]
    pub struct FontId;
    /// Handle to a sprite asset owned by a [`TextContext`]
    pub struct SpriteId;
}

/// Owner of fonts, sprites, fallback lists and settings
pub struct TextContext {
    fonts: SlotMap<FontId, FontAsset>,
    sprites: SlotMap<SpriteId, SpriteAsset>,
    settings: TextSettings,
    line_break_rules: LineBreakRules,
    global_fallbacks: Vec<FontId>,
    default_font: Option<FontId>,
    default_sprite: Option<SpriteId>,
}

impl Default for TextContext {
    fn default() -> Self {
        Self::new(TextSettings::default())
    }
}

impl TextContext {
    pub fn new(settings: TextSettings) -> Self {
        let line_break_rules = LineBreakRules::from_settings(&settings);
        Self {
            fonts: SlotMap::with_key(),
            sprites: SlotMap::with_key(),
            settings,
            line_break_rules,
            global_fallbacks: Vec::new(),
            default_font: None,
            default_sprite: None,
        }
    }

    pub fn settings(&self) -> &TextSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TextSettings) {
        self.line_break_rules = LineBreakRules::from_settings(&settings);
        self.settings = settings;
    }

    pub fn line_break_rules(&self) -> &LineBreakRules {
        &self.line_break_rules
    }

    /// Take ownership of a font asset; the first one becomes the default font
    pub fn add_font(&mut self, asset: FontAsset) -> FontId {
        tracing::debug!("Registered font asset '{}'", asset.name());
        let id = self.fonts.insert(asset);
        if self.default_font.is_none() {
            self.default_font = Some(id);
        }
        id
    }

    /// Remove a font asset and every reference to it
    pub fn remove_font(&mut self, id: FontId) -> Option<FontAsset> {
        let asset = self.fonts.remove(id)?;
        self.global_fallbacks.retain(|f| *f != id);
        if self.default_font == Some(id) {
            self.default_font = None;
        }
        for (_, other) in self.fonts.iter_mut() {
            other.forget_font(id);
        }
        Some(asset)
    }

    pub fn font(&self, id: FontId) -> Option<&FontAsset> {
        self.fonts.get(id)
    }

    pub fn font_mut(&mut self, id: FontId) -> Option<&mut FontAsset> {
        self.fonts.get_mut(id)
    }

    pub fn font_by_name(&self, name: &str) -> Option<FontId> {
        self.fonts
            .iter()
            .find(|(_, asset)| asset.name().eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    pub fn fonts(&self) -> impl Iterator<Item = (FontId, &FontAsset)> {
        self.fonts.iter()
    }

    pub fn add_sprite(&mut self, asset: SpriteAsset) -> SpriteId {
        let id = self.sprites.insert(asset);
        if self.default_sprite.is_none() {
            self.default_sprite = Some(id);
        }
        id
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&SpriteAsset> {
        self.sprites.get(id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut SpriteAsset> {
        self.sprites.get_mut(id)
    }

    pub fn sprite_by_name(&self, name: &str) -> Option<SpriteId> {
        self.sprites
            .iter()
            .find(|(_, asset)| asset.name().eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    pub fn global_fallbacks(&self) -> &[FontId] {
        &self.global_fallbacks
    }

    pub fn set_global_fallbacks(&mut self, fallbacks: Vec<FontId>) {
        self.global_fallbacks = fallbacks;
    }

    pub fn push_global_fallback(&mut self, id: FontId) {
        if !self.global_fallbacks.contains(&id) {
            self.global_fallbacks.push(id);
        }
    }

    pub fn default_font(&self) -> Option<FontId> {
        self.default_font
    }

    pub fn set_default_font(&mut self, id: Option<FontId>) {
        self.default_font = id;
    }

    pub fn default_sprite(&self) -> Option<SpriteId> {
        self.default_sprite
    }

    pub fn set_default_sprite(&mut self, id: Option<SpriteId>) {
        self.default_sprite = id;
    }

    /// Face metrics of either asset kind
    pub fn face_info(&self, asset: AssetRef) -> Option<&FaceInfo> {
        match asset {
            AssetRef::Font(id) => self.fonts.get(id).map(FontAsset::face_info),
            AssetRef::Sprite(id) => self.sprites.get(id).map(SpriteAsset::face_info),
        }
    }

    pub fn material_hash(&self, asset: AssetRef) -> Option<u64> {
        match asset {
            AssetRef::Font(id) => self.fonts.get(id).map(FontAsset::material_hash),
            AssetRef::Sprite(id) => self.sprites.get(id).map(SpriteAsset::material_hash),
        }
    }

    pub fn asset_name(&self, asset: AssetRef) -> Option<&str> {
        match asset {
            AssetRef::Font(id) => self.fonts.get(id).map(FontAsset::name),
            AssetRef::Sprite(id) => self.sprites.get(id).map(SpriteAsset::name),
        }
    }
}
