//! Text settings
//!
//! Read-only configuration consulted by resolution and layout. Loaded from
//! TOML; every field has a default so partial files are fine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::atlas::{PackingMode, RenderMode};
use crate::{Result, TextError};

/// Global text settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextSettings {
    /// Code point shown for unresolvable characters
    #[serde(default = "default_missing_glyph")]
    pub missing_glyph_codepoint: u32,
    /// Log a warning for every unresolved code point
    #[serde(default = "default_true")]
    pub warnings_enabled: bool,
    /// System families loaded as global fallbacks, in order
    #[serde(default)]
    pub fallback_font_families: Vec<String>,
    /// Family of the global default font
    #[serde(default)]
    pub default_font_family: Option<String>,
    /// Characters that may not start a line
    #[serde(default = "default_leading_characters")]
    pub leading_characters: String,
    /// Characters that may not end a line
    #[serde(default = "default_following_characters")]
    pub following_characters: String,
    /// Break Hangul at spaces instead of between syllables
    #[serde(default)]
    pub modern_hangul_line_breaking: bool,
    #[serde(default = "default_ellipsis")]
    pub ellipsis_codepoint: u32,
    #[serde(default = "default_auto_size_iterations")]
    pub auto_size_max_iterations: u32,
    /// Word-wrap rewinds allowed on one line before the pass gives up
    #[serde(default = "default_recursion_guard")]
    pub recursion_guard_limit: u32,
    #[serde(default)]
    pub atlas: AtlasSettings,
}

fn default_missing_glyph() -> u32 {
    0x2423
}

fn default_true() -> bool {
    true
}

fn default_leading_characters() -> String {
    "!%),.:;?]}¢°·'\"†‡›℃∶、。〃〆〕〗〞﹚﹜！＂％＇），．：；？］｝～｣､々〉》」』】〙〟ゝゞァィゥェォッャュョヮヵヶーヽヾ…‥"
        .to_string()
}

fn default_following_characters() -> String {
    "([{£¥'\"‵〈《「『【〔〖〝﹙﹛＄（．［｛￡￥｢〘".to_string()
}

fn default_ellipsis() -> u32 {
    0x2026
}

fn default_auto_size_iterations() -> u32 {
    100
}

fn default_recursion_guard() -> u32 {
    1000
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            missing_glyph_codepoint: default_missing_glyph(),
            warnings_enabled: true,
            fallback_font_families: Vec::new(),
            default_font_family: None,
            leading_characters: default_leading_characters(),
            following_characters: default_following_characters(),
            modern_hangul_line_breaking: false,
            ellipsis_codepoint: default_ellipsis(),
            auto_size_max_iterations: default_auto_size_iterations(),
            recursion_guard_limit: default_recursion_guard(),
            atlas: AtlasSettings::default(),
        }
    }
}

/// Defaults for newly created font asset atlases
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AtlasSettings {
    #[serde(default = "default_atlas_size")]
    pub width: u32,
    #[serde(default = "default_atlas_size")]
    pub height: u32,
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Point size glyphs are rasterized at
    #[serde(default = "default_sampling_size")]
    pub sampling_point_size: f32,
    #[serde(default = "default_true")]
    pub multi_atlas: bool,
    #[serde(default = "default_max_surfaces")]
    pub max_surfaces: usize,
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default)]
    pub packing_mode: PackingMode,
}

fn default_atlas_size() -> u32 {
    1024
}

fn default_padding() -> u32 {
    9
}

fn default_sampling_size() -> f32 {
    90.0
}

fn default_max_surfaces() -> usize {
    8
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            width: default_atlas_size(),
            height: default_atlas_size(),
            padding: default_padding(),
            sampling_point_size: default_sampling_size(),
            multi_atlas: true,
            max_surfaces: default_max_surfaces(),
            render_mode: RenderMode::default(),
            packing_mode: PackingMode::default(),
        }
    }
}

impl TextSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: TextSettings =
            toml::from_str(content).map_err(|e| TextError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| TextError::Settings(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TextError::Settings(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.atlas.width == 0 || self.atlas.height == 0 {
            return Err(TextError::Settings("atlas size must be non-zero".into()));
        }
        if self.atlas.sampling_point_size <= 0.0 {
            return Err(TextError::Settings(
                "sampling_point_size must be positive".into(),
            ));
        }
        if char::from_u32(self.missing_glyph_codepoint).is_none() {
            return Err(TextError::Settings(format!(
                "missing_glyph_codepoint {:#X} is not a scalar value",
                self.missing_glyph_codepoint
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TextSettings::default();
        assert_eq!(settings.missing_glyph_codepoint, 0x2423);
        assert_eq!(settings.ellipsis_codepoint, 0x2026);
        assert_eq!(settings.auto_size_max_iterations, 100);
        assert!(settings.atlas.multi_atlas);
        assert!(settings.leading_characters.contains('。'));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = TextSettings::from_toml_str(
            r#"
            warnings_enabled = false
            fallback_font_families = ["Noto Sans CJK KR", "Noto Color Emoji"]

            [atlas]
            width = 512
            render_mode = "rgba"
            "#,
        )
        .unwrap();
        assert!(!settings.warnings_enabled);
        assert_eq!(settings.fallback_font_families.len(), 2);
        assert_eq!(settings.atlas.width, 512);
        assert_eq!(settings.atlas.height, 1024);
        assert_eq!(settings.atlas.render_mode, RenderMode::Rgba);
        assert_eq!(settings.missing_glyph_codepoint, 0x2423);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let settings = TextSettings::default();
        let text = settings.to_toml().unwrap();
        assert_eq!(TextSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            TextSettings::from_toml_str("[atlas]\nwidth = 0"),
            Err(TextError::Settings(_))
        ));
        assert!(TextSettings::from_toml_str("missing_glyph_codepoint = 55296").is_err());
        assert!(TextSettings::from_toml_str("warnings_enabled = 3").is_err());
    }
}
