//! Shared fixtures: synthetic fonts sampled at 100pt, so at layout size 100
//! one design unit is 0.1 px.

#![allow(dead_code)]

use tessel_text::{
    AtlasSettings, FontAsset, FontId, LayoutOptions, SyntheticFace, SyntheticRasterizer,
    TextContext, TextSettings,
};

pub const SAMPLING: f32 = 100.0;

pub fn atlas_settings() -> AtlasSettings {
    AtlasSettings {
        width: 256,
        height: 256,
        padding: 1,
        sampling_point_size: SAMPLING,
        multi_atlas: true,
        max_surfaces: 4,
        ..Default::default()
    }
}

pub fn font_asset(name: &str, face: SyntheticFace) -> FontAsset {
    FontAsset::from_source(name, Box::new(SyntheticRasterizer::new(face)), &atlas_settings())
        .expect("synthetic face loads")
}

pub fn context_with(face: SyntheticFace) -> (TextContext, FontId) {
    context_with_settings(face, TextSettings::default())
}

pub fn context_with_settings(face: SyntheticFace, settings: TextSettings) -> (TextContext, FontId) {
    let mut ctx = TextContext::new(settings);
    let font = ctx.add_font(font_asset("Test", face));
    (ctx, font)
}

/// Lowercase latin at 500 units, space at 250, ellipsis at 500
pub fn latin_face() -> SyntheticFace {
    SyntheticFace::new("Test")
        .with_glyphs("abcdefghijklmnopqrstuvwxyz", 500.0)
        .with_glyph(' ', 250.0)
        .with_glyph('\u{2026}', 500.0)
}

pub fn options(font: FontId) -> LayoutOptions {
    LayoutOptions::new(font).with_size(SAMPLING)
}
