mod common;

use tessel_text::{AtlasSurface, GlyphAtlas, GlyphRect, RenderMode, SyntheticFace};

use common::{atlas_settings, font_asset};

fn assert_partition(surface: &AtlasSurface) {
    let bounds = GlyphRect::new(0, 0, surface.width(), surface.height());
    let rects: Vec<&GlyphRect> = surface.used_rects().iter().chain(surface.free_rects()).collect();
    for (i, a) in rects.iter().enumerate() {
        assert!(bounds.contains(a), "{:?} escapes the surface", a);
        for b in &rects[i + 1..] {
            assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn packing_keeps_rectangles_disjoint() {
    let mut atlas = GlyphAtlas::new(128, 128, 2, RenderMode::Alpha8).with_multi_atlas(true, 3);
    let sizes = [(13, 7), (30, 30), (5, 41), (22, 9), (1, 1), (60, 12), (9, 9), (17, 33)];
    let mut packed = 0;
    for round in 0..12 {
        for &(w, h) in &sizes {
            if atlas.pack(w + round % 3, h).is_ok() {
                packed += 1;
            }
            for surface in atlas.surfaces() {
                assert_partition(surface);
            }
        }
    }
    assert!(packed > sizes.len());
    assert!(atlas.surface_count() <= 3);
}

#[test]
fn dynamic_add_round_trip_except_absent() {
    let face = SyntheticFace::new("Test").with_glyphs("abcxyz", 400.0);
    let mut font = font_asset("Test", face);

    let outcome = font.try_add_characters(&['a' as u32, 'q' as u32, 'z' as u32, 'b' as u32]);
    assert!(!outcome.all_added);
    assert_eq!(outcome.missing, vec!['q' as u32]);

    let check = font.has_characters("azb", false);
    assert!(check.all_added);
    let check = font.has_characters("aq", false);
    assert_eq!(check.missing, vec!['q' as u32]);

    for surface in font.atlas().surfaces() {
        assert_partition(surface);
    }
}

#[test]
fn initialize_is_idempotent() {
    let face = SyntheticFace::new("Test").with_glyphs("hello", 500.0);
    let mut font = font_asset("Test", face);
    assert!(font.has_characters("hello", true).all_added);

    let info = font.face_info().clone();
    let mut store = font.store().clone();
    store.initialize(&info);
    let first_chars = store.character_lookup().clone();
    let first_glyphs = store.glyph_lookup().clone();
    store.initialize(&info);
    assert_eq!(store.character_lookup(), &first_chars);
    assert_eq!(store.glyph_lookup(), &first_glyphs);
}

#[test]
fn capacity_exhaustion_reports_missing() {
    let mut settings = atlas_settings();
    settings.width = 64;
    settings.height = 64;
    settings.multi_atlas = false;
    let face = SyntheticFace::new("Test").with_glyphs("abcdefghij", 400.0);
    let mut font = tessel_text::FontAsset::from_source(
        "Wide",
        Box::new(tessel_text::SyntheticRasterizer::new(face)),
        &settings,
    )
    .unwrap();

    let outcome = font.has_characters("abcdefghij", true);
    assert!(!outcome.all_added);
    assert!(!outcome.missing.is_empty());
    // What did fit is still usable
    assert!(font.has_character('a' as u32));
}
