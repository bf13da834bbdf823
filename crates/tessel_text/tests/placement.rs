mod common;

use tessel_text::{
    HorizontalAlignment, PairAdjustmentRecord, SyntheticFace, TextLayoutEngine, ValueRecord,
};

use common::{context_with, options};

#[test]
fn wrap_undoes_kerning_of_the_kept_glyph() {
    let face = SyntheticFace::new("Test")
        .with_glyphs("ab-V", 500.0)
        .with_kerning('-', 'V', -200.0);
    let (mut ctx, font) = context_with(face);
    let opts = options(font).with_box(Some(170.0), None);

    let result = TextLayoutEngine::new().layout(&mut ctx, "a-Vb", &opts).unwrap();
    assert_eq!(result.line_text(0), "a-");
    assert_eq!(result.line_text(1), "Vb");
    assert_eq!(result.characters[1].x_advance, 50.0);
    assert_eq!(result.lines[0].width, 100.0);

    // Alignment sees the unkerned width
    let opts = opts.with_alignment(HorizontalAlignment::Right);
    let result = TextLayoutEngine::new().layout(&mut ctx, "a-Vb", &opts).unwrap();
    assert_eq!(result.characters[0].origin, 70.0);
}

#[test]
fn kerning_survives_when_the_pair_stays_together() {
    let face = SyntheticFace::new("Test")
        .with_glyphs("ab-V", 500.0)
        .with_kerning('-', 'V', -200.0);
    let (mut ctx, font) = context_with(face);

    let result = TextLayoutEngine::new().layout(&mut ctx, "a-Vb", &options(font)).unwrap();
    assert_eq!(result.lines.len(), 1);
    assert_eq!(result.characters[1].x_advance, 30.0);
    assert_eq!(result.characters[2].origin, 80.0);
}

fn spaced_pair_face(ignore_spacing: bool) -> SyntheticFace {
    let face = SyntheticFace::new("Test").with_glyphs("AV", 500.0);
    let mut record = PairAdjustmentRecord::new(
        face.glyph_index_of('A'),
        ValueRecord::new(0.0, 0.0, -100.0, 0.0),
        face.glyph_index_of('V'),
        ValueRecord::default(),
    );
    record.ignore_spacing = ignore_spacing;
    face.with_pair_adjustment(record)
}

#[test]
fn pair_adjustment_can_suppress_character_spacing() {
    for (ignore_spacing, next_origin) in [(false, 110.0), (true, 100.0)] {
        let (mut ctx, font) = context_with(spaced_pair_face(ignore_spacing));
        let mut opts = options(font);
        // 10 px at size 100
        opts.character_spacing = 10.0;

        let result = TextLayoutEngine::new().layout(&mut ctx, "AVA", &opts).unwrap();
        // A: 50 + 10 spacing - 10 kerning
        assert_eq!(result.characters[0].x_advance, 50.0);
        assert_eq!(result.characters[1].origin, 50.0);
        assert_eq!(result.characters[2].origin, next_origin, "ignore_spacing={ignore_spacing}");
    }
}

#[test]
fn attached_mark_adds_no_spacing() {
    let face = SyntheticFace::new("Test")
        .with_glyphs("ab", 500.0)
        .with_glyph('\u{0301}', 0.0)
        .with_mark_to_base('a', (250.0, 700.0), '\u{0301}', (0.0, 0.0));
    let (mut ctx, font) = context_with(face);
    let mut opts = options(font);
    opts.character_spacing = 10.0;

    let result = TextLayoutEngine::new()
        .layout(&mut ctx, "a\u{0301}b", &opts)
        .unwrap();
    assert_eq!(result.characters.len(), 3);
    assert_eq!(result.characters[1].x_advance, 0.0);
    assert_eq!(result.characters[1].origin + result.characters[1].x_offset, 25.0);
    assert_eq!(result.characters[2].origin, 60.0);
}
