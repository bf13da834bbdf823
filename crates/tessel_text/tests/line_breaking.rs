mod common;

use tessel_text::{LayoutDiagnostic, OverflowMode, SyntheticFace, TextLayoutEngine, TextSettings};

use common::{context_with, context_with_settings, latin_face, options};

fn cjk_face() -> SyntheticFace {
    SyntheticFace::new("Test")
        .with_glyphs("漢字（。가나다라", 500.0)
        .with_glyph(' ', 250.0)
}

#[test]
fn ideographs_break_between_any_pair() {
    let (mut ctx, font) = context_with(cjk_face());
    let opts = options(font).with_box(Some(100.0), None);

    let result = TextLayoutEngine::new().layout(&mut ctx, "漢字漢", &opts).unwrap();
    assert_eq!(result.line_text(0), "漢字");
    assert_eq!(result.line_text(1), "漢");
}

#[test]
fn closing_punctuation_never_starts_a_line() {
    let (mut ctx, font) = context_with(cjk_face());
    let opts = options(font).with_box(Some(100.0), None);

    let result = TextLayoutEngine::new().layout(&mut ctx, "漢字。", &opts).unwrap();
    assert_eq!(result.lines.len(), 2);
    assert_eq!(result.line_text(0), "漢");
    assert_eq!(result.line_text(1), "字。");
}

#[test]
fn opening_bracket_never_ends_a_line() {
    let (mut ctx, font) = context_with(cjk_face());
    let opts = options(font).with_box(Some(100.0), None);

    let result = TextLayoutEngine::new().layout(&mut ctx, "漢（字", &opts).unwrap();
    assert_eq!(result.line_text(0), "漢");
    assert_eq!(result.line_text(1), "（字");
}

#[test]
fn hangul_breaking_follows_settings() {
    let opts = |font| options(font).with_box(Some(150.0), None);

    // Syllables break like ideographs by default
    let (mut ctx, font) = context_with(cjk_face());
    let result = TextLayoutEngine::new().layout(&mut ctx, "가 나다라", &opts(font)).unwrap();
    assert_eq!(result.line_text(0), "가 나");
    assert_eq!(result.line_text(1), "다라");

    // Modern Hangul breaks at spaces only
    let settings = TextSettings {
        modern_hangul_line_breaking: true,
        ..Default::default()
    };
    let (mut ctx, font) = context_with_settings(cjk_face(), settings);
    let result = TextLayoutEngine::new().layout(&mut ctx, "가 나다라", &opts(font)).unwrap();
    assert_eq!(result.line_text(0), "가 ");
    assert_eq!(result.line_text(1), "나다라");
}

#[test]
fn recursion_guard_truncates_and_reports() {
    let settings = TextSettings {
        recursion_guard_limit: 0,
        ..Default::default()
    };
    let (mut ctx, font) = context_with_settings(latin_face(), settings);
    let opts = options(font).with_box(Some(250.0), None);

    let result = TextLayoutEngine::new().layout(&mut ctx, "abc abc", &opts).unwrap();
    assert!(result.is_truncated);
    assert_eq!(result.visible_text(), "abca");
    assert!(result
        .diagnostics
        .contains(&LayoutDiagnostic::RecursionGuardTripped { index: 5 }));
}

#[test]
fn recursion_guard_counts_per_line() {
    let settings = TextSettings {
        recursion_guard_limit: 1,
        ..Default::default()
    };
    let (mut ctx, font) = context_with_settings(latin_face(), settings);
    let opts = options(font).with_box(Some(250.0), None);

    let result = TextLayoutEngine::new()
        .layout(&mut ctx, "abc abc abc abc", &opts)
        .unwrap();
    assert!(!result.is_truncated);
    assert_eq!(result.lines.len(), 4);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn each_page_starts_with_fresh_line_metrics() {
    let (mut ctx, font) = context_with(latin_face());
    let opts = options(font)
        .with_box(Some(250.0), Some(100.0))
        .with_overflow(OverflowMode::Page);

    let result = TextLayoutEngine::new()
        .layout(&mut ctx, "<size=200%>a</size>bc abc", &opts)
        .unwrap();
    assert_eq!(result.lines.len(), 2);
    assert_eq!(result.pages.len(), 2);

    // The tall glyph only affects the first page
    assert_eq!(result.lines[0].ascender, 160.0);
    assert_eq!(result.lines[1].page_index, 1);
    assert_eq!(result.lines[1].ascender, 80.0);
    assert_eq!(result.lines[1].baseline, 80.0);
    assert_eq!(result.pages[0].ascender, 160.0);
    assert_eq!(result.pages[1].ascender, 80.0);
    assert_eq!(result.pages[1].descender, -20.0);
}

#[test]
fn unwrapped_truncate_cuts_at_the_box_edge() {
    let (mut ctx, font) = context_with(latin_face());
    let opts = options(font)
        .with_box(Some(100.0), None)
        .with_wrapping(false)
        .with_overflow(OverflowMode::Truncate);

    let result = TextLayoutEngine::new().layout(&mut ctx, "abcdef", &opts).unwrap();
    assert!(result.is_truncated);
    assert_eq!(result.lines.len(), 1);
    assert_eq!(result.visible_text(), "ab");
    assert!(result.linked_overflow_index.is_none());

    let opts = opts.with_overflow(OverflowMode::Linked);
    let result = TextLayoutEngine::new().layout(&mut ctx, "abcdef", &opts).unwrap();
    assert_eq!(result.visible_text(), "ab");
    assert_eq!(result.linked_overflow_index, Some(2));
}

#[test]
fn unwrapped_ellipsis_fits_inside_the_box() {
    let (mut ctx, font) = context_with(latin_face());
    let opts = options(font)
        .with_box(Some(125.0), None)
        .with_wrapping(false)
        .with_overflow(OverflowMode::Ellipsis);

    let result = TextLayoutEngine::new().layout(&mut ctx, "abcdef", &opts).unwrap();
    assert!(result.is_truncated);
    assert_eq!(result.visible_text(), "a\u{2026}");
    assert_eq!(result.lines[0].width, 100.0);
}

#[test]
fn ellipsis_room_uses_its_own_size() {
    let (mut ctx, font) = context_with(latin_face());
    let opts = options(font)
        .with_box(Some(100.0), None)
        .with_wrapping(false)
        .with_overflow(OverflowMode::Ellipsis);

    // Half-size b's leave room for a half-size ellipsis, not a full one
    let result = TextLayoutEngine::new()
        .layout(&mut ctx, "a<size=50%>bbbbbb</size>", &opts)
        .unwrap();
    assert_eq!(result.visible_text(), "a\u{2026}");
    assert!(result
        .visible_characters()
        .all(|c| c.bottom_right.x <= 100.0 + 1e-3));
}
