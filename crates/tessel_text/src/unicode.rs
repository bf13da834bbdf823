//! Code point classification for resolution, shaping and line breaking

use rustc_hash::FxHashSet;

use crate::settings::TextSettings;

pub const SPACE: u32 = 0x20;
pub const TAB: u32 = 0x09;
pub const LINE_FEED: u32 = 0x0A;
pub const VERTICAL_TAB: u32 = 0x0B;
pub const CARRIAGE_RETURN: u32 = 0x0D;
pub const END_OF_TEXT: u32 = 0x03;
pub const NO_BREAK_SPACE: u32 = 0xA0;
pub const SOFT_HYPHEN: u32 = 0xAD;
pub const HYPHEN_MINUS: u32 = 0x2D;
pub const ZERO_WIDTH_SPACE: u32 = 0x200B;
pub const WORD_JOINER: u32 = 0x2060;
pub const LINE_SEPARATOR: u32 = 0x2028;
pub const PARAGRAPH_SEPARATOR: u32 = 0x2029;
pub const ELLIPSIS: u32 = 0x2026;

/// Coarse script grouping, used for fallback caching and break rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptBucket {
    Hangul,
    Kana,
    Han,
    Arabic,
    Devanagari,
    Thai,
    Hebrew,
    Cyrillic,
    Greek,
    Other,
}

/// Script bucket of a code point
///
/// Not a 1:1 mapping to Unicode Script; good enough to tell CJK text from
/// alphabetic text.
pub fn script_bucket(cp: u32) -> ScriptBucket {
    match cp {
        0x1100..=0x11FF // Hangul Jamo
        | 0x3130..=0x318F // Hangul Compatibility Jamo
        | 0xA960..=0xA97F // Hangul Jamo Extended-A
        | 0xAC00..=0xD7A3 // Hangul Syllables
        | 0xD7B0..=0xD7FF // Hangul Jamo Extended-B
        => ScriptBucket::Hangul,

        0x3040..=0x309F | 0x30A0..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9D => {
            ScriptBucket::Kana
        }

        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B820..=0x2CEAF
        | 0x2CEB0..=0x2EBEF => ScriptBucket::Han,

        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => {
            ScriptBucket::Arabic
        }

        0x0900..=0x097F | 0xA8E0..=0xA8FF => ScriptBucket::Devanagari,
        0x0E00..=0x0E7F => ScriptBucket::Thai,
        0x0590..=0x05FF => ScriptBucket::Hebrew,
        0x0400..=0x04FF | 0x0500..=0x052F => ScriptBucket::Cyrillic,
        0x0370..=0x03FF => ScriptBucket::Greek,
        _ => ScriptBucket::Other,
    }
}

pub fn is_hangul(cp: u32) -> bool {
    script_bucket(cp) == ScriptBucket::Hangul
}

/// Han, Kana, CJK punctuation and full-width forms
pub fn is_cjk(cp: u32) -> bool {
    matches!(script_bucket(cp), ScriptBucket::Han | ScriptBucket::Kana)
        || matches!(
            cp,
            0x2E80..=0x2FDF | 0x3000..=0x303F | 0x3190..=0x31EF | 0xFF00..=0xFF65 | 0xFFE0..=0xFFEF
        )
}

/// Combining diacritical marks and common script vowel signs
pub fn is_combining_mark(cp: u32) -> bool {
    matches!(
        cp,
        0x0300..=0x036F
            | 0x0483..=0x0489
            | 0x0591..=0x05BD
            | 0x05BF
            | 0x05C1..=0x05C2
            | 0x05C4..=0x05C5
            | 0x05C7
            | 0x0610..=0x061A
            | 0x064B..=0x065F
            | 0x0670
            | 0x06D6..=0x06DC
            | 0x06DF..=0x06E4
            | 0x0900..=0x0903
            | 0x093A..=0x094F
            | 0x0951..=0x0957
            | 0x0E31
            | 0x0E34..=0x0E3A
            | 0x0E47..=0x0E4E
            | 0x1AB0..=0x1AFF
            | 0x1DC0..=0x1DFF
            | 0x20D0..=0x20FF
            | 0x302A..=0x302F
            | 0x3099..=0x309A
            | 0xFE20..=0xFE2F
    )
}

/// Glyphs skipped in place while matching ligature components
pub fn is_ignorable_for_ligature(cp: u32) -> bool {
    is_combining_mark(cp) || matches!(cp, 0x200C | 0x200D | 0xFE00..=0xFE0F)
}

/// Breaking whitespace (excludes the no-break spaces)
pub fn is_breaking_whitespace(cp: u32) -> bool {
    matches!(
        cp,
        SPACE | TAB | 0x1680 | 0x2000..=0x2006 | 0x2008..=0x200A | 0x205F | 0x3000
    )
}

/// Spaces and joiners that glue their neighbours
pub fn is_non_breaking(cp: u32) -> bool {
    matches!(cp, NO_BREAK_SPACE | 0x2007 | 0x2011 | 0x202F | WORD_JOINER | 0xFEFF)
}

/// A break is allowed after these without any whitespace
pub fn is_break_after(cp: u32) -> bool {
    matches!(cp, HYPHEN_MINUS | SOFT_HYPHEN | 0x2010 | 0x2012..=0x2014 | ZERO_WIDTH_SPACE)
}

/// Forced line breaks; `is_paragraph_end` tells which also end a paragraph
pub fn is_line_break(cp: u32) -> bool {
    matches!(
        cp,
        LINE_FEED | VERTICAL_TAB | CARRIAGE_RETURN | LINE_SEPARATOR | PARAGRAPH_SEPARATOR
    )
}

pub fn is_paragraph_end(cp: u32) -> bool {
    matches!(cp, LINE_FEED | PARAGRAPH_SEPARATOR)
}

/// Word separators that receive justification slack
pub fn is_separator(cp: u32) -> bool {
    matches!(
        cp,
        SPACE | TAB | NO_BREAK_SPACE | 0x1680 | 0x2000..=0x200A | 0x202F | 0x205F | 0x3000
    )
}

/// Zero-advance formatting characters
pub fn is_zero_width(cp: u32) -> bool {
    matches!(
        cp,
        END_OF_TEXT | 0x061C | 0x200B..=0x200F | 0x2060..=0x2064 | 0xFEFF
    )
}

/// Latin and other alphabetic scripts (anything below CJK radicals)
pub fn is_alphabetic_script(cp: u32) -> bool {
    cp < 0x2E80 && !is_breaking_whitespace(cp) && !is_line_break(cp)
}

/// CJK line-breaking rules
///
/// `leading` code points may not start a line (closing punctuation),
/// `following` code points may not end one (opening brackets).
#[derive(Debug, Clone, Default)]
pub struct LineBreakRules {
    leading: FxHashSet<u32>,
    following: FxHashSet<u32>,
    /// Break modern Hangul at word boundaries like Latin text
    pub modern_hangul: bool,
}

impl LineBreakRules {
    pub fn new(leading: &str, following: &str, modern_hangul: bool) -> Self {
        Self {
            leading: leading.chars().map(|c| c as u32).collect(),
            following: following.chars().map(|c| c as u32).collect(),
            modern_hangul,
        }
    }

    pub fn from_settings(settings: &TextSettings) -> Self {
        Self::new(
            &settings.leading_characters,
            &settings.following_characters,
            settings.modern_hangul_line_breaking,
        )
    }

    pub fn forbids_line_start(&self, cp: u32) -> bool {
        self.leading.contains(&cp)
    }

    pub fn forbids_line_end(&self, cp: u32) -> bool {
        self.following.contains(&cp)
    }

    /// Whether a line may break between `prev` and `next` without whitespace
    ///
    /// Between ideographic characters any pair breaks unless the rules
    /// forbid it; an alphabetic character followed by CJK always breaks.
    pub fn can_break_between(&self, prev: u32, next: u32) -> bool {
        let cjk_like = |cp: u32| is_cjk(cp) || (is_hangul(cp) && !self.modern_hangul);

        if !cjk_like(prev) && !cjk_like(next) {
            return false;
        }
        if is_alphabetic_script(prev) && cjk_like(next) && !self.forbids_line_start(next) {
            return true;
        }
        !self.forbids_line_end(prev) && !self.forbids_line_start(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_buckets() {
        assert_eq!(script_bucket('가' as u32), ScriptBucket::Hangul);
        assert_eq!(script_bucket('カ' as u32), ScriptBucket::Kana);
        assert_eq!(script_bucket('漢' as u32), ScriptBucket::Han);
        assert_eq!(script_bucket('A' as u32), ScriptBucket::Other);
    }

    #[test]
    fn test_break_classes() {
        assert!(is_breaking_whitespace(SPACE));
        assert!(!is_breaking_whitespace(NO_BREAK_SPACE));
        assert!(is_non_breaking(NO_BREAK_SPACE));
        assert!(is_break_after(HYPHEN_MINUS));
        assert!(is_line_break(LINE_FEED));
        assert!(!is_paragraph_end(VERTICAL_TAB));
        assert!(is_ignorable_for_ligature(0x0301));
        assert!(!is_ignorable_for_ligature('a' as u32));
    }

    #[test]
    fn test_cjk_break_rules() {
        let rules = LineBreakRules::new("。」", "「", false);
        let han = '漢' as u32;
        assert!(rules.can_break_between(han, han));
        assert!(!rules.can_break_between(han, '。' as u32));
        assert!(!rules.can_break_between('「' as u32, han));
        assert!(rules.can_break_between('a' as u32, han));
        assert!(!rules.can_break_between('a' as u32, 'b' as u32));
    }

    #[test]
    fn test_modern_hangul_uses_word_breaks() {
        let classic = LineBreakRules::new("", "", false);
        let modern = LineBreakRules::new("", "", true);
        let ga = '가' as u32;
        assert!(classic.can_break_between(ga, ga));
        assert!(!modern.can_break_between(ga, ga));
    }
}
