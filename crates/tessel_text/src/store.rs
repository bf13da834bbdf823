//! Glyph and character tables
//!
//! The serialized tables (`glyph_table`, `character_table`) are the source of
//! truth; the lookup dictionaries are derived from them by `initialize()`
//! and kept in sync by the add operations.

use rustc_hash::FxHashMap;

use crate::atlas::GlyphRect;
use crate::glyph::{Character, FaceInfo, Glyph, GlyphMetrics};

/// Code points that get zero-size placeholder glyphs when the face has none
///
/// Tab is special-cased to advance by the face's tab width.
pub const PLACEHOLDER_CODEPOINTS: &[u32] = &[
    0x03,   // end of text
    0x09,   // tab
    0x0A,   // line feed
    0x0B,   // vertical tab
    0x0D,   // carriage return
    0x061C, // arabic letter mark
    0x200B, // zero width space
    0x200E, // left-to-right mark
    0x200F, // right-to-left mark
    0x2028, // line separator
    0x2029, // paragraph separator
    0x2060, // word joiner
];

/// Glyph/character tables of one font asset
#[derive(Debug, Clone, Default)]
pub struct GlyphStore {
    glyph_table: Vec<Glyph>,
    character_table: Vec<Character>,
    glyph_lookup: FxHashMap<u32, Glyph>,
    character_lookup: FxHashMap<u32, Character>,
    placeholder_glyphs: FxHashMap<u32, Glyph>,
}

impl GlyphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted tables; call `initialize` before lookups
    pub fn from_tables(glyph_table: Vec<Glyph>, character_table: Vec<Character>) -> Self {
        Self {
            glyph_table,
            character_table,
            ..Default::default()
        }
    }

    /// Rebuild every lookup dictionary from the tables.
    ///
    /// Duplicate keys in the tables keep their first entry. Control code
    /// points the face lacks get placeholder glyphs so layout can treat them
    /// like any other character.
    pub fn initialize(&mut self, face: &FaceInfo) {
        self.glyph_lookup.clear();
        self.character_lookup.clear();
        self.placeholder_glyphs.clear();

        for glyph in &self.glyph_table {
            self.glyph_lookup.entry(glyph.index).or_insert(*glyph);
        }

        for character in &self.character_table {
            if !self.glyph_lookup.contains_key(&character.glyph_index) {
                tracing::trace!(
                    "Character U+{:04X} references unknown glyph {}",
                    character.unicode,
                    character.glyph_index
                );
                continue;
            }
            self.character_lookup
                .entry(character.unicode)
                .or_insert(*character);
        }

        for &codepoint in PLACEHOLDER_CODEPOINTS {
            if self.character_lookup.contains_key(&codepoint) {
                continue;
            }
            let advance = if codepoint == 0x09 { face.tab_width } else { 0.0 };
            let glyph = Glyph::new(
                0,
                GlyphMetrics::new(0.0, 0.0, 0.0, 0.0, advance),
                GlyphRect::zero(),
            );
            self.placeholder_glyphs.insert(codepoint, glyph);
            self.character_lookup
                .insert(codepoint, Character::new(codepoint, 0));
        }
    }

    /// Append a glyph; false if its index is already known
    pub fn add_glyph(&mut self, glyph: Glyph) -> bool {
        if self.glyph_lookup.contains_key(&glyph.index) {
            return false;
        }
        self.glyph_table.push(glyph);
        self.glyph_lookup.insert(glyph.index, glyph);
        true
    }

    /// Append a character mapping; false if the code point is already mapped
    pub fn add_character(&mut self, unicode: u32, glyph_index: u32) -> bool {
        if self.character_lookup.contains_key(&unicode) {
            return false;
        }
        let character = Character::new(unicode, glyph_index);
        self.character_table.push(character);
        self.character_lookup.insert(unicode, character);
        true
    }

    pub fn has_character(&self, unicode: u32) -> bool {
        self.character_lookup.contains_key(&unicode)
    }

    pub fn has_glyph(&self, index: u32) -> bool {
        self.glyph_lookup.contains_key(&index)
    }

    pub fn character(&self, unicode: u32) -> Option<&Character> {
        self.character_lookup.get(&unicode)
    }

    pub fn glyph(&self, index: u32) -> Option<&Glyph> {
        self.glyph_lookup.get(&index)
    }

    /// Character and its glyph for a code point
    pub fn lookup(&self, unicode: u32) -> Option<(Character, Glyph)> {
        let character = *self.character_lookup.get(&unicode)?;
        let glyph = match self.placeholder_glyphs.get(&unicode) {
            Some(placeholder) => *placeholder,
            None => *self.glyph_lookup.get(&character.glyph_index)?,
        };
        Some((character, glyph))
    }

    /// Whether the code point resolves to a synthesized placeholder
    pub fn is_placeholder(&self, unicode: u32) -> bool {
        self.placeholder_glyphs.contains_key(&unicode)
    }

    pub fn glyph_table(&self) -> &[Glyph] {
        &self.glyph_table
    }

    pub fn character_table(&self) -> &[Character] {
        &self.character_table
    }

    pub fn character_lookup(&self) -> &FxHashMap<u32, Character> {
        &self.character_lookup
    }

    pub fn glyph_lookup(&self) -> &FxHashMap<u32, Glyph> {
        &self.glyph_lookup
    }

    /// Glyph indices in table order
    pub fn glyph_indices(&self) -> Vec<u32> {
        self.glyph_table.iter().map(|g| g.index).collect()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyph_table.len()
    }

    pub fn character_count(&self) -> usize {
        self.character_table.len()
    }

    /// Drop every table and dictionary
    pub fn clear(&mut self) {
        self.glyph_table.clear();
        self.character_table.clear();
        self.glyph_lookup.clear();
        self.character_lookup.clear();
        self.placeholder_glyphs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(index: u32, advance: f32) -> Glyph {
        Glyph::new(
            index,
            GlyphMetrics::new(8.0, 10.0, 1.0, 10.0, advance),
            GlyphRect::new(index * 10, 0, 8, 10),
        )
    }

    fn sample_store() -> GlyphStore {
        GlyphStore::from_tables(
            vec![glyph(1, 10.0), glyph(2, 12.0)],
            vec![
                Character::new(0x41, 1),
                Character::new(0x42, 2),
                Character::new(0xC5, 1),
            ],
        )
    }

    #[test]
    fn test_initialize_builds_lookups() {
        let mut store = sample_store();
        store.initialize(&FaceInfo::default());
        let (character, glyph) = store.lookup(0x42).unwrap();
        assert_eq!(character.glyph_index, 2);
        assert_eq!(glyph.metrics.horizontal_advance, 12.0);
        // Code points may share a glyph.
        assert_eq!(store.lookup(0xC5).unwrap().1.index, 1);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut store = sample_store();
        store.initialize(&FaceInfo::default());
        let characters = store.character_lookup().clone();
        let glyphs = store.glyph_lookup().clone();

        store.initialize(&FaceInfo::default());
        assert_eq!(store.character_lookup(), &characters);
        assert_eq!(store.glyph_lookup(), &glyphs);
    }

    #[test]
    fn test_placeholders_synthesized() {
        let face = FaceInfo {
            tab_width: 30.0,
            ..Default::default()
        };
        let mut store = sample_store();
        store.initialize(&face);

        for &cp in PLACEHOLDER_CODEPOINTS {
            assert!(store.has_character(cp), "U+{cp:04X} missing");
        }
        let (_, tab) = store.lookup(0x09).unwrap();
        assert_eq!(tab.metrics.horizontal_advance, 30.0);
        assert!(tab.is_empty());
        assert_eq!(store.lookup(0x200B).unwrap().1.metrics.horizontal_advance, 0.0);
        // Placeholders are not persisted.
        assert_eq!(store.character_count(), 3);
    }

    #[test]
    fn test_real_glyph_beats_placeholder() {
        let mut store =
            GlyphStore::from_tables(vec![glyph(7, 40.0)], vec![Character::new(0x09, 7)]);
        store.initialize(&FaceInfo::default());
        assert!(!store.is_placeholder(0x09));
        assert_eq!(store.lookup(0x09).unwrap().1.index, 7);
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut store = sample_store();
        store.initialize(&FaceInfo::default());
        assert!(!store.add_glyph(glyph(1, 99.0)));
        assert!(store.add_glyph(glyph(3, 14.0)));
        assert!(!store.add_character(0x41, 3));
        assert!(store.add_character(0x43, 3));
        assert_eq!(store.lookup(0x43).unwrap().1.metrics.horizontal_advance, 14.0);
        assert_eq!(store.glyph_count(), 3);
    }
}
