//! OpenType feature tables
//!
//! Four independent lookups keyed by glyph index: ligature substitution
//! (first component → candidates), pair adjustment, mark-to-base and
//! mark-to-mark. Pair and mark tables use a packed key
//! `second << 16 | first` (`mark << 16 | base` for marks).
//!
//! Every table is append-only. A record whose key already exists is
//! dropped, so the first insertion wins. Values are stored in font design
//! units; callers scale them by `point_size / units_per_em`.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::rasterizer::FeatureRecords;

/// Pack two glyph indices into one lookup key
#[inline]
pub fn pack_key(first: u32, second: u32) -> u32 {
    (second & 0xFFFF) << 16 | (first & 0xFFFF)
}

/// Ordered component glyphs substituted by a single ligature glyph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LigatureRecord {
    /// Full component sequence, first component included
    pub components: SmallVec<[u32; 4]>,
    /// Output glyph
    pub ligature: u32,
}

impl LigatureRecord {
    pub fn new(components: &[u32], ligature: u32) -> Self {
        Self {
            components: SmallVec::from_slice(components),
            ligature,
        }
    }

    pub fn first(&self) -> Option<u32> {
        self.components.first().copied()
    }
}

/// Placement and advance deltas for one glyph of a pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueRecord {
    pub x_placement: f32,
    pub y_placement: f32,
    pub x_advance: f32,
    pub y_advance: f32,
}

impl ValueRecord {
    pub fn new(x_placement: f32, y_placement: f32, x_advance: f32, y_advance: f32) -> Self {
        Self {
            x_placement,
            y_placement,
            x_advance,
            y_advance,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Multiply every component by `scale`
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            x_placement: self.x_placement * scale,
            y_placement: self.y_placement * scale,
            x_advance: self.x_advance * scale,
            y_advance: self.y_advance * scale,
        }
    }
}

/// Kerning record for an adjacent glyph pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairAdjustmentRecord {
    pub first_glyph: u32,
    pub first: ValueRecord,
    pub second_glyph: u32,
    pub second: ValueRecord,
    /// Suppress normal character spacing between the pair
    pub ignore_spacing: bool,
}

impl PairAdjustmentRecord {
    pub fn new(
        first_glyph: u32,
        first: ValueRecord,
        second_glyph: u32,
        second: ValueRecord,
    ) -> Self {
        Self {
            first_glyph,
            first,
            second_glyph,
            second,
            ignore_spacing: false,
        }
    }

    pub fn key(&self) -> u32 {
        pack_key(self.first_glyph, self.second_glyph)
    }
}

/// Anchor point in design units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Mark attachment record
///
/// Shared by mark-to-base and mark-to-mark; for the latter `base_glyph` is
/// the preceding mark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkAdjustmentRecord {
    pub base_glyph: u32,
    pub base_anchor: Anchor,
    pub mark_glyph: u32,
    pub mark_anchor: Anchor,
}

impl MarkAdjustmentRecord {
    pub fn new(base_glyph: u32, base_anchor: Anchor, mark_glyph: u32, mark_anchor: Anchor) -> Self {
        Self {
            base_glyph,
            base_anchor,
            mark_glyph,
            mark_anchor,
        }
    }

    pub fn key(&self) -> u32 {
        pack_key(self.base_glyph, self.mark_glyph)
    }

    /// Offset that moves the mark anchor onto the base anchor
    pub fn offset(&self) -> (f32, f32) {
        (
            self.base_anchor.x - self.mark_anchor.x,
            self.base_anchor.y - self.mark_anchor.y,
        )
    }
}

/// Result of a successful ligature match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigatureMatch {
    pub ligature: u32,
    /// One past the last consumed position
    pub end: usize,
}

/// Per-font OpenType feature lookups
#[derive(Debug, Clone, Default)]
pub struct FontFeatureTable {
    ligatures: FxHashMap<u32, Vec<LigatureRecord>>,
    ligature_count: usize,
    pair_adjustments: FxHashMap<u32, PairAdjustmentRecord>,
    mark_to_base: FxHashMap<u32, MarkAdjustmentRecord>,
    mark_to_mark: FxHashMap<u32, MarkAdjustmentRecord>,
}

impl FontFeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ligature; returns false if the component sequence exists
    pub fn add_ligature(&mut self, record: LigatureRecord) -> bool {
        let Some(first) = record.first() else {
            return false;
        };
        if record.components.len() < 2 {
            return false;
        }
        let candidates = self.ligatures.entry(first).or_default();
        if candidates.iter().any(|c| c.components == record.components) {
            return false;
        }
        candidates.push(record);
        self.ligature_count += 1;
        true
    }

    pub fn add_pair_adjustment(&mut self, record: PairAdjustmentRecord) -> bool {
        insert_first_wins(&mut self.pair_adjustments, record.key(), record)
    }

    pub fn add_mark_to_base(&mut self, record: MarkAdjustmentRecord) -> bool {
        insert_first_wins(&mut self.mark_to_base, record.key(), record)
    }

    pub fn add_mark_to_mark(&mut self, record: MarkAdjustmentRecord) -> bool {
        insert_first_wins(&mut self.mark_to_mark, record.key(), record)
    }

    /// Bulk import; returns how many records were new
    pub fn import(&mut self, records: FeatureRecords) -> usize {
        match records {
            FeatureRecords::Ligatures(list) => list
                .into_iter()
                .filter(|r| self.add_ligature(r.clone()))
                .count(),
            FeatureRecords::PairAdjustments(list) => list
                .into_iter()
                .filter(|r| self.add_pair_adjustment(*r))
                .count(),
            FeatureRecords::MarkToBase(list) => list
                .into_iter()
                .filter(|r| self.add_mark_to_base(*r))
                .count(),
            FeatureRecords::MarkToMark(list) => list
                .into_iter()
                .filter(|r| self.add_mark_to_mark(*r))
                .count(),
        }
    }

    /// Ligature candidates starting with `first`, in insertion order
    pub fn ligature_candidates(&self, first: u32) -> &[LigatureRecord] {
        self.ligatures
            .get(&first)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pair_adjustment(&self, first: u32, second: u32) -> Option<&PairAdjustmentRecord> {
        self.pair_adjustments.get(&pack_key(first, second))
    }

    pub fn mark_to_base(&self, base: u32, mark: u32) -> Option<&MarkAdjustmentRecord> {
        self.mark_to_base.get(&pack_key(base, mark))
    }

    pub fn mark_to_mark(&self, base_mark: u32, mark: u32) -> Option<&MarkAdjustmentRecord> {
        self.mark_to_mark.get(&pack_key(base_mark, mark))
    }

    /// Match a ligature starting at `start`.
    ///
    /// Glyphs for which `ignorable` returns true are skipped when they are not
    /// the next expected component; they become part of the consumed span.
    /// The first fully matching candidate wins.
    pub fn match_ligature(
        &self,
        glyphs: &[u32],
        start: usize,
        ignorable: impl Fn(usize) -> bool,
    ) -> Option<LigatureMatch> {
        let first = *glyphs.get(start)?;

        'candidates: for candidate in self.ligature_candidates(first) {
            let mut pos = start + 1;
            for &expected in &candidate.components[1..] {
                loop {
                    let Some(&glyph) = glyphs.get(pos) else {
                        continue 'candidates;
                    };
                    if glyph == expected {
                        pos += 1;
                        break;
                    }
                    if ignorable(pos) {
                        pos += 1;
                        continue;
                    }
                    continue 'candidates;
                }
            }
            return Some(LigatureMatch {
                ligature: candidate.ligature,
                end: pos,
            });
        }

        None
    }

    pub fn ligature_count(&self) -> usize {
        self.ligature_count
    }

    pub fn pair_adjustment_count(&self) -> usize {
        self.pair_adjustments.len()
    }

    pub fn mark_to_base_count(&self) -> usize {
        self.mark_to_base.len()
    }

    pub fn mark_to_mark_count(&self) -> usize {
        self.mark_to_mark.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ligature_count == 0
            && self.pair_adjustments.is_empty()
            && self.mark_to_base.is_empty()
            && self.mark_to_mark.is_empty()
    }

    /// Iterate all ligature records
    pub fn ligatures(&self) -> impl Iterator<Item = &LigatureRecord> {
        self.ligatures.values().flatten()
    }

    pub fn clear(&mut self) {
        self.ligatures.clear();
        self.ligature_count = 0;
        self.pair_adjustments.clear();
        self.mark_to_base.clear();
        self.mark_to_mark.clear();
    }
}

fn insert_first_wins<T>(map: &mut FxHashMap<u32, T>, key: u32, value: T) -> bool {
    use std::collections::hash_map::Entry;

    match map.entry(key) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
    }
}
