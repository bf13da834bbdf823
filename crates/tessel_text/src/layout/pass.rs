//! One layout pass
//!
//! Walks shaped units in order and places them line by line. The pass is a
//! small state machine over [`LayoutPhase`]: normal flow places characters,
//! word wrap rewinds to the best restore point, the overflow phases dispatch
//! on [`OverflowMode`]. A pass that overflowed while auto-size is active
//! ends in [`LayoutPhase::AutoSizeAdjusting`] instead of `Done`.

use crate::atlas::UvRect;
use crate::context::TextContext;
use crate::glyph::{FaceInfo, TextElement};
use crate::layout::cursor::{CursorState, EllipsisCandidate, LayoutPhase, RestorePoints};
use crate::layout::options::{LayoutOptions, OverflowMode};
use crate::layout::output::{CharacterInfo, Extents, LayoutDiagnostic, LineInfo, Point};
use crate::layout::shaping::{self, ShapedText, ShapedUnit};
use crate::unicode;

const EPSILON: f32 = 0.001;

/// Values auto-size may change between passes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassParams {
    pub font_size: f32,
    /// Line spacing, 1/100 em
    pub line_spacing: f32,
    /// Character width, percent of normal
    pub width_percent: f32,
}

impl PassParams {
    pub fn from_options(options: &LayoutOptions) -> Self {
        Self {
            font_size: options.font_size,
            line_spacing: options.line_spacing,
            width_percent: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    pub characters: Vec<CharacterInfo>,
    pub lines: Vec<LineInfo>,
    /// Some text did not fit the box
    pub overflowed: bool,
    pub is_truncated: bool,
    pub linked_overflow_index: Option<usize>,
    pub diagnostics: Vec<LayoutDiagnostic>,
    pub wants_adjustment: bool,
}

/// Scaled metrics of one unit at the pass's point size
#[derive(Debug, Clone, Copy)]
struct UnitMetrics {
    size: f32,
    scale: f32,
    /// Design units to layout pixels
    design_scale: f32,
    advance: f32,
    ascender: f32,
    descender: f32,
    line_height: f32,
    visible: bool,
    whitespace: bool,
}

/// Where and how a unit will be placed
#[derive(Debug, Clone, Copy)]
struct Placement {
    metrics: UnitMetrics,
    origin: f32,
    x_offset: f32,
    y_offset: f32,
    advance: f32,
    spacing: f32,
    /// Advance change applied to the previous character by kerning
    kern_prev: Option<(usize, f32, f32)>,
    attached: bool,
}

impl Placement {
    fn ink_right(&self, element: Option<&TextElement>) -> f32 {
        match element {
            Some(element) if self.metrics.visible => {
                let m = &element.glyph().metrics;
                let ink = (m.horizontal_bearing_x + m.width) * self.metrics.scale;
                self.origin + self.x_offset + ink
            }
            _ => self.origin + self.advance,
        }
    }
}

pub struct LayoutPass<'a> {
    ctx: &'a TextContext,
    shaped: &'a ShapedText,
    options: &'a LayoutOptions,
    params: PassParams,
    auto_size_active: bool,
    width: f32,
    height: f32,
    guard_limit: u32,

    phase: LayoutPhase,
    cursor: CursorState,
    restore: RestorePoints,
    line_start: CursorState,
    restores: u32,
    /// Place the next unit even if it is too wide
    force_width: bool,
    /// Place the next unit even if the line is too tall
    force_height: bool,
    /// Kerning applied to earlier characters, undone when a restore drops
    /// the second glyph of the pair
    kerns: Vec<KernEdit>,
    out: PassOutput,
}

#[derive(Debug, Clone, Copy)]
struct KernEdit {
    second: usize,
    first: usize,
    x_advance: f32,
    x_offset: f32,
}

impl<'a> LayoutPass<'a> {
    pub fn new(
        ctx: &'a TextContext,
        shaped: &'a ShapedText,
        options: &'a LayoutOptions,
        params: PassParams,
        start_unit: usize,
        auto_size_active: bool,
    ) -> Self {
        let cursor = CursorState::new(start_unit);
        Self {
            ctx,
            shaped,
            options,
            params,
            auto_size_active,
            width: options.content_width(),
            height: options.content_height(),
            guard_limit: ctx.settings().recursion_guard_limit,
            phase: LayoutPhase::NormalFlow,
            line_start: cursor.clone(),
            cursor,
            restore: RestorePoints::default(),
            restores: 0,
            force_width: false,
            force_height: false,
            kerns: Vec::new(),
            out: PassOutput::default(),
        }
    }

    /// Run to `Done` or `AutoSizeAdjusting`
    pub fn run(mut self) -> PassOutput {
        loop {
            self.phase = match self.phase {
                LayoutPhase::NormalFlow => self.normal_flow(),
                LayoutPhase::WordWrapSearch => self.word_wrap_search(),
                LayoutPhase::VerticalOverflow => self.vertical_overflow(),
                LayoutPhase::HorizontalOverflow => self.horizontal_overflow(),
                LayoutPhase::AutoSizeAdjusting => {
                    self.out.wants_adjustment = true;
                    break;
                }
                LayoutPhase::Done => break,
            };
        }
        self.out
    }

    fn units(&self) -> &'a [ShapedUnit] {
        &self.shaped.units
    }

    fn normal_flow(&mut self) -> LayoutPhase {
        let units = self.units();
        let Some(unit) = units.get(self.cursor.unit) else {
            return self.finish();
        };

        if unit.consumed {
            self.cursor.unit += 1;
            return LayoutPhase::NormalFlow;
        }

        let placement = self.plan(unit);

        if unicode::is_line_break(unit.unicode) {
            self.commit(unit, &placement);
            self.break_line(unicode::is_paragraph_end(unit.unicode));
            return LayoutPhase::NormalFlow;
        }

        if !self.force_width
            && !placement.metrics.whitespace
            && placement.ink_right(unit.element.as_ref()) > self.width + EPSILON
        {
            return if self.options.wrapping {
                self.record_break(unit);
                LayoutPhase::WordWrapSearch
            } else {
                LayoutPhase::HorizontalOverflow
            };
        }

        let ascender = self.cursor.line_ascender.max(placement.metrics.ascender);
        let descender = self.cursor.line_descender.min(placement.metrics.descender);
        let bottom = self.cursor.line_top + ascender - descender;
        if !self.force_height && bottom > self.height + EPSILON {
            return LayoutPhase::VerticalOverflow;
        }

        self.force_width = false;
        self.force_height = false;
        self.record_before(unit);
        self.commit(unit, &placement);
        self.record_after(unit);
        LayoutPhase::NormalFlow
    }

    fn metrics(&self, unit: &ShapedUnit) -> UnitMetrics {
        let base = self.params.font_size;
        let size = unit.style.size.map(|s| s.apply(base)).unwrap_or(base);

        let fallback_face = self.ctx.font(self.options.font).map(|f| f.face_info());
        let (face, element_scale): (Option<&FaceInfo>, f32) = match &unit.element {
            Some(element) => (
                self.ctx.face_info(element.asset()).or(fallback_face),
                element.scale(),
            ),
            None => (fallback_face, 1.0),
        };
        let face_size = face.map(|f| f.point_size).unwrap_or(size).max(EPSILON);
        let size_scale = size / face_size;
        let scale = size_scale * element_scale;

        let cp = unit.unicode;
        let whitespace = unicode::is_breaking_whitespace(cp)
            || matches!(cp, unicode::NO_BREAK_SPACE | 0x2007 | 0x202F)
            || unicode::is_line_break(cp)
            || unicode::is_zero_width(cp);

        let advance = match &unit.element {
            Some(_) if unicode::is_zero_width(cp) || unicode::is_line_break(cp) => 0.0,
            Some(element) => {
                let width_factor = self.params.width_percent / 100.0;
                element.glyph().metrics.horizontal_advance * scale * width_factor
            }
            None => 0.0,
        };
        let visible = !whitespace
            && unit
                .element
                .as_ref()
                .map(|e| !e.glyph().is_empty())
                .unwrap_or(false);

        UnitMetrics {
            size,
            scale,
            design_scale: face.map(FaceInfo::design_scale).unwrap_or(1.0) * size_scale,
            advance,
            ascender: face.map(|f| f.ascent_line * size_scale).unwrap_or(size),
            descender: face.map(|f| f.descent_line * size_scale).unwrap_or(0.0),
            line_height: face.map(|f| f.line_height * size_scale).unwrap_or(size),
            visible,
            whitespace,
        }
    }

    fn plan(&self, unit: &ShapedUnit) -> Placement {
        let metrics = self.metrics(unit);
        let mut placement = Placement {
            metrics,
            origin: self.cursor.x,
            x_offset: 0.0,
            y_offset: 0.0,
            advance: metrics.advance,
            spacing: self.options.character_spacing * metrics.size / 100.0,
            kern_prev: None,
            attached: false,
        };

        if unicode::is_separator(unit.unicode) {
            placement.spacing += self.options.word_spacing * metrics.size / 100.0;
        }
        if unit.synthesize_bold {
            if let Some(font) = unit.element.as_ref().and_then(TextElement::font) {
                let bold = self.ctx.font(font).map(|f| f.bold_spacing).unwrap_or(0.0);
                placement.spacing += bold * metrics.size / 100.0;
            }
        }
        if unit.unicode == unicode::TAB {
            let face_tab = unit
                .element
                .as_ref()
                .and_then(|e| self.ctx.face_info(e.asset()))
                .map(|f| f.tab_width)
                .unwrap_or(0.0);
            let stop = face_tab * metrics.scale * self.options.tab_size;
            if stop > EPSILON {
                let next = ((self.cursor.x / stop).floor() + 1.0) * stop;
                placement.advance = next - self.cursor.x;
            }
        }

        let Some(element) = unit.element.as_ref() else {
            return placement;
        };

        if unit.is_mark {
            if let Some((x, y)) = self.attach_mark(element) {
                placement.origin = x;
                placement.y_offset = y;
                placement.advance = 0.0;
                placement.spacing = 0.0;
                placement.attached = true;
                return placement;
            }
        }

        if let Some(prev) = self.cursor.prev_char {
            let prev_info = &self.out.characters[prev];
            if let Some(prev_element) = prev_info.element.as_ref() {
                if let Some(record) = shaping::pair_adjustment(self.ctx, prev_element, element) {
                    let k = metrics.design_scale;
                    let shift = record.first.x_advance * k;
                    placement.kern_prev = Some((prev, shift, record.first.x_placement * k));
                    placement.origin += shift;
                    placement.x_offset = record.second.x_placement * k;
                    placement.y_offset = record.second.y_placement * k;
                    placement.advance += record.second.x_advance * k;
                    if record.ignore_spacing {
                        placement.spacing = 0.0;
                    }
                }
            }
        }

        placement
    }

    /// Pen position and vertical offset for a mark, from the previous base
    /// or mark anchors
    fn attach_mark(&self, mark: &TextElement) -> Option<(f32, f32)> {
        let prev = self.cursor.prev_char?;
        let base = self.cursor.prev_base;
        let prev_is_mark = Some(prev) != base;

        let anchored = |index: usize, base_is_mark: bool| -> Option<(f32, f32)> {
            let info = self.out.characters.get(index)?;
            let target = info.element.as_ref()?;
            let (dx, dy) = shaping::mark_offset(self.ctx, target, mark, base_is_mark)?;
            let k = info.scale * self.ctx.face_info(target.asset())?.design_scale();
            Some((info.origin + info.x_offset + dx * k, info.y_offset + dy * k))
        };

        if prev_is_mark {
            anchored(prev, true).or_else(|| base.and_then(|b| anchored(b, false)))
        } else {
            anchored(prev, false)
        }
    }

    fn commit(&mut self, unit: &ShapedUnit, placement: &Placement) {
        let index = self.out.characters.len();
        if let Some((prev, shift, x_placement)) = placement.kern_prev {
            if let Some(info) = self.out.characters.get_mut(prev) {
                info.x_advance += shift;
                info.x_offset += x_placement;
                self.kerns.push(KernEdit {
                    second: index,
                    first: prev,
                    x_advance: shift,
                    x_offset: x_placement,
                });
            }
        }

        let m = placement.metrics;
        let color = unit.style.color.unwrap_or(self.options.color);
        let (x_offset, origin) = if placement.attached {
            (placement.origin - self.cursor.x, self.cursor.x)
        } else {
            (placement.x_offset, placement.origin)
        };

        let info = CharacterInfo {
            unicode: unit.unicode,
            source_index: unit.source_index,
            element: unit.element,
            style: unit.styles,
            color,
            point_size: m.size,
            scale: m.scale,
            origin,
            x_advance: placement.advance + placement.spacing,
            baseline: 0.0,
            ascender: m.ascender,
            descender: m.descender,
            x_offset,
            y_offset: placement.y_offset,
            top_left: Point::default(),
            bottom_left: Point::default(),
            top_right: Point::default(),
            bottom_right: Point::default(),
            uv: self.uv(unit.element.as_ref()),
            packed_scale: if unit.synthesize_bold { -m.scale } else { m.scale },
            material_index: 0,
            line_index: self.cursor.line_index,
            word_index: None,
            page_index: self.cursor.page_index,
            visible: m.visible,
        };
        let right = info.ink_right();
        self.out.characters.push(info);

        let cursor = &mut self.cursor;
        cursor.char_count += 1;
        cursor.unit += 1;
        if !placement.attached {
            cursor.x = placement.origin + placement.advance + placement.spacing;
        }
        cursor.line_ascender = cursor.line_ascender.max(m.ascender);
        cursor.line_descender = cursor.line_descender.min(m.descender);
        cursor.line_height = cursor.line_height.max(m.line_height);
        if m.visible {
            cursor.line_right = cursor.line_right.max(right);
            cursor.line_has_visible = true;
        }
        cursor.prev_unicode = Some(unit.unicode);
        if matches!(unit.element, Some(TextElement::Character { .. })) && !m.whitespace {
            cursor.prev_char = Some(index);
            if !unit.is_mark {
                cursor.prev_base = Some(index);
            }
        } else {
            cursor.prev_char = None;
            cursor.prev_base = None;
        }
    }

    fn uv(&self, element: Option<&TextElement>) -> UvRect {
        match element {
            Some(TextElement::Character { font, glyph, .. }) => self
                .ctx
                .font(*font)
                .map(|f| f.atlas().uv_rect(&glyph.rect))
                .unwrap_or_default(),
            Some(TextElement::Sprite { sprite, glyph, .. }) => {
                let Some(asset) = self.ctx.sprite(*sprite) else {
                    return UvRect::default();
                };
                let (w, h) = asset.texture_size();
                let (w, h) = (w.max(1) as f32, h.max(1) as f32);
                UvRect {
                    u_min: glyph.rect.x as f32 / w,
                    v_min: glyph.rect.y as f32 / h,
                    u_max: glyph.rect.right() as f32 / w,
                    v_max: glyph.rect.bottom() as f32 / h,
                }
            }
            None => UvRect::default(),
        }
    }

    /// Break opportunity between the previous unit and `unit`
    fn record_break(&mut self, unit: &ShapedUnit) {
        if unit.is_mark || unit.style.no_break || self.cursor.line_is_empty() {
            return;
        }
        let Some(prev) = self.cursor.prev_unicode else {
            return;
        };
        if self.ctx.line_break_rules().can_break_between(prev, unit.unicode) {
            self.restore.hard_break = Some(self.cursor.clone());
        }
    }

    /// Restore points that refer to the position before `unit`
    fn record_before(&mut self, unit: &ShapedUnit) {
        if unit.is_mark {
            return;
        }
        self.record_break(unit);

        if let Some(ellipsis) = self.shaped.ellipsis {
            let source_index = unit.source_index;
            let ellipsis_width = self.metrics(&self.ellipsis_unit(ellipsis, source_index)).advance;
            if self.cursor.x + ellipsis_width <= self.width + EPSILON {
                self.restore.ellipsis.push(EllipsisCandidate {
                    state: self.cursor.clone(),
                });
            }
        }
    }

    /// Restore points that refer to the position after the unit just placed
    fn record_after(&mut self, unit: &ShapedUnit) {
        let cp = unit.unicode;
        let next_is_mark = self
            .units()
            .get(self.cursor.unit)
            .map(|u| u.is_mark)
            .unwrap_or(false);
        if next_is_mark {
            return;
        }

        let breakable = unicode::is_breaking_whitespace(cp) || unicode::is_break_after(cp);
        if breakable && !unit.style.no_break {
            self.restore.hard_break = Some(self.cursor.clone());
        } else if unicode::is_non_breaking(cp) || (breakable && unit.style.no_break) {
            self.restore.soft_break = Some(self.cursor.clone());
        }
        self.restore.last_valid = Some(self.cursor.clone());
    }

    fn restore_to(&mut self, state: CursorState) {
        while let Some(edit) = self.kerns.last().copied() {
            if edit.second < state.char_count {
                break;
            }
            self.kerns.pop();
            if edit.first < state.char_count {
                let info = &mut self.out.characters[edit.first];
                info.x_advance -= edit.x_advance;
                info.x_offset -= edit.x_offset;
            }
        }
        self.out.characters.truncate(state.char_count);
        self.out.lines.truncate(state.line_index);
        self.restore.discard_ellipsis_after(state.char_count);
        self.cursor = state;
    }

    fn word_wrap_search(&mut self) -> LayoutPhase {
        self.restores += 1;
        if self.restores > self.guard_limit {
            return self.trip_recursion_guard();
        }

        let hard = self.restore.hard_break.as_ref();
        let mid_word = self.restore.last_valid.as_ref();
        let ratio_limit = self.options.wrapping_ratio * self.width;
        let target = match (hard, mid_word) {
            (Some(h), Some(v)) if h.x < ratio_limit => Some(v.clone()),
            _ => self.restore.best_break().cloned(),
        };
        let splits_word = hard.is_none() && self.restore.soft_break.is_none();

        match target {
            Some(state) if state.char_count > state.line_first_char => {
                tracing::trace!("Wrapping at unit {}", state.unit);
                if splits_word && self.auto_size_active {
                    // A smaller size may keep the word whole
                    self.out.overflowed = true;
                }
                self.restore_to(state);
                self.break_line(false);
            }
            _ => {
                // Nothing on the line to break after; place anyway
                self.out.overflowed = true;
                self.force_width = true;
            }
        }
        LayoutPhase::NormalFlow
    }

    fn trip_recursion_guard(&mut self) -> LayoutPhase {
        let index = self.cursor.unit;
        tracing::warn!(
            "Line breaking gave up after {} restores at unit {}; truncating",
            self.guard_limit,
            index
        );
        self.out
            .diagnostics
            .push(LayoutDiagnostic::RecursionGuardTripped { index });
        self.out.is_truncated = true;
        self.out.overflowed = true;
        self.finish()
    }

    fn vertical_overflow(&mut self) -> LayoutPhase {
        self.out.overflowed = true;
        match self.options.overflow {
            OverflowMode::Overflow => {
                self.force_height = true;
                LayoutPhase::NormalFlow
            }
            OverflowMode::Page => {
                if self.cursor.line_top <= EPSILON {
                    // Already the first line of a page
                    self.force_height = true;
                } else {
                    let mut state = self.line_start.clone();
                    self.restore_to(state.clone());
                    state.page_index += 1;
                    state.line_top = 0.0;
                    self.cursor = state;
                    self.line_start = self.cursor.clone();
                    self.restore.clear_line();
                    tracing::trace!(
                        "Page {} starts at unit {}",
                        self.cursor.page_index,
                        self.cursor.unit
                    );
                }
                LayoutPhase::NormalFlow
            }
            OverflowMode::Truncate | OverflowMode::Linked => {
                let first_dropped = self.cursor.line_first_unit;
                let state = self.line_start.clone();
                self.restore_to(state);
                self.cut(first_dropped)
            }
            OverflowMode::Ellipsis => self.insert_ellipsis(),
        }
    }

    fn horizontal_overflow(&mut self) -> LayoutPhase {
        self.out.overflowed = true;
        match self.options.overflow {
            OverflowMode::Overflow => {
                self.force_width = true;
                LayoutPhase::NormalFlow
            }
            OverflowMode::Page => {
                if self.cursor.line_is_empty() {
                    self.force_width = true;
                } else {
                    self.break_line(false);
                }
                LayoutPhase::NormalFlow
            }
            OverflowMode::Truncate | OverflowMode::Linked => self.cut(self.cursor.unit),
            OverflowMode::Ellipsis => self.insert_ellipsis(),
        }
    }

    /// Stop before `unit`; linked overflow remembers where to resume
    fn cut(&mut self, unit: usize) -> LayoutPhase {
        self.out.is_truncated = true;
        if self.options.overflow == OverflowMode::Linked {
            self.out.linked_overflow_index = self.units().get(unit).map(|u| u.source_index);
        }
        self.finish()
    }

    fn insert_ellipsis(&mut self) -> LayoutPhase {
        self.out.is_truncated = true;
        let ellipsis = self.shaped.ellipsis;

        if let (Some(element), Some(candidate)) = (ellipsis, self.restore.ellipsis.pop()) {
            let state = candidate.state;
            let source_index = self
                .units()
                .get(state.unit)
                .map(|u| u.source_index)
                .unwrap_or(state.unit);
            self.restore_to(state);

            let unit = self.ellipsis_unit(element, source_index);
            let placement = self.plan(&unit);
            self.commit(&unit, &placement);
            return self.finish();
        }

        tracing::debug!("No room for an ellipsis; nothing is shown");
        self.kerns.clear();
        self.out.characters.clear();
        self.out.lines.clear();
        self.cursor = CursorState::new(self.cursor.unit);
        LayoutPhase::Done
    }

    /// The ellipsis as a unit in the base style
    fn ellipsis_unit(&self, element: TextElement, source_index: usize) -> ShapedUnit {
        ShapedUnit {
            source_index,
            unicode: element.unicode(),
            element: Some(element),
            font: self.options.font,
            style: Default::default(),
            styles: self.options.styles,
            synthesize_bold: false,
            synthesize_italic: false,
            consumed: false,
            is_mark: false,
        }
    }

    /// Close the current line and open the next one
    fn break_line(&mut self, ends_paragraph: bool) {
        let line_height = self.finish_line(ends_paragraph);
        let size = self.params.font_size;
        let spacing = self.params.line_spacing * size / 100.0;
        let mut next_top = self.cursor.line_top + line_height + spacing;
        if ends_paragraph {
            next_top += self.options.paragraph_spacing * size / 100.0;
        }
        self.cursor.start_line(next_top);
        self.line_start = self.cursor.clone();
        self.restore.clear_line();
        self.restores = 0;
    }

    /// Build the [`LineInfo`] for the current line; returns its height
    fn finish_line(&mut self, ends_paragraph: bool) -> f32 {
        let cursor = &self.cursor;
        let first = cursor.line_first_char;
        let end = cursor.char_count;

        let (mut ascender, mut descender, mut line_height) =
            (cursor.line_ascender, cursor.line_descender, cursor.line_height);
        if first == end {
            if let Some(face) = self.ctx.font(self.options.font).map(|f| f.face_info()) {
                let s = self.params.font_size / face.point_size.max(EPSILON);
                ascender = face.ascent_line * s;
                descender = face.descent_line * s;
                line_height = face.line_height * s;
            }
        }
        let height = line_height.max(ascender - descender);
        let baseline = self.options.margins.top + cursor.line_top + ascender;
        let line_index = self.out.lines.len();
        let page_index = cursor.page_index;

        let mut first_visible = None;
        let mut last_visible = None;
        let mut space_count = 0;
        let mut width: f32 = 0.0;
        let mut extents = Extents::EMPTY;
        for (i, info) in self.out.characters[first..end].iter_mut().enumerate() {
            info.baseline = baseline;
            info.line_index = line_index;
            info.page_index = page_index;
            if unicode::is_separator(info.unicode) {
                space_count += 1;
            }
            if info.visible {
                first_visible.get_or_insert(first + i);
                last_visible = Some(first + i);
                width = width.max(info.origin + info.x_advance);
                extents.include(Point::new(info.ink_left(), baseline - ascender));
                extents.include(Point::new(info.ink_right(), baseline - descender));
            }
        }

        let alignment = self
            .out
            .characters
            .get(first)
            .and_then(|c| self.units().get(c.source_index))
            .and_then(|u| u.style.align)
            .unwrap_or(self.options.alignment);

        self.out.lines.push(LineInfo {
            first_char: first,
            end_char: end,
            first_visible_char: first_visible,
            last_visible_char: last_visible,
            visible_character_count: self.out.characters[first..end]
                .iter()
                .filter(|c| c.visible)
                .count(),
            space_count,
            word_count: 0,
            width,
            available_width: self.width,
            ascender,
            descender,
            baseline,
            line_height: height,
            alignment,
            page_index,
            ends_paragraph,
            extents,
        });
        height
    }

    fn finish(&mut self) -> LayoutPhase {
        if !self.cursor.line_is_empty() {
            self.finish_line(true);
        }
        if self.out.overflowed && self.auto_size_active {
            LayoutPhase::AutoSizeAdjusting
        } else {
            LayoutPhase::Done
        }
    }
}
