//! Layout cursor and restore points
//!
//! The line breaker never rewinds by hand. Every place it may come back to
//! is a [`CursorState`] snapshot held in [`RestorePoints`]; restoring
//! truncates the emitted characters back to the snapshot and resumes from
//! its unit.

/// Phases of one layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    NormalFlow,
    WordWrapSearch,
    VerticalOverflow,
    HorizontalOverflow,
    /// The pass did not fit and auto-size wants another attempt
    AutoSizeAdjusting,
    Done,
}

/// Everything needed to resume a pass from a given unit
#[derive(Debug, Clone, PartialEq)]
pub struct CursorState {
    /// Next unit to process
    pub unit: usize,
    /// Characters emitted so far
    pub char_count: usize,
    /// Lines finished so far (also the current line index)
    pub line_index: usize,
    pub page_index: usize,
    /// Pen x relative to the line start
    pub x: f32,
    /// Top of the current line relative to the content top of the page
    pub line_top: f32,
    pub line_first_char: usize,
    pub line_first_unit: usize,
    pub line_ascender: f32,
    pub line_descender: f32,
    pub line_height: f32,
    /// Right edge of the last visible, non-whitespace character
    pub line_right: f32,
    pub line_has_visible: bool,
    /// Code point of the previous unit, for break rules
    pub prev_unicode: Option<u32>,
    /// Last placed character that kerning or marks can attach to
    pub prev_char: Option<usize>,
    /// Last placed base (non-mark) character
    pub prev_base: Option<usize>,
}

impl CursorState {
    pub fn new(unit: usize) -> Self {
        Self {
            unit,
            char_count: 0,
            line_index: 0,
            page_index: 0,
            x: 0.0,
            line_top: 0.0,
            line_first_char: 0,
            line_first_unit: unit,
            line_ascender: 0.0,
            line_descender: 0.0,
            line_height: 0.0,
            line_right: 0.0,
            line_has_visible: false,
            prev_unicode: None,
            prev_char: None,
            prev_base: None,
        }
    }

    /// Reset per-line tracking for a line starting at `line_top`
    pub fn start_line(&mut self, line_top: f32) {
        self.line_index += 1;
        self.x = 0.0;
        self.line_top = line_top;
        self.line_first_char = self.char_count;
        self.line_first_unit = self.unit;
        self.line_ascender = 0.0;
        self.line_descender = 0.0;
        self.line_height = 0.0;
        self.line_right = 0.0;
        self.line_has_visible = false;
        self.prev_unicode = None;
        self.prev_char = None;
        self.prev_base = None;
    }

    /// Whether the current line holds any character yet
    pub fn line_is_empty(&self) -> bool {
        self.char_count == self.line_first_char
    }
}

/// An ellipsis may replace everything from `state` onwards
#[derive(Debug, Clone, PartialEq)]
pub struct EllipsisCandidate {
    pub state: CursorState,
}

/// Saved positions the line breaker can rewind to
#[derive(Debug, Clone, Default)]
pub struct RestorePoints {
    /// Last legal word boundary on the current line
    pub hard_break: Option<CursorState>,
    /// Fallback boundary when no hard break exists (e.g. no-break space)
    pub soft_break: Option<CursorState>,
    /// Position before the last placed character
    pub last_valid: Option<CursorState>,
    /// Candidates across all lines, latest last
    pub ellipsis: Vec<EllipsisCandidate>,
}

impl RestorePoints {
    /// Forget the per-line points; ellipsis candidates survive line breaks
    pub fn clear_line(&mut self) {
        self.hard_break = None;
        self.soft_break = None;
        self.last_valid = None;
    }

    /// Drop candidates that point past `char_count`
    pub fn discard_ellipsis_after(&mut self, char_count: usize) {
        self.ellipsis.retain(|c| c.state.char_count <= char_count);
    }

    /// Best point to break the current line at, by priority
    pub fn best_break(&self) -> Option<&CursorState> {
        self.hard_break
            .as_ref()
            .or(self.soft_break.as_ref())
            .or(self.last_valid.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(unit: usize) -> CursorState {
        CursorState {
            char_count: unit,
            ..CursorState::new(unit)
        }
    }

    #[test]
    fn test_break_priority() {
        let mut points = RestorePoints::default();
        assert!(points.best_break().is_none());
        points.last_valid = Some(state(5));
        assert_eq!(points.best_break().map(|s| s.unit), Some(5));
        points.soft_break = Some(state(3));
        assert_eq!(points.best_break().map(|s| s.unit), Some(3));
        points.hard_break = Some(state(2));
        assert_eq!(points.best_break().map(|s| s.unit), Some(2));

        points.ellipsis.push(EllipsisCandidate { state: state(1) });
        points.clear_line();
        assert!(points.best_break().is_none());
        assert_eq!(points.ellipsis.len(), 1);
    }

    #[test]
    fn test_start_line_resets() {
        let mut cursor = CursorState::new(0);
        cursor.x = 40.0;
        cursor.char_count = 4;
        cursor.unit = 4;
        cursor.line_has_visible = true;
        cursor.start_line(20.0);
        assert_eq!(cursor.line_index, 1);
        assert_eq!(cursor.x, 0.0);
        assert_eq!(cursor.line_first_char, 4);
        assert_eq!(cursor.line_first_unit, 4);
        assert!(cursor.line_is_empty());
        assert!(!cursor.line_has_visible);
    }

    #[test]
    fn test_discard_ellipsis_after() {
        let mut points = RestorePoints::default();
        for n in [1, 3, 6] {
            points.ellipsis.push(EllipsisCandidate { state: state(n) });
        }
        points.discard_ellipsis_after(3);
        assert_eq!(points.ellipsis.len(), 2);
    }
}
