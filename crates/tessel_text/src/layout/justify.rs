//! Line alignment, justification and word records

use crate::layout::options::{HorizontalAlignment, LayoutOptions, VerticalAlignment};
use crate::layout::output::{CharacterInfo, LineInfo, WordInfo};
use crate::unicode;

/// Horizontal placement of every line, margins included
pub fn align_lines(chars: &mut [CharacterInfo], lines: &mut [LineInfo], options: &LayoutOptions) {
    let widest = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);

    for line in lines.iter_mut() {
        let available = if line.available_width.is_finite() {
            line.available_width
        } else {
            widest
        };
        let range = line.first_char..line.end_char;

        if options.right_to_left {
            mirror(&mut chars[range.clone()], line);
        }

        let offset = match line.alignment {
            HorizontalAlignment::Left => 0.0,
            HorizontalAlignment::Center => (available - line.width) / 2.0,
            HorizontalAlignment::Right => available - line.width,
            HorizontalAlignment::Geometry => {
                if line.extents.is_empty() {
                    (available - line.width) / 2.0
                } else {
                    (available - line.extents.width()) / 2.0 - line.extents.min.x
                }
            }
            HorizontalAlignment::Justified if line.ends_paragraph => 0.0,
            HorizontalAlignment::Justified | HorizontalAlignment::Flush => {
                let ratio = options.justified_character_ratio;
                justify(&mut chars[range.clone()], line, available, ratio);
                0.0
            }
        };

        let dx = options.margins.left + offset;
        for info in &mut chars[range] {
            info.translate(dx, 0.0);
        }
        if !line.extents.is_empty() {
            line.extents.min.x += dx;
            line.extents.max.x += dx;
        }
    }
}

/// Reverse pen positions within a line for right-to-left text
fn mirror(chars: &mut [CharacterInfo], line: &mut LineInfo) {
    let width = line.width;
    for info in chars.iter_mut() {
        info.origin = width - info.origin - info.x_advance;
        info.x_offset = -info.x_offset;
    }
    if !line.extents.is_empty() {
        let (min, max) = (line.extents.min.x, line.extents.max.x);
        line.extents.min.x = width - max;
        line.extents.max.x = width - min;
    }
}

/// Spread the line's slack over gaps and characters.
///
/// `character_ratio` of the slack goes to every visible character, the rest
/// to separators between the first and last visible character. Separators
/// leading the line do not count as gaps.
fn justify(chars: &mut [CharacterInfo], line: &mut LineInfo, available: f32, character_ratio: f32) {
    let slack = available - line.width;
    let (Some(first_visible), Some(last_visible)) =
        (line.first_visible_char, line.last_visible_char)
    else {
        return;
    };
    if slack <= 0.0 || !slack.is_finite() {
        return;
    }
    let first_visible = first_visible - line.first_char;
    let last_visible = last_visible - line.first_char;

    let visible = chars[first_visible..=last_visible]
        .iter()
        .filter(|c| c.visible)
        .count();
    let gaps = chars[first_visible..last_visible]
        .iter()
        .filter(|c| unicode::is_separator(c.unicode))
        .count();
    if visible <= 1 && gaps == 0 {
        return;
    }

    let ratio = if gaps == 0 {
        1.0
    } else {
        character_ratio.clamp(0.0, 1.0)
    };
    let char_step = if visible > 1 {
        slack * ratio / (visible - 1) as f32
    } else {
        0.0
    };
    let gap_step = if gaps > 0 {
        slack * (1.0 - ratio) / gaps as f32
    } else {
        0.0
    };

    let mut offset = 0.0;
    for (i, info) in chars.iter_mut().enumerate() {
        info.origin += offset;
        if i < first_visible || i >= last_visible {
            continue;
        }
        if info.visible {
            offset += char_step;
        }
        if unicode::is_separator(info.unicode) {
            offset += gap_step;
        }
    }

    line.width = available;
    if !line.extents.is_empty() {
        line.extents.max.x += offset;
    }
}

/// Shift pages vertically inside the box
pub fn align_vertically(
    chars: &mut [CharacterInfo],
    lines: &mut [LineInfo],
    options: &LayoutOptions,
) {
    let height = options.content_height();
    let pages = lines.iter().map(|l| l.page_index).max().map(|p| p + 1).unwrap_or(0);

    for page in 0..pages {
        let page_lines: Vec<usize> = (0..lines.len())
            .filter(|&i| lines[i].page_index == page)
            .collect();
        let (Some(&first), Some(&last)) = (page_lines.first(), page_lines.last()) else {
            continue;
        };
        let top = lines[first].baseline - lines[first].ascender;
        let bottom = lines[last].baseline - lines[last].descender;
        let block = bottom - top;

        let dy = match options.vertical_alignment {
            VerticalAlignment::Top => 0.0,
            VerticalAlignment::Middle if height.is_finite() => (height - block) / 2.0,
            VerticalAlignment::Bottom if height.is_finite() => height - block,
            VerticalAlignment::Middle | VerticalAlignment::Bottom => 0.0,
            VerticalAlignment::Baseline => -lines[first].ascender,
        };
        if dy == 0.0 {
            continue;
        }

        for &index in &page_lines {
            let line = &mut lines[index];
            line.baseline += dy;
            if !line.extents.is_empty() {
                line.extents.min.y += dy;
                line.extents.max.y += dy;
            }
            for info in &mut chars[line.first_char..line.end_char] {
                info.translate(0.0, dy);
            }
        }
    }
}

/// Group characters into words; words never span lines
pub fn build_words(chars: &mut [CharacterInfo], lines: &mut [LineInfo]) -> Vec<WordInfo> {
    let mut words = Vec::new();

    for (line_index, line) in lines.iter_mut().enumerate() {
        let mut start: Option<usize> = None;
        let mut count = 0;
        for i in line.first_char..=line.end_char {
            let is_word_char = i < line.end_char && {
                let cp = chars[i].unicode;
                !unicode::is_separator(cp)
                    && !unicode::is_line_break(cp)
                    && !unicode::is_zero_width(cp)
            };
            match (is_word_char, start) {
                (true, None) => start = Some(i),
                (false, Some(first)) => {
                    for info in &mut chars[first..i] {
                        info.word_index = Some(words.len());
                    }
                    words.push(WordInfo {
                        first_char: first,
                        end_char: i,
                        line_index,
                    });
                    count += 1;
                    start = None;
                }
                _ => {}
            }
        }
        line.word_count = count;
    }

    words
}

#[cfg(test)]
mod tests {
    use crate::atlas::UvRect;
    use crate::glyph::FontStyles;
    use crate::layout::output::{Extents, Point};
    use crate::richtext::Color;
    use super::*;

    fn first_origin(chars: &[CharacterInfo]) -> Point {
        chars
            .iter()
            .find(|c| c.visible)
            .map(|c| Point::new(c.origin, c.baseline))
            .unwrap_or_default()
    }

    fn ch(c: char, origin: f32, advance: f32) -> CharacterInfo {
        let visible = !c.is_whitespace();
        CharacterInfo {
            unicode: c as u32,
            source_index: 0,
            element: None,
            style: FontStyles::NORMAL,
            color: Color::WHITE,
            point_size: 10.0,
            scale: 1.0,
            origin,
            x_advance: advance,
            baseline: 8.0,
            ascender: 8.0,
            descender: -2.0,
            x_offset: 0.0,
            y_offset: 0.0,
            top_left: Point::default(),
            bottom_left: Point::default(),
            top_right: Point::default(),
            bottom_right: Point::default(),
            uv: UvRect::default(),
            packed_scale: 1.0,
            material_index: 0,
            line_index: 0,
            word_index: None,
            page_index: 0,
            visible,
        }
    }

    fn line_of(
        text: &str,
        available: f32,
        alignment: HorizontalAlignment,
    ) -> (Vec<CharacterInfo>, LineInfo) {
        let chars: Vec<CharacterInfo> = text
            .chars()
            .enumerate()
            .map(|(i, c)| ch(c, i as f32 * 10.0, 10.0))
            .collect();
        let first_visible = chars.iter().position(|c| c.visible);
        let last_visible = chars.iter().rposition(|c| c.visible);
        let width = last_visible.map(|i| chars[i].origin + 10.0).unwrap_or(0.0);
        let line = LineInfo {
            first_char: 0,
            end_char: chars.len(),
            first_visible_char: first_visible,
            last_visible_char: last_visible,
            visible_character_count: chars.iter().filter(|c| c.visible).count(),
            space_count: 0,
            word_count: 0,
            width,
            available_width: available,
            ascender: 8.0,
            descender: -2.0,
            baseline: 8.0,
            line_height: 10.0,
            alignment,
            page_index: 0,
            ends_paragraph: false,
            extents: Extents::EMPTY,
        };
        (chars, line)
    }

    fn align(text: &str, alignment: HorizontalAlignment) -> Vec<f32> {
        let (mut chars, line) = line_of(text, 100.0, alignment);
        let mut lines = vec![line];
        let options = LayoutOptions::new(Default::default());
        align_lines(&mut chars, &mut lines, &options);
        chars.iter().map(|c| c.origin).collect()
    }

    #[test]
    fn test_simple_alignments() {
        assert_eq!(align("ab", HorizontalAlignment::Left), vec![0.0, 10.0]);
        assert_eq!(align("ab", HorizontalAlignment::Right), vec![80.0, 90.0]);
        assert_eq!(align("ab", HorizontalAlignment::Center), vec![40.0, 50.0]);
    }

    #[test]
    fn test_justify_spreads_over_gaps() {
        // "ab cd": width 50, slack 50 on one gap
        let origins = align("ab cd", HorizontalAlignment::Flush);
        assert_eq!(origins, vec![0.0, 10.0, 20.0, 80.0, 90.0]);
    }

    #[test]
    fn test_justified_last_line_exempt() {
        let (mut chars, mut line) = line_of("ab cd", 100.0, HorizontalAlignment::Justified);
        line.ends_paragraph = true;
        let mut lines = vec![line];
        align_lines(&mut chars, &mut lines, &LayoutOptions::new(Default::default()));
        assert_eq!(chars[3].origin, 30.0);
    }

    #[test]
    fn test_leading_separator_not_a_gap() {
        // Leading space is skipped; the single inner gap takes all slack
        let origins = align(" ab cd", HorizontalAlignment::Flush);
        assert_eq!(origins[0], 0.0);
        assert_eq!(origins[1], 10.0);
        assert_eq!(origins[4], 80.0);
        assert_eq!(*origins.last().unwrap(), 90.0);
    }

    #[test]
    fn test_character_ratio() {
        let (mut chars, line) = line_of("ab cd", 100.0, HorizontalAlignment::Flush);
        let mut lines = vec![line];
        let mut options = LayoutOptions::new(Default::default());
        options.justified_character_ratio = 1.0;
        align_lines(&mut chars, &mut lines, &options);
        // 50 slack over 4 visible chars -> 3 steps of 16.67
        let last = chars.last().unwrap().origin;
        assert!((last - 90.0).abs() < 0.01, "{last}");
        assert!((chars[1].origin - (10.0 + 50.0 / 3.0)).abs() < 0.01);
    }

    #[test]
    fn test_right_to_left_mirrors() {
        let (mut chars, line) = line_of("abc", 30.0, HorizontalAlignment::Left);
        let mut lines = vec![line];
        let mut options = LayoutOptions::new(Default::default());
        options.right_to_left = true;
        align_lines(&mut chars, &mut lines, &options);
        let origins: Vec<f32> = chars.iter().map(|c| c.origin).collect();
        assert_eq!(origins, vec![20.0, 10.0, 0.0]);
    }

    #[test]
    fn test_vertical_middle() {
        let (mut chars, line) = line_of("ab", 100.0, HorizontalAlignment::Left);
        let mut lines = vec![line];
        let mut options = LayoutOptions::new(Default::default());
        options.height = Some(30.0);
        options.vertical_alignment = VerticalAlignment::Middle;
        align_vertically(&mut chars, &mut lines, &options);
        // Block is 10 tall, box 30 -> shift by 10
        assert_eq!(lines[0].baseline, 18.0);
        assert_eq!(first_origin(&chars).y, 18.0);
    }

    #[test]
    fn test_words() {
        let (mut chars, line) = line_of("ab  cd e", 100.0, HorizontalAlignment::Left);
        let mut lines = vec![line];
        let words = build_words(&mut chars, &mut lines);
        assert_eq!(words.len(), 3);
        assert_eq!(words[1].first_char, 4);
        assert_eq!(words[1].character_count(), 2);
        assert_eq!(lines[0].word_count, 3);
        assert_eq!(chars[7].word_index, Some(2));
        assert_eq!(chars[2].word_index, None);
    }
}
