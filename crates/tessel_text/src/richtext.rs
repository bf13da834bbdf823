//! Rich text tag parsing
//!
//! Turns tagged text into styled units. Supported tags:
//! `<b>`, `<i>`, `<color=#RRGGBB[AA]>`, `<size=N>` / `<size=N%>` /
//! `<size=+N>`, `<font="name">`, `<sprite=N>` / `<sprite name="x">`,
//! `<align=...>`, `<nobr>`, `<br>` and `<noparse>`. Closing tags pop the
//! matching style. Anything that does not parse as a known tag is kept as
//! literal text.

use crate::glyph::{FontStyles, FontWeight};
use crate::layout::HorizontalAlignment;

const MAX_TAG_LENGTH: usize = 128;

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA` or a basic color name
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                3 => Some(Self::rgba(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255)),
                6 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
                8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
                _ => None,
            };
        }
        let named = match value.to_ascii_lowercase().as_str() {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::rgba(255, 0, 0, 255),
            "green" => Self::rgba(0, 255, 0, 255),
            "blue" => Self::rgba(0, 0, 255, 255),
            "yellow" => Self::rgba(255, 255, 0, 255),
            "orange" => Self::rgba(255, 128, 0, 255),
            "purple" => Self::rgba(160, 32, 240, 255),
            _ => return None,
        };
        Some(named)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Size requested by a `<size>` tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    /// Absolute point size
    Points(f32),
    /// Percentage of the base size
    Percent(f32),
    /// Offset from the base size
    Relative(f32),
}

impl SizeSpec {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(percent) = value.strip_suffix('%') {
            return percent.parse().ok().map(SizeSpec::Percent);
        }
        let number = value.strip_suffix("px").unwrap_or(value);
        if number.starts_with('+') || number.starts_with('-') {
            return number.parse().ok().map(SizeSpec::Relative);
        }
        number.parse().ok().map(SizeSpec::Points)
    }

    /// Resolve against the base point size
    pub fn apply(self, base: f32) -> f32 {
        match self {
            SizeSpec::Points(size) => size,
            SizeSpec::Percent(percent) => base * percent / 100.0,
            SizeSpec::Relative(offset) => base + offset,
        }
        .max(0.0)
    }
}

/// Style state attached to every unit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnitStyle {
    pub styles: FontStyles,
    pub weight: FontWeight,
    pub color: Option<Color>,
    pub size: Option<SizeSpec>,
    /// Index into [`RichText::font_names`]
    pub font: Option<usize>,
    pub align: Option<HorizontalAlignment>,
    pub no_break: bool,
}

/// What a unit stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitContent {
    Char(u32),
    /// Sprite by index in the default sprite asset
    SpriteIndex(usize),
    /// Sprite by name, index into [`RichText::sprite_names`]
    SpriteName(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextUnit {
    pub content: UnitContent,
    pub style: UnitStyle,
}

impl TextUnit {
    /// Code point for characters, object replacement for sprites
    pub fn unicode(&self) -> u32 {
        match self.content {
            UnitContent::Char(cp) => cp,
            UnitContent::SpriteIndex(_) | UnitContent::SpriteName(_) => 0xFFFC,
        }
    }
}

/// Parsed text ready for resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichText {
    pub units: Vec<TextUnit>,
    pub font_names: Vec<String>,
    pub sprite_names: Vec<String>,
}

#[derive(Default)]
struct StyleStack {
    bold: u32,
    italic: u32,
    colors: Vec<Color>,
    sizes: Vec<SizeSpec>,
    fonts: Vec<usize>,
    aligns: Vec<HorizontalAlignment>,
    no_break: u32,
}

impl StyleStack {
    fn current(&self) -> UnitStyle {
        let mut styles = FontStyles::NORMAL;
        if self.bold > 0 {
            styles.insert(FontStyles::BOLD);
        }
        if self.italic > 0 {
            styles.insert(FontStyles::ITALIC);
        }
        UnitStyle {
            styles,
            weight: if self.bold > 0 {
                FontWeight::BOLD
            } else {
                FontWeight::REGULAR
            },
            color: self.colors.last().copied(),
            size: self.sizes.last().copied(),
            font: self.fonts.last().copied(),
            align: self.aligns.last().copied(),
            no_break: self.no_break > 0,
        }
    }
}

/// A parsed `<name=value attr=value>` tag
struct Tag<'a> {
    name: String,
    closing: bool,
    value: Option<&'a str>,
    attributes: Vec<(String, &'a str)>,
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_tag(body: &str) -> Option<Tag<'_>> {
    let (closing, body) = match body.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let name_end = body
        .find(|c: char| c == '=' || c.is_whitespace())
        .unwrap_or(body.len());
    let name = body[..name_end].to_ascii_lowercase();
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }

    let mut rest = &body[name_end..];
    let mut value = None;
    if let Some(after) = rest.strip_prefix('=') {
        let (v, remaining) = split_value(after);
        value = Some(v);
        rest = remaining;
    }

    let mut attributes = Vec::new();
    for token in split_attributes(rest) {
        let (key, raw) = token.split_once('=')?;
        attributes.push((key.trim().to_ascii_lowercase(), unquote(raw)));
    }

    Some(Tag {
        name,
        closing,
        value,
        attributes,
    })
}

/// Split a possibly quoted value off the front of `s`
fn split_value(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    if let Some(quoted) = s.strip_prefix('"') {
        if let Some(end) = quoted.find('"') {
            return (&quoted[..end], &quoted[end + 1..]);
        }
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (&s[..end], &s[end..])
}

fn split_attributes(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            tokens.push(rest);
            break;
        };
        let (_, after) = split_value(&rest[eq + 1..]);
        let consumed = rest.len() - after.len();
        tokens.push(rest[..consumed].trim());
        rest = after.trim_start();
    }
    tokens
}

fn parse_alignment(value: &str) -> Option<HorizontalAlignment> {
    match value.to_ascii_lowercase().as_str() {
        "left" => Some(HorizontalAlignment::Left),
        "center" => Some(HorizontalAlignment::Center),
        "right" => Some(HorizontalAlignment::Right),
        "justified" => Some(HorizontalAlignment::Justified),
        "flush" => Some(HorizontalAlignment::Flush),
        "geometry" => Some(HorizontalAlignment::Geometry),
        _ => None,
    }
}

fn intern(names: &mut Vec<String>, name: &str) -> usize {
    match names.iter().position(|n| n == name) {
        Some(index) => index,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}

/// Parse `text`; with `rich == false` every char is a plain unit
pub fn parse(text: &str, rich: bool) -> RichText {
    let mut out = RichText::default();
    let mut stack = StyleStack::default();

    if !rich {
        out.units = text
            .chars()
            .map(|c| TextUnit {
                content: UnitContent::Char(c as u32),
                style: UnitStyle::default(),
            })
            .collect();
        return out;
    }

    let mut no_parse = false;
    let mut i = 0;
    while i < text.len() {
        let Some(c) = text[i..].chars().next() else {
            break;
        };

        if c == '<' {
            let window_end = (i + MAX_TAG_LENGTH).min(text.len());
            let close = text[i..]
                .char_indices()
                .take_while(|(offset, _)| i + offset < window_end)
                .find(|(_, ch)| *ch == '>')
                .map(|(offset, _)| i + offset);

            if let Some(close) = close {
                let body = &text[i + 1..close];
                if no_parse {
                    if body.trim().eq_ignore_ascii_case("/noparse") {
                        no_parse = false;
                        i = close + 1;
                        continue;
                    }
                } else if let Some(tag) = parse_tag(body) {
                    if apply_tag(&tag, &mut stack, &mut out, &mut no_parse) {
                        i = close + 1;
                        continue;
                    }
                }
            }
        }

        out.units.push(TextUnit {
            content: UnitContent::Char(c as u32),
            style: stack.current(),
        });
        i += c.len_utf8();
    }

    out
}

/// Apply a tag; false means "not a tag we know", keep it literal
fn apply_tag(
    tag: &Tag<'_>,
    stack: &mut StyleStack,
    out: &mut RichText,
    no_parse: &mut bool,
) -> bool {
    let value = tag.value.map(unquote);

    if tag.closing {
        match tag.name.as_str() {
            "b" => stack.bold = stack.bold.saturating_sub(1),
            "i" => stack.italic = stack.italic.saturating_sub(1),
            "color" => {
                stack.colors.pop();
            }
            "size" => {
                stack.sizes.pop();
            }
            "font" => {
                stack.fonts.pop();
            }
            "align" => {
                stack.aligns.pop();
            }
            "nobr" => stack.no_break = stack.no_break.saturating_sub(1),
            _ => return false,
        }
        return true;
    }

    match tag.name.as_str() {
        "b" => stack.bold += 1,
        "i" => stack.italic += 1,
        "nobr" => stack.no_break += 1,
        "noparse" => *no_parse = true,
        "br" => out.units.push(TextUnit {
            content: UnitContent::Char(crate::unicode::LINE_FEED),
            style: stack.current(),
        }),
        "color" => match value.and_then(Color::parse) {
            Some(color) => stack.colors.push(color),
            None => return false,
        },
        "size" => match value.and_then(SizeSpec::parse) {
            Some(size) => stack.sizes.push(size),
            None => return false,
        },
        "font" => match value {
            Some(name) if !name.is_empty() => {
                let index = intern(&mut out.font_names, name);
                stack.fonts.push(index);
            }
            _ => return false,
        },
        "align" => match value.and_then(parse_alignment) {
            Some(align) => stack.aligns.push(align),
            None => return false,
        },
        "sprite" => {
            let by_name = tag
                .attributes
                .iter()
                .find(|(key, _)| key == "name")
                .map(|(_, name)| *name);
            let content = match (by_name, value) {
                (Some(name), _) => UnitContent::SpriteName(intern(&mut out.sprite_names, name)),
                (None, Some(index)) => match index.trim().parse::<usize>() {
                    Ok(index) => UnitContent::SpriteIndex(index),
                    Err(_) => return false,
                },
                (None, None) => return false,
            };
            out.units.push(TextUnit {
                content,
                style: stack.current(),
            });
        }
        _ => return false,
    }
    true
}
