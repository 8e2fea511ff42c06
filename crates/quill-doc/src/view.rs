// SPDX-License-Identifier: MIT
//! View: soft-wrapped rendering of a [`Document`] into a frame area.
//!
//! Prose has long paragraphs and no horizontal scrolling, so every logical
//! line is wrapped into display rows no wider than the area. Wrapping
//! prefers the last blank on the row; a word longer than the row is broken
//! wherever it hits the edge. A single blank that lands exactly on the edge
//! hangs past it rather than starting the next row.
//!
//! The view only keeps the index of the first visible row. Each render
//! re-wraps the document, moves that index just enough to keep the cursor
//! row on screen, paints, and reports where the cursor landed. Streaming
//! text in at the cursor therefore scrolls the view along with it.

use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use quill_term::frame::Frame;
use quill_term::style::Style;

use crate::document::Document;

// ---------------------------------------------------------------------------
// Area
// ---------------------------------------------------------------------------

/// A rectangle of the frame, in display columns and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Area {
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// ---------------------------------------------------------------------------
// Wrapping
// ---------------------------------------------------------------------------

/// Display width of one document char. Tabs show as a single blank; line
/// breaks and other controls take no space.
fn char_width(ch: char) -> usize {
    if ch == '\t' {
        1
    } else {
        ch.width().unwrap_or(0)
    }
}

/// Split one logical line (without its line break) into row ranges of char
/// offsets. Always returns at least one range; an empty line is `[0..0]`.
#[must_use]
pub fn wrap_line(chars: &[char], width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    if chars.is_empty() {
        return vec![0..0];
    }

    let mut rows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = start;
        let mut col = 0;
        let mut last_blank = None;
        let mut hung = false;

        while end < chars.len() {
            let ch = chars[end];
            let w = char_width(ch);
            if col + w > width && end > start {
                if ch == ' ' || ch == '\t' {
                    end += 1;
                    hung = true;
                }
                break;
            }
            col += w;
            if ch.is_whitespace() {
                last_blank = Some(end + 1);
            }
            end += 1;
        }

        if !hung && end < chars.len() {
            if let Some(brk) = last_blank {
                end = brk;
            }
        }
        rows.push(start..end);
        start = end;
    }
    rows
}

/// One display row: the doc char range it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DisplayRow {
    chars: Range<usize>,
}

/// Wrap the whole document. Returns the rows and the index of the row that
/// holds the cursor together with the cursor's display column in it.
fn layout(doc: &Document, width: usize) -> (Vec<DisplayRow>, usize, usize) {
    let rope = doc.rope();
    let cursor = doc.cursor();
    let mut rows = Vec::new();
    let mut cursor_row = 0;
    let mut cursor_col = 0;

    for (line_idx, line) in rope.lines().enumerate() {
        let line_start = rope.line_to_char(line_idx);
        let chars: Vec<char> = line.chars().filter(|&c| c != '\n').collect();
        let wrapped = wrap_line(&chars, width);

        let line_end = line_start + chars.len();
        let on_this_line = (line_start..=line_end).contains(&cursor);

        for (i, range) in wrapped.iter().enumerate() {
            if on_this_line {
                let offset = cursor - line_start;
                let is_last = i + 1 == wrapped.len();
                if range.start <= offset && (offset < range.end || is_last) {
                    cursor_row = rows.len();
                    cursor_col = chars[range.start..offset]
                        .iter()
                        .map(|&c| char_width(c))
                        .sum();
                }
            }
            rows.push(DisplayRow {
                chars: line_start + range.start..line_start + range.end,
            });
        }
    }

    // A rope always yields at least one (possibly empty) line, but keep the
    // invariant explicit for callers that index rows[0].
    if rows.is_empty() {
        rows.push(DisplayRow { chars: 0..0 });
    }
    (rows, cursor_row, cursor_col)
}

// ---------------------------------------------------------------------------
// DocView
// ---------------------------------------------------------------------------

/// Scroll state for one document pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocView {
    top: usize,
}

impl DocView {
    #[must_use]
    pub const fn new() -> Self {
        Self { top: 0 }
    }

    /// First visible display row.
    #[inline]
    #[must_use]
    pub const fn top(&self) -> usize {
        self.top
    }

    pub fn scroll_to_top(&mut self) {
        self.top = 0;
    }

    /// Paint `doc` into `area` of `frame` and return the cursor's screen
    /// position. Scrolls first so the cursor row is visible.
    pub fn render(
        &mut self,
        doc: &Document,
        frame: &mut Frame,
        area: Area,
        style: Style,
    ) -> (u16, u16) {
        if area.width == 0 || area.height == 0 {
            return (area.x, area.y);
        }

        let width = usize::from(area.width);
        let height = usize::from(area.height);
        let (rows, cursor_row, cursor_col) = layout(doc, width);

        if cursor_row < self.top {
            self.top = cursor_row;
        } else if cursor_row >= self.top + height {
            self.top = cursor_row + 1 - height;
        }

        let rope = doc.rope();
        for (screen_y, row) in rows.iter().skip(self.top).take(height).enumerate() {
            let text: String = rope
                .slice(row.chars.clone())
                .chars()
                .filter(|&c| c != '\n')
                .map(|c| if c == '\t' { ' ' } else { c })
                .collect();
            #[allow(clippy::cast_possible_truncation)] // screen_y < height <= u16::MAX
            let y = area.y + screen_y as u16;
            frame.put_str(area.x, y, &text, style);
        }

        #[allow(clippy::cast_possible_truncation)] // both bounded by the area
        let (x, y) = (
            cursor_col.min(width - 1) as u16,
            (cursor_row - self.top) as u16,
        );
        (area.x + x, area.y + y)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
