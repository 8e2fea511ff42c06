// SPDX-License-Identifier: MIT
//
// Frame: what the application paints, and the renderer that ships it.
//
// A `Frame` is a grid of rows, each row a list of styled spans clipped to
// the frame width. Applications paint with `put_str` at an (x, y) origin;
// later writes overwrite earlier ones on the same columns, the way cells
// would.
//
// `LineRenderer` keeps the previously rendered frame and, on every render,
// rewrites only the rows that changed. A writing surface changes a row or
// two per frame (the line being typed into, the status badge), so row
// granularity is enough and keeps the renderer simple. Output is
// accumulated in one `Vec<u8>` and written with a single syscall, wrapped
// in synchronized-output markers to avoid tearing.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::style::Style;

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One display column: a character plus its style. Wide characters occupy
/// two columns; the second holds `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    ch: Option<char>,
    style: Style,
}

const BLANK: Slot = Slot {
    ch: Some(' '),
    style: Style::PLAIN,
};

/// A single row of the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    slots: Vec<Slot>,
}

impl Row {
    fn blank(width: u16) -> Self {
        Self {
            slots: vec![BLANK; width as usize],
        }
    }

    /// The visible text of this row (wide-character continuations elided,
    /// trailing spaces kept).
    #[must_use]
    pub fn text(&self) -> String {
        self.slots.iter().filter_map(|s| s.ch).collect()
    }

    /// Style at display column `x`, if inside the row.
    #[must_use]
    pub fn style_at(&self, x: u16) -> Option<Style> {
        self.slots.get(x as usize).map(|s| s.style)
    }

    /// Group consecutive slots with the same style into `(style, text)` runs.
    fn runs(&self) -> Vec<(Style, String)> {
        let mut runs: Vec<(Style, String)> = Vec::new();
        for slot in &self.slots {
            let Some(ch) = slot.ch else { continue };
            match runs.last_mut() {
                Some((style, text)) if *style == slot.style => text.push(ch),
                _ => runs.push((slot.style, ch.to_string())),
            }
        }
        runs
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// The screen contents for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    rows: Vec<Row>,
}

impl Frame {
    /// A blank frame of `width × height` columns and rows.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            rows: (0..height).map(|_| Row::blank(width)).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Row `y`, if inside the frame.
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&Row> {
        self.rows.get(y as usize)
    }

    /// Reset every column to a plain space.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.slots.fill(BLANK);
        }
    }

    /// Resize, discarding contents.
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height);
    }

    /// Paint `text` starting at column `x` of row `y`, clipped to the frame.
    ///
    /// Control characters are skipped. A wide character that would straddle
    /// the right edge is dropped. Returns the column after the last painted
    /// character.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        let width = self.width as usize;
        let Some(row) = self.rows.get_mut(y as usize) else {
            return x;
        };

        let mut col = x as usize;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w == 0 {
                continue;
            }
            if col + w > width {
                break;
            }
            // Overwriting half of an earlier wide char orphans the other half.
            if row.slots[col].ch.is_none() && col > 0 {
                row.slots[col - 1] = BLANK;
            }
            row.slots[col] = Slot {
                ch: Some(ch),
                style,
            };
            if w == 2 {
                row.slots[col + 1] = Slot { ch: None, style };
            } else if row.slots.get(col + 1).is_some_and(|s| s.ch.is_none()) {
                row.slots[col + 1] = BLANK;
            }
            col += w;
        }

        #[allow(clippy::cast_possible_truncation)] // col <= width, which is a u16.
        let end = col as u16;
        end
    }

    /// Fill columns `x..x + len` of row `y` with `ch` in `style`.
    pub fn fill(&mut self, x: u16, y: u16, len: u16, ch: char, style: Style) {
        let run: String = std::iter::repeat_n(ch, len as usize).collect();
        self.put_str(x, y, &run, style);
    }
}

// ─── LineRenderer ────────────────────────────────────────────────────────────

/// Renders frames to the terminal, rewriting only rows that changed.
#[derive(Debug, Default)]
pub struct LineRenderer {
    previous: Option<Frame>,
    out: Vec<u8>,
}

impl LineRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame so the next render repaints every row.
    /// Needed after a resize or anything else that scribbled on the screen.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    /// Queue the escape sequences that turn the previous frame into `frame`.
    /// Returns the number of rows rewritten.
    ///
    /// # Errors
    ///
    /// Only fails if writing into the internal buffer fails, which a `Vec`
    /// never does.
    pub fn render(&mut self, frame: &Frame) -> io::Result<usize> {
        let full = self
            .previous
            .as_ref()
            .is_none_or(|p| p.width != frame.width || p.height != frame.height);

        let mut changed = 0;
        ansi::begin_sync(&mut self.out)?;
        for (y, row) in frame.rows.iter().enumerate() {
            let same = !full
                && self
                    .previous
                    .as_ref()
                    .and_then(|p| p.rows.get(y))
                    .is_some_and(|prev| prev == row);
            if same {
                continue;
            }

            #[allow(clippy::cast_possible_truncation)] // y < frame.height.
            ansi::cursor_to(&mut self.out, 0, y as u16)?;
            for (style, text) in row.runs() {
                ansi::style(&mut self.out, style)?;
                self.out.write_all(text.as_bytes())?;
            }
            ansi::reset(&mut self.out)?;
            changed += 1;
        }
        ansi::end_sync(&mut self.out)?;

        match &mut self.previous {
            Some(prev) if !full => prev.clone_from(frame),
            _ => self.previous = Some(frame.clone()),
        }
        Ok(changed)
    }

    /// The bytes queued since the last flush.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.out
    }

    /// Write all queued bytes to stdout in one go.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.out.is_empty() {
            return Ok(());
        }
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        lock.write_all(&self.out)?;
        lock.flush()?;
        self.out.clear();
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Attr, Color};
    use pretty_assertions::assert_eq;

    fn row_text(frame: &Frame, y: u16) -> String {
        frame.row(y).unwrap().text()
    }

    // ── Frame painting ────────────────────────────────────────────

    #[test]
    fn new_frame_is_blank() {
        let f = Frame::new(4, 2);
        assert_eq!(row_text(&f, 0), "    ");
        assert_eq!(row_text(&f, 1), "    ");
    }

    #[test]
    fn put_str_places_text() {
        let mut f = Frame::new(8, 1);
        let end = f.put_str(2, 0, "abc", Style::PLAIN);
        assert_eq!(end, 5);
        assert_eq!(row_text(&f, 0), "  abc   ");
    }

    #[test]
    fn put_str_clips_at_right_edge() {
        let mut f = Frame::new(4, 1);
        let end = f.put_str(2, 0, "hello", Style::PLAIN);
        assert_eq!(end, 4);
        assert_eq!(row_text(&f, 0), "  he");
    }

    #[test]
    fn put_str_outside_rows_is_noop() {
        let mut f = Frame::new(4, 1);
        assert_eq!(f.put_str(1, 5, "x", Style::PLAIN), 1);
        assert_eq!(row_text(&f, 0), "    ");
    }

    #[test]
    fn wide_char_takes_two_columns() {
        let mut f = Frame::new(6, 1);
        let end = f.put_str(0, 0, "日x", Style::PLAIN);
        assert_eq!(end, 3);
        assert_eq!(row_text(&f, 0), "日x   ");
    }

    #[test]
    fn wide_char_dropped_at_edge() {
        let mut f = Frame::new(3, 1);
        let end = f.put_str(2, 0, "日", Style::PLAIN);
        assert_eq!(end, 2);
        assert_eq!(row_text(&f, 0), "   ");
    }

    #[test]
    fn overwriting_wide_continuation_blanks_lead() {
        let mut f = Frame::new(4, 1);
        f.put_str(0, 0, "日", Style::PLAIN);
        f.put_str(1, 0, "z", Style::PLAIN);
        assert_eq!(row_text(&f, 0), " z  ");
    }

    #[test]
    fn overwriting_wide_lead_blanks_continuation() {
        let mut f = Frame::new(4, 1);
        f.put_str(0, 0, "日", Style::PLAIN);
        f.put_str(0, 0, "z", Style::PLAIN);
        assert_eq!(row_text(&f, 0), "z   ");
    }

    #[test]
    fn control_chars_skipped() {
        let mut f = Frame::new(4, 1);
        f.put_str(0, 0, "a\tb", Style::PLAIN);
        assert_eq!(row_text(&f, 0), "ab  ");
    }

    #[test]
    fn fill_repeats_char() {
        let mut f = Frame::new(5, 1);
        let bold = Style::PLAIN.with(Attr::BOLD);
        f.fill(1, 0, 3, '─', bold);
        assert_eq!(row_text(&f, 0), " ─── ");
        let row = f.row(0).unwrap();
        assert_eq!(row.style_at(0), Some(Style::PLAIN));
        assert_eq!(row.style_at(1), Some(bold));
        assert_eq!(row.style_at(3), Some(bold));
        assert_eq!(row.style_at(4), Some(Style::PLAIN));
    }

    #[test]
    fn clear_resets_contents() {
        let mut f = Frame::new(3, 1);
        f.put_str(0, 0, "abc", Style::fg(Color::Indexed(1)));
        f.clear();
        assert_eq!(row_text(&f, 0), "   ");
        assert_eq!(f.row(0).unwrap().style_at(0), Some(Style::PLAIN));
    }

    #[test]
    fn resize_changes_dimensions() {
        let mut f = Frame::new(3, 1);
        f.resize(10, 4);
        assert_eq!((f.width(), f.height()), (10, 4));
        assert_eq!(row_text(&f, 3).len(), 10);
    }

    // ── Renderer ──────────────────────────────────────────────────

    #[test]
    fn first_render_writes_every_row() {
        let mut r = LineRenderer::new();
        let f = Frame::new(4, 3);
        assert_eq!(r.render(&f).unwrap(), 3);
    }

    #[test]
    fn unchanged_frame_writes_nothing() {
        let mut r = LineRenderer::new();
        let f = Frame::new(4, 3);
        r.render(&f).unwrap();
        assert_eq!(r.render(&f).unwrap(), 0);
    }

    #[test]
    fn only_changed_rows_rewritten() {
        let mut r = LineRenderer::new();
        let mut f = Frame::new(4, 3);
        r.render(&f).unwrap();
        f.put_str(0, 1, "hi", Style::PLAIN);
        assert_eq!(r.render(&f).unwrap(), 1);
        let out = String::from_utf8_lossy(r.pending()).into_owned();
        assert!(out.contains("\x1b[2;1H"), "row 1 must be addressed: {out:?}");
        assert!(out.contains("hi"));
    }

    #[test]
    fn resize_forces_full_render() {
        let mut r = LineRenderer::new();
        r.render(&Frame::new(4, 2)).unwrap();
        assert_eq!(r.render(&Frame::new(5, 2)).unwrap(), 2);
    }

    #[test]
    fn force_redraw_repaints() {
        let mut r = LineRenderer::new();
        let f = Frame::new(4, 2);
        r.render(&f).unwrap();
        r.force_redraw();
        assert_eq!(r.render(&f).unwrap(), 2);
    }

    #[test]
    fn output_is_synchronized() {
        let mut r = LineRenderer::new();
        r.render(&Frame::new(2, 1)).unwrap();
        let out = String::from_utf8_lossy(r.pending()).into_owned();
        assert!(out.starts_with("\x1b[?2026h"));
        assert!(out.ends_with("\x1b[?2026l"));
    }

    #[test]
    fn runs_group_same_style() {
        let mut f = Frame::new(4, 1);
        let red = Style::fg(Color::Indexed(1));
        f.put_str(0, 0, "ab", red);
        let runs = f.row(0).unwrap().runs();
        assert_eq!(runs, vec![(red, "ab".to_string()), (Style::PLAIN, "  ".to_string())]);
    }
}
