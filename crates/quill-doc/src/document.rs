// SPDX-License-Identifier: MIT
//! Document: the text being written, plus one cursor.
//!
//! A `Document` wraps a [`ropey::Rope`] and a cursor stored as a char index
//! into it. The cursor is always in `0..=len_chars()`; every operation that
//! changes the text keeps it there.
//!
//! Line endings are normalized to `\n` on the way in. Pasted text from a
//! terminal arrives with `\r`, model output occasionally with `\r\n`, and
//! the view only ever has to deal with one kind of break.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ropey::Rope;

/// Rope text with a char-index cursor.
#[derive(Debug, Clone)]
pub struct Document {
    rope: Rope,
    cursor: usize,
    path: Option<PathBuf>,
}

impl Document {
    /// An empty document with the cursor at 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor: 0,
            path: None,
        }
    }

    /// A document holding `text`, cursor at the end.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let rope = Rope::from_str(&normalize(text));
        let cursor = rope.len_chars();
        Self {
            rope,
            cursor,
            path: None,
        }
    }

    /// Load a document from disk. A missing file yields an empty document
    /// that remembers the path.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `NotFound`.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let mut doc = match fs::read_to_string(path) {
            Ok(text) => Self::from_text(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::new(),
            Err(e) => return Err(e),
        };
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// The file this document was opened from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the text back to [`path`](Self::path). Returns bytes written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the document has no path, or the I/O
    /// error from writing.
    pub fn save(&self) -> io::Result<usize> {
        let Some(path) = self.path.as_deref() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "document has no file name",
            ));
        };
        let text = self.text();
        fs::write(path, &text)?;
        Ok(text.len())
    }

    /// The underlying rope.
    #[inline]
    #[must_use]
    pub const fn rope(&self) -> &Rope {
        &self.rope
    }

    /// The whole text.
    #[must_use]
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    #[inline]
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Cursor as a char index.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Place the cursor, clamped to the text.
    pub fn set_cursor(&mut self, idx: usize) {
        self.cursor = idx.min(self.len_chars());
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Insert `text` at the cursor; the cursor ends up after it.
    pub fn insert_at_cursor(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = normalize(text);
        self.rope.insert(self.cursor, &text);
        self.cursor += text.chars().count();
    }

    /// Insert one character at the cursor.
    pub fn insert_char(&mut self, ch: char) {
        let ch = if ch == '\r' { '\n' } else { ch };
        self.rope.insert_char(self.cursor, ch);
        self.cursor += 1;
    }

    /// Delete the character before the cursor. Returns `false` at the start.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.rope.remove(self.cursor - 1..self.cursor);
        self.cursor -= 1;
        true
    }

    /// Remove all text and put the cursor at 0.
    pub fn clear_all(&mut self) {
        self.rope = Rope::new();
        self.cursor = 0;
    }

    // ── Motion ──────────────────────────────────────────────────

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len_chars());
    }

    /// Start of the current line.
    pub fn move_home(&mut self) {
        let line = self.rope.char_to_line(self.cursor);
        self.cursor = self.rope.line_to_char(line);
    }

    /// End of the current line, before its line break.
    pub fn move_end(&mut self) {
        let line = self.rope.char_to_line(self.cursor);
        let start = self.rope.line_to_char(line);
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
        }
        self.cursor = start + len;
    }

    pub fn move_cursor_to_end(&mut self) {
        self.cursor = self.len_chars();
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_is_empty() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.cursor(), 0);
        assert_eq!(doc.text(), "");
        assert!(doc.path().is_none());
    }

    #[test]
    fn from_text_puts_cursor_at_end() {
        let doc = Document::from_text("héllo");
        assert_eq!(doc.len_chars(), 5);
        assert_eq!(doc.cursor(), 5);
    }

    #[test]
    fn insert_advances_cursor() {
        let mut doc = Document::new();
        doc.insert_at_cursor("Once ");
        doc.insert_at_cursor("upon");
        assert_eq!(doc.text(), "Once upon");
        assert_eq!(doc.cursor(), 9);
    }

    #[test]
    fn insert_in_the_middle() {
        let mut doc = Document::from_text("ac");
        doc.set_cursor(1);
        doc.insert_at_cursor("b");
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.cursor(), 2);
    }

    #[test]
    fn insert_empty_is_noop() {
        let mut doc = Document::from_text("x");
        doc.insert_at_cursor("");
        assert_eq!(doc.text(), "x");
        assert_eq!(doc.cursor(), 1);
    }

    #[test]
    fn line_endings_are_normalized() {
        let mut doc = Document::new();
        doc.insert_at_cursor("a\r\nb\rc");
        assert_eq!(doc.text(), "a\nb\nc");
        assert_eq!(doc.cursor(), 5);
        doc.insert_char('\r');
        assert_eq!(doc.text(), "a\nb\nc\n");
    }

    #[test]
    fn backspace_removes_previous_char() {
        let mut doc = Document::from_text("abc");
        assert!(doc.backspace());
        assert_eq!(doc.text(), "ab");
        doc.set_cursor(0);
        assert!(!doc.backspace());
        assert_eq!(doc.text(), "ab");
    }

    #[test]
    fn clear_all_resets_cursor() {
        let mut doc = Document::from_text("some text");
        doc.clear_all();
        assert!(doc.is_empty());
        assert_eq!(doc.cursor(), 0);
    }

    #[test]
    fn left_right_clamp() {
        let mut doc = Document::from_text("ab");
        doc.move_right();
        assert_eq!(doc.cursor(), 2);
        doc.move_left();
        doc.move_left();
        doc.move_left();
        assert_eq!(doc.cursor(), 0);
    }

    #[test]
    fn home_end_stay_on_line() {
        let mut doc = Document::from_text("first\nsecond\nthird");
        doc.set_cursor(9);
        doc.move_home();
        assert_eq!(doc.cursor(), 6);
        doc.move_end();
        assert_eq!(doc.cursor(), 12);
    }

    #[test]
    fn end_on_last_line() {
        let mut doc = Document::from_text("one\ntwo");
        doc.set_cursor(4);
        doc.move_end();
        assert_eq!(doc.cursor(), 7);
    }

    #[test]
    fn move_cursor_to_end() {
        let mut doc = Document::from_text("story");
        doc.set_cursor(0);
        doc.move_cursor_to_end();
        assert_eq!(doc.cursor(), 5);
    }

    #[test]
    fn set_cursor_clamps() {
        let mut doc = Document::from_text("abc");
        doc.set_cursor(99);
        assert_eq!(doc.cursor(), 3);
    }

    #[test]
    fn open_missing_file_keeps_path() {
        let path = std::env::temp_dir().join("quill-doc-missing-file.txt");
        let _ = fs::remove_file(&path);
        let doc = Document::open(&path).unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.path(), Some(path.as_path()));
    }

    #[test]
    fn open_reads_file() {
        let path = std::env::temp_dir().join("quill-doc-open-test.txt");
        fs::write(&path, "line one\r\nline two").unwrap();
        let doc = Document::open(&path).unwrap();
        assert_eq!(doc.text(), "line one\nline two");
        assert_eq!(doc.cursor(), doc.len_chars());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_round_trips_through_disk() {
        let path = std::env::temp_dir().join("quill-doc-save-test.txt");
        let _ = fs::remove_file(&path);
        let mut doc = Document::open(&path).unwrap();
        doc.insert_at_cursor("a new chapter");
        assert_eq!(doc.save().unwrap(), 13);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a new chapter");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_without_path_fails() {
        let err = Document::from_text("x").save().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
