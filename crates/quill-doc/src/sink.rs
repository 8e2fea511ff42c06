// SPDX-License-Identifier: MIT
//! The narrow surface the generation core writes through.
//!
//! Streaming code never needs the rest of [`Document`]: it moves the cursor
//! to the end, reads the text for context, types fragments in, and clears
//! everything on a new session. Keeping that behind a trait lets the core
//! be tested against a recording fake.

use crate::document::Document;

/// Where generated text goes.
pub trait DocumentSink {
    /// Insert at the cursor. The cursor moves past the inserted text.
    fn insert_at_cursor(&mut self, text: &str);

    /// Remove all content.
    fn clear_all(&mut self);

    fn move_cursor_to_end(&mut self);

    /// Full plain text.
    fn text(&self) -> String;
}

impl DocumentSink for Document {
    fn insert_at_cursor(&mut self, text: &str) {
        Self::insert_at_cursor(self, text);
    }

    fn clear_all(&mut self) {
        Self::clear_all(self);
    }

    fn move_cursor_to_end(&mut self) {
        Self::move_cursor_to_end(self);
    }

    fn text(&self) -> String {
        Self::text(self)
    }
}
