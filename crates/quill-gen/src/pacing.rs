// SPDX-License-Identifier: MIT
//! Chunk pacing: turns bursty network fragments into steady typing.
//!
//! Fragments arrive whenever the network delivers them: sometimes a word,
//! sometimes half a paragraph at once. They are appended to a FIFO of
//! chars, and on every frame tick one drain step moves a small slice from
//! the front into the document. The slice grows with the backlog so a
//! large burst catches up instead of trailing far behind the stream:
//!
//! | buffered chars | slice per frame |
//! |----------------|-----------------|
//! | > 100          | 15              |
//! | > 50           | 8               |
//! | > 20           | 4               |
//! | otherwise      | 2               |
//!
//! The queue has a single consumer: whoever holds `&mut PacingQueue`.

use std::collections::VecDeque;

use quill_doc::DocumentSink;

/// Chars moved by one drain step when `buffered` chars are waiting.
#[must_use]
pub const fn slice_size(buffered: usize) -> usize {
    if buffered > 100 {
        15
    } else if buffered > 50 {
        8
    } else if buffered > 20 {
        4
    } else {
        2
    }
}

/// FIFO of chars waiting to be typed into the document.
#[derive(Debug, Clone, Default)]
pub struct PacingQueue {
    buffer: VecDeque<char>,
    draining: bool,
    delivered: usize,
}

impl PacingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `fragment` behind everything already buffered and arm the
    /// drain process.
    pub fn append(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.buffer.extend(fragment.chars());
        self.draining = true;
    }

    /// Drop everything buffered and stop draining. Dropped text is never
    /// delivered.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.draining = false;
        self.delivered = 0;
    }

    /// Number of buffered chars.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether a drain step would try to deliver text.
    #[inline]
    #[must_use]
    pub const fn is_draining(&self) -> bool {
        self.draining
    }

    /// Chars delivered since the last reset.
    #[inline]
    #[must_use]
    pub const fn delivered(&self) -> usize {
        self.delivered
    }

    /// The buffered text, front first.
    #[must_use]
    pub fn pending_text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Move one slice from the front of the queue into `sink`. Returns the
    /// number of chars delivered.
    ///
    /// With no sink the step does nothing: the text stays buffered and the
    /// process stays armed, so the next step retries. The process disarms
    /// itself once the buffer runs dry.
    pub fn drain_step(&mut self, sink: Option<&mut dyn DocumentSink>) -> usize {
        if !self.draining {
            return 0;
        }
        let Some(sink) = sink else {
            return 0;
        };

        let take = slice_size(self.buffer.len()).min(self.buffer.len());
        let slice: String = self.buffer.drain(..take).collect();
        if !slice.is_empty() {
            sink.insert_at_cursor(&slice);
        }
        self.delivered += take;

        if self.buffer.is_empty() {
            self.draining = false;
        }
        take
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Records every insertion.
    #[derive(Default)]
    struct Recorder {
        text: String,
        inserts: Vec<String>,
    }

    impl DocumentSink for Recorder {
        fn insert_at_cursor(&mut self, text: &str) {
            self.text.push_str(text);
            self.inserts.push(text.to_string());
        }
        fn clear_all(&mut self) {
            self.text.clear();
        }
        fn move_cursor_to_end(&mut self) {}
        fn text(&self) -> String {
            self.text.clone()
        }
    }

    fn first_slice(len: usize) -> usize {
        let mut q = PacingQueue::new();
        q.append(&"x".repeat(len));
        let mut sink = Recorder::default();
        q.drain_step(Some(&mut sink))
    }

    #[test]
    fn thresholds() {
        assert_eq!(slice_size(101), 15);
        assert_eq!(slice_size(100), 8);
        assert_eq!(slice_size(51), 8);
        assert_eq!(slice_size(50), 4);
        assert_eq!(slice_size(21), 4);
        assert_eq!(slice_size(20), 2);
        assert_eq!(slice_size(0), 2);
    }

    #[test]
    fn first_step_sizes() {
        assert_eq!(first_slice(120), 15);
        assert_eq!(first_slice(60), 8);
        assert_eq!(first_slice(30), 4);
        assert_eq!(first_slice(10), 2);
        assert_eq!(first_slice(1), 1);
    }

    #[test]
    fn append_is_fifo() {
        let mut q = PacingQueue::new();
        q.append("ab");
        q.append("cd");
        assert_eq!(q.pending_text(), "abcd");
        assert!(q.is_draining());
    }

    #[test]
    fn drains_everything_in_order() {
        let pieces = [" It", " was", " a", " dark", " and stormy night, ", "日本語", "!"];
        let mut q = PacingQueue::new();
        let mut sink = Recorder::default();
        for piece in pieces {
            q.append(piece);
            q.drain_step(Some(&mut sink));
        }
        while q.is_draining() {
            q.drain_step(Some(&mut sink));
        }
        assert_eq!(sink.text, pieces.concat());
        assert_eq!(q.delivered(), pieces.concat().chars().count());
        assert!(q.is_empty());
    }

    #[test]
    fn slice_shrinks_as_backlog_drains() {
        let mut q = PacingQueue::new();
        q.append(&"y".repeat(60));
        let mut sink = Recorder::default();
        let sizes: Vec<usize> = std::iter::from_fn(|| {
            let n = q.drain_step(Some(&mut sink));
            (n > 0).then_some(n)
        })
        .collect();
        assert_eq!(sizes[0], 8);
        assert_eq!(sizes.iter().sum::<usize>(), 60);
        assert_eq!(*sizes.last().unwrap(), 2);
    }

    #[test]
    fn missing_sink_keeps_text_armed() {
        let mut q = PacingQueue::new();
        q.append("hello");
        assert_eq!(q.drain_step(None), 0);
        assert_eq!(q.len(), 5);
        assert!(q.is_draining());

        let mut sink = Recorder::default();
        assert_eq!(q.drain_step(Some(&mut sink)), 2);
        assert_eq!(sink.text, "he");
    }

    #[test]
    fn stops_when_empty_and_rearms_on_append() {
        let mut q = PacingQueue::new();
        let mut sink = Recorder::default();
        q.append("ab");
        assert_eq!(q.drain_step(Some(&mut sink)), 2);
        assert!(!q.is_draining());
        assert_eq!(q.drain_step(Some(&mut sink)), 0);

        q.append("c");
        assert!(q.is_draining());
        assert_eq!(q.drain_step(Some(&mut sink)), 1);
        assert_eq!(sink.inserts, vec!["ab", "c"]);
    }

    #[test]
    fn reset_discards_pending_text() {
        let mut q = PacingQueue::new();
        let mut sink = Recorder::default();
        q.append("discard me");
        q.drain_step(Some(&mut sink));
        q.reset();
        assert!(q.is_empty());
        assert!(!q.is_draining());
        assert_eq!(q.delivered(), 0);
        assert_eq!(q.drain_step(Some(&mut sink)), 0);
        assert_eq!(sink.text, "di");
    }

    #[test]
    fn empty_fragment_does_not_arm() {
        let mut q = PacingQueue::new();
        q.append("");
        assert!(!q.is_draining());
    }
}
