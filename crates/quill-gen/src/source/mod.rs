// SPDX-License-Identifier: MIT
//! Text sources: where generated fragments come from.
//!
//! A source runs on the tokio runtime and never sees the document. It
//! receives a snapshot of the text in a [`GenerationRequest`] and pushes
//! fragments through a [`FragmentSink`], which tags each one with the
//! generation it belongs to and forwards it to the UI thread.

mod fallback;
mod gemini;

pub use fallback::{FallbackSource, default_passage, instruction_passage, split_before_whitespace};
pub use gemini::GeminiSource;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::Result;

/// What a source is asked to continue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub document_text: String,
    pub instruction: Option<String>,
}

/// One message from a streaming task to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub generation: u64,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Fragment(String),
    Finished,
    Failed(String),
}

/// The sending half handed to a source for one generation.
#[derive(Debug, Clone)]
pub struct FragmentSink {
    generation: u64,
    tx: UnboundedSender<StreamMessage>,
    cancel: CancellationToken,
}

impl FragmentSink {
    #[must_use]
    pub const fn new(
        generation: u64,
        tx: UnboundedSender<StreamMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generation,
            tx,
            cancel,
        }
    }

    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Forward one fragment. Empty fragments are skipped. Returns `false`
    /// once the generation is cancelled or the receiver is gone; the
    /// source should stop then.
    pub fn emit(&self, text: impl Into<String>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let text = text.into();
        if text.is_empty() {
            return true;
        }
        self.send(MessageKind::Fragment(text))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the generation is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub(crate) fn finish(&self) {
        self.send(MessageKind::Finished);
    }

    pub(crate) fn fail(&self, message: String) {
        self.send(MessageKind::Failed(message));
    }

    fn send(&self, kind: MessageKind) -> bool {
        self.tx
            .send(StreamMessage {
                generation: self.generation,
                kind,
            })
            .is_ok()
    }
}

/// A producer of text fragments.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Name for logs and the status line.
    fn name(&self) -> &str;

    /// Stream a continuation for `request` into `sink`, returning once the
    /// source has nothing more to say.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`](crate::error::SourceError) when the stream
    /// fails, and `SourceError::Cancelled` when the sink stops accepting.
    async fn stream(&self, request: GenerationRequest, sink: &FragmentSink) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[test]
    fn emit_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FragmentSink::new(7, tx, CancellationToken::new());
        assert!(sink.emit("hello"));
        assert!(sink.emit(""));
        sink.finish();
        assert_eq!(
            rx.try_recv().unwrap(),
            StreamMessage {
                generation: 7,
                kind: MessageKind::Fragment("hello".into())
            }
        );
        assert_eq!(rx.try_recv().unwrap().kind, MessageKind::Finished);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn cancelled_sink_refuses() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let sink = FragmentSink::new(1, tx, token.clone());
        token.cancel();
        assert!(sink.is_cancelled());
        assert!(!sink.emit("late"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_receiver_refuses() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = FragmentSink::new(1, tx, CancellationToken::new());
        assert!(!sink.emit("nobody listening"));
    }
}
