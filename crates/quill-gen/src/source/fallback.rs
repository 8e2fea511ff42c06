// SPDX-License-Identifier: MIT
//! Simulated source: canned prose typed out word by word.
//!
//! Used when no API key is configured so the whole pipeline can still be
//! tried end to end. The passage is cut before every whitespace char and
//! each piece is emitted after a short random pause, which is enough to
//! look like a network stream on screen.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use super::{FragmentSink, GenerationRequest, TextSource};
use crate::error::{Result, SourceError};

const DEFAULT_PASSAGE: &str = " ...and then, seemingly out of nowhere, the horizon began to shimmer \
with an iridescent glow. It wasn't just light; it was a promise of a new dawn, a digital awakening \
that would change the course of history forever. The data streams coalesced into a tangible form, \
a bridge between the physical and the virtual.";

/// The passage used when there is no instruction.
#[must_use]
pub const fn default_passage() -> &'static str {
    DEFAULT_PASSAGE
}

/// The passage used when the user gave an instruction.
#[must_use]
pub fn instruction_passage(instruction: &str) -> String {
    format!(
        " [Simulated output for instruction: \"{instruction}\"] The system processed the request \
         and began to weave a new narrative thread, intricately detailed and perfectly aligned \
         with the user's intent."
    )
}

/// Cut `text` in front of every whitespace char. A leading whitespace char
/// does not produce an empty first piece.
///
/// `"a b  c"` → `["a", " b", " ", " c"]`
#[must_use]
pub fn split_before_whitespace(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() && i > start {
            pieces.push(&text[start..i]);
            start = i;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Emits a canned passage with random pauses between pieces.
#[derive(Debug, Clone)]
pub struct FallbackSource {
    delay_ms: RangeInclusive<u64>,
}

impl FallbackSource {
    #[must_use]
    pub const fn new(delay_ms: RangeInclusive<u64>) -> Self {
        Self { delay_ms }
    }

    fn next_delay(&self) -> Duration {
        let (lo, hi) = (*self.delay_ms.start(), *self.delay_ms.end());
        let ms = if lo >= hi {
            lo
        } else {
            rand::rng().random_range(lo..=hi)
        };
        Duration::from_millis(ms)
    }
}

impl Default for FallbackSource {
    fn default() -> Self {
        Self::new(50..=150)
    }
}

#[async_trait]
impl TextSource for FallbackSource {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn stream(&self, request: GenerationRequest, sink: &FragmentSink) -> Result<()> {
        let passage = match request.instruction.as_deref().filter(|i| !i.is_empty()) {
            Some(instruction) => instruction_passage(instruction),
            None => DEFAULT_PASSAGE.to_string(),
        };
        let pieces = split_before_whitespace(&passage);
        debug!(
            generation = sink.generation(),
            pieces = pieces.len(),
            "streaming simulated passage"
        );

        for piece in pieces {
            let delay = self.next_delay();
            tokio::select! {
                () = sink.cancelled() => return Err(SourceError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            if !sink.emit(piece) {
                return Err(SourceError::Cancelled);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MessageKind, StreamMessage};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio_util::sync::CancellationToken;

    fn fragments(rx: &mut UnboundedReceiver<StreamMessage>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let MessageKind::Fragment(text) = msg.kind {
                out.push(text);
            }
        }
        out
    }

    #[test]
    fn splits_like_a_lookahead() {
        assert_eq!(split_before_whitespace("a b  c"), vec!["a", " b", " ", " c"]);
        assert_eq!(split_before_whitespace(" lead"), vec![" lead"]);
        assert_eq!(split_before_whitespace("one\ntwo"), vec!["one", "\ntwo"]);
        assert!(split_before_whitespace("").is_empty());
    }

    #[test]
    fn pieces_rebuild_the_passage() {
        let pieces = split_before_whitespace(default_passage());
        assert_eq!(pieces.concat(), default_passage());
        assert!(pieces[0].starts_with(" ...and"));
    }

    #[test]
    fn instruction_is_quoted() {
        let passage = instruction_passage("write a poem");
        assert!(passage.starts_with(" [Simulated output for instruction: \"write a poem\"]"));
        assert!(passage.ends_with("the user's intent."));
    }

    #[tokio::test]
    async fn streams_default_passage() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FragmentSink::new(3, tx, CancellationToken::new());
        let source = FallbackSource::new(0..=0);

        source.stream(GenerationRequest::default(), &sink).await.unwrap();

        assert_eq!(fragments(&mut rx).concat(), default_passage());
    }

    #[tokio::test]
    async fn streams_instruction_passage() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FragmentSink::new(1, tx, CancellationToken::new());
        let request = GenerationRequest {
            document_text: "Some story".into(),
            instruction: Some("make it rhyme".into()),
        };

        FallbackSource::new(0..=0).stream(request, &sink).await.unwrap();

        assert_eq!(fragments(&mut rx).concat(), instruction_passage("make it rhyme"));
    }

    #[tokio::test]
    async fn whitespace_instruction_is_still_quoted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FragmentSink::new(1, tx, CancellationToken::new());
        let request = GenerationRequest {
            document_text: String::new(),
            instruction: Some("  ".into()),
        };

        FallbackSource::new(0..=0).stream(request, &sink).await.unwrap();

        assert_eq!(fragments(&mut rx).concat(), instruction_passage("  "));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_pieces() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FragmentSink::new(1, tx, CancellationToken::new());
        let source = FallbackSource::default();
        let started = tokio::time::Instant::now();

        source.stream(GenerationRequest::default(), &sink).await.unwrap();

        let pieces = fragments(&mut rx).len() as u64;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50 * pieces));
        assert!(elapsed <= Duration::from_millis(150 * pieces));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let sink = FragmentSink::new(1, tx, token.clone());
        let source = FallbackSource::new(100..=100);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            token.cancel();
        });
        let result = source.stream(GenerationRequest::default(), &sink).await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(SourceError::Cancelled)));
        assert_eq!(fragments(&mut rx).len(), 3);
    }
}
