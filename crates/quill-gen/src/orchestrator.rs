// SPDX-License-Identifier: MIT
//! Orchestrator: one generation at a time, kept consistent with the page.
//!
//! The orchestrator lives on the UI thread next to the document. Starting a
//! generation spawns a task on the tokio runtime that runs the text source;
//! the task only talks back through a channel of [`StreamMessage`]s, each
//! tagged with the generation id it was spawned for. Every frame tick,
//! [`Orchestrator::pump`] drains that channel into the lifecycle and the
//! pacing queue, advances the success timer and types one slice into the
//! document.
//!
//! Cancelling forgets the active id and trips the task's token. Whatever
//! the stale task still manages to send carries an id nobody is waiting
//! for and is dropped on arrival.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use quill_doc::DocumentSink;

use crate::config::GenerationConfig;
use crate::error::SourceError;
use crate::lifecycle::{GenerationContext, Lifecycle, LifecycleEvent, LifecycleState, Transition};
use crate::pacing::PacingQueue;
use crate::source::{FragmentSink, GenerationRequest, MessageKind, StreamMessage, TextSource};

/// Shown when a stream fails without saying why.
pub const GENERIC_FAILURE: &str = "Failed to generate text";

struct ActiveGeneration {
    id: u64,
    cancel: CancellationToken,
}

/// Drives generations from start to finish.
pub struct Orchestrator {
    lifecycle: Lifecycle,
    pacer: PacingQueue,
    source: Arc<dyn TextSource>,
    runtime: Handle,
    tx: UnboundedSender<StreamMessage>,
    rx: UnboundedReceiver<StreamMessage>,
    next_id: u64,
    active: Option<ActiveGeneration>,
}

impl Orchestrator {
    /// An idle orchestrator streaming from `source` on `runtime`.
    #[must_use]
    pub fn new(source: Arc<dyn TextSource>, runtime: Handle, success_hold: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            lifecycle: Lifecycle::new(success_hold),
            pacer: PacingQueue::new(),
            source,
            runtime,
            tx,
            rx,
            next_id: 0,
            active: None,
        }
    }

    /// Build the source from `config` and wrap it.
    #[must_use]
    pub fn from_config(config: &GenerationConfig, runtime: Handle) -> Self {
        Self::new(config.build_source(), runtime, config.success_hold)
    }

    // ── Accessors ───────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    #[inline]
    #[must_use]
    pub const fn context(&self) -> &GenerationContext {
        self.lifecycle.context()
    }

    #[inline]
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.lifecycle.state() == LifecycleState::Generating
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Chars received but not yet typed into the document.
    #[must_use]
    pub fn pending_chars(&self) -> usize {
        self.pacer.len()
    }

    /// Id of the generation whose messages are currently accepted.
    #[must_use]
    pub fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.id)
    }

    // ── Operations ──────────────────────────────────────────────

    /// Start a generation continuing `doc`. Ignored while one is running.
    ///
    /// The cursor moves to the end of the document first so streamed text
    /// lands after everything already written. A blank instruction counts
    /// as none.
    pub fn start_generation(
        &mut self,
        doc: &mut dyn DocumentSink,
        instruction: Option<&str>,
        now: Instant,
    ) -> Transition {
        if self.is_generating() {
            debug!("start ignored, a generation is already running");
            return Transition::Ignored;
        }

        let instruction = instruction
            .filter(|i| !i.trim().is_empty())
            .map(String::from);

        doc.move_cursor_to_end();
        let transition = self.lifecycle.handle(
            LifecycleEvent::StartGeneration {
                instruction: instruction.clone(),
            },
            now,
        );
        if !transition.is_applied() {
            return transition;
        }

        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        let request = GenerationRequest {
            document_text: doc.text(),
            instruction,
        };
        let sink = FragmentSink::new(id, self.tx.clone(), cancel.clone());
        info!(
            generation = id,
            source = self.source.name(),
            context_chars = request.document_text.chars().count(),
            has_instruction = request.instruction.is_some(),
            "generation started"
        );

        self.runtime
            .spawn(run_stream(Arc::clone(&self.source), request, sink));
        self.active = Some(ActiveGeneration { id, cancel });
        transition
    }

    /// Apply everything that arrived from the stream, advance the success
    /// timer and type one slice. `doc` is `None` while the document is not
    /// on screen; text then waits in the queue.
    ///
    /// Returns whether anything visible changed.
    pub fn pump(&mut self, doc: Option<&mut dyn DocumentSink>, now: Instant) -> bool {
        let mut changed = false;

        while let Ok(message) = self.rx.try_recv() {
            changed |= self.apply(message, now);
        }

        changed |= self.lifecycle.tick(now).is_applied();
        changed |= self.pacer.drain_step(doc) > 0;
        changed
    }

    /// Stop the running generation. Queued text is discarded and nothing
    /// the old stream sends afterwards reaches the document.
    pub fn cancel(&mut self, now: Instant) -> Transition {
        self.abort_stream();
        self.pacer.reset();
        let transition = self.lifecycle.handle(LifecycleEvent::Cancel, now);
        if transition.is_applied() {
            info!("generation cancelled");
        }
        transition
    }

    /// Throw away everything: running stream, queued text, status and the
    /// document itself.
    pub fn new_session(&mut self, doc: &mut dyn DocumentSink) {
        self.abort_stream();
        self.pacer.reset();
        self.lifecycle.reset();
        doc.clear_all();
        info!("new session");
    }

    fn abort_stream(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            debug!(generation = active.id, "stream aborted");
        }
    }

    fn apply(&mut self, message: StreamMessage, now: Instant) -> bool {
        if self.active_generation() != Some(message.generation) {
            trace!(generation = message.generation, "dropping stale stream message");
            return false;
        }

        match message.kind {
            MessageKind::Fragment(text) => {
                self.pacer.append(&text);
                false
            }
            MessageKind::Finished => {
                self.active = None;
                info!(generation = message.generation, "generation complete");
                self.lifecycle
                    .handle(LifecycleEvent::GenerationComplete, now)
                    .is_applied()
            }
            MessageKind::Failed(reason) => {
                self.active = None;
                let message = if reason.trim().is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    reason
                };
                self.lifecycle
                    .handle(LifecycleEvent::Error { message }, now)
                    .is_applied()
            }
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.abort_stream();
    }
}

/// Body of the streaming task.
async fn run_stream(source: Arc<dyn TextSource>, request: GenerationRequest, sink: FragmentSink) {
    let result = tokio::select! {
        biased;
        () = sink.cancelled() => Err(SourceError::Cancelled),
        result = source.stream(request, &sink) => result,
    };

    match result {
        Ok(()) => sink.finish(),
        Err(e) if e.is_cancelled() => {
            debug!(generation = sink.generation(), "stream stopped after cancel");
        }
        Err(e) => {
            error!(generation = sink.generation(), error = %e, "generation failed");
            sink.fail(e.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
