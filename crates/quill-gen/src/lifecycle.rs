// SPDX-License-Identifier: MIT
//! Generation lifecycle: the four-state machine behind the status badge.
//!
//! ```text
//!            StartGeneration                 GenerationComplete
//!   Idle ───────────────────▶ Generating ─────────────────────▶ Success
//!    ▲  ◀───── Cancel ──────    │   ▲  ◀──── StartGeneration ──── │
//!    │                    Error │   │                             │
//!    │                          ▼   │ StartGeneration             │
//!    └──────── Cancel ─────── Error                               │
//!    ▲                                                            │
//!    └─────────────── SuccessElapsed (hold after entry) ──────────┘
//! ```
//!
//! The transition table lives in [`next_state`], a pure function. Anything
//! it doesn't list is ignored: state and context stay exactly as they were.
//! [`Lifecycle`] adds the context updates and the one timed transition,
//! which is driven by [`Lifecycle::tick`] from the frame loop rather than a
//! timer thread.

use std::time::{Duration, Instant};

use tracing::debug;

/// How long `Success` is shown before falling back to `Idle`.
pub const SUCCESS_HOLD: Duration = Duration::from_millis(2000);

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
}

impl LifecycleState {
    /// Short name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StartGeneration { instruction: Option<String> },
    Cancel,
    GenerationComplete,
    Error { message: String },
    SuccessElapsed,
}

impl LifecycleEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::StartGeneration { .. } => "start",
            Self::Cancel => "cancel",
            Self::GenerationComplete => "complete",
            Self::Error { .. } => "error",
            Self::SuccessElapsed => "success-elapsed",
        }
    }
}

/// Data carried alongside the state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationContext {
    /// Instruction of the most recent accepted start.
    pub instruction: Option<String>,
    /// Message of the most recent failure, cleared on every accepted start.
    pub last_error: Option<String>,
}

/// Outcome of offering an event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied {
        from: LifecycleState,
        to: LifecycleState,
    },
    Ignored,
}

impl Transition {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// The transition table. `None` means the event is ignored in `state`.
#[must_use]
pub const fn next_state(state: LifecycleState, event: &LifecycleEvent) -> Option<LifecycleState> {
    use LifecycleEvent as E;
    use LifecycleState as S;

    match (state, event) {
        (S::Idle | S::Success | S::Error, E::StartGeneration { .. }) => Some(S::Generating),
        (S::Generating | S::Error, E::Cancel) | (S::Success, E::SuccessElapsed) => Some(S::Idle),
        (S::Generating, E::GenerationComplete) => Some(S::Success),
        (S::Generating, E::Error { .. }) => Some(S::Error),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// The state machine plus its context and success timer.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    context: GenerationContext,
    hold: Duration,
    success_since: Option<Instant>,
}

impl Lifecycle {
    /// A machine in `Idle` whose `Success` lasts `hold`.
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            state: LifecycleState::Idle,
            context: GenerationContext::default(),
            hold,
            success_since: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    #[must_use]
    pub const fn context(&self) -> &GenerationContext {
        &self.context
    }

    #[inline]
    #[must_use]
    pub const fn hold(&self) -> Duration {
        self.hold
    }

    /// Offer `event` at time `now`.
    pub fn handle(&mut self, event: LifecycleEvent, now: Instant) -> Transition {
        let from = self.state;
        let Some(to) = next_state(from, &event) else {
            debug!(state = from.name(), event = event.name(), "ignored lifecycle event");
            return Transition::Ignored;
        };

        match event {
            LifecycleEvent::StartGeneration { instruction } => {
                self.context.last_error = None;
                self.context.instruction = instruction;
            }
            LifecycleEvent::Error { message } => {
                self.context.last_error = Some(message);
            }
            LifecycleEvent::Cancel
            | LifecycleEvent::GenerationComplete
            | LifecycleEvent::SuccessElapsed => {}
        }

        self.state = to;
        self.success_since = (to == LifecycleState::Success).then_some(now);
        debug!(from = from.name(), to = to.name(), "lifecycle transition");
        Transition::Applied { from, to }
    }

    /// Fire `SuccessElapsed` once the hold has passed. Ignored otherwise.
    pub fn tick(&mut self, now: Instant) -> Transition {
        match self.success_since {
            Some(since) if now.saturating_duration_since(since) >= self.hold => {
                self.handle(LifecycleEvent::SuccessElapsed, now)
            }
            _ => Transition::Ignored,
        }
    }

    /// Back to `Idle` with an empty context and no pending timer.
    pub fn reset(&mut self) {
        self.state = LifecycleState::Idle;
        self.context = GenerationContext::default();
        self.success_since = None;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(SUCCESS_HOLD)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn start(instruction: Option<&str>) -> LifecycleEvent {
        LifecycleEvent::StartGeneration {
            instruction: instruction.map(String::from),
        }
    }

    fn fail(message: &str) -> LifecycleEvent {
        LifecycleEvent::Error {
            message: message.into(),
        }
    }

    fn all_events() -> Vec<LifecycleEvent> {
        vec![
            start(Some("go")),
            start(None),
            LifecycleEvent::Cancel,
            LifecycleEvent::GenerationComplete,
            fail("boom"),
            LifecycleEvent::SuccessElapsed,
        ]
    }

    #[test]
    fn starts_idle_and_empty() {
        let lc = Lifecycle::default();
        assert_eq!(lc.state(), LifecycleState::Idle);
        assert_eq!(lc.context(), &GenerationContext::default());
        assert_eq!(lc.hold(), SUCCESS_HOLD);
    }

    #[test]
    fn happy_path() {
        let now = Instant::now();
        let mut lc = Lifecycle::default();
        assert_eq!(
            lc.handle(start(Some("a storm")), now),
            Transition::Applied {
                from: LifecycleState::Idle,
                to: LifecycleState::Generating
            }
        );
        assert_eq!(lc.context().instruction.as_deref(), Some("a storm"));
        assert!(lc.handle(LifecycleEvent::GenerationComplete, now).is_applied());
        assert_eq!(lc.state(), LifecycleState::Success);
    }

    #[test]
    fn error_records_message_and_restart_clears_it() {
        let now = Instant::now();
        let mut lc = Lifecycle::default();
        lc.handle(start(None), now);
        lc.handle(fail("quota exceeded"), now);
        assert_eq!(lc.state(), LifecycleState::Error);
        assert_eq!(lc.context().last_error.as_deref(), Some("quota exceeded"));

        lc.handle(start(Some("retry")), now);
        assert_eq!(lc.state(), LifecycleState::Generating);
        assert_eq!(lc.context().last_error, None);
        assert_eq!(lc.context().instruction.as_deref(), Some("retry"));
    }

    #[test]
    fn cancel_from_generating_and_error() {
        let now = Instant::now();
        let mut lc = Lifecycle::default();
        lc.handle(start(None), now);
        assert!(lc.handle(LifecycleEvent::Cancel, now).is_applied());
        assert_eq!(lc.state(), LifecycleState::Idle);

        lc.handle(start(None), now);
        lc.handle(fail("x"), now);
        assert!(lc.handle(LifecycleEvent::Cancel, now).is_applied());
        assert_eq!(lc.state(), LifecycleState::Idle);
    }

    #[test]
    fn success_reverts_after_exactly_the_hold() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::default();
        lc.handle(start(None), t0);
        lc.handle(LifecycleEvent::GenerationComplete, t0);

        assert_eq!(lc.tick(t0 + Duration::from_millis(1999)), Transition::Ignored);
        assert_eq!(lc.state(), LifecycleState::Success);

        assert_eq!(
            lc.tick(t0 + Duration::from_millis(2000)),
            Transition::Applied {
                from: LifecycleState::Success,
                to: LifecycleState::Idle
            }
        );
        assert_eq!(lc.tick(t0 + Duration::from_millis(5000)), Transition::Ignored);
    }

    #[test]
    fn start_preempts_the_success_timer() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::default();
        lc.handle(start(None), t0);
        lc.handle(LifecycleEvent::GenerationComplete, t0);
        lc.handle(start(Some("more")), t0 + Duration::from_millis(500));
        assert_eq!(lc.tick(t0 + Duration::from_millis(2500)), Transition::Ignored);
        assert_eq!(lc.state(), LifecycleState::Generating);
    }

    #[test]
    fn hold_is_configurable() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::new(Duration::from_millis(10));
        lc.handle(start(None), t0);
        lc.handle(LifecycleEvent::GenerationComplete, t0);
        assert!(lc.tick(t0 + Duration::from_millis(10)).is_applied());
    }

    #[test]
    fn ignored_events_change_nothing() {
        let now = Instant::now();
        let table: &[(LifecycleState, &[LifecycleEvent])] = &[
            (
                LifecycleState::Idle,
                &[
                    LifecycleEvent::Cancel,
                    LifecycleEvent::GenerationComplete,
                    LifecycleEvent::SuccessElapsed,
                ],
            ),
            (LifecycleState::Generating, &[LifecycleEvent::SuccessElapsed]),
        ];

        for (state, events) in table {
            let mut lc = Lifecycle::default();
            if *state == LifecycleState::Generating {
                lc.handle(start(Some("keep")), now);
            }
            for event in events.iter() {
                let before = (lc.state(), lc.context().clone());
                assert_eq!(lc.handle(event.clone(), now), Transition::Ignored);
                assert_eq!((lc.state(), lc.context().clone()), before);
            }
        }

        // Errors outside Generating must not touch last_error.
        let mut lc = Lifecycle::default();
        assert_eq!(lc.handle(fail("late"), now), Transition::Ignored);
        assert_eq!(lc.context().last_error, None);
    }

    #[test]
    fn start_while_generating_is_ignored() {
        let now = Instant::now();
        let mut lc = Lifecycle::default();
        lc.handle(start(Some("first")), now);
        assert_eq!(lc.handle(start(Some("second")), now), Transition::Ignored);
        assert_eq!(lc.context().instruction.as_deref(), Some("first"));
    }

    #[test]
    fn every_sequence_stays_in_the_table() {
        // Walk all event sequences of length 4 from Idle and check each step
        // against next_state.
        let events = all_events();
        let now = Instant::now();
        let mut stack = vec![(Lifecycle::default(), 0usize)];
        while let Some((lc, depth)) = stack.pop() {
            if depth == 4 {
                continue;
            }
            for event in &events {
                let mut next = lc.clone();
                let expected = next_state(lc.state(), event);
                let result = next.handle(event.clone(), now);
                match expected {
                    Some(to) => {
                        assert_eq!(result, Transition::Applied { from: lc.state(), to });
                    }
                    None => {
                        assert_eq!(result, Transition::Ignored);
                        assert_eq!(next.context(), lc.context());
                    }
                }
                stack.push((next, depth + 1));
            }
        }
    }

    #[test]
    fn reset_clears_everything() {
        let t0 = Instant::now();
        let mut lc = Lifecycle::default();
        lc.handle(start(Some("x")), t0);
        lc.handle(fail("bad"), t0);
        lc.reset();
        assert_eq!(lc.state(), LifecycleState::Idle);
        assert_eq!(lc.context(), &GenerationContext::default());
        assert_eq!(lc.tick(t0 + SUCCESS_HOLD), Transition::Ignored);
    }
}
