// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop: input, frame ticks, and rendering on one thread.
//
// Each iteration waits for stdin bytes until the next frame tick is due.
// Whatever happens (bytes or timeout) the loop then:
//
//   1. hands parsed events to the app,
//   2. picks up a pending resize,
//   3. calls `on_frame` if a tick is due. This is the animation-frame hook
//      where streamed text is typed into the document, one paced slice per
//      frame. Input bursts wake the loop more often but never add ticks,
//   4. repaints and renders if anything changed.
//
// Idle screens cost one wakeup per frame and no output: rendering only
// happens when the dirty flag is set, and the line renderer only writes
// rows that differ.
//
// A timeout with bytes still buffered in the parser means a lone ESC was
// really the Escape key, so the parser is flushed then.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::ansi::{self, CursorShape};
use crate::frame::{Frame, LineRenderer};
use crate::input::{Event, Parser};
use crate::reader::InputReader;
use crate::terminal::{Size, Terminal};

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

static RESIZED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_sigwinch(_sig: libc::c_int) {
    RESIZED.store(true, Ordering::Relaxed);
}

/// Install the SIGWINCH handler. Storing to an atomic is async-signal-safe.
#[cfg(unix)]
fn watch_resizes() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = on_sigwinch as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(not(unix))]
const fn watch_resizes() {}

// ─── App ─────────────────────────────────────────────────────────────────────

/// What the app wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// An application driven by [`EventLoop`].
///
/// Per iteration the loop calls [`on_event`](App::on_event) for each input
/// event, [`on_resize`](App::on_resize) if the window changed,
/// [`on_frame`](App::on_frame) once, then [`paint`](App::paint) and
/// [`cursor`](App::cursor) if anything is dirty.
pub trait App {
    /// Handle one input event. Returning [`Action::Quit`] ends the loop.
    fn on_event(&mut self, _event: &Event) -> Action {
        Action::Continue
    }

    /// The terminal was resized; the frame already has the new size.
    fn on_resize(&mut self, _size: Size) {}

    /// Called once per frame interval, input or not. Return `true` when
    /// state changed and the screen needs repainting.
    fn on_frame(&mut self, _now: Instant) -> bool {
        false
    }

    /// Paint the whole UI into a cleared frame.
    fn paint(&mut self, frame: &mut Frame);

    /// Where to show the hardware cursor after painting, or `None` to hide it.
    fn cursor(&self) -> Option<(u16, u16, CursorShape)> {
        None
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Frame timing for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Longest wait for input before a frame tick fires.
    pub frame_interval: Duration,
}

impl LoopConfig {
    /// Interval for `fps` frames per second, clamped to 1..=240.
    #[must_use]
    pub fn from_fps(fps: u16) -> Self {
        let fps = u64::from(fps.clamp(1, 240));
        Self {
            frame_interval: Duration::from_micros(1_000_000 / fps),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from_fps(120)
    }
}

// ─── Frame clock ─────────────────────────────────────────────────────────────

/// Schedules frame ticks at a fixed interval, independent of how often
/// the loop wakes up.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    interval: Duration,
    next: Instant,
}

impl FrameClock {
    const fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now,
        }
    }

    /// How long the loop may sleep before the next tick is due.
    fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Whether a tick is due at `now`. A due tick schedules the next one;
    /// a clock that fell behind restarts from `now` instead of catching up.
    fn tick(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// Owns the terminal, parser and renderer for the lifetime of the UI.
pub struct EventLoop {
    terminal: Terminal,
    parser: Parser,
    renderer: LineRenderer,
    config: LoopConfig,
}

impl EventLoop {
    /// # Errors
    ///
    /// Returns an error if the terminal handle can't be created.
    pub fn new(config: LoopConfig) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new()?,
            parser: Parser::new(),
            renderer: LineRenderer::new(),
            config,
        })
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terminal.size()
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> LoopConfig {
        self.config
    }

    /// Enter the terminal UI and run until the app quits or stdin closes.
    /// The terminal is restored on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if entering/leaving the terminal, spawning the
    /// reader, or writing a frame fails.
    pub fn run(&mut self, app: &mut impl App) -> io::Result<()> {
        self.terminal.enter()?;
        watch_resizes();

        let result = InputReader::spawn().and_then(|(mut reader, rx)| {
            let outcome = self.run_frames(app, &rx);
            reader.stop();
            outcome
        });

        self.terminal.leave()?;
        result
    }

    fn run_frames(&mut self, app: &mut impl App, rx: &Receiver<Vec<u8>>) -> io::Result<()> {
        let size = self.terminal.size();
        let mut frame = Frame::new(size.cols, size.rows);
        let mut dirty = true;
        let mut clock = FrameClock::new(self.config.frame_interval, Instant::now());

        loop {
            let events = match rx.recv_timeout(clock.remaining(Instant::now())) {
                Ok(bytes) => self.parser.advance(&bytes),
                Err(RecvTimeoutError::Timeout) if self.parser.has_pending() => self.parser.flush(),
                Err(RecvTimeoutError::Timeout) => Vec::new(),
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };
            for event in &events {
                if app.on_event(event) == Action::Quit {
                    return Ok(());
                }
                dirty = true;
            }

            if RESIZED.swap(false, Ordering::Relaxed) {
                let size = self.terminal.refresh_size();
                frame.resize(size.cols, size.rows);
                self.renderer.force_redraw();
                app.on_resize(size);
                dirty = true;
            }

            let now = Instant::now();
            if clock.tick(now) {
                dirty |= app.on_frame(now);
            }

            if dirty {
                self.draw(app, &mut frame)?;
                dirty = false;
            }
        }
    }

    fn draw(&mut self, app: &mut impl App, frame: &mut Frame) -> io::Result<()> {
        frame.clear();
        app.paint(frame);
        self.renderer.render(frame)?;
        self.renderer.flush()?;

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        match app.cursor() {
            Some((x, y, shape)) => {
                ansi::cursor_to(&mut lock, x, y)?;
                ansi::set_cursor_shape(&mut lock, shape)?;
                ansi::cursor_show(&mut lock)?;
            }
            None => ansi::cursor_hide(&mut lock)?,
        }
        lock.flush()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
