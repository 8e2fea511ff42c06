// SPDX-License-Identifier: MIT
//
// quill: a terminal writing surface that streams AI continuations into a
// document.
//
// This binary wires the workspace crates together:
//
//   quill-term → terminal control, input parsing, frame rendering, event loop
//   quill-doc  → rope document, cursor, soft-wrapped view
//   quill-gen  → lifecycle, pacing queue, prompt shaping, text sources
//
// `Writer` implements quill-term's App trait. Keys flow through on_event
// into the instruction field or the document; every frame tick, on_frame
// pumps the orchestrator, which types streamed text into the document a
// slice at a time. Streaming itself runs on a tokio runtime owned by main.
//
// Layout:
//
//   ┌──────────────────────────────────────────┐
//   │ quill · notes.txt               [ READY ]│  ← header + status badge
//   ├──────────────────────────────────────────┤
//   │ › instruction field                      │
//   ├──────────────────────────────────────────┤
//   │   document pane (soft-wrapped)           │  ← hidden until first submit
//   │                                          │
//   │ key hints / last error        12 words   │  ← bottom line
//   └──────────────────────────────────────────┘

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthChar;

use quill_doc::{Area, DocView, Document, DocumentSink};
use quill_gen::config::{
    DEFAULT_BASE_URL, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use quill_gen::{GenerationConfig, LifecycleState, Orchestrator};
use quill_term::ansi::CursorShape;
use quill_term::event_loop::{Action, App, EventLoop, LoopConfig};
use quill_term::frame::Frame;
use quill_term::input::{Event, KeyCode, KeyEvent, Modifiers};
use quill_term::style::{Attr, Color, Style};

// ─── Command line ───────────────────────────────────────────────────────────

/// Write in the terminal and let a model continue the story.
#[derive(Debug, Clone, Parser)]
#[command(name = "quill", version, about)]
struct QuillConfig {
    /// Text file to open. Starts with the document pane expanded.
    file: Option<PathBuf>,

    /// Gemini API key. Without one a simulated source is used.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// API base URL.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Output token limit per generation.
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    max_output_tokens: u32,

    /// Sampling temperature.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Frame rate of the UI loop; streamed text is typed once per frame.
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u16).range(1..=240))]
    fps: u16,

    /// Write logs to this file. Nothing is logged without it.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "quill_gen=trace").
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl QuillConfig {
    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            ..GenerationConfig::default()
        }
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Route tracing output to `path`. Stdout belongs to the UI, so logs only
/// ever go to a file.
fn init_file_logging(path: &Path, level: &str) -> Result<WorkerGuard> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level {level:?}"))?,
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("failed to install the log subscriber")?;

    Ok(guard)
}

// ─── Styles ─────────────────────────────────────────────────────────────────

const DIM: Style = Style::PLAIN.with(Attr::DIM);
const BOLD: Style = Style::PLAIN.with(Attr::BOLD);
const ACCENT: Style = Style::fg(Color::Indexed(75));
const ERROR: Style = Style::fg(Color::Indexed(203));
const PLACEHOLDER: Style = Style::PLAIN.with(Attr::DIM).with(Attr::ITALIC);

/// Label and style of the status badge.
const fn badge(state: LifecycleState) -> (&'static str, Style) {
    let (label, bg) = match state {
        LifecycleState::Idle => return ("READY", Style::PLAIN.with(Attr::INVERSE)),
        LifecycleState::Generating => ("AI ACTIVE", Color::Indexed(75)),
        LifecycleState::Success => ("DONE", Color::Indexed(114)),
        LifecycleState::Error => ("ERROR", Color::Indexed(203)),
    };
    (label, Style::fg(Color::Indexed(16)).on(bg).with(Attr::BOLD))
}

const HINTS: &str =
    "Enter generate · ^G continue/stop · Esc stop · Tab focus · ^N new · ^S save · ^Q quit";

const INSTRUCTION_PLACEHOLDER: &str = "Describe what to write, or press ^G to start a story";

const EMPTY_PANE_HINT: &str = "Your story will appear here.";

// ─── Instruction field ──────────────────────────────────────────────────────

/// One-line text input with a char cursor.
#[derive(Debug, Clone, Default)]
struct LineInput {
    text: String,
    cursor: usize,
}

impl LineInput {
    fn byte_at(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn insert_str(&mut self, s: &str) {
        let at = self.byte_at(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.text.remove(at);
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// The part of the text that fits in `width` columns with the cursor
    /// visible, and the cursor's column inside it.
    fn visible(&self, width: usize) -> (String, usize) {
        let chars: Vec<char> = self.text.chars().collect();
        let w = |c: &char| c.width().unwrap_or(0);
        let width = width.max(1);

        let mut start = 0;
        while chars[start..self.cursor].iter().map(w).sum::<usize>() >= width {
            start += 1;
        }

        let mut shown = String::new();
        let mut used = 0;
        for c in &chars[start..] {
            used += w(c);
            if used > width {
                break;
            }
            shown.push(*c);
        }
        let col = chars[start..self.cursor].iter().map(w).sum();
        (shown, col)
    }
}

// ─── Writer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Instruction,
    Document,
}

/// The application: instruction field, document pane, status.
struct Writer {
    doc: Document,
    view: DocView,
    orch: Orchestrator,
    instruction: LineInput,
    focus: Focus,
    /// Whether the document pane is shown. Collapsed until the first
    /// submission of a session.
    expanded: bool,
    /// Transient note for the bottom line, cleared by the next key.
    message: Option<String>,
    cursor_screen: Option<(u16, u16)>,
}

impl Writer {
    fn new(doc: Document, orch: Orchestrator, expanded: bool) -> Self {
        Self {
            doc,
            view: DocView::new(),
            orch,
            instruction: LineInput::default(),
            focus: if expanded {
                Focus::Document
            } else {
                Focus::Instruction
            },
            expanded,
            message: None,
            cursor_screen: None,
        }
    }

    // ── Commands ────────────────────────────────────────────────

    /// Start generating from the current instruction.
    fn submit(&mut self, now: Instant) {
        if self.orch.is_generating() {
            return;
        }
        if !self.expanded {
            self.doc.clear_all();
            self.view.scroll_to_top();
            self.expanded = true;
        }
        let instruction = self.instruction.text.trim();
        let transition = self
            .orch
            .start_generation(&mut self.doc, Some(instruction), now);
        if transition.is_applied() {
            self.focus = Focus::Document;
        }
    }

    /// Ctrl+G: stop when running, otherwise start.
    fn toggle_generation(&mut self, now: Instant) {
        if self.orch.is_generating() {
            self.orch.cancel(now);
        } else {
            self.submit(now);
        }
    }

    fn new_session(&mut self) {
        self.orch.new_session(&mut self.doc);
        self.instruction.clear();
        self.view.scroll_to_top();
        self.expanded = false;
        self.focus = Focus::Instruction;
    }

    fn save(&mut self) {
        self.message = Some(match self.doc.save() {
            Ok(bytes) => {
                let name = self
                    .doc
                    .path()
                    .map_or_else(String::new, |p| p.display().to_string());
                info!(path = %name, bytes, "document saved");
                format!("Saved {bytes} bytes to {name}")
            }
            Err(e) => {
                warn!(error = %e, "save failed");
                format!("Not saved: {e}")
            }
        });
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Instruction if self.expanded => Focus::Document,
            _ => Focus::Instruction,
        };
    }

    // ── Key handling ────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        self.message = None;

        if key.is_ctrl('q') || key.is_ctrl('c') {
            return Action::Quit;
        }
        if key.is_ctrl('g') {
            self.toggle_generation(now);
            return Action::Continue;
        }
        if key.is_ctrl('n') {
            self.new_session();
            return Action::Continue;
        }
        if key.is_ctrl('s') {
            self.save();
            return Action::Continue;
        }

        match key.code {
            KeyCode::Escape => {
                if self.orch.is_generating() {
                    self.orch.cancel(now);
                } else {
                    self.focus = Focus::Instruction;
                }
            }
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            _ if key.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) => {}
            _ => match self.focus {
                Focus::Instruction => self.edit_instruction(key.code, now),
                Focus::Document => self.edit_document(key.code),
            },
        }
        Action::Continue
    }

    fn edit_instruction(&mut self, code: KeyCode, now: Instant) {
        let input = &mut self.instruction;
        match code {
            KeyCode::Enter => {
                if !input.text.trim().is_empty() {
                    self.submit(now);
                }
            }
            KeyCode::Char(c) => input.insert_str(c.encode_utf8(&mut [0; 4])),
            KeyCode::Backspace => input.backspace(),
            KeyCode::Left => input.cursor = input.cursor.saturating_sub(1),
            KeyCode::Right => input.cursor = (input.cursor + 1).min(input.len()),
            KeyCode::Home => input.cursor = 0,
            KeyCode::End => input.cursor = input.len(),
            _ => {}
        }
    }

    fn edit_document(&mut self, code: KeyCode) {
        let doc = &mut self.doc;
        match code {
            KeyCode::Enter => doc.insert_char('\n'),
            KeyCode::Char(c) => doc.insert_char(c),
            KeyCode::Backspace => {
                doc.backspace();
            }
            KeyCode::Left => doc.move_left(),
            KeyCode::Right => doc.move_right(),
            KeyCode::Home => doc.move_home(),
            KeyCode::End => doc.move_end(),
            _ => {}
        }
    }

    fn paste(&mut self, text: &str) {
        self.message = None;
        match self.focus {
            Focus::Instruction => {
                let flat: String = text
                    .chars()
                    .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                    .collect();
                self.instruction.insert_str(&flat);
            }
            Focus::Document => self.doc.insert_at_cursor(text),
        }
    }

    // ── Painting ────────────────────────────────────────────────

    fn paint_header(&self, frame: &mut Frame) {
        let w = frame.width();
        let x = frame.put_str(1, 0, "quill", BOLD);
        let title = self
            .doc
            .path()
            .and_then(Path::file_name)
            .map_or_else(|| "untitled".to_string(), |n| n.to_string_lossy().into_owned());
        frame.put_str(x, 0, &format!(" · {title}"), DIM);

        let (label, style) = badge(self.orch.state());
        let text = format!(" {label} ");
        #[allow(clippy::cast_possible_truncation)] // short ASCII label
        let len = text.len() as u16;
        frame.put_str(w.saturating_sub(len + 1), 0, &text, style);

        frame.fill(0, 1, w, '─', DIM);
        frame.fill(0, 3, w, '─', DIM);
    }

    fn paint_instruction(&mut self, frame: &mut Frame) {
        let w = frame.width();
        frame.put_str(1, 2, "›", ACCENT);
        let field_width = usize::from(w.saturating_sub(4));

        if self.instruction.text.is_empty() {
            frame.put_str(3, 2, INSTRUCTION_PLACEHOLDER, PLACEHOLDER);
        }
        let (shown, col) = self.instruction.visible(field_width);
        frame.put_str(3, 2, &shown, Style::PLAIN);

        if self.focus == Focus::Instruction {
            #[allow(clippy::cast_possible_truncation)] // col < field_width <= u16::MAX
            let x = 3 + col as u16;
            self.cursor_screen = Some((x, 2));
        }
    }

    fn paint_document(&mut self, frame: &mut Frame, area: Area) {
        if !self.expanded {
            let hint_y = area.y + area.height / 2;
            #[allow(clippy::cast_possible_truncation)] // ASCII hint
            let len = EMPTY_PANE_HINT.len() as u16;
            let x = frame.width().saturating_sub(len) / 2;
            frame.put_str(x, hint_y, EMPTY_PANE_HINT, DIM);
            return;
        }

        let pos = self.view.render(&self.doc, frame, area, Style::PLAIN);
        if self.focus == Focus::Document {
            self.cursor_screen = Some(pos);
        }
    }

    fn paint_status(&self, frame: &mut Frame, y: u16) {
        let w = frame.width();
        let ctx = self.orch.context();

        if let Some(message) = &self.message {
            frame.put_str(1, y, message, ACCENT);
        } else if self.orch.state() == LifecycleState::Error {
            let err = ctx.last_error.as_deref().unwrap_or("Generation failed");
            frame.put_str(1, y, &format!("✗ {err}"), ERROR);
        } else {
            frame.put_str(1, y, HINTS, DIM);
        }

        let words = self.doc.text().split_whitespace().count();
        let stats = format!(" {words} words · {} ", self.orch.source_name());
        #[allow(clippy::cast_possible_truncation)]
        let len = stats.chars().count() as u16;
        frame.put_str(w.saturating_sub(len), y, &stats, DIM);
    }
}

impl App for Writer {
    fn on_event(&mut self, event: &Event) -> Action {
        match event {
            Event::Key(key) => self.handle_key(*key, Instant::now()),
            Event::Paste(text) => {
                self.paste(text);
                Action::Continue
            }
        }
    }

    fn on_frame(&mut self, now: Instant) -> bool {
        let sink: Option<&mut dyn DocumentSink> = if self.expanded {
            Some(&mut self.doc)
        } else {
            None
        };
        self.orch.pump(sink, now)
    }

    fn paint(&mut self, frame: &mut Frame) {
        let (w, h) = (frame.width(), frame.height());
        self.cursor_screen = None;

        if h < 6 || w < 20 {
            frame.put_str(0, 0, "quill: window too small", DIM);
            return;
        }

        self.paint_header(frame);
        self.paint_instruction(frame);
        let area = Area::new(2, 4, w - 4, h - 5);
        self.paint_document(frame, area);
        self.paint_status(frame, h - 1);
    }

    fn cursor(&self) -> Option<(u16, u16, CursorShape)> {
        self.cursor_screen
            .map(|(x, y)| (x, y, CursorShape::BlinkBar))
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let config = QuillConfig::parse();

    let _log_guard = config
        .log_file
        .as_deref()
        .map(|path| init_file_logging(path, &config.log_level))
        .transpose()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("quill-gen")
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let doc = match &config.file {
        Some(path) => Document::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => Document::new(),
    };

    let orch = Orchestrator::from_config(&config.generation_config(), runtime.handle().clone());
    info!(
        source = orch.source_name(),
        fps = config.fps,
        file = ?config.file,
        "starting quill"
    );

    let mut writer = Writer::new(doc, orch, config.file.is_some());
    let mut event_loop =
        EventLoop::new(LoopConfig::from_fps(config.fps)).context("failed to initialize terminal")?;
    event_loop.run(&mut writer).context("terminal I/O failed")?;

    drop(writer);
    runtime.shutdown_timeout(Duration::from_millis(200));
    info!("quill exited");
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
