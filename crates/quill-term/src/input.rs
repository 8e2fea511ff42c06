// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw stdin bytes into key and paste events. quill only enables
// bracketed paste on top of the legacy keyboard encoding, so the parser
// understands exactly that:
//
// - printable ASCII and multi-byte UTF-8
// - C0 control bytes (Ctrl+letter, Enter, Tab, Backspace)
// - CSI / SS3 navigation keys with xterm modifier parameters
// - Alt+key (ESC followed by a printable byte)
// - bracketed paste, delivered as one `Paste` event
//
// Escape sequences can be split across reads, so the parser keeps the
// unconsumed tail in a small buffer. A lone ESC is ambiguous until the
// next read; the event loop calls `flush` when a tick passes without new
// bytes, which turns it into a real Escape key.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A parsed terminal input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// Text pasted between the bracketed-paste delimiters.
    Paste(String),
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key press with no modifiers.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Ctrl + `ch`.
    #[must_use]
    pub const fn ctrl(ch: char) -> Self {
        Self {
            code: KeyCode::Char(ch),
            modifiers: Modifiers::CTRL,
        }
    }

    /// True for Ctrl + `ch` with no other modifiers.
    #[must_use]
    pub fn is_ctrl(&self, ch: char) -> bool {
        self.code == KeyCode::Char(ch) && self.modifiers == Modifiers::CTRL
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A Unicode character.
    Char(char),
    Enter,
    Tab,
    /// Shift+Tab (`CSI Z`).
    BackTab,
    Backspace,
    Escape,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    /// Keyboard modifier flags, in xterm's `param = 1 + bitmask` encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

/// Incremental terminal input parser.
///
/// Feed bytes with [`advance`](Parser::advance); call
/// [`flush`](Parser::flush) after an idle tick to resolve a pending ESC.
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
    in_paste: bool,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every event that is now complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            let rest = &self.buf[pos..];

            if self.in_paste {
                let Some(end) = find(rest, PASTE_END) else {
                    break;
                };
                events.push(Event::Paste(String::from_utf8_lossy(&rest[..end]).into_owned()));
                pos += end + PASTE_END.len();
                self.in_paste = false;
                continue;
            }

            if rest.starts_with(PASTE_START) {
                self.in_paste = true;
                pos += PASTE_START.len();
                continue;
            }
            // A strict prefix of the paste opener: wait for the rest.
            if rest.len() < PASTE_START.len() && rest.len() > 2 && PASTE_START.starts_with(rest) {
                break;
            }

            match parse_one(rest) {
                Step::Event(event, used) => {
                    events.push(event);
                    pos += used;
                }
                Step::Skip(used) => pos += used,
                Step::Incomplete => break,
            }
        }

        self.buf.drain(..pos);
        events
    }

    /// Whether bytes are waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty() && !self.in_paste
    }

    /// Emit pending bytes as literal keys. A lone ESC becomes Escape; an
    /// unfinished sequence degrades to its individual characters.
    pub fn flush(&mut self) -> Vec<Event> {
        if self.in_paste {
            return Vec::new();
        }
        let events = self
            .buf
            .iter()
            .filter_map(|&b| match b {
                0x1B => Some(key(KeyCode::Escape, Modifiers::empty())),
                0x20..=0x7E => Some(key(KeyCode::Char(b as char), Modifiers::empty())),
                _ => control_key(b),
            })
            .collect();
        self.buf.clear();
        events
    }
}

// ─── Parsing ────────────────────────────────────────────────────────────────

enum Step {
    Event(Event, usize),
    Skip(usize),
    Incomplete,
}

const fn key(code: KeyCode, modifiers: Modifiers) -> Event {
    Event::Key(KeyEvent { code, modifiers })
}

/// Map a C0 control byte (or DEL) to its key.
fn control_key(b: u8) -> Option<Event> {
    let event = match b {
        0x08 | 0x7F => key(KeyCode::Backspace, Modifiers::empty()),
        0x09 => key(KeyCode::Tab, Modifiers::empty()),
        0x0A | 0x0D => key(KeyCode::Enter, Modifiers::empty()),
        0x00 => key(KeyCode::Char(' '), Modifiers::CTRL),
        0x01..=0x1A => key(KeyCode::Char((b'a' + b - 1) as char), Modifiers::CTRL),
        _ => return None,
    };
    Some(event)
}

fn parse_one(buf: &[u8]) -> Step {
    match buf[0] {
        0x1B => parse_escape(buf),
        b @ 0x20..=0x7E => Step::Event(key(KeyCode::Char(b as char), Modifiers::empty()), 1),
        b @ (0x00..=0x1F | 0x7F) => control_key(b).map_or(Step::Skip(1), |e| Step::Event(e, 1)),
        _ => parse_utf8(buf),
    }
}

fn parse_escape(buf: &[u8]) -> Step {
    let Some(&next) = buf.get(1) else {
        return Step::Incomplete;
    };
    match next {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        0x1B => Step::Event(key(KeyCode::Escape, Modifiers::ALT), 2),
        b @ 0x20..=0x7E => Step::Event(key(KeyCode::Char(b as char), Modifiers::ALT), 2),
        // ESC before something we don't recognise: deliver the Escape and
        // let the next byte parse on its own.
        _ => Step::Event(key(KeyCode::Escape, Modifiers::empty()), 1),
    }
}

fn parse_csi(buf: &[u8]) -> Step {
    // ESC [ params... final, where final is in 0x40..=0x7E.
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Step::Incomplete;
        };
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Step::Skip(end + 1);
        }
        end += 1;
    }

    let params = parse_params(&buf[2..end]);
    let modifiers = params.get(1).copied().map_or(Modifiers::empty(), decode_modifiers);
    let used = end + 1;

    let code = match buf[end] {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'Z' => KeyCode::BackTab,
        b'~' => match params.first().copied().unwrap_or(0) {
            1 | 7 => KeyCode::Home,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            _ => return Step::Skip(used),
        },
        _ => return Step::Skip(used),
    };
    Step::Event(key(code, modifiers), used)
}

fn parse_ss3(buf: &[u8]) -> Step {
    let Some(&b) = buf.get(2) else {
        return Step::Incomplete;
    };
    let code = match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return Step::Skip(3),
    };
    Step::Event(key(code, Modifiers::empty()), 3)
}

fn parse_utf8(buf: &[u8]) -> Step {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Step::Skip(1),
    };
    if buf.len() < len {
        return Step::Incomplete;
    }
    std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Step::Skip(1), |ch| {
            Step::Event(key(KeyCode::Char(ch), Modifiers::empty()), len)
        })
}

/// Semicolon-separated decimal parameters. Empty fields read as 0.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, b| acc.saturating_mul(10).saturating_add(u16::from(b - b'0')))
        })
        .collect()
}

/// xterm encodes modifiers as `1 + bitmask`; 0 and 1 both mean none.
#[allow(clippy::cast_possible_truncation)] // Only the low bits carry flags.
const fn decode_modifiers(param: u16) -> Modifiers {
    Modifiers::from_bits_truncate(param.saturating_sub(1) as u8)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
