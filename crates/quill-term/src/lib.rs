// SPDX-License-Identifier: MIT
//
// quill-term: the terminal layer for quill.
//
// Raw-mode terminal control, a background stdin reader, a key/paste
// parser, a line-diffed frame renderer, and the frame-ticked event loop
// that drives the application. Everything talks to the terminal through
// ANSI escape sequences and termios directly; there is no TUI framework
// underneath.

pub mod ansi;
pub mod event_loop;
pub mod frame;
pub mod input;
pub mod reader;
pub mod style;
pub mod terminal;
