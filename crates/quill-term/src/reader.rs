// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background stdin reader.
//
// `read()` on stdin blocks, but the event loop has to keep ticking frames
// while the user is idle (that is when streamed text gets typed out). So a
// dedicated thread owns stdin and forwards whatever it reads over a
// channel; the loop waits on that channel with a frame-length timeout.
//
// The thread polls stdin with a short timeout and re-checks a stop flag in
// between, so `stop` returns promptly instead of waiting for a keypress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Largest chunk handed over in one message. A key is a few bytes; a
/// paste can be kilobytes and simply arrives in several chunks.
const CHUNK: usize = 4096;

/// How long one `poll()` waits before re-checking the stop flag.
#[cfg(unix)]
const POLL_MS: i32 = 50;

/// Handle to the reader thread. Stops and joins it on drop.
pub struct InputReader {
    thread: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Start the reader. Every message on the returned receiver is a
    /// non-empty chunk of raw stdin bytes; the channel closes on EOF or
    /// after [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn() -> std::io::Result<(Self, Receiver<Vec<u8>>)> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("quill-stdin".into())
            .spawn(move || read_until_stopped(&tx, &flag))?;

        Ok((
            Self {
                thread: Some(thread),
                stop,
            },
            rx,
        ))
    }

    /// Ask the thread to exit and wait for it. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn read_until_stopped(tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; CHUNK];

    while !stop.load(Ordering::Relaxed) {
        let mut pfd = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&raw mut pfd, 1, POLL_MS) };
        if ready <= 0 {
            continue;
        }

        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }
        #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
        let chunk = buf[..n as usize].to_vec();
        if tx.send(chunk).is_err() {
            break;
        }
    }
}

/// Without `poll()` the thread can only notice the stop flag between reads.
#[cfg(not(unix))]
fn read_until_stopped(tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::io::Read;

    let mut buf = [0u8; CHUNK];
    let mut stdin = std::io::stdin();
    while !stop.load(Ordering::Relaxed) {
        match stdin.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
