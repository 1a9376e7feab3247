//! Line framing for the processor's byte stream
//!
//! The processor terminates normal lines with `\r\n`, but prints its login
//! and ready prompts without a terminator and then waits. Those prompts are
//! therefore recognised as frame boundaries of their own and emitted with
//! the prompt text included.
//!
//! Chunks may be pushed from any thread. They are queued in arrival order and
//! parsed by whichever caller holds the parse lock, so two producers never
//! interleave partial parses.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::constants::{
    DEFAULT_LOGIN_PROMPT, DEFAULT_READY_PROMPTS, LINE_TERMINATOR, MAX_FRAME_LENGTH,
};

/// Tokens that end a frame
#[derive(Debug, Clone)]
pub struct FrameTokens {
    terminator: Vec<u8>,
    banners: Vec<Vec<u8>>,
    login_prompt: Vec<u8>,
}

impl FrameTokens {
    /// Build the token set from prompt strings
    ///
    /// `banners` are matched exactly, `login_prompt` ignoring ASCII case.
    pub fn new<I, S>(banners: I, login_prompt: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terminator: LINE_TERMINATOR.as_bytes().to_vec(),
            banners: banners
                .into_iter()
                .map(|b| b.as_ref().as_bytes().to_vec())
                .filter(|b| !b.is_empty())
                .collect(),
            login_prompt: login_prompt.as_bytes().to_vec(),
        }
    }

    /// Find the first frame in `buf`, checking end positions from `from`
    ///
    /// Returns `(emit_len, consume_len)`. The frame whose token completes
    /// first wins; on a tie the longer token (earlier start) wins. Choosing by
    /// completion point keeps the result independent of how the stream was
    /// chunked.
    fn find(&self, buf: &[u8], from: usize) -> Option<(usize, usize)> {
        for end in from.max(1)..=buf.len() {
            let mut best: Option<(usize, usize, usize)> = None; // (token_len, emit, consume)
            let mut consider = |token_len: usize, emit: usize| {
                if best.is_none_or(|(len, _, _)| token_len > len) {
                    best = Some((token_len, emit, end));
                }
            };

            if ends_with(buf, end, &self.terminator, false) {
                consider(self.terminator.len(), end - self.terminator.len());
            }
            for banner in &self.banners {
                if ends_with(buf, end, banner, false) {
                    consider(banner.len(), end);
                }
            }
            if !self.login_prompt.is_empty() && ends_with(buf, end, &self.login_prompt, true) {
                consider(self.login_prompt.len(), end);
            }

            if let Some((_, emit, consume)) = best {
                return Some((emit, consume));
            }
        }
        None
    }
}

impl Default for FrameTokens {
    fn default() -> Self {
        Self::new(DEFAULT_READY_PROMPTS.iter().copied(), DEFAULT_LOGIN_PROMPT)
    }
}

fn ends_with(buf: &[u8], end: usize, token: &[u8], ignore_case: bool) -> bool {
    if token.is_empty() || end < token.len() {
        return false;
    }
    let window = &buf[end - token.len()..end];
    if ignore_case {
        window.eq_ignore_ascii_case(token)
    } else {
        window == token
    }
}

#[derive(Debug, Default)]
struct ParseState {
    buffer: BytesMut,
    /// End positions below this have already been checked without a match
    scanned: usize,
}

impl ParseState {
    fn consume(&mut self, chunk: &[u8], tokens: &FrameTokens, on_line: &mut dyn FnMut(String)) {
        self.buffer.extend_from_slice(chunk);

        while let Some((emit, consume)) = tokens.find(&self.buffer, self.scanned + 1) {
            let frame = self.buffer.split_to(consume);
            let line = String::from_utf8_lossy(&frame[..emit]).into_owned();
            trace!(line = %line.escape_debug(), "Framed line");
            self.scanned = 0;
            on_line(line);
        }

        if self.buffer.len() > MAX_FRAME_LENGTH {
            warn!(
                len = self.buffer.len(),
                max = MAX_FRAME_LENGTH,
                "Dropping unterminated frame"
            );
            self.buffer.clear();
        }

        self.scanned = self.buffer.len();
    }
}

/// Incremental line framer
#[derive(Debug)]
pub struct FrameReader {
    tokens: FrameTokens,
    pending: Mutex<VecDeque<Bytes>>,
    state: Mutex<ParseState>,
}

impl FrameReader {
    pub fn new(tokens: FrameTokens) -> Self {
        Self {
            tokens,
            pending: Mutex::new(VecDeque::new()),
            state: Mutex::new(ParseState::default()),
        }
    }

    /// Queue a chunk and parse whatever is pending
    ///
    /// `on_line` is called for every complete frame, in stream order, while
    /// the parse lock is held. If another thread is already parsing, the
    /// chunk is left for it and this call returns immediately.
    pub fn push(&self, chunk: &[u8], on_line: &mut dyn FnMut(String)) {
        self.pending.lock().push_back(Bytes::copy_from_slice(chunk));

        loop {
            let Some(mut state) = self.state.try_lock() else {
                return;
            };

            loop {
                let next = self.pending.lock().pop_front();
                let Some(chunk) = next else { break };
                state.consume(&chunk, &self.tokens, on_line);
            }

            drop(state);

            // A producer may have queued a chunk after our last pop but before
            // the parse lock was released.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    /// Convenience wrapper collecting the emitted lines
    pub fn push_collect(&self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        self.push(chunk, &mut |line| lines.push(line));
        lines
    }

    /// Drop any partial line and queued chunks
    pub fn reset(&self) {
        let mut state = self.state.lock();
        self.pending.lock().clear();
        state.buffer.clear();
        state.scanned = 0;
    }

    /// Bytes buffered without a complete frame
    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(FrameTokens::default())
    }
}
