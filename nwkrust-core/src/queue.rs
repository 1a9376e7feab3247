//! Outbound command queue
//!
//! The processor accepts one command per tick. Commands wait in one of two
//! FIFO tiers; execute commands always go before queries. Nothing is sent
//! until the link is ready, and a dropped link discards everything queued.
//! While the queue is closed (no link at all) new commands are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    command::Mode,
    error::{Error, Result},
    message::Message,
};

/// Destination for outbound lines (the transport's send side)
pub trait LineSink: Send + Sync {
    fn send_line(&self, line: &str);
}

impl<F> LineSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn send_line(&self, line: &str) {
        self(line)
    }
}

/// Queue tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Execute,
    Query,
}

impl Priority {
    /// Classify a line by its mode character
    pub fn classify(line: &str) -> Result<Self> {
        match line.chars().next() {
            Some(c) if c == Mode::Execute.symbol() => Ok(Self::Execute),
            Some(c) if c == Mode::Query.symbol() => Ok(Self::Query),
            Some(c) => Err(Error::IllegalMode(c)),
            None => Err(Error::EmptyLine),
        }
    }
}

#[derive(Debug, Default)]
struct Tiers {
    execute: VecDeque<String>,
    query: VecDeque<String>,
}

/// Two-tier command queue with a ready gate
#[derive(Debug)]
pub struct CommandQueue {
    tiers: Mutex<Tiers>,
    ready: AtomicBool,
    open: AtomicBool,
}

impl CommandQueue {
    /// An open queue with the ready gate shut
    pub fn new() -> Self {
        Self {
            tiers: Mutex::new(Tiers::default()),
            ready: AtomicBool::new(false),
            open: AtomicBool::new(true),
        }
    }

    /// Queue an encoded message
    pub fn enqueue(&self, message: &Message) -> Result<()> {
        self.enqueue_line(message.encode())
    }

    /// Queue a raw line, classified by its first character
    ///
    /// A closed queue drops the line and still returns `Ok`.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalMode`] for anything that is not an execute or query line.
    pub fn enqueue_line(&self, line: impl Into<String>) -> Result<()> {
        let line = line.into();
        let priority = Priority::classify(&line)?;

        if !self.is_open() {
            debug!(line = %line.trim_end(), "Queue closed, dropping command");
            return Ok(());
        }

        trace!(line = %line.trim_end(), ?priority, "Queued");

        let mut tiers = self.tiers.lock();
        match priority {
            Priority::Execute => tiers.execute.push_back(line),
            Priority::Query => tiers.query.push_back(line),
        }
        Ok(())
    }

    /// Pop the next line regardless of the ready gate
    pub fn pop(&self) -> Option<String> {
        let mut tiers = self.tiers.lock();
        tiers.execute.pop_front().or_else(|| tiers.query.pop_front())
    }

    /// Send at most one line if the link is ready
    ///
    /// Returns `true` if a line was sent.
    pub fn dispatch_one(&self, sink: &dyn LineSink) -> bool {
        if !self.is_ready() {
            return false;
        }
        match self.pop() {
            Some(line) => {
                trace!(line = %line.trim_end(), "Dispatching");
                sink.send_line(&line);
                true
            }
            None => false,
        }
    }

    /// Open or close the ready gate
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Accept (`true`) or silently drop (`false`) new commands
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Drop every queued line, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut tiers = self.tiers.lock();
        let dropped = tiers.execute.len() + tiers.query.len();
        tiers.execute.clear();
        tiers.query.clear();
        if dropped > 0 {
            debug!(dropped, "Discarded queued commands");
        }
        dropped
    }

    /// Queued `(execute, query)` counts
    pub fn pending(&self) -> (usize, usize) {
        let tiers = self.tiers.lock();
        (tiers.execute.len(), tiers.query.len())
    }

    pub fn len(&self) -> usize {
        let (execute, query) = self.pending();
        execute + query
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl LineSink) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink_sent = Arc::clone(&sent);
        (sent, move |line: &str| sink_sent.lock().push(line.to_string()))
    }

    #[test]
    fn test_execute_preempts_query() {
        let queue = CommandQueue::new();
        queue.enqueue_line("?A\r\n").unwrap();
        queue.enqueue_line("#B\r\n").unwrap();
        queue.enqueue_line("?C\r\n").unwrap();
        queue.enqueue_line("#D\r\n").unwrap();
        queue.set_ready(true);

        let (sent, sink) = recorder();
        while queue.dispatch_one(&sink) {}

        assert_eq!(*sent.lock(), vec!["#B\r\n", "#D\r\n", "?A\r\n", "?C\r\n"]);
    }

    #[test]
    fn test_one_line_per_dispatch() {
        let queue = CommandQueue::new();
        queue.set_ready(true);
        queue.enqueue(&Message::query(Command::Area, 1, 6)).unwrap();
        queue.enqueue(&Message::query(Command::Area, 1, 8)).unwrap();

        let (sent, sink) = recorder();
        assert!(queue.dispatch_one(&sink));
        assert_eq!(sent.lock().len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_not_ready_sends_nothing() {
        let queue = CommandQueue::new();
        queue.enqueue_line("#OUTPUT,1,1,0.00\r\n").unwrap();

        let (sent, sink) = recorder();
        assert!(!queue.dispatch_one(&sink));
        assert!(sent.lock().is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_illegal_mode_rejected() {
        let queue = CommandQueue::new();
        assert!(matches!(
            queue.enqueue_line("~OUTPUT,1,1,0.00\r\n"),
            Err(Error::IllegalMode('~'))
        ));
        assert!(matches!(queue.enqueue_line(""), Err(Error::EmptyLine)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closed_queue_drops_commands() {
        let queue = CommandQueue::new();
        queue.set_open(false);
        queue.set_ready(true);

        queue.enqueue_line("#OUTPUT,1,1,0.00\r\n").unwrap();
        assert!(queue.is_empty());
        assert!(matches!(queue.enqueue_line("~OUTPUT,1"), Err(Error::IllegalMode('~'))));

        queue.set_open(true);
        queue.enqueue_line("#OUTPUT,1,1,0.00\r\n").unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear_drops_backlog() {
        let queue = CommandQueue::new();
        for i in 0..5 {
            queue.enqueue_line(format!("?OUTPUT,{i},1\r\n")).unwrap();
        }
        queue.enqueue_line("#AREA,1,6,1\r\n").unwrap();
        assert_eq!(queue.pending(), (1, 5));

        assert_eq!(queue.clear(), 6);
        queue.set_ready(true);

        let (sent, sink) = recorder();
        assert!(!queue.dispatch_one(&sink));
        assert!(sent.lock().is_empty());
    }
}
