//! Periodic command dispatch
//!
//! The processor has no flow control, so the queue is drained at a fixed
//! pace: at most one line per tick.

use std::sync::Arc;
use std::time::Duration;

use nwkrust_core::{CommandQueue, LineSink};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// Handle to a running dispatch task; stops the task when dropped
#[derive(Debug)]
pub struct Dispatcher {
    handle: JoinHandle<()>,
}

impl Dispatcher {
    /// Start draining `queue` into `sink` every `period`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(queue: Arc<CommandQueue>, sink: Arc<dyn LineSink>, period: Duration) -> Self {
        debug!(?period, "Starting dispatcher");

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                queue.dispatch_one(sink.as_ref());
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        debug!("Stopping dispatcher");
        self.handle.abort();
    }
}
