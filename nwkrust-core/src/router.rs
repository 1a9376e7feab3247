//! Feedback routing
//!
//! Responses are not correlated with the request that caused them. Each
//! integration registers a handler under `(command family, integration id)`
//! and receives every response line carrying that key, shaped to its own
//! addressing. Error replies carry no key and are decoded and logged here.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::{
    command::{Command, Mode},
    error::Result,
    message::{Addressing, Envelope, Feedback},
};

/// Routing key: command family plus integration id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub command: Command,
    pub integration_id: u32,
}

impl RouteKey {
    pub fn new(command: Command, integration_id: u32) -> Self {
        Self {
            command,
            integration_id,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.command, self.integration_id)
    }
}

/// Feedback handler
pub type Handler = Arc<dyn Fn(Feedback<'_>) -> Result<()> + Send + Sync>;

struct Route {
    id: u64,
    addressing: Addressing,
    handler: Handler,
}

/// Registry of feedback handlers
#[derive(Default)]
pub struct ResponseRouter {
    next_id: AtomicU64,
    routes: RwLock<HashMap<RouteKey, Vec<Route>>>,
}

impl ResponseRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `(command, integration_id)`
    ///
    /// The handler stays registered until the returned [`Registration`] is dropped.
    pub fn register<F>(
        self: &Arc<Self>,
        command: Command,
        integration_id: u32,
        addressing: Addressing,
        handler: F,
    ) -> Registration
    where
        F: Fn(Feedback<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let key = RouteKey::new(command, integration_id);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.routes.write().entry(key).or_default().push(Route {
            id,
            addressing,
            handler: Arc::new(handler),
        });

        trace!(%key, id, "Registered feedback handler");

        Registration {
            router: Arc::downgrade(self),
            key,
            id,
        }
    }

    fn unregister(&self, key: RouteKey, id: u64) {
        let mut routes = self.routes.write();
        if let Some(list) = routes.get_mut(&key) {
            list.retain(|route| route.id != id);
            if list.is_empty() {
                routes.remove(&key);
            }
        }
        trace!(%key, id, "Unregistered feedback handler");
    }

    /// Number of handlers registered for a key
    pub fn handler_count(&self, key: RouteKey) -> usize {
        self.routes.read().get(&key).map_or(0, Vec::len)
    }

    /// Deliver a parsed line
    ///
    /// Returns the number of handlers that accepted the feedback. A failing or
    /// panicking handler is logged and does not stop delivery to the others.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        match envelope.mode {
            Mode::Error => {
                if let Some(code) = envelope.error_code() {
                    warn!(code = code.code(), "Processor reported error: {}", code);
                }
                return 0;
            }
            Mode::Execute | Mode::Query => {
                trace!(line = %envelope, "Ignoring echoed command");
                return 0;
            }
            Mode::Response => {}
        }

        let key = RouteKey::new(envelope.command, envelope.integration_id);

        // Clone the handlers out so none run under the registry lock
        let targets: Vec<(Addressing, Handler)> = match self.routes.read().get(&key) {
            Some(list) => list
                .iter()
                .map(|r| (r.addressing, Arc::clone(&r.handler)))
                .collect(),
            None => {
                trace!(%key, "No handler for feedback");
                return 0;
            }
        };

        let mut delivered = 0;
        for (addressing, handler) in targets {
            let feedback = match envelope.feedback(addressing) {
                Ok(feedback) => feedback,
                Err(e) => {
                    warn!(%key, line = %envelope, "Malformed feedback: {}", e);
                    continue;
                }
            };

            match catch_unwind(AssertUnwindSafe(|| handler(feedback))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!(%key, line = %envelope, "Feedback handler failed: {}", e),
                Err(_) => warn!(%key, line = %envelope, "Feedback handler panicked"),
            }
        }
        delivered
    }

    /// Parse and deliver a raw line
    pub fn dispatch_line(&self, line: &str) -> Result<usize> {
        let envelope = Envelope::parse(line)?;
        Ok(self.dispatch(&envelope))
    }
}

impl fmt::Debug for ResponseRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseRouter")
            .field("keys", &self.routes.read().len())
            .finish()
    }
}

/// Handle that unregisters its handler when dropped
#[derive(Debug)]
pub struct Registration {
    router: Weak<ResponseRouter>,
    key: RouteKey,
    id: u64,
}

impl Registration {
    pub fn key(&self) -> RouteKey {
        self.key
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(router) = self.router.upgrade() {
            router.unregister(self.key, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_routes_by_key() {
        let router = Arc::new(ResponseRouter::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _zone = router.register(Command::Output, 10, Addressing::Plain, move |fb| {
            sink.lock().push((fb.action(), fb.params().to_vec()));
            Ok(())
        });

        assert_eq!(router.dispatch_line("~OUTPUT,10,1,50.00").unwrap(), 1);
        assert_eq!(router.dispatch_line("~OUTPUT,11,1,50.00").unwrap(), 0);
        assert_eq!(router.dispatch_line("~AREA,10,6,1").unwrap(), 0);

        assert_eq!(*seen.lock(), vec![(1, vec!["50.00".to_string()])]);
    }

    #[test]
    fn test_componented_shape() {
        let router = Arc::new(ResponseRouter::new());
        let seen = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&seen);
        let _keypad = router.register(Command::Device, 30, Addressing::Componented, move |fb| {
            *sink.lock() = Some((fb.component(), fb.action(), fb.param(0)?.to_string()));
            Ok(())
        });

        router.dispatch_line("~DEVICE,30,81,9,1\r\n").unwrap();
        assert_eq!(*seen.lock(), Some((Some(81), 9, "1".to_string())));
    }

    #[test]
    fn test_drop_unregisters() {
        let router = Arc::new(ResponseRouter::new());
        let key = RouteKey::new(Command::Area, 1);

        let registration = router.register(Command::Area, 1, Addressing::Plain, |_| Ok(()));
        assert_eq!(router.handler_count(key), 1);

        drop(registration);
        assert_eq!(router.handler_count(key), 0);
        assert_eq!(router.dispatch_line("~AREA,1,6,1").unwrap(), 0);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let router = Arc::new(ResponseRouter::new());
        let hits = Arc::new(Mutex::new(0));

        let _bad = router.register(Command::Area, 1, Addressing::Plain, |_| {
            Err(Error::MissingParameter { expected: 2, actual: 1 })
        });
        let _panics = router.register(Command::Area, 1, Addressing::Plain, |_| panic!("boom"));
        let counter = Arc::clone(&hits);
        let _good = router.register(Command::Area, 1, Addressing::Plain, move |_| {
            *counter.lock() += 1;
            Ok(())
        });

        assert_eq!(router.dispatch_line("~AREA,1,6,1").unwrap(), 1);
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_error_and_echo_lines_not_routed() {
        let router = Arc::new(ResponseRouter::new());
        let _r = router.register(Command::Output, 4, Addressing::Plain, |_| Ok(()));

        // ~ERROR,4 carries a code, not integration 4
        assert_eq!(router.dispatch_line("~ERROR,4").unwrap(), 0);
        assert_eq!(router.dispatch_line("#OUTPUT,4,1,0.00").unwrap(), 0);
    }

    #[test]
    fn test_malformed_shape_skipped() {
        let router = Arc::new(ResponseRouter::new());
        let _r = router.register(Command::Device, 30, Addressing::Componented, |_| Ok(()));
        assert_eq!(router.dispatch_line("~DEVICE,30,81").unwrap(), 0);
    }
}
