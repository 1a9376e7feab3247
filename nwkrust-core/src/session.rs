//! Link session management
//!
//! The session is the connection gate in front of the command queue:
//! - `Disconnected` until the transport reports a connection
//! - `AwaitingLogin` while the processor prompts for and checks the login
//! - `Ready` once the ready prompt (or a login acknowledgement) arrives

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

/// Link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No transport connection
    Disconnected,

    /// Connected, login not yet complete
    AwaitingLogin,

    /// Logged in and accepting commands
    Ready,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Completed logins since creation
    logins: AtomicU32,

    /// Current link state
    state: parking_lot::RwLock<LinkState>,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                logins: AtomicU32::new(0),
                state: parking_lot::RwLock::new(LinkState::Disconnected),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> LinkState {
        *self.inner.state.read()
    }

    /// Check if the transport is connected
    pub fn is_connected(&self) -> bool {
        !matches!(self.state(), LinkState::Disconnected)
    }

    /// Check if commands may be sent
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), LinkState::Ready)
    }

    /// Number of completed logins (one per connection)
    pub fn login_count(&self) -> u32 {
        self.inner.logins.load(Ordering::Acquire)
    }

    /// Transport connected, start waiting for the login exchange
    pub fn connect(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != LinkState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot connect from state: {:?}",
                *state
            )));
        }

        *state = LinkState::AwaitingLogin;
        Ok(())
    }

    /// Login complete
    ///
    /// Returns `true` on the transition into `Ready`, `false` if already ready
    /// (the processor repeats its prompt after every command).
    pub fn mark_ready(&self) -> Result<bool> {
        let mut state = self.inner.state.write();

        match *state {
            LinkState::AwaitingLogin => {
                *state = LinkState::Ready;
                self.inner.logins.fetch_add(1, Ordering::AcqRel);
                Ok(true)
            }
            LinkState::Ready => Ok(false),
            LinkState::Disconnected => Err(Error::InvalidSessionState(
                "Cannot become ready while disconnected".into(),
            )),
        }
    }

    /// Close session, returning the state it was in
    pub fn close(&self) -> LinkState {
        std::mem::replace(&mut *self.inner.state.write(), LinkState::Disconnected)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.state(), LinkState::Disconnected);
        assert!(!session.is_connected());
        assert!(!session.is_ready());
    }

    #[test]
    fn test_login_sequence() {
        let session = Session::new();
        session.connect().unwrap();
        assert_eq!(session.state(), LinkState::AwaitingLogin);
        assert!(session.is_connected());
        assert!(!session.is_ready());

        assert!(session.mark_ready().unwrap());
        assert!(session.is_ready());
        assert_eq!(session.login_count(), 1);

        // Repeated prompt is not a new login
        assert!(!session.mark_ready().unwrap());
        assert_eq!(session.login_count(), 1);
    }

    #[test]
    fn test_session_close() {
        let session = Session::new();
        session.connect().unwrap();
        session.mark_ready().unwrap();

        assert_eq!(session.close(), LinkState::Ready);
        assert_eq!(session.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_invalid_state_transitions() {
        let session = Session::new();

        // Cannot become ready without connecting
        assert!(session.mark_ready().is_err());

        // Cannot connect twice
        session.connect().unwrap();
        assert!(session.connect().is_err());
    }

    #[test]
    fn test_session_clone() {
        let session1 = Session::new();
        session1.connect().unwrap();

        let session2 = session1.clone();

        // Both share same state
        session1.mark_ready().unwrap();
        assert!(session2.is_ready());
    }
}
