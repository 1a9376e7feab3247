//! Transport layer for the NWK integration protocol
//!
//! Provides the telnet-style TCP link to a processor. The protocol is plain
//! text, so transports move raw bytes and leave framing to the core crate.

pub mod error;
pub mod tcp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the processor
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from the processor
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive whatever bytes arrive within `timeout`
    ///
    /// Returns [`Error::ReadTimeout`] if nothing arrived and
    /// [`Error::ConnectionClosed`] once the remote end has hung up.
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
