//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Read timeout")]
    ReadTimeout,

    #[error("Connection closed by processor")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Nothing arrived within the receive window; the link is still up
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ReadTimeout)
    }

    /// The link is gone and must be re-established
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::ConnectionClosed | Error::NotConnected | Error::Io(_))
    }
}
