//! # nwkrust-core
//!
//! Core protocol implementation for Lutron NWK integration processors.
//!
//! This crate provides the transport-independent protocol primitives:
//! - Line encoding and decoding
//! - Stream framing around the unterminated prompts
//! - The two-tier outbound command queue
//! - Feedback routing by command family and integration id
//! - The login/ready session gate

pub mod codec;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod message;
pub mod observer;
pub mod queue;
pub mod router;
pub mod session;

pub use command::{Command, Mode};
pub use error::{Error, ErrorCode, Result};
pub use frame::{FrameReader, FrameTokens};
pub use message::{Addressing, Envelope, Feedback, Message};
pub use observer::{Observers, SubscriptionId};
pub use queue::{CommandQueue, LineSink, Priority};
pub use router::{Handler, Registration, ResponseRouter, RouteKey};
pub use session::{LinkState, Session};
