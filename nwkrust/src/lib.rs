//! # nwkrust
//!
//! Rust engine for the Lutron NWK integration protocol spoken by Quantum and
//! GRAFIK Eye QS lighting processors.
//!
//! ## Features
//!
//! - Line codec and chunk-independent framing for the text protocol
//! - Paced two-tier command queue (execute before query)
//! - Feedback routing into a cached integration tree
//! - Room-level facade with a change-event broadcast
//!
//! ## Quick Start
//!
//! ```no_run
//! use nwkrust::{AreaConfig, Device, DeviceEvent, LinkState, TcpTransport, Topology};
//!
//! #[tokio::main]
//! async fn main() -> nwkrust::Result<()> {
//!     let topology = Topology::new().with_area(
//!         AreaConfig::new(1, 1, "Living")
//!             .with_zone(10, "Downlights")
//!             .with_scene(1, "Bright"),
//!     );
//!     let device = Device::new(topology)?;
//!     let mut events = device.subscribe();
//!
//!     let driver = device.clone();
//!     let link = tokio::spawn(async move {
//!         let mut transport = TcpTransport::with_default_port("192.168.1.50");
//!         driver.run(&mut transport).await
//!     });
//!
//!     while let Ok(event) = events.recv().await {
//!         if event == DeviceEvent::LinkStateChanged(LinkState::Ready) {
//!             break;
//!         }
//!     }
//!
//!     device.set_room_scene(1, 1)?;
//!     device.set_load_level(1, 10, 0.75)?;
//!
//!     link.await.ok();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod integration;
pub mod link;
pub mod room;
pub mod tree;

// Re-exports
pub use config::Config;
pub use device::Device;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use event::DeviceEvent;
pub use integration::{
    Area, Context, GrafikEyeDevice, Integration, Keypad, Scene, Shade, ShadeDrive, ShadeGroup,
    Zone, ZoneAddress,
};
pub use link::{ChannelSink, TransportEvent};
pub use room::{Room, RoomControl, ShadeTarget};
pub use tree::IntegrationTree;

// Re-export protocol and topology types
pub use nwkrust_core::{Command, LineSink, LinkState, Message, Session};
pub use nwkrust_transport::{TcpTransport, Transport};
pub use nwkrust_types::{
    AreaConfig, ButtonShadeConfig, GrafikEyeConfig, IntegrationKind, KeypadConfig, NodeConfig,
    Occupancy, Topology,
};
