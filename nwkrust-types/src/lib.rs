//! Type definitions for nwkrust
//!
//! Shared between the protocol core and the device facade: the pre-parsed
//! integration topology handed to the engine and the small state enums the
//! processor reports.

pub mod error;
pub mod state;
pub mod topology;

pub use error::{Error, Result};
pub use state::{IntegrationKind, Occupancy};
pub use topology::{
    AreaConfig, ButtonConfig, ButtonShadeConfig, ComponentConfig, GrafikEyeConfig, KeypadConfig,
    NodeConfig, Topology,
};
