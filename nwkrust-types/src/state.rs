//! Observed-state enums shared by the core and the facade

use std::fmt;

use crate::error::{Error, Result};

/// Kind of an integration endpoint on the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationKind {
    Area,
    Zone,
    Shade,
    ShadeGroup,
    Scene,
    Keypad,
    GrafikEyeDevice,
}

impl IntegrationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Zone => "zone",
            Self::Shade => "shade",
            Self::ShadeGroup => "shade group",
            Self::Scene => "scene",
            Self::Keypad => "keypad",
            Self::GrafikEyeDevice => "GRAFIK Eye device",
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Area occupancy as reported by `~AREA,<id>,8,<state>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Occupancy {
    #[default]
    Unknown,
    Inactive,
    Occupied,
    Unoccupied,
}

impl Occupancy {
    /// Wire value used by the processor
    pub fn as_wire(self) -> u32 {
        match self {
            Self::Unknown => 1,
            Self::Inactive => 2,
            Self::Occupied => 3,
            Self::Unoccupied => 4,
        }
    }
}

impl TryFrom<u32> for Occupancy {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            // Some firmware reports 255 for "no occupancy sensors"
            1 | 255 => Ok(Self::Unknown),
            2 => Ok(Self::Inactive),
            3 => Ok(Self::Occupied),
            4 => Ok(Self::Unoccupied),
            _ => Err(Error::UnknownState {
                kind: "occupancy",
                value,
            }),
        }
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Inactive => "inactive",
            Self::Occupied => "occupied",
            Self::Unoccupied => "unoccupied",
        };
        f.write_str(s)
    }
}
