//! Change notifications published by a [`Device`](crate::Device)

use nwkrust_core::LinkState;
use nwkrust_types::Occupancy;

/// Room-scoped change event
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A load's cached level moved by more than the tolerance
    LoadLevelChanged { room: u32, load: u32, level: f64 },

    /// A room's derived scene changed (`None` when no scene is active)
    SceneChanged { room: u32, scene: Option<u32> },

    /// An area in the room reported new occupancy
    OccupancyChanged { room: u32, occupancy: Occupancy },

    /// The integration tree was rebuilt
    TopologyChanged,

    /// The processor link moved to a new state
    LinkStateChanged(LinkState),
}

impl DeviceEvent {
    /// Room the event belongs to, if any
    pub fn room(&self) -> Option<u32> {
        match self {
            Self::LoadLevelChanged { room, .. }
            | Self::SceneChanged { room, .. }
            | Self::OccupancyChanged { room, .. } => Some(*room),
            Self::TopologyChanged | Self::LinkStateChanged(_) => None,
        }
    }
}
