//! Integration topology
//!
//! The processor's integration report is loaded elsewhere; the engine only
//! receives the parsed tree. A room is served either by one or more areas,
//! by a single keypad, or by a single GRAFIK Eye device.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

/// Keypad LED components sit at `button + 80`, so buttons must stay below that.
pub const MAX_KEYPAD_BUTTON: u32 = 80;

/// GRAFIK Eye scene controller component (reserved)
pub const SCENE_CONTROLLER_COMPONENT: u32 = 141;

/// A plain `(integration id, name)` leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub integration_id: u32,
    pub name: String,
}

impl NodeConfig {
    pub fn new(integration_id: u32, name: impl Into<String>) -> Self {
        Self {
            integration_id,
            name: name.into(),
        }
    }
}

/// An area and the outputs, shades and scenes it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaConfig {
    pub room: u32,
    pub integration_id: u32,
    pub name: String,
    pub zones: Vec<NodeConfig>,
    pub shades: Vec<NodeConfig>,
    pub shade_groups: Vec<NodeConfig>,
    pub scenes: Vec<NodeConfig>,
}

impl AreaConfig {
    pub fn new(room: u32, integration_id: u32, name: impl Into<String>) -> Self {
        Self {
            room,
            integration_id,
            name: name.into(),
            zones: Vec::new(),
            shades: Vec::new(),
            shade_groups: Vec::new(),
            scenes: Vec::new(),
        }
    }

    pub fn with_zone(mut self, integration_id: u32, name: impl Into<String>) -> Self {
        self.zones.push(NodeConfig::new(integration_id, name));
        self
    }

    pub fn with_shade(mut self, integration_id: u32, name: impl Into<String>) -> Self {
        self.shades.push(NodeConfig::new(integration_id, name));
        self
    }

    pub fn with_shade_group(mut self, integration_id: u32, name: impl Into<String>) -> Self {
        self.shade_groups.push(NodeConfig::new(integration_id, name));
        self
    }

    pub fn with_scene(mut self, integration_id: u32, name: impl Into<String>) -> Self {
        self.scenes.push(NodeConfig::new(integration_id, name));
        self
    }
}

/// Keypad button bound to a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonConfig {
    pub button: u32,
    pub scene: NodeConfig,
}

/// A keypad serving a room on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadConfig {
    pub room: u32,
    pub integration_id: u32,
    pub name: String,
    pub buttons: Vec<ButtonConfig>,
}

impl KeypadConfig {
    pub fn new(room: u32, integration_id: u32, name: impl Into<String>) -> Self {
        Self {
            room,
            integration_id,
            name: name.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, button: u32, scene_id: u32, scene_name: impl Into<String>) -> Self {
        self.buttons.push(ButtonConfig {
            button,
            scene: NodeConfig::new(scene_id, scene_name),
        });
        self
    }
}

/// GRAFIK Eye zone, addressed by component number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentConfig {
    pub component: u32,
    pub name: String,
}

/// Shade driven through device buttons (press, then timed release)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonShadeConfig {
    pub shade_id: u32,
    pub name: String,
    pub open: u32,
    pub close: u32,
    pub stop: Option<u32>,
}

/// A GRAFIK Eye QS control unit serving a room on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrafikEyeConfig {
    pub room: u32,
    pub integration_id: u32,
    pub name: String,
    pub zones: Vec<ComponentConfig>,
    pub scenes: Vec<NodeConfig>,
    pub shades: Vec<ButtonShadeConfig>,
}

impl GrafikEyeConfig {
    pub fn new(room: u32, integration_id: u32, name: impl Into<String>) -> Self {
        Self {
            room,
            integration_id,
            name: name.into(),
            zones: Vec::new(),
            scenes: Vec::new(),
            shades: Vec::new(),
        }
    }

    pub fn with_zone(mut self, component: u32, name: impl Into<String>) -> Self {
        self.zones.push(ComponentConfig {
            component,
            name: name.into(),
        });
        self
    }

    pub fn with_scene(mut self, scene: u32, name: impl Into<String>) -> Self {
        self.scenes.push(NodeConfig::new(scene, name));
        self
    }

    pub fn with_shade(mut self, shade: ButtonShadeConfig) -> Self {
        self.shades.push(shade);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoomContainer {
    Areas,
    Keypad,
    GrafikEye,
}

/// Complete integration topology for one processor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub areas: Vec<AreaConfig>,
    pub keypads: Vec<KeypadConfig>,
    pub grafik_eyes: Vec<GrafikEyeConfig>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, area: AreaConfig) -> Self {
        self.areas.push(area);
        self
    }

    pub fn with_keypad(mut self, keypad: KeypadConfig) -> Self {
        self.keypads.push(keypad);
        self
    }

    pub fn with_grafik_eye(mut self, device: GrafikEyeConfig) -> Self {
        self.grafik_eyes.push(device);
        self
    }

    /// Room numbers in ascending order
    pub fn rooms(&self) -> Vec<u32> {
        let mut rooms: Vec<u32> = self
            .areas
            .iter()
            .map(|a| a.room)
            .chain(self.keypads.iter().map(|k| k.room))
            .chain(self.grafik_eyes.iter().map(|g| g.room))
            .collect();
        rooms.sort_unstable();
        rooms.dedup();
        rooms
    }

    /// Check structural rules the engine relies on
    ///
    /// - a room is served by areas, one keypad, or one GRAFIK Eye, never a mix
    /// - integration ids are unique within a command family
    /// - keypad buttons and device components do not collide with reserved components
    pub fn validate(&self) -> Result<()> {
        let mut rooms: BTreeMap<u32, RoomContainer> = BTreeMap::new();
        let mut claim = |room: u32, container: RoomContainer| -> Result<()> {
            match rooms.insert(room, container) {
                None => Ok(()),
                Some(RoomContainer::Areas) if container == RoomContainer::Areas => Ok(()),
                Some(previous) => Err(Error::InvalidTopology(format!(
                    "room {room} is claimed by both {previous:?} and {container:?}"
                ))),
            }
        };

        for area in &self.areas {
            claim(area.room, RoomContainer::Areas)?;
        }
        for keypad in &self.keypads {
            claim(keypad.room, RoomContainer::Keypad)?;
        }
        for device in &self.grafik_eyes {
            claim(device.room, RoomContainer::GrafikEye)?;
        }

        let mut area_ids = HashSet::new();
        let mut output_ids = HashSet::new();
        let mut group_ids = HashSet::new();
        let mut device_ids = HashSet::new();

        for area in &self.areas {
            unique(&mut area_ids, area.integration_id, "AREA")?;
            for node in area.zones.iter().chain(&area.shades) {
                unique(&mut output_ids, node.integration_id, "OUTPUT")?;
            }
            for node in &area.shade_groups {
                unique(&mut group_ids, node.integration_id, "SHADEGRP")?;
            }
        }

        for keypad in &self.keypads {
            unique(&mut device_ids, keypad.integration_id, "DEVICE")?;
            let mut buttons = HashSet::new();
            for button in &keypad.buttons {
                if button.button == 0 || button.button >= MAX_KEYPAD_BUTTON {
                    return Err(Error::InvalidTopology(format!(
                        "keypad {} button {} is outside 1..{}",
                        keypad.integration_id, button.button, MAX_KEYPAD_BUTTON
                    )));
                }
                if !buttons.insert(button.button) {
                    return Err(Error::InvalidTopology(format!(
                        "keypad {} declares button {} twice",
                        keypad.integration_id, button.button
                    )));
                }
            }
        }

        for device in &self.grafik_eyes {
            unique(&mut device_ids, device.integration_id, "DEVICE")?;
            let mut components = HashSet::new();
            for zone in &device.zones {
                if zone.component == SCENE_CONTROLLER_COMPONENT || !components.insert(zone.component) {
                    return Err(Error::InvalidTopology(format!(
                        "device {} zone component {} is reserved or duplicated",
                        device.integration_id, zone.component
                    )));
                }
            }
        }

        Ok(())
    }
}

fn unique(seen: &mut HashSet<u32>, id: u32, family: &str) -> Result<()> {
    if seen.insert(id) {
        Ok(())
    } else {
        Err(Error::InvalidTopology(format!("duplicate {family} integration id {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Topology {
        Topology::new()
            .with_area(
                AreaConfig::new(1, 1, "Living")
                    .with_zone(10, "Downlights")
                    .with_shade(20, "Window")
                    .with_scene(1, "Bright"),
            )
            .with_area(AreaConfig::new(1, 2, "Dining").with_zone(11, "Pendant"))
            .with_keypad(KeypadConfig::new(2, 30, "Hall").with_button(1, 1, "On"))
            .with_grafik_eye(GrafikEyeConfig::new(3, 40, "Kitchen").with_zone(1, "Cans"))
    }

    #[test]
    fn test_valid_topology() {
        let topology = sample();
        assert!(topology.validate().is_ok());
        assert_eq!(topology.rooms(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mixed_room_rejected() {
        let topology = sample().with_keypad(KeypadConfig::new(1, 31, "Living keypad"));
        assert!(matches!(topology.validate(), Err(Error::InvalidTopology(_))));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let topology = sample().with_area(AreaConfig::new(4, 5, "Den").with_shade(10, "Clash"));
        assert!(topology.validate().is_err());
    }

    #[test]
    fn test_keypad_button_range() {
        let topology = Topology::new()
            .with_keypad(KeypadConfig::new(2, 30, "Hall").with_button(81, 1, "On"));
        assert!(topology.validate().is_err());

        let topology = Topology::new().with_keypad(
            KeypadConfig::new(2, 30, "Hall")
                .with_button(1, 1, "On")
                .with_button(1, 2, "Off"),
        );
        assert!(topology.validate().is_err());
    }

    #[test]
    fn test_grafik_eye_reserved_component() {
        let topology = Topology::new()
            .with_grafik_eye(GrafikEyeConfig::new(3, 40, "Kitchen").with_zone(141, "Bad"));
        assert!(topology.validate().is_err());
    }
}
