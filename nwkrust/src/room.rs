//! Rooms: the facade's unit of addressing
//!
//! A room is served either by one or more areas, by a single keypad, or by a
//! single GRAFIK Eye unit. Multi-area rooms aggregate their derived state:
//! a value is reported only when every area agrees.

use std::sync::Arc;

use nwkrust_types::Occupancy;

use crate::{
    error::{Error, Result},
    integration::{Area, GrafikEyeDevice, Integration, Keypad, Scene, Shade, ShadeGroup, Zone},
};

/// What serves a room
#[derive(Debug)]
pub enum RoomControl {
    Areas(Vec<Arc<Area>>),
    Keypad(Arc<Keypad>),
    GrafikEye(Arc<GrafikEyeDevice>),
}

/// A shade or shade group; both share a room's shade ids
#[derive(Debug, Clone, Copy)]
pub enum ShadeTarget<'a> {
    Shade(&'a Shade),
    Group(&'a ShadeGroup),
}

impl ShadeTarget<'_> {
    pub fn id(&self) -> u32 {
        match self {
            Self::Shade(shade) => shade.integration_id(),
            Self::Group(group) => group.integration_id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Shade(shade) => shade.name(),
            Self::Group(group) => group.name(),
        }
    }

    pub fn start_raising(&self) -> Result<()> {
        match self {
            Self::Shade(shade) => shade.start_raising(),
            Self::Group(group) => group.start_raising(),
        }
    }

    pub fn start_lowering(&self) -> Result<()> {
        match self {
            Self::Shade(shade) => shade.start_lowering(),
            Self::Group(group) => group.start_lowering(),
        }
    }

    pub fn stop(&self) -> Result<()> {
        match self {
            Self::Shade(shade) => shade.stop(),
            Self::Group(group) => group.stop(),
        }
    }
}

#[derive(Debug)]
pub struct Room {
    id: u32,
    control: RoomControl,
}

impl Room {
    pub(crate) fn new(id: u32, control: RoomControl) -> Self {
        Self { id, control }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn control(&self) -> &RoomControl {
        &self.control
    }

    /// Dimmable loads in topology order
    pub fn loads(&self) -> Vec<&Arc<Zone>> {
        match &self.control {
            RoomControl::Areas(areas) => areas.iter().flat_map(|a| a.zones()).collect(),
            RoomControl::GrafikEye(unit) => unit.zones().iter().collect(),
            RoomControl::Keypad(_) => Vec::new(),
        }
    }

    pub fn load(&self, load: u32) -> Result<&Arc<Zone>> {
        let found = match &self.control {
            RoomControl::Areas(areas) => areas.iter().find_map(|a| a.zone(load)),
            RoomControl::GrafikEye(unit) => unit.zone(load),
            RoomControl::Keypad(_) => None,
        };
        found.ok_or(Error::LoadNotFound {
            room: self.id,
            load,
        })
    }

    /// Shades, then shade groups
    pub fn shades(&self) -> Vec<ShadeTarget<'_>> {
        match &self.control {
            RoomControl::Areas(areas) => areas
                .iter()
                .flat_map(|a| a.shades().iter().map(ShadeTarget::Shade))
                .chain(
                    areas
                        .iter()
                        .flat_map(|a| a.shade_groups().iter().map(ShadeTarget::Group)),
                )
                .collect(),
            RoomControl::GrafikEye(unit) => unit.shades().iter().map(ShadeTarget::Shade).collect(),
            RoomControl::Keypad(_) => Vec::new(),
        }
    }

    /// A shade id matching both a shade and a shade group resolves to the shade
    pub fn shade(&self, shade: u32) -> Result<ShadeTarget<'_>> {
        self.shades()
            .into_iter()
            .find(|target| target.id() == shade)
            .ok_or(Error::ShadeNotFound {
                room: self.id,
                shade,
            })
    }

    pub fn scenes(&self) -> Vec<&Scene> {
        match &self.control {
            RoomControl::Areas(areas) => areas.iter().flat_map(|a| a.scenes()).collect(),
            RoomControl::Keypad(keypad) => keypad.scenes().collect(),
            RoomControl::GrafikEye(unit) => unit.scenes().iter().collect(),
        }
    }

    /// Current scene
    ///
    /// For multi-area rooms this is the areas' common scene, or `Some(0)`
    /// when they disagree.
    pub fn scene(&self) -> Option<u32> {
        match &self.control {
            RoomControl::Areas(areas) => aggregate_scene(areas.iter().map(|a| a.scene())),
            RoomControl::Keypad(keypad) => keypad.active_scene(),
            RoomControl::GrafikEye(unit) => unit.scene(),
        }
    }

    /// Recall a scene on everything in the room that defines it
    pub fn set_scene(&self, scene: u32) -> Result<()> {
        let not_found = || Error::SceneNotFound {
            room: self.id,
            scene,
        };

        match &self.control {
            RoomControl::Areas(areas) => {
                let mut recalled = false;
                for area in areas.iter().filter(|a| a.has_scene(scene)) {
                    area.set_scene(scene)?;
                    recalled = true;
                }
                if recalled { Ok(()) } else { Err(not_found()) }
            }
            RoomControl::Keypad(keypad) => keypad.recall_scene(scene),
            RoomControl::GrafikEye(unit) if unit.has_scene(scene) => unit.set_scene(scene),
            RoomControl::GrafikEye(_) => Err(not_found()),
        }
    }

    /// Occupancy; `Unknown` unless every area agrees
    pub fn occupancy(&self) -> Occupancy {
        match &self.control {
            RoomControl::Areas(areas) => aggregate_occupancy(areas.iter().map(|a| a.occupancy())),
            RoomControl::Keypad(_) | RoomControl::GrafikEye(_) => Occupancy::Unknown,
        }
    }

    pub(crate) fn integrations(&self) -> Vec<&dyn Integration> {
        let mut nodes: Vec<&dyn Integration> = Vec::new();
        match &self.control {
            RoomControl::Areas(areas) => {
                for area in areas {
                    nodes.push(&**area);
                    nodes.extend(area.zones().iter().map(|z| &**z as &dyn Integration));
                    nodes.extend(area.shades().iter().map(|s| s as &dyn Integration));
                    nodes.extend(area.shade_groups().iter().map(|g| g as &dyn Integration));
                    nodes.extend(area.scenes().iter().map(|s| s as &dyn Integration));
                }
            }
            RoomControl::Keypad(keypad) => {
                nodes.push(&**keypad);
                nodes.extend(keypad.scenes().map(|s| s as &dyn Integration));
            }
            RoomControl::GrafikEye(unit) => {
                nodes.push(&**unit);
                nodes.extend(unit.zones().iter().map(|z| &**z as &dyn Integration));
                nodes.extend(unit.shades().iter().map(|s| s as &dyn Integration));
                nodes.extend(unit.scenes().iter().map(|s| s as &dyn Integration));
            }
        }
        nodes
    }
}

/// The common value, if every item agrees
fn unanimous<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut values = values.into_iter();
    let first = values.next()?;
    values.all(|v| v == first).then_some(first)
}

pub(crate) fn aggregate_scene(scenes: impl IntoIterator<Item = Option<u32>>) -> Option<u32> {
    unanimous(scenes).unwrap_or(Some(0))
}

pub(crate) fn aggregate_occupancy(values: impl IntoIterator<Item = Occupancy>) -> Occupancy {
    unanimous(values).unwrap_or(Occupancy::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::Context;
    use crate::integration::testing::{context, drain};
    use nwkrust_core::ResponseRouter;
    use nwkrust_types::{AreaConfig, KeypadConfig};
    use pretty_assertions::assert_eq;

    fn two_area_room(ctx: Context) -> Room {
        let living = AreaConfig::new(1, 1, "Living")
            .with_zone(10, "Downlights")
            .with_shade(20, "Window")
            .with_scene(1, "Bright");
        let dining = AreaConfig::new(1, 2, "Dining")
            .with_zone(11, "Pendant")
            .with_shade_group(5, "South")
            .with_scene(1, "Bright")
            .with_scene(2, "Dinner");
        Room::new(
            1,
            RoomControl::Areas(vec![
                Area::new(&living, ctx.clone()),
                Area::new(&dining, ctx),
            ]),
        )
    }

    fn feed(router: &ResponseRouter, lines: &[&str]) {
        for line in lines {
            router.dispatch_line(line).unwrap();
        }
    }

    #[test]
    fn test_unanimous() {
        assert_eq!(unanimous([3, 3, 3]), Some(3));
        assert_eq!(unanimous([3, 4]), None);
        assert_eq!(unanimous(Vec::<u32>::new()), None);
    }

    #[test]
    fn test_occupancy_aggregation() {
        let (_queue, router, ctx) = context();
        let room = two_area_room(ctx);

        feed(&router, &["~AREA,1,8,3", "~AREA,2,8,3"]);
        assert_eq!(room.occupancy(), Occupancy::Occupied);

        feed(&router, &["~AREA,2,8,4"]);
        assert_eq!(room.occupancy(), Occupancy::Unknown);
    }

    #[test]
    fn test_scene_aggregation() {
        let (_queue, router, ctx) = context();
        let room = two_area_room(ctx);
        assert_eq!(room.scene(), None);

        feed(&router, &["~AREA,1,6,1", "~AREA,2,6,1"]);
        assert_eq!(room.scene(), Some(1));

        feed(&router, &["~AREA,2,6,2"]);
        assert_eq!(room.scene(), Some(0));
    }

    #[test]
    fn test_lookups() {
        let (_queue, _router, ctx) = context();
        let room = two_area_room(ctx);

        let loads: Vec<u32> = room.loads().iter().map(|z| z.load_id()).collect();
        assert_eq!(loads, vec![10, 11]);
        let shades: Vec<u32> = room.shades().iter().map(|s| s.id()).collect();
        assert_eq!(shades, vec![20, 5]);

        assert!(matches!(room.load(12), Err(Error::LoadNotFound { room: 1, load: 12 })));
        assert!(matches!(room.shade(6), Err(Error::ShadeNotFound { room: 1, shade: 6 })));
    }

    #[test]
    fn test_set_scene_targets_defining_areas() {
        let (queue, _router, ctx) = context();
        let room = two_area_room(ctx);

        room.set_scene(1).unwrap();
        room.set_scene(2).unwrap();
        assert_eq!(
            drain(&queue),
            vec!["#AREA,1,6,1\r\n", "#AREA,2,6,1\r\n", "#AREA,2,6,2\r\n"]
        );

        assert!(room.set_scene(7).unwrap_err().is_not_found());
    }

    #[test]
    fn test_keypad_room() {
        let (queue, router, ctx) = context();
        let keypad = Keypad::new(&KeypadConfig::new(2, 30, "Hall").with_button(4, 12, "Party"), ctx);
        let room = Room::new(2, RoomControl::Keypad(keypad));

        assert!(room.loads().is_empty());
        assert_eq!(room.occupancy(), Occupancy::Unknown);

        router.dispatch_line("~DEVICE,30,84,9,1").unwrap();
        assert_eq!(room.scene(), Some(12));

        room.set_scene(12).unwrap();
        assert_eq!(drain(&queue), vec!["#DEVICE,30,4,3\r\n", "#DEVICE,30,4,4\r\n"]);
    }
}
