//! Integration tree built from a topology
//!
//! The tree is built once per topology and replaced wholesale on reload.
//! Building it wires every node's observers to the device event channel.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use nwkrust_types::Topology;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    error::Result,
    event::DeviceEvent,
    integration::{Area, Context, GrafikEyeDevice, Integration, Keypad, Zone},
    room::{Room, RoomControl, aggregate_occupancy, aggregate_scene},
};

#[derive(Debug, Default)]
pub struct IntegrationTree {
    rooms: BTreeMap<u32, Room>,
}

impl IntegrationTree {
    /// Validate `topology` and build its nodes
    pub fn build(
        topology: &Topology,
        ctx: &Context,
        events: &broadcast::Sender<DeviceEvent>,
    ) -> Result<Self> {
        topology.validate()?;

        let mut areas: BTreeMap<u32, Vec<Arc<Area>>> = BTreeMap::new();
        for config in &topology.areas {
            areas
                .entry(config.room)
                .or_default()
                .push(Area::new(config, ctx.clone()));
        }

        let mut rooms = BTreeMap::new();

        for (room, members) in areas {
            let weak: Vec<Weak<Area>> = members.iter().map(Arc::downgrade).collect();
            for area in &members {
                for zone in area.zones() {
                    publish_load(room, zone, events);
                }

                let (tx, siblings) = (events.clone(), weak.clone());
                area.subscribe_scene(move |_| {
                    let scene = aggregate_scene(siblings.iter().filter_map(Weak::upgrade).map(|a| a.scene()));
                    let _ = tx.send(DeviceEvent::SceneChanged { room, scene });
                });

                let (tx, siblings) = (events.clone(), weak.clone());
                area.subscribe_occupancy(move |_| {
                    let occupancy = aggregate_occupancy(
                        siblings.iter().filter_map(Weak::upgrade).map(|a| a.occupancy()),
                    );
                    let _ = tx.send(DeviceEvent::OccupancyChanged { room, occupancy });
                });
            }
            rooms.insert(room, Room::new(room, RoomControl::Areas(members)));
        }

        for config in &topology.keypads {
            let keypad = Keypad::new(config, ctx.clone());
            let (tx, room) = (events.clone(), config.room);
            keypad.subscribe_scene(move |scene| {
                let _ = tx.send(DeviceEvent::SceneChanged { room, scene: *scene });
            });
            rooms.insert(room, Room::new(room, RoomControl::Keypad(keypad)));
        }

        for config in &topology.grafik_eyes {
            let unit = GrafikEyeDevice::new(config, ctx.clone());
            let room = config.room;
            for zone in unit.zones() {
                publish_load(room, zone, events);
            }
            let tx = events.clone();
            unit.subscribe_scene(move |scene| {
                let _ = tx.send(DeviceEvent::SceneChanged { room, scene: *scene });
            });
            rooms.insert(room, Room::new(room, RoomControl::GrafikEye(unit)));
        }

        debug!(rooms = rooms.len(), "Built integration tree");
        Ok(Self { rooms })
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room(&self, id: u32) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Every node, containers before their children
    pub fn integrations(&self) -> Vec<&dyn Integration> {
        self.rooms.values().flat_map(Room::integrations).collect()
    }

    /// Queue every node's start-up queries
    ///
    /// A node that fails is logged and skipped. Returns how many succeeded.
    pub fn initialize(&self) -> usize {
        let nodes = self.integrations();
        let total = nodes.len();
        let ok = nodes
            .into_iter()
            .filter(|node| match node.initialize() {
                Ok(()) => true,
                Err(e) => {
                    warn!(kind = %node.kind(), id = node.integration_id(), "Initialize failed: {}", e);
                    false
                }
            })
            .count();
        debug!(ok, total, "Initialized integrations");
        ok
    }
}

fn publish_load(room: u32, zone: &Arc<Zone>, events: &broadcast::Sender<DeviceEvent>) {
    let (tx, load) = (events.clone(), zone.load_id());
    zone.subscribe(move |level| {
        let _ = tx.send(DeviceEvent::LoadLevelChanged {
            room,
            load,
            level: *level,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::testing::{context, drain};
    use nwkrust_types::{AreaConfig, GrafikEyeConfig, KeypadConfig};
    use pretty_assertions::assert_eq;

    fn topology() -> Topology {
        Topology::new()
            .with_area(AreaConfig::new(1, 1, "Living").with_zone(10, "Downlights"))
            .with_area(AreaConfig::new(1, 2, "Dining").with_zone(11, "Pendant"))
            .with_keypad(KeypadConfig::new(2, 30, "Hall").with_button(1, 5, "On"))
            .with_grafik_eye(GrafikEyeConfig::new(3, 40, "Kitchen").with_zone(1, "Cans"))
    }

    #[test]
    fn test_build_rooms() {
        let (_queue, _router, ctx) = context();
        let (tx, _rx) = broadcast::channel(16);
        let tree = IntegrationTree::build(&topology(), &ctx, &tx).unwrap();

        let rooms: Vec<u32> = tree.rooms().map(Room::id).collect();
        assert_eq!(rooms, vec![1, 2, 3]);
        assert!(matches!(tree.room(1).unwrap().control(), RoomControl::Areas(a) if a.len() == 2));
    }

    #[test]
    fn test_invalid_topology_rejected() {
        let (_queue, _router, ctx) = context();
        let (tx, _rx) = broadcast::channel(16);
        let topology = topology().with_keypad(KeypadConfig::new(1, 31, "Clash"));
        assert!(IntegrationTree::build(&topology, &ctx, &tx).is_err());
    }

    #[test]
    fn test_initialize_queues_every_query() {
        let (queue, _router, ctx) = context();
        let (tx, _rx) = broadcast::channel(16);
        let tree = IntegrationTree::build(&topology(), &ctx, &tx).unwrap();

        assert_eq!(tree.initialize(), tree.integrations().len());
        assert_eq!(
            drain(&queue),
            vec![
                "?AREA,1,6\r\n",
                "?AREA,1,8\r\n",
                "?OUTPUT,10,1\r\n",
                "?AREA,2,6\r\n",
                "?AREA,2,8\r\n",
                "?OUTPUT,11,1\r\n",
                "?DEVICE,30,81,9\r\n",
                "?DEVICE,40,141,7\r\n",
                "?DEVICE,40,1,14\r\n",
            ]
        );
    }

    #[test]
    fn test_events_carry_room() {
        let (_queue, router, ctx) = context();
        let (tx, mut rx) = broadcast::channel(16);
        let _tree = IntegrationTree::build(&topology(), &ctx, &tx).unwrap();

        router.dispatch_line("~OUTPUT,11,1,20.00").unwrap();
        router.dispatch_line("~AREA,1,8,3").unwrap();
        router.dispatch_line("~DEVICE,30,81,9,1").unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            DeviceEvent::LoadLevelChanged { room: 1, load: 11, level: 0.2 }
        );
        // Area 2 still reports unknown occupancy
        assert_eq!(
            rx.try_recv().unwrap(),
            DeviceEvent::OccupancyChanged { room: 1, occupancy: nwkrust_types::Occupancy::Unknown }
        );
        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::SceneChanged { room: 2, scene: Some(5) });
    }
}
