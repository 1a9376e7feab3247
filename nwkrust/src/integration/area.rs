//! Area: a zone of control owning zones, shades, shade groups and scenes

use std::sync::{Arc, Weak};
use std::time::Duration;

use nwkrust_core::{
    Addressing, Command, Feedback, Message, Observers, Registration, SubscriptionId, codec,
    constants::actions::area,
};
use nwkrust_types::{AreaConfig, IntegrationKind, Occupancy};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{Context, Integration, Scene, Shade, ShadeDrive, ShadeGroup, Zone, ZoneAddress};
use crate::error::Result;

#[derive(Debug, Default)]
struct AreaState {
    scene: Option<u32>,
    occupancy: Occupancy,
}

pub struct Area {
    id: u32,
    name: String,
    room: u32,
    zones: Vec<Arc<Zone>>,
    shades: Vec<Shade>,
    shade_groups: Vec<ShadeGroup>,
    scenes: Vec<Scene>,
    state: Mutex<AreaState>,
    scene_changed: Observers<Option<u32>>,
    occupancy_changed: Observers<Occupancy>,
    /// One per zone, same order as `zones`
    zone_watch: Vec<SubscriptionId>,
    ctx: Context,
    _feedback: Registration,
}

impl Area {
    pub fn new(config: &AreaConfig, ctx: Context) -> Arc<Self> {
        let id = config.integration_id;

        Arc::new_cyclic(|weak: &Weak<Area>| {
            let zones: Vec<Arc<Zone>> = config
                .zones
                .iter()
                .map(|z| Zone::new(ZoneAddress::Output { id: z.integration_id }, &z.name, ctx.clone()))
                .collect();

            // A manual level change drops the active scene without any feedback
            let zone_watch = zones
                .iter()
                .map(|zone| {
                    let weak = weak.clone();
                    zone.subscribe(move |_| {
                        if let Some(area) = weak.upgrade() {
                            area.requery_scene();
                        }
                    })
                })
                .collect();

            let handler = weak.clone();
            let feedback = ctx.register(Command::Area, id, Addressing::Plain, move |fb| {
                match handler.upgrade() {
                    Some(area) => area.handle_feedback(fb),
                    None => Ok(()),
                }
            });

            Self {
                id,
                name: config.name.clone(),
                room: config.room,
                zones,
                shades: config
                    .shades
                    .iter()
                    .map(|s| Shade::new(s.integration_id, &s.name, ShadeDrive::Output, ctx.clone()))
                    .collect(),
                shade_groups: config
                    .shade_groups
                    .iter()
                    .map(|g| ShadeGroup::new(g.integration_id, &g.name, ctx.clone()))
                    .collect(),
                scenes: config
                    .scenes
                    .iter()
                    .map(|s| Scene::new(s.integration_id, &s.name))
                    .collect(),
                state: Mutex::new(AreaState::default()),
                scene_changed: Observers::new(),
                occupancy_changed: Observers::new(),
                zone_watch,
                ctx,
                _feedback: feedback,
            }
        })
    }

    pub fn room(&self) -> u32 {
        self.room
    }

    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }

    pub fn zone(&self, id: u32) -> Option<&Arc<Zone>> {
        self.zones.iter().find(|z| z.load_id() == id)
    }

    pub fn shades(&self) -> &[Shade] {
        &self.shades
    }

    pub fn shade_groups(&self) -> &[ShadeGroup] {
        &self.shade_groups
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn has_scene(&self, scene: u32) -> bool {
        self.scenes.iter().any(|s| s.integration_id() == scene)
    }

    /// Active scene, `None` if the processor reported none
    pub fn scene(&self) -> Option<u32> {
        self.state.lock().scene
    }

    pub fn occupancy(&self) -> Occupancy {
        self.state.lock().occupancy
    }

    pub fn subscribe_scene<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Option<u32>) + Send + Sync + 'static,
    {
        self.scene_changed.subscribe(callback)
    }

    pub fn unsubscribe_scene(&self, id: SubscriptionId) -> bool {
        self.scene_changed.unsubscribe(id)
    }

    pub fn subscribe_occupancy<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Occupancy) + Send + Sync + 'static,
    {
        self.occupancy_changed.subscribe(callback)
    }

    pub fn unsubscribe_occupancy(&self, id: SubscriptionId) -> bool {
        self.occupancy_changed.unsubscribe(id)
    }

    /// Recall a scene
    pub fn set_scene(&self, scene: u32) -> Result<()> {
        self.ctx.send(
            &Message::execute(Command::Area, self.id, area::SCENE).param(scene.to_string()),
        )
    }

    /// Set every zone in the area to `level` with the default fade and delay
    pub fn set_level(&self, level: f64) -> Result<()> {
        let config = self.ctx.config();
        self.set_level_with(level, config.default_fade, config.default_delay)
    }

    pub fn set_level_with(&self, level: f64, fade: Duration, delay: Duration) -> Result<()> {
        self.ctx.send(
            &Message::execute(Command::Area, self.id, area::LEVEL)
                .level(level)
                .duration(fade)
                .duration(delay),
        )
    }

    pub fn start_raising(&self) -> Result<()> {
        self.execute(area::START_RAISING)
    }

    pub fn start_lowering(&self) -> Result<()> {
        self.execute(area::START_LOWERING)
    }

    pub fn stop(&self) -> Result<()> {
        self.execute(area::STOP)
    }

    /// Ask the processor for the current scene
    pub fn requery_scene(&self) {
        debug!(area = self.id, "Re-querying area scene");
        if let Err(e) = self.ctx.send(&Message::query(Command::Area, self.id, area::SCENE)) {
            warn!(area = self.id, "Failed to queue scene query: {}", e);
        }
    }

    pub(crate) fn apply_scene(&self, scene: Option<u32>) -> bool {
        {
            let mut state = self.state.lock();
            if state.scene == scene {
                return false;
            }
            state.scene = scene;
        }
        trace!(area = self.id, ?scene, "Area scene changed");
        self.scene_changed.notify(&scene);
        true
    }

    pub(crate) fn apply_occupancy(&self, occupancy: Occupancy) -> bool {
        {
            let mut state = self.state.lock();
            if state.occupancy == occupancy {
                return false;
            }
            state.occupancy = occupancy;
        }
        trace!(area = self.id, %occupancy, "Area occupancy changed");
        self.occupancy_changed.notify(&occupancy);
        true
    }

    fn handle_feedback(&self, feedback: Feedback<'_>) -> nwkrust_core::Result<()> {
        match feedback.action() {
            area::SCENE => {
                let scene = codec::parse_optional(feedback.param(0)?)?;
                self.apply_scene(scene);
            }
            area::OCCUPANCY => {
                let raw = feedback.param(0)?;
                let occupancy = codec::parse_u32("occupancy", raw)
                    .ok()
                    .and_then(|v| Occupancy::try_from(v).ok())
                    .ok_or_else(|| nwkrust_core::Error::InvalidNumber {
                        field: "occupancy",
                        value: raw.to_string(),
                    })?;
                self.apply_occupancy(occupancy);
            }
            action => trace!(area = self.id, action, "Ignoring area feedback"),
        }
        Ok(())
    }

    fn execute(&self, action: u32) -> Result<()> {
        self.ctx
            .send(&Message::execute(Command::Area, self.id, action))
    }
}

impl Integration for Area {
    fn integration_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Area
    }

    fn initialize(&self) -> Result<()> {
        self.ctx
            .send(&Message::query(Command::Area, self.id, area::SCENE))?;
        self.ctx
            .send(&Message::query(Command::Area, self.id, area::OCCUPANCY))
    }
}

impl Drop for Area {
    fn drop(&mut self) {
        for (zone, id) in self.zones.iter().zip(&self.zone_watch) {
            zone.unsubscribe(*id);
        }
    }
}

impl std::fmt::Debug for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Area")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("room", &self.room)
            .field("zones", &self.zones.len())
            .field("state", &*self.state.lock())
            .finish()
    }
}
