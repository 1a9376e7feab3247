//! GRAFIK Eye QS control unit
//!
//! A single component-addressed `DEVICE` integration that owns its zones
//! (as components), a scene controller and button-driven shades.

use std::sync::{Arc, Weak};

use nwkrust_core::{
    Addressing, Command, Feedback, Message, Observers, Registration, SubscriptionId, codec,
    constants::{SCENE_CONTROLLER_COMPONENT, actions::device},
};
use nwkrust_types::{GrafikEyeConfig, IntegrationKind};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{Context, Integration, Scene, Shade, ShadeDrive, Zone, ZoneAddress};
use crate::error::Result;

pub struct GrafikEyeDevice {
    id: u32,
    name: String,
    room: u32,
    zones: Vec<Arc<Zone>>,
    shades: Vec<Shade>,
    scenes: Vec<Scene>,
    scene: Mutex<Option<u32>>,
    scene_changed: Observers<Option<u32>>,
    zone_watch: Vec<SubscriptionId>,
    ctx: Context,
    _feedback: Registration,
}

impl GrafikEyeDevice {
    pub fn new(config: &GrafikEyeConfig, ctx: Context) -> Arc<Self> {
        let id = config.integration_id;
        let pulse = ctx.config().shade_pulse;

        Arc::new_cyclic(|weak: &Weak<GrafikEyeDevice>| {
            let zones: Vec<Arc<Zone>> = config
                .zones
                .iter()
                .map(|z| {
                    let address = ZoneAddress::DeviceComponent {
                        device: id,
                        component: z.component,
                    };
                    Zone::new(address, &z.name, ctx.clone())
                })
                .collect();

            let zone_watch = zones
                .iter()
                .map(|zone| {
                    let weak = weak.clone();
                    zone.subscribe(move |_| {
                        if let Some(unit) = weak.upgrade() {
                            unit.requery_scene();
                        }
                    })
                })
                .collect();

            let handler = weak.clone();
            let feedback = ctx.register(Command::Device, id, Addressing::Componented, move |fb| {
                match handler.upgrade() {
                    Some(unit) => unit.handle_feedback(fb),
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
                    .map(|s| {
                        let drive = ShadeDrive::Buttons {
                            device: id,
                            open: s.open,
                            close: s.close,
                            stop: s.stop,
                            pulse,
                        };
                        Shade::new(s.shade_id, &s.name, drive, ctx.clone())
                    })
                    .collect(),
                scenes: config
                    .scenes
                    .iter()
                    .map(|s| Scene::new(s.integration_id, &s.name))
                    .collect(),
                scene: Mutex::new(None),
                scene_changed: Observers::new(),
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

    pub fn zone(&self, component: u32) -> Option<&Arc<Zone>> {
        self.zones.iter().find(|z| z.load_id() == component)
    }

    pub fn shades(&self) -> &[Shade] {
        &self.shades
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn has_scene(&self, scene: u32) -> bool {
        self.scenes.iter().any(|s| s.integration_id() == scene)
    }

    pub fn scene(&self) -> Option<u32> {
        *self.scene.lock()
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

    pub fn set_scene(&self, scene: u32) -> Result<()> {
        self.ctx.send(
            &Message::execute(Command::Device, self.id, device::SCENE)
                .with_component(SCENE_CONTROLLER_COMPONENT)
                .param(scene.to_string()),
        )
    }

    pub fn requery_scene(&self) {
        debug!(device = self.id, "Re-querying device scene");
        if let Err(e) = self.ctx.send(&self.scene_query()) {
            warn!(device = self.id, "Failed to queue scene query: {}", e);
        }
    }

    pub(crate) fn apply_scene(&self, scene: Option<u32>) -> bool {
        {
            let mut current = self.scene.lock();
            if *current == scene {
                return false;
            }
            *current = scene;
        }
        trace!(device = self.id, ?scene, "Device scene changed");
        self.scene_changed.notify(&scene);
        true
    }

    fn scene_query(&self) -> Message {
        Message::query(Command::Device, self.id, device::SCENE)
            .with_component(SCENE_CONTROLLER_COMPONENT)
    }

    fn handle_feedback(&self, feedback: Feedback<'_>) -> nwkrust_core::Result<()> {
        let component = feedback.component().unwrap_or_default();

        match (component, feedback.action()) {
            (SCENE_CONTROLLER_COMPONENT, device::SCENE) => {
                let scene = codec::parse_optional(feedback.param(0)?)?;
                self.apply_scene(scene);
            }
            (component, device::ZONE_LEVEL) => match self.zone(component) {
                Some(zone) => {
                    let level = codec::parse_level(feedback.param(0)?)?;
                    zone.apply_level(level);
                }
                None => trace!(device = self.id, component, "Level for unknown zone"),
            },
            (component, action) => {
                trace!(device = self.id, component, action, "Ignoring device feedback")
            }
        }
        Ok(())
    }
}

impl Integration for GrafikEyeDevice {
    fn integration_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::GrafikEyeDevice
    }

    /// Scene only; zones query themselves
    fn initialize(&self) -> Result<()> {
        self.ctx.send(&self.scene_query())
    }
}

impl Drop for GrafikEyeDevice {
    fn drop(&mut self) {
        for (zone, id) in self.zones.iter().zip(&self.zone_watch) {
            zone.unsubscribe(*id);
        }
    }
}

impl std::fmt::Debug for GrafikEyeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrafikEyeDevice")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("room", &self.room)
            .field("zones", &self.zones.len())
            .field("scene", &self.scene())
            .finish()
    }
}
