//! Keypad with scene buttons
//!
//! The processor reports button LEDs, not scenes. The active scene is
//! derived from the lit buttons: the lowest lit button wins.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use nwkrust_core::{
    Addressing, Command, Feedback, Message, Observers, Registration, SubscriptionId, codec,
    constants::{KEYPAD_LED_OFFSET, actions::device},
};
use nwkrust_types::{IntegrationKind, KeypadConfig};
use parking_lot::Mutex;
use tracing::trace;

use super::{Context, Integration, Scene};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct LedState {
    lit: BTreeMap<u32, bool>,
    active_button: Option<u32>,
}

pub struct Keypad {
    id: u32,
    name: String,
    room: u32,
    /// Button number to the scene it recalls
    buttons: BTreeMap<u32, Scene>,
    leds: Mutex<LedState>,
    scene_changed: Observers<Option<u32>>,
    ctx: Context,
    _feedback: Registration,
}

impl Keypad {
    pub fn new(config: &KeypadConfig, ctx: Context) -> Arc<Self> {
        let id = config.integration_id;

        Arc::new_cyclic(|weak: &Weak<Keypad>| {
            let weak = weak.clone();
            let feedback = ctx.register(Command::Device, id, Addressing::Componented, move |fb| {
                match weak.upgrade() {
                    Some(keypad) => keypad.handle_feedback(fb),
                    None => Ok(()),
                }
            });

            Self {
                id,
                name: config.name.clone(),
                room: config.room,
                buttons: config
                    .buttons
                    .iter()
                    .map(|b| (b.button, Scene::new(b.scene.integration_id, &b.scene.name)))
                    .collect(),
                leds: Mutex::new(LedState::default()),
                scene_changed: Observers::new(),
                ctx,
                _feedback: feedback,
            }
        })
    }

    pub fn room(&self) -> u32 {
        self.room
    }

    /// Scenes in button order
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.buttons.values()
    }

    pub fn has_scene(&self, scene: u32) -> bool {
        self.button_for_scene(scene).is_some()
    }

    /// Button currently considered active
    pub fn active_button(&self) -> Option<u32> {
        self.leds.lock().active_button
    }

    /// Scene bound to the active button
    pub fn active_scene(&self) -> Option<u32> {
        self.active_button()
            .and_then(|button| self.buttons.get(&button))
            .map(|scene| scene.integration_id())
    }

    pub fn is_lit(&self, button: u32) -> bool {
        self.leds.lock().lit.get(&button).copied().unwrap_or(false)
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

    /// Recall a scene by pressing and releasing its button
    pub fn recall_scene(&self, scene: u32) -> Result<()> {
        let button = self.button_for_scene(scene).ok_or(Error::SceneNotFound {
            room: self.room,
            scene,
        })?;
        self.press_and_release(button)
    }

    pub fn press_and_release(&self, button: u32) -> Result<()> {
        self.ctx.send(
            &Message::execute(Command::Device, self.id, device::PRESS).with_component(button),
        )?;
        self.ctx.send(
            &Message::execute(Command::Device, self.id, device::RELEASE).with_component(button),
        )
    }

    /// Record an LED state and re-derive the active button
    ///
    /// Returns `true` if the active scene changed.
    pub(crate) fn set_led_state(&self, button: u32, on: bool) -> bool {
        let (before, after) = {
            let mut leds = self.leds.lock();
            let before = leds.active_button;
            leds.lit.insert(button, on);

            if on {
                if leds.active_button.is_none_or(|active| active > button) {
                    leds.active_button = Some(button);
                }
            } else if leds.active_button == Some(button) {
                leds.active_button = leds
                    .lit
                    .iter()
                    .find(|&(_, &lit)| lit)
                    .map(|(&b, _)| b);
            }
            (before, leds.active_button)
        };

        if before == after {
            return false;
        }

        let scene = self.active_scene();
        trace!(keypad = self.id, button = ?after, ?scene, "Keypad active scene changed");
        self.scene_changed.notify(&scene);
        true
    }

    fn button_for_scene(&self, scene: u32) -> Option<u32> {
        self.buttons
            .iter()
            .find(|(_, s)| s.integration_id() == scene)
            .map(|(&button, _)| button)
    }

    fn handle_feedback(&self, feedback: Feedback<'_>) -> nwkrust_core::Result<()> {
        let component = feedback.component().unwrap_or_default();

        if feedback.action() != device::LED_STATE || component <= KEYPAD_LED_OFFSET {
            trace!(keypad = self.id, component, action = feedback.action(), "Ignoring keypad feedback");
            return Ok(());
        }

        let button = component - KEYPAD_LED_OFFSET;
        if !self.buttons.contains_key(&button) {
            trace!(keypad = self.id, button, "LED for unbound button");
            return Ok(());
        }

        let on = codec::parse_u32("LED state", feedback.param(0)?)? != 0;
        self.set_led_state(button, on);
        Ok(())
    }
}

impl Integration for Keypad {
    fn integration_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Keypad
    }

    fn initialize(&self) -> Result<()> {
        for &button in self.buttons.keys() {
            self.ctx.send(
                &Message::query(Command::Device, self.id, device::LED_STATE)
                    .with_component(button + KEYPAD_LED_OFFSET),
            )?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Keypad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypad")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("room", &self.room)
            .field("buttons", &self.buttons.len())
            .field("active_button", &self.active_button())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::testing::{context, drain};
    use pretty_assertions::assert_eq;

    fn hall() -> KeypadConfig {
        KeypadConfig::new(2, 30, "Hall")
            .with_button(1, 1, "Bright")
            .with_button(2, 2, "Dim")
            .with_button(3, 3, "Night")
    }

    #[test]
    fn test_lowest_lit_button_wins() {
        let (_queue, _router, ctx) = context();
        let keypad = Keypad::new(&hall(), ctx);

        keypad.set_led_state(3, true);
        keypad.set_led_state(1, true);
        keypad.set_led_state(3, false);
        assert_eq!(keypad.active_scene(), Some(1));
    }

    #[test]
    fn test_last_led_off_clears_scene() {
        let (_queue, _router, ctx) = context();
        let keypad = Keypad::new(&hall(), ctx);

        assert!(keypad.set_led_state(3, true));
        assert!(keypad.set_led_state(3, false));
        assert_eq!(keypad.active_scene(), None);
    }

    #[test]
    fn test_off_falls_back_to_lowest_lit() {
        let (_queue, _router, ctx) = context();
        let keypad = Keypad::new(&hall(), ctx);

        keypad.set_led_state(2, true);
        keypad.set_led_state(3, true);
        assert_eq!(keypad.active_button(), Some(2));

        keypad.set_led_state(2, false);
        assert_eq!(keypad.active_scene(), Some(3));
    }

    #[test]
    fn test_led_feedback_routed() {
        let (_queue, router, ctx) = context();
        let keypad = Keypad::new(&hall(), ctx);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        keypad.subscribe_scene(move |scene| sink.lock().push(*scene));

        router.dispatch_line("~DEVICE,30,82,9,1").unwrap();
        assert!(keypad.is_lit(2));
        router.dispatch_line("~DEVICE,30,82,9,0").unwrap();

        // Button presses and unbound LEDs are ignored
        router.dispatch_line("~DEVICE,30,2,3").unwrap();
        router.dispatch_line("~DEVICE,30,87,9,1").unwrap();

        assert_eq!(*seen.lock(), vec![Some(2), None]);
    }

    #[test]
    fn test_recall_scene_presses_bound_button() {
        let (queue, _router, ctx) = context();
        let keypad = Keypad::new(&hall(), ctx);

        keypad.recall_scene(2).unwrap();
        assert_eq!(drain(&queue), vec!["#DEVICE,30,2,3\r\n", "#DEVICE,30,2,4\r\n"]);

        assert!(matches!(
            keypad.recall_scene(9),
            Err(Error::SceneNotFound { room: 2, scene: 9 })
        ));
    }

    #[test]
    fn test_initialize_queries_each_led() {
        let (queue, _router, ctx) = context();
        let keypad = Keypad::new(&hall(), ctx);

        keypad.initialize().unwrap();
        assert_eq!(
            drain(&queue),
            vec!["?DEVICE,30,81,9\r\n", "?DEVICE,30,82,9\r\n", "?DEVICE,30,83,9\r\n"]
        );
    }
}
