//! Dimmable lighting zone

use std::sync::{Arc, Weak};
use std::time::Duration;

use nwkrust_core::{
    Addressing, Command, Feedback, Message, Observers, Registration, SubscriptionId, codec,
    constants::actions::{device, output},
};
use nwkrust_types::IntegrationKind;
use parking_lot::Mutex;
use tracing::trace;

use super::{Context, Integration};
use crate::error::Result;

/// Where a zone lives on the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAddress {
    /// Its own `OUTPUT` integration
    Output { id: u32 },
    /// A zone component of a `DEVICE` integration; feedback arrives through the device
    DeviceComponent { device: u32, component: u32 },
}

/// A single dimmable output, level in `[0, 1]`
pub struct Zone {
    name: String,
    address: ZoneAddress,
    level: Mutex<f64>,
    level_changed: Observers<f64>,
    ctx: Context,
    _feedback: Option<Registration>,
}

impl Zone {
    pub fn new(address: ZoneAddress, name: impl Into<String>, ctx: Context) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Zone>| {
            let feedback = match address {
                ZoneAddress::Output { id } => {
                    let weak = weak.clone();
                    Some(ctx.register(Command::Output, id, Addressing::Plain, move |fb| {
                        match weak.upgrade() {
                            Some(zone) => zone.handle_output_feedback(fb),
                            None => Ok(()),
                        }
                    }))
                }
                // Routed by the owning device
                ZoneAddress::DeviceComponent { .. } => None,
            };

            Self {
                name: name.into(),
                address,
                level: Mutex::new(0.0),
                level_changed: Observers::new(),
                ctx,
                _feedback: feedback,
            }
        })
    }

    pub fn address(&self) -> ZoneAddress {
        self.address
    }

    /// Id the facade addresses this zone by
    pub fn load_id(&self) -> u32 {
        match self.address {
            ZoneAddress::Output { id } => id,
            ZoneAddress::DeviceComponent { component, .. } => component,
        }
    }

    /// Last level reported by the processor
    pub fn level(&self) -> f64 {
        *self.level.lock()
    }

    /// Observe level changes larger than the tolerance
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&f64) + Send + Sync + 'static,
    {
        self.level_changed.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.level_changed.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.level_changed.len()
    }

    /// Go to `level` with the configured default fade and delay
    pub fn set_level(&self, level: f64) -> Result<()> {
        let config = self.ctx.config();
        self.set_level_with(level, config.default_fade, config.default_delay)
    }

    /// Go to `level` over `fade`, starting after `delay`
    ///
    /// Cached state is not touched; it follows the processor's feedback.
    pub fn set_level_with(&self, level: f64, fade: Duration, delay: Duration) -> Result<()> {
        let action = match self.address {
            ZoneAddress::Output { .. } => output::LEVEL,
            ZoneAddress::DeviceComponent { .. } => device::ZONE_LEVEL,
        };
        self.ctx
            .send(&self.execute(action).level(level).duration(fade).duration(delay))
    }

    pub fn start_raising(&self) -> Result<()> {
        self.ctx.send(&self.execute(match self.address {
            ZoneAddress::Output { .. } => output::START_RAISING,
            ZoneAddress::DeviceComponent { .. } => device::ZONE_START_RAISING,
        }))
    }

    pub fn start_lowering(&self) -> Result<()> {
        self.ctx.send(&self.execute(match self.address {
            ZoneAddress::Output { .. } => output::START_LOWERING,
            ZoneAddress::DeviceComponent { .. } => device::ZONE_START_LOWERING,
        }))
    }

    pub fn stop(&self) -> Result<()> {
        self.ctx.send(&self.execute(match self.address {
            ZoneAddress::Output { .. } => output::STOP,
            ZoneAddress::DeviceComponent { .. } => device::ZONE_STOP,
        }))
    }

    /// Store a reported level, notifying observers if it moved past the tolerance
    ///
    /// Returns `true` if the cached level changed.
    pub(crate) fn apply_level(&self, level: f64) -> bool {
        let tolerance = self.ctx.config().level_tolerance;
        {
            let mut current = self.level.lock();
            if (level - *current).abs() <= tolerance {
                return false;
            }
            *current = level;
        }

        trace!(zone = self.load_id(), level, "Zone level changed");
        self.level_changed.notify(&level);
        true
    }

    fn handle_output_feedback(&self, feedback: Feedback<'_>) -> nwkrust_core::Result<()> {
        if feedback.action() == output::LEVEL {
            let level = codec::parse_level(feedback.param(0)?)?;
            self.apply_level(level);
        }
        Ok(())
    }

    fn execute(&self, action: u32) -> Message {
        match self.address {
            ZoneAddress::Output { id } => Message::execute(Command::Output, id, action),
            ZoneAddress::DeviceComponent { device: id, component } => {
                Message::execute(Command::Device, id, action).with_component(component)
            }
        }
    }
}

impl Integration for Zone {
    fn integration_id(&self) -> u32 {
        self.load_id()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Zone
    }

    fn initialize(&self) -> Result<()> {
        let query = match self.address {
            ZoneAddress::Output { id } => Message::query(Command::Output, id, output::LEVEL),
            ZoneAddress::DeviceComponent { device: id, component } => {
                Message::query(Command::Device, id, device::ZONE_LEVEL).with_component(component)
            }
        };
        self.ctx.send(&query)
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("level", &self.level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::integration::testing::{context, context_with, drain};
    use nwkrust_core::RouteKey;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tolerance_suppresses_small_changes() {
        let (_queue, _router, ctx) = context_with(Config::default().with_level_tolerance(0.1));
        let zone = Zone::new(ZoneAddress::Output { id: 10 }, "Downlights", ctx);
        zone.apply_level(0.5);

        let events = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&events);
        zone.subscribe(move |_| *counter.lock() += 1);

        assert!(!zone.apply_level(0.501));
        assert_eq!(*events.lock(), 0);

        assert!(zone.apply_level(0.65));
        assert_eq!(*events.lock(), 1);
        assert_eq!(zone.level(), 0.65);
    }

    #[test]
    fn test_output_feedback_updates_level() {
        let (_queue, router, ctx) = context();
        let zone = Zone::new(ZoneAddress::Output { id: 10 }, "Downlights", ctx);

        router.dispatch_line("~OUTPUT,10,1,75.00").unwrap();
        assert!((zone.level() - 0.75).abs() < 1e-9);

        // Malformed feedback leaves state alone
        router.dispatch_line("~OUTPUT,10,1").unwrap();
        router.dispatch_line("~OUTPUT,10,1,bright").unwrap();
        assert!((zone.level() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_output_commands() {
        let (queue, _router, ctx) = context();
        let zone = Zone::new(ZoneAddress::Output { id: 10 }, "Downlights", ctx);

        zone.set_level(0.5).unwrap();
        zone.start_raising().unwrap();
        zone.stop().unwrap();
        zone.initialize().unwrap();

        assert_eq!(
            drain(&queue),
            vec![
                "#OUTPUT,10,1,50.00,00:00:00,00:00:00\r\n",
                "#OUTPUT,10,2\r\n",
                "#OUTPUT,10,4\r\n",
                "?OUTPUT,10,1\r\n",
            ]
        );
        // No optimistic update
        assert_eq!(zone.level(), 0.0);
    }

    #[test]
    fn test_device_component_commands() {
        let (queue, _router, ctx) = context();
        let zone = Zone::new(
            ZoneAddress::DeviceComponent { device: 40, component: 2 },
            "Cans",
            ctx,
        );

        zone.set_level_with(1.0, Duration::from_secs(3), Duration::ZERO).unwrap();
        zone.start_lowering().unwrap();
        zone.initialize().unwrap();

        assert_eq!(zone.load_id(), 2);
        assert_eq!(
            drain(&queue),
            vec![
                "#DEVICE,40,2,14,100.00,00:00:03,00:00:00\r\n",
                "#DEVICE,40,2,19\r\n",
                "?DEVICE,40,2,14\r\n",
            ]
        );
    }

    #[test]
    fn test_drop_releases_registration() {
        let (_queue, router, ctx) = context();
        let zone = Zone::new(ZoneAddress::Output { id: 10 }, "Downlights", ctx);
        let key = RouteKey::new(Command::Output, 10);
        assert_eq!(router.handler_count(key), 1);

        drop(zone);
        assert_eq!(router.handler_count(key), 0);
    }
}
