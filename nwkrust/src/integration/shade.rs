//! Shades and shade groups
//!
//! Neither keeps state. Output-driven shades and shade groups take plain
//! raise/lower/stop actions. Button-driven shades press a device button and
//! release it after a pulse; some have no stop button at all.

use std::time::Duration;

use nwkrust_core::{
    Command, Message,
    constants::actions::{device, output, shade_group},
};
use nwkrust_types::IntegrationKind;
use tracing::{debug, warn};

use super::{Context, Integration};
use crate::error::Result;

/// How a shade is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeDrive {
    /// `OUTPUT` raise/lower/stop actions on the shade's own id
    Output,
    /// Press and timed release of buttons on a `DEVICE`
    Buttons {
        device: u32,
        open: u32,
        close: u32,
        stop: Option<u32>,
        pulse: Duration,
    },
}

#[derive(Debug)]
pub struct Shade {
    id: u32,
    name: String,
    drive: ShadeDrive,
    ctx: Context,
}

impl Shade {
    pub fn new(id: u32, name: impl Into<String>, drive: ShadeDrive, ctx: Context) -> Self {
        Self {
            id,
            name: name.into(),
            drive,
            ctx,
        }
    }

    pub fn drive(&self) -> ShadeDrive {
        self.drive
    }

    pub fn start_raising(&self) -> Result<()> {
        match self.drive {
            ShadeDrive::Output => self.output(output::START_RAISING),
            ShadeDrive::Buttons { open, .. } => self.pulse(open),
        }
    }

    pub fn start_lowering(&self) -> Result<()> {
        match self.drive {
            ShadeDrive::Output => self.output(output::START_LOWERING),
            ShadeDrive::Buttons { close, .. } => self.pulse(close),
        }
    }

    /// Stop motion; a no-op for button shades without a stop button
    pub fn stop(&self) -> Result<()> {
        match self.drive {
            ShadeDrive::Output => self.output(output::STOP),
            ShadeDrive::Buttons { stop: Some(button), .. } => self.pulse(button),
            ShadeDrive::Buttons { stop: None, .. } => {
                warn!(shade = self.id, name = %self.name, "Shade has no stop button, ignoring stop");
                Ok(())
            }
        }
    }

    fn output(&self, action: u32) -> Result<()> {
        self.ctx
            .send(&Message::execute(Command::Output, self.id, action))
    }

    fn pulse(&self, button: u32) -> Result<()> {
        let ShadeDrive::Buttons { device: id, pulse, .. } = self.drive else {
            return Ok(());
        };

        debug!(shade = self.id, button, ?pulse, "Pulsing shade button");

        // Release first: without a runtime nothing is sent
        self.ctx.send_after(
            Message::execute(Command::Device, id, device::RELEASE).with_component(button),
            pulse,
        )?;
        self.ctx
            .send(&Message::execute(Command::Device, id, device::PRESS).with_component(button))
    }
}

impl Integration for Shade {
    fn integration_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Shade
    }
}

/// A `SHADEGRP` integration moving several shades together
#[derive(Debug)]
pub struct ShadeGroup {
    id: u32,
    name: String,
    ctx: Context,
}

impl ShadeGroup {
    pub fn new(id: u32, name: impl Into<String>, ctx: Context) -> Self {
        Self {
            id,
            name: name.into(),
            ctx,
        }
    }

    /// Move the group to `level` (0 closed, 1 open)
    pub fn set_level(&self, level: f64) -> Result<()> {
        let config = self.ctx.config();
        self.ctx.send(
            &Message::execute(Command::ShadeGroup, self.id, shade_group::LEVEL)
                .level(level)
                .duration(config.default_fade)
                .duration(config.default_delay),
        )
    }

    pub fn start_raising(&self) -> Result<()> {
        self.execute(shade_group::START_RAISING)
    }

    pub fn start_lowering(&self) -> Result<()> {
        self.execute(shade_group::START_LOWERING)
    }

    pub fn stop(&self) -> Result<()> {
        self.execute(shade_group::STOP)
    }

    fn execute(&self, action: u32) -> Result<()> {
        self.ctx
            .send(&Message::execute(Command::ShadeGroup, self.id, action))
    }
}

impl Integration for ShadeGroup {
    fn integration_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::ShadeGroup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::integration::testing::{context, drain};
    use pretty_assertions::assert_eq;

    fn button_drive(stop: Option<u32>) -> ShadeDrive {
        ShadeDrive::Buttons {
            device: 40,
            open: 71,
            close: 72,
            stop,
            pulse: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_output_shade() {
        let (queue, _router, ctx) = context();
        let shade = Shade::new(20, "Window", ShadeDrive::Output, ctx);

        shade.start_raising().unwrap();
        shade.start_lowering().unwrap();
        shade.stop().unwrap();

        assert_eq!(
            drain(&queue),
            vec!["#OUTPUT,20,2\r\n", "#OUTPUT,20,3\r\n", "#OUTPUT,20,4\r\n"]
        );
    }

    #[test]
    fn test_shade_group() {
        let (queue, _router, ctx) = context();
        let group = ShadeGroup::new(5, "South", ctx);

        group.set_level(0.25).unwrap();
        group.start_lowering().unwrap();
        group.stop().unwrap();

        assert_eq!(
            drain(&queue),
            vec![
                "#SHADEGRP,5,1,25.00,00:00:00,00:00:00\r\n",
                "#SHADEGRP,5,3\r\n",
                "#SHADEGRP,5,4\r\n",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_shade_releases_after_pulse() {
        let (queue, _router, ctx) = context();
        queue.set_ready(true);
        let shade = Shade::new(1, "Drapes", button_drive(Some(73)), ctx);

        shade.start_raising().unwrap();
        assert_eq!(drain(&queue), vec!["#DEVICE,40,71,3\r\n"]);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(queue.is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(drain(&queue), vec!["#DEVICE,40,71,4\r\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_stop_button_is_noop() {
        let (queue, _router, ctx) = context();
        queue.set_ready(true);
        let shade = Shade::new(1, "Drapes", button_drive(None), ctx);

        shade.stop().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_dropped_when_link_down() {
        let (queue, _router, ctx) = context();
        queue.set_ready(true);
        let shade = Shade::new(1, "Drapes", button_drive(Some(73)), ctx);

        shade.start_lowering().unwrap();
        queue.clear();
        queue.set_ready(false);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.is_empty());
    }

    #[test]
    fn test_button_shade_needs_runtime() {
        let (queue, _router, ctx) = context();
        let shade = Shade::new(1, "Drapes", button_drive(Some(73)), ctx);

        assert!(matches!(shade.start_raising(), Err(Error::NoRuntime)));
        assert!(queue.is_empty());
    }
}
