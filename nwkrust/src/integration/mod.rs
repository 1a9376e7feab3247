//! Integration tree nodes
//!
//! Every node owns its cached state and its feedback registration. Nodes
//! hold a [`Context`] to reach the command queue and response router of the
//! connection they belong to.

mod area;
mod grafik_eye;
mod keypad;
mod scene;
mod shade;
mod zone;

pub use area::Area;
pub use grafik_eye::GrafikEyeDevice;
pub use keypad::Keypad;
pub use scene::Scene;
pub use shade::{Shade, ShadeDrive, ShadeGroup};
pub use zone::{Zone, ZoneAddress};

use std::sync::Arc;
use std::time::Duration;

use nwkrust_core::{
    Addressing, Command, CommandQueue, Feedback, Message, Registration, ResponseRouter,
};
use nwkrust_types::IntegrationKind;
use tracing::{debug, trace, warn};

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Common identity and start-up behaviour of an integration
pub trait Integration: Send + Sync {
    fn integration_id(&self) -> u32;

    fn name(&self) -> &str;

    fn kind(&self) -> IntegrationKind;

    /// Queue the queries that bring cached state up to date
    fn initialize(&self) -> Result<()> {
        Ok(())
    }
}

/// Connection-scoped services shared by every node
#[derive(Debug, Clone)]
pub struct Context {
    queue: Arc<CommandQueue>,
    router: Arc<ResponseRouter>,
    config: Arc<Config>,
}

impl Context {
    pub fn new(queue: Arc<CommandQueue>, router: Arc<ResponseRouter>, config: Arc<Config>) -> Self {
        Self {
            queue,
            router,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queue a command for the next free dispatch tick
    pub fn send(&self, message: &Message) -> Result<()> {
        self.queue.enqueue(message)?;
        Ok(())
    }

    /// Queue a command once `delay` has elapsed
    ///
    /// Needs a tokio runtime. The command is dropped if the link went down
    /// in the meantime.
    pub fn send_after(&self, message: Message, delay: Duration) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let queue = Arc::clone(&self.queue);

        trace!(%message, ?delay, "Scheduling delayed command");

        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !queue.is_ready() {
                debug!(%message, "Link down, dropping delayed command");
                return;
            }
            if let Err(e) = queue.enqueue(&message) {
                warn!(%message, "Failed to queue delayed command: {}", e);
            }
        });
        Ok(())
    }

    pub(crate) fn register<F>(
        &self,
        command: Command,
        integration_id: u32,
        addressing: Addressing,
        handler: F,
    ) -> Registration
    where
        F: Fn(Feedback<'_>) -> nwkrust_core::Result<()> + Send + Sync + 'static,
    {
        self.router
            .register(command, integration_id, addressing, handler)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn context_with(config: Config) -> (Arc<CommandQueue>, Arc<ResponseRouter>, Context) {
        let queue = Arc::new(CommandQueue::new());
        let router = Arc::new(ResponseRouter::new());
        let ctx = Context::new(Arc::clone(&queue), Arc::clone(&router), Arc::new(config));
        (queue, router, ctx)
    }

    pub fn context() -> (Arc<CommandQueue>, Arc<ResponseRouter>, Context) {
        context_with(Config::default())
    }

    /// Everything queued, in dispatch order
    pub fn drain(queue: &CommandQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop()).collect()
    }
}
