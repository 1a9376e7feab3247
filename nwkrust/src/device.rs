//! High-level device interface

use std::sync::Arc;
use std::time::Duration;

use nwkrust_core::{CommandQueue, FrameReader, LineSink, LinkState, ResponseRouter, Session};
use nwkrust_transport::Transport;
use nwkrust_types::{NodeConfig, Occupancy, Topology};
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    error::{Error, Result},
    event::DeviceEvent,
    integration::{Context, Integration},
    link::{self, TransportEvent},
    room::Room,
    tree::IntegrationTree,
};

/// Lutron NWK processor
///
/// Holds the cached state of every integration in the topology and turns
/// facade calls into queued protocol commands. Cloning is cheap; clones
/// share one connection.
///
/// # Examples
///
/// ```no_run
/// use nwkrust::{AreaConfig, Device, TcpTransport, Topology};
///
/// #[tokio::main]
/// async fn main() -> nwkrust::Result<()> {
///     let topology = Topology::new()
///         .with_area(AreaConfig::new(1, 1, "Living").with_zone(10, "Downlights"));
///     let device = Device::new(topology)?;
///
///     let driver = device.clone();
///     tokio::spawn(async move {
///         let mut transport = TcpTransport::with_default_port("192.168.1.50");
///         driver.run(&mut transport).await
///     });
///
///     let mut events = device.subscribe();
///     while let Ok(event) = events.recv().await {
///         println!("{:?}", event);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Device {
    inner: Arc<Inner>,
}

struct Inner {
    config: Arc<Config>,
    queue: Arc<CommandQueue>,
    router: Arc<ResponseRouter>,
    session: Session,
    frames: FrameReader,
    tree: RwLock<IntegrationTree>,
    events: broadcast::Sender<DeviceEvent>,
    sink: RwLock<Option<Arc<dyn LineSink>>>,
}

impl Device {
    /// Create a device with default settings
    pub fn new(topology: Topology) -> Result<Self> {
        Self::with_config(topology, Config::default())
    }

    /// Create a device with custom settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Types`] if the topology fails validation.
    pub fn with_config(topology: Topology, config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let queue = Arc::new(CommandQueue::new());
        queue.set_open(false);
        let router = Arc::new(ResponseRouter::new());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let ctx = Context::new(Arc::clone(&queue), Arc::clone(&router), Arc::clone(&config));
        let tree = IntegrationTree::build(&topology, &ctx, &events)?;

        Ok(Self {
            inner: Arc::new(Inner {
                frames: FrameReader::new(config.frame_tokens()),
                config,
                queue,
                router,
                session: Session::new(),
                tree: RwLock::new(tree),
                events,
                sink: RwLock::new(None),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Where login replies go; the dispatcher is given its own sink
    pub fn attach_sink(&self, sink: Arc<dyn LineSink>) {
        *self.inner.sink.write() = Some(sink);
    }

    pub fn detach_sink(&self) {
        *self.inner.sink.write() = None;
    }

    pub fn link_state(&self) -> LinkState {
        self.inner.session.state()
    }

    /// Lines waiting for a dispatch tick
    pub fn pending_commands(&self) -> usize {
        self.inner.queue.len()
    }

    /// Receive every change published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.events.subscribe()
    }

    /// Feed a transport notification into the engine
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(true) => self.link_up(),
            TransportEvent::Connected(false) | TransportEvent::Online(false) => self.link_down(),
            TransportEvent::Online(true) => debug!("Network online"),
            TransportEvent::Data(text) => self.push_data(text.as_bytes()),
        }
    }

    /// Feed received bytes into the engine
    pub fn push_data(&self, chunk: &[u8]) {
        trace!(len = chunk.len(), "Received chunk");
        self.inner.frames.push(chunk, &mut |line| self.handle_line(&line));
    }

    fn link_up(&self) {
        match self.inner.session.connect() {
            Ok(()) => {
                self.inner.queue.set_open(true);
                info!("Link connected, awaiting login");
                self.emit(DeviceEvent::LinkStateChanged(LinkState::AwaitingLogin));
            }
            Err(e) => debug!("Ignoring connect: {}", e),
        }
    }

    fn link_down(&self) {
        let previous = self.inner.session.close();
        self.inner.queue.set_open(false);
        self.inner.queue.set_ready(false);
        self.inner.queue.clear();
        self.inner.frames.reset();

        if previous != LinkState::Disconnected {
            info!(?previous, "Link disconnected");
            self.emit(DeviceEvent::LinkStateChanged(LinkState::Disconnected));
        }
    }

    fn handle_line(&self, line: &str) {
        let text = line.trim();
        if text.is_empty() {
            return;
        }

        let config = &self.inner.config;
        if config.is_login_line(line) {
            self.send_login();
        } else if config.is_ready_line(line) {
            match self.inner.session.mark_ready() {
                Ok(true) => self.on_ready(),
                Ok(false) => trace!("Prompt"),
                Err(e) => debug!("Ignoring prompt: {}", e),
            }
        } else {
            match self.inner.router.dispatch_line(text) {
                Ok(handled) => trace!(line = text, handled, "Routed"),
                Err(e) => debug!(line = text, "Ignoring unparsed line: {}", e),
            }
        }
    }

    fn send_login(&self) {
        if self.inner.session.state() != LinkState::AwaitingLogin {
            debug!("Login prompt outside login phase");
            return;
        }
        match self.inner.sink.read().as_ref() {
            Some(sink) => {
                debug!(username = %self.inner.config.username, "Sending login");
                sink.send_line(&format!("{}\r\n", self.inner.config.username));
            }
            None => warn!("Login prompt but no sink attached"),
        }
    }

    fn on_ready(&self) {
        self.inner.queue.set_ready(true);
        info!(logins = self.inner.session.login_count(), "Link ready");
        self.emit(DeviceEvent::LinkStateChanged(LinkState::Ready));
        self.inner.tree.read().initialize();
    }

    fn emit(&self, event: DeviceEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn with_room<R>(&self, room: u32, f: impl FnOnce(&Room) -> Result<R>) -> Result<R> {
        let tree = self.inner.tree.read();
        let room = tree.room(room).ok_or(Error::RoomNotFound(room))?;
        f(room)
    }

    /// Room numbers in ascending order
    pub fn rooms(&self) -> Vec<u32> {
        self.inner.tree.read().rooms().map(Room::id).collect()
    }

    pub fn loads(&self, room: u32) -> Result<Vec<NodeConfig>> {
        self.with_room(room, |r| {
            Ok(r.loads()
                .into_iter()
                .map(|z| NodeConfig::new(z.load_id(), z.name()))
                .collect())
        })
    }

    /// Shades and shade groups; they share one id space per room
    pub fn shades(&self, room: u32) -> Result<Vec<NodeConfig>> {
        self.with_room(room, |r| {
            Ok(r.shades()
                .into_iter()
                .map(|s| NodeConfig::new(s.id(), s.name()))
                .collect())
        })
    }

    pub fn scenes(&self, room: u32) -> Result<Vec<NodeConfig>> {
        self.with_room(room, |r| {
            Ok(r.scenes()
                .into_iter()
                .map(|s| NodeConfig::new(s.integration_id(), s.name()))
                .collect())
        })
    }

    /// Cached load level in `[0, 1]`
    pub fn load_level(&self, room: u32, load: u32) -> Result<f64> {
        self.with_room(room, |r| Ok(r.load(load)?.level()))
    }

    pub fn set_load_level(&self, room: u32, load: u32, level: f64) -> Result<()> {
        self.with_room(room, |r| r.load(load)?.set_level(level))
    }

    pub fn set_load_level_with(
        &self,
        room: u32,
        load: u32,
        level: f64,
        fade: Duration,
        delay: Duration,
    ) -> Result<()> {
        self.with_room(room, |r| r.load(load)?.set_level_with(level, fade, delay))
    }

    pub fn start_raising_load(&self, room: u32, load: u32) -> Result<()> {
        self.with_room(room, |r| r.load(load)?.start_raising())
    }

    pub fn start_lowering_load(&self, room: u32, load: u32) -> Result<()> {
        self.with_room(room, |r| r.load(load)?.start_lowering())
    }

    pub fn stop_load(&self, room: u32, load: u32) -> Result<()> {
        self.with_room(room, |r| r.load(load)?.stop())
    }

    pub fn start_raising_shade(&self, room: u32, shade: u32) -> Result<()> {
        self.with_room(room, |r| r.shade(shade)?.start_raising())
    }

    pub fn start_lowering_shade(&self, room: u32, shade: u32) -> Result<()> {
        self.with_room(room, |r| r.shade(shade)?.start_lowering())
    }

    pub fn stop_shade(&self, room: u32, shade: u32) -> Result<()> {
        self.with_room(room, |r| r.shade(shade)?.stop())
    }

    /// Current scene; `Some(0)` when a multi-area room disagrees
    pub fn room_scene(&self, room: u32) -> Result<Option<u32>> {
        self.with_room(room, |r| Ok(r.scene()))
    }

    pub fn set_room_scene(&self, room: u32, scene: u32) -> Result<()> {
        self.with_room(room, |r| r.set_scene(scene))
    }

    pub fn room_occupancy(&self, room: u32) -> Result<Occupancy> {
        self.with_room(room, |r| Ok(r.occupancy()))
    }

    /// Replace the integration tree
    ///
    /// Cached state starts over. If the link is ready, the new tree is
    /// queried immediately.
    pub fn reload_topology(&self, topology: &Topology) -> Result<()> {
        let ctx = Context::new(
            Arc::clone(&self.inner.queue),
            Arc::clone(&self.inner.router),
            Arc::clone(&self.inner.config),
        );
        let tree = IntegrationTree::build(topology, &ctx, &self.inner.events)?;

        let old = std::mem::replace(&mut *self.inner.tree.write(), tree);
        drop(old);

        info!(rooms = topology.rooms().len(), "Topology reloaded");
        self.emit(DeviceEvent::TopologyChanged);

        if self.inner.session.is_ready() {
            self.inner.tree.read().initialize();
        }
        Ok(())
    }

    /// Drive the link over `transport` until it closes
    ///
    /// Connects, logs in, and keeps the dispatcher running while pumping
    /// bytes both ways. Returns `Ok` when the processor hangs up. The
    /// engine sees a disconnect however this returns, including when the
    /// future is dropped.
    pub async fn run<T>(&self, transport: &mut T) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        info!("Connecting to {}...", transport.remote_addr());
        transport.connect().await?;

        let (sink, mut outbound) = link::channel();
        let sink: Arc<dyn LineSink> = Arc::new(sink);
        self.attach_sink(Arc::clone(&sink));

        let _link = LinkGuard(self.clone());
        self.handle_event(TransportEvent::Connected(true));

        let _dispatcher = Dispatcher::spawn(
            Arc::clone(&self.inner.queue),
            sink,
            self.inner.config.dispatch_interval,
        );

        let poll = self.inner.config.receive_poll;
        let result = loop {
            if let Err(e) = flush(transport, &mut outbound).await {
                break Err(e);
            }
            match transport.receive(poll).await {
                Ok(chunk) => self.push_data(&chunk),
                Err(e) if e.is_timeout() => continue,
                Err(nwkrust_transport::Error::ConnectionClosed) => {
                    info!("Processor closed the connection");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        if transport.is_connected() {
            if let Err(e) = transport.disconnect().await {
                warn!("Failed to close transport: {}", e);
            }
        }
        result.map_err(Error::from)
    }
}

async fn flush<T>(
    transport: &mut T,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> nwkrust_transport::Result<()>
where
    T: Transport + ?Sized,
{
    while let Ok(line) = outbound.try_recv() {
        trace!(line = %line.trim_end(), "Sending");
        transport.send(line.as_bytes()).await?;
    }
    Ok(())
}

/// Reports the link down when `run` ends
struct LinkGuard(Device);

impl Drop for LinkGuard {
    fn drop(&mut self) {
        self.0.handle_event(TransportEvent::Connected(false));
        self.0.detach_sink();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("state", &self.link_state())
            .field("rooms", &self.rooms())
            .field("pending", &self.pending_commands())
            .finish()
    }
}
