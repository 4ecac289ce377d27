//! MQTT transport over `rumqttc` and the tokio service runner.
//!
//! Two pieces live here:
//!
//! - [`RumqttcLink`] implements [`CommandLink`] over the synchronous
//!   `rumqttc` client. Every `connect` builds a fresh session (clean
//!   session, fixed credentials, 20 s keep-alive) and spawns a worker
//!   thread that drains the event loop: the ConnAck confirms the connect
//!   within the 10 s bound, publishes queue up for `try_recv`, and the
//!   first connection error records the loss cause and ends the worker.
//!   The state machine's own reconnect is the authoritative recovery path,
//!   so a lost session is never resurrected here — the next `connect`
//!   starts over and resubscribes explicitly.
//!
//! - [`LinkService`] owns a [`FieldController`] on a tokio task. UI-side
//!   callers talk to it through a [`LinkHandle`]; requests are serialized
//!   through one channel into the single-writer controller, and a periodic
//!   tick pumps reconnect deadlines and inbound messages.
//!
//! ```ignore
//! let (service, handle) = LinkService::with_default_transport(config);
//! let status = service.controller().status_events();
//! tokio::spawn(service.run());
//!
//! handle.register(registration).await?;
//! handle.toggle(topic, DeviceAction::Motor, true).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{DeviceAction, QueryKind};
use crate::config::BrokerConfig;
use crate::controller::FieldController;
use crate::device::DeviceRegistration;
use crate::traits::{CommandLink, LinkMessage};

// ============================================================================
// Errors
// ============================================================================

/// Transport and service errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Broker refused or the network failed during connect.
    #[error("connect failed: {0}")]
    Connect(String),
    /// No ConnAck within the bounded connect timeout.
    #[error("connect timed out after {0}s")]
    ConnectTimeout(u16),
    /// Operation needs an open session.
    #[error("not connected")]
    NotConnected,
    /// Broker rejected a subscribe.
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    /// Transport rejected a publish.
    #[error("publish failed: {0}")]
    Publish(String),
    /// The service task is gone; its request channel is closed.
    #[error("link service stopped")]
    ServiceStopped,
}

// ============================================================================
// Rumqttc-backed CommandLink
// ============================================================================

/// [`CommandLink`] over the synchronous `rumqttc` client.
pub struct RumqttcLink {
    client: Option<Client>,
    inbound: Option<Receiver<LinkMessage>>,
    connected: Arc<AtomicBool>,
    lost: Arc<Mutex<Option<String>>>,
    closing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RumqttcLink {
    /// Create a link with no session.
    pub fn new() -> Self {
        Self {
            client: None,
            inbound: None,
            connected: Arc::new(AtomicBool::new(false)),
            lost: Arc::new(Mutex::new(None)),
            closing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn teardown(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Some(client) = self.client.take() {
            let _ = client.disconnect();
        }
        self.connected.store(false, Ordering::SeqCst);
        self.inbound = None;
        // Worker exits once the session closes; don't wait on it here.
        self.worker = None;
    }
}

impl Default for RumqttcLink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLink for RumqttcLink {
    type Error = LinkError;

    fn connect(&mut self, config: &BrokerConfig) -> Result<(), LinkError> {
        // Any previous session is abandoned; each connect starts clean.
        self.teardown();

        // Fresh flags per session, so a worker from an abandoned session
        // can never clobber the new one's state.
        self.connected = Arc::new(AtomicBool::new(false));
        self.lost = Arc::new(Mutex::new(None));
        self.closing = Arc::new(AtomicBool::new(false));

        let mut options = MqttOptions::new(
            config.client_id.as_str(),
            config.host.as_str(),
            config.port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs as u64));
        options.set_clean_session(config.clean_session);
        if config.has_auth() {
            options.set_credentials(config.username.as_str(), config.password.as_str());
        }

        let (client, mut connection) = Client::new(options, 64);

        let (msg_tx, msg_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let connected = Arc::clone(&self.connected);
        let lost = Arc::clone(&self.lost);
        let closing = Arc::clone(&self.closing);

        let worker = std::thread::spawn(move || {
            let mut ready = Some(ready_tx);
            for event in connection.iter() {
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        connected.store(true, Ordering::SeqCst);
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message =
                            LinkMessage::new(publish.topic.clone(), publish.payload.to_vec());
                        if msg_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        connected.store(false, Ordering::SeqCst);
                        if closing.load(Ordering::SeqCst) {
                            // User-initiated teardown, not a loss.
                            break;
                        }
                        match ready.take() {
                            Some(tx) => {
                                let _ = tx.send(Err(e.to_string()));
                            }
                            None => {
                                *lost.lock().unwrap() = Some(e.to_string());
                            }
                        }
                        break;
                    }
                }
            }
        });

        let timeout = Duration::from_secs(config.connect_timeout_secs as u64);
        match ready_rx.recv_timeout(timeout) {
            Ok(Ok(())) => {
                self.client = Some(client);
                self.inbound = Some(msg_rx);
                self.worker = Some(worker);
                Ok(())
            }
            Ok(Err(e)) => Err(LinkError::Connect(e)),
            Err(_) => {
                // Dropping the client closes the event loop; the worker
                // follows it down.
                Err(LinkError::ConnectTimeout(config.connect_timeout_secs))
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), LinkError> {
        self.teardown();
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        let client = self.client.as_mut().ok_or(LinkError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| LinkError::Subscribe(e.to_string()))
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        let client = self.client.as_mut().ok_or(LinkError::NotConnected)?;
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| LinkError::Publish(e.to_string()))
    }

    fn try_recv(&mut self) -> Option<LinkMessage> {
        self.inbound.as_ref()?.try_recv().ok()
    }

    fn take_lost(&mut self) -> Option<String> {
        self.lost.lock().unwrap().take()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Service runner
// ============================================================================

/// A request delivered into the controller's single-writer boundary.
#[derive(Clone, Debug)]
pub enum ControlRequest {
    /// Register a device (the first one binds the connection).
    Register(DeviceRegistration),
    /// Switch an action on a registered device.
    Toggle {
        /// Bound topic of the device.
        topic: String,
        /// The action to switch.
        action: DeviceAction,
        /// Desired position.
        on: bool,
    },
    /// Request a fresh reading.
    Query(QueryKind),
    /// Ask the starter to re-report everything.
    Refresh,
    /// Tear down the session and cancel any pending reconnect.
    Disconnect,
}

/// UI-side handle to a running [`LinkService`].
#[derive(Clone)]
pub struct LinkHandle {
    tx: tokio::sync::mpsc::Sender<ControlRequest>,
}

impl LinkHandle {
    async fn send(&self, request: ControlRequest) -> Result<(), LinkError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| LinkError::ServiceStopped)
    }

    /// Register a device.
    pub async fn register(&self, registration: DeviceRegistration) -> Result<(), LinkError> {
        self.send(ControlRequest::Register(registration)).await
    }

    /// Switch an action on a registered device.
    pub async fn toggle(
        &self,
        topic: impl Into<String>,
        action: DeviceAction,
        on: bool,
    ) -> Result<(), LinkError> {
        self.send(ControlRequest::Toggle {
            topic: topic.into(),
            action,
            on,
        })
        .await
    }

    /// Request a fresh reading.
    pub async fn query(&self, kind: QueryKind) -> Result<(), LinkError> {
        self.send(ControlRequest::Query(kind)).await
    }

    /// Ask the starter to re-report everything.
    pub async fn refresh(&self) -> Result<(), LinkError> {
        self.send(ControlRequest::Refresh).await
    }

    /// Tear down the session.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.send(ControlRequest::Disconnect).await
    }
}

/// Owns a [`FieldController`] and drives it from a tokio task.
pub struct LinkService<L: CommandLink> {
    controller: FieldController<L>,
    requests: tokio::sync::mpsc::Receiver<ControlRequest>,
    poll_interval: Duration,
    started: Instant,
}

impl LinkService<RumqttcLink> {
    /// Service over the rumqttc transport with the default 100 ms pump.
    pub fn with_default_transport(config: BrokerConfig) -> (Self, LinkHandle) {
        let controller = FieldController::new(RumqttcLink::new(), config);
        Self::new(controller, Duration::from_millis(100))
    }
}

impl<L: CommandLink> LinkService<L> {
    /// Wrap a controller in a service; subscribe observers through
    /// [`controller`](Self::controller) before spawning [`run`](Self::run).
    pub fn new(controller: FieldController<L>, poll_interval: Duration) -> (Self, LinkHandle) {
        let (tx, rx) = tokio::sync::mpsc::channel(32);
        (
            Self {
                controller,
                requests: rx,
                poll_interval,
                started: Instant::now(),
            },
            LinkHandle { tx },
        )
    }

    /// The wrapped controller (for wiring observers before `run`).
    pub fn controller(&self) -> &FieldController<L> {
        &self.controller
    }

    /// Mutable access to the wrapped controller.
    pub fn controller_mut(&mut self) -> &mut FieldController<L> {
        &mut self.controller
    }

    fn handle(controller: &mut FieldController<L>, now_ms: u64, request: ControlRequest) {
        match request {
            ControlRequest::Register(registration) => {
                if let Err(e) = controller.register(registration, now_ms) {
                    warn!(error = %e, "registration rejected");
                }
            }
            ControlRequest::Toggle { topic, action, on } => {
                if let Err(e) = controller.toggle(&topic, action, on) {
                    warn!(topic = %topic, error = %e, "toggle failed");
                }
            }
            ControlRequest::Query(kind) => {
                if let Err(e) = controller.query(kind) {
                    warn!(error = %e, "query failed");
                }
            }
            ControlRequest::Refresh => {
                if let Err(e) = controller.refresh() {
                    warn!(error = %e, "refresh failed");
                }
            }
            ControlRequest::Disconnect => controller.disconnect(),
        }
    }

    /// Run until every [`LinkHandle`] is dropped, then disconnect.
    pub async fn run(self) {
        let Self {
            mut controller,
            mut requests,
            poll_interval,
            started,
        } = self;

        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            let now_ms = started.elapsed().as_millis() as u64;
            tokio::select! {
                _ = ticker.tick() => {
                    controller.poll(now_ms);
                }
                request = requests.recv() => match request {
                    Some(request) => Self::handle(&mut controller, now_ms, request),
                    None => {
                        debug!("all handles dropped; shutting down link service");
                        controller.disconnect();
                        break;
                    }
                },
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
