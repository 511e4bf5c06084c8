//! The event stream client.
//!
//! One [`EventStreamClient`] owns at most one live connection between
//! [`EventStreamClient::connect`] and [`EventStreamClient::disconnect`]. Every
//! frame that has a registered listener becomes the "latest event" and is
//! broadcast to subscribers in delivery order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use super::decoder::SseDecoder;
use super::event::{StreamEvent, DEFAULT_STREAM_KINDS};
use super::listeners::{Listener, ListenerRegistry};
use super::transport::{ReconnectPolicy, StreamTransport, TransportError};

const EVENT_CAPACITY: usize = 1024;

// ============================================================================
// Configuration and state
// ============================================================================

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Single endpoint used for both the default and the named kinds.
    pub url: String,
    pub kinds: Vec<String>,
    pub reconnect: ReconnectPolicy,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kinds: DEFAULT_STREAM_KINDS.iter().map(|k| k.to_string()).collect(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// Opening the stream or waiting to reconnect.
    Connecting,
    Open,
    /// Torn down, or the reconnect policy gave up.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

struct Connection {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

// ============================================================================
// Client
// ============================================================================

pub struct EventStreamClient {
    config: StreamConfig,
    transport: Arc<dyn StreamTransport>,
    listeners: Arc<ListenerRegistry>,
    latest: Arc<watch::Sender<Option<StreamEvent>>>,
    events: broadcast::Sender<StreamEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    seq: Arc<AtomicU64>,
    connection: Mutex<Option<Connection>>,
}

impl EventStreamClient {
    pub fn new(config: StreamConfig, transport: Arc<dyn StreamTransport>) -> Self {
        let (latest, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            config,
            transport,
            listeners: Arc::new(ListenerRegistry::new()),
            latest: Arc::new(latest),
            events,
            state: Arc::new(state),
            seq: Arc::new(AtomicU64::new(0)),
            connection: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Open the stream. Calling this while a connection is alive is a no-op,
    /// so exactly one underlying connection exists per mount.
    pub async fn connect(&self) -> Result<(), TransportError> {
        if self.config.url.trim().is_empty() {
            return Err(TransportError::Config("stream url is empty".to_string()));
        }

        let mut connection = self.connection.lock().await;
        if let Some(existing) = connection.as_ref() {
            if !existing.handle.is_finished() {
                debug!("connect called while already connected; ignoring");
                return Ok(());
            }
        }

        info!("connecting to stream: {}", self.config.url);
        self.register_listeners();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = StreamTask {
            url: self.config.url.clone(),
            transport: self.transport.clone(),
            listeners: self.listeners.clone(),
            policy: self.config.reconnect.clone(),
            state: self.state.clone(),
            seq: self.seq.clone(),
        };
        let handle = tokio::spawn(task.run(shutdown_rx));
        *connection = Some(Connection { shutdown, handle });
        Ok(())
    }

    /// Tear the mount down: deregister every listener, then close the
    /// connection. Safe to call repeatedly and after the connection failed.
    ///
    /// The connection lock is held until the task has stopped, so a
    /// concurrent `connect` starts only after this teardown is complete.
    pub async fn disconnect(&self) {
        let mut guard = self.connection.lock().await;
        let removed = self.listeners.clear();
        debug!("deregistered {} listeners", removed);

        let Some(connection) = guard.take() else {
            return;
        };

        let _ = connection.shutdown.send(true);
        if let Err(e) = connection.handle.await {
            if !e.is_cancelled() {
                warn!("connection task ended abnormally: {}", e);
            }
        }
        self.state.send_replace(ConnectionState::Closed);
        drop(guard);
        info!("connection closed");
    }

    /// Most recent event, if any was received.
    pub fn latest(&self) -> Option<StreamEvent> {
        self.latest.borrow().clone()
    }

    pub fn watch_latest(&self) -> watch::Receiver<Option<StreamEvent>> {
        self.latest.subscribe()
    }

    /// Receive every published event in delivery order.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_listening(&self, kind: &str) -> bool {
        self.listeners.is_registered(kind)
    }

    fn register_listeners(&self) {
        for kind in &self.config.kinds {
            self.listeners.register(kind.clone(), self.publisher());
        }
        debug!("listening for kinds: {:?}", self.config.kinds);
    }

    fn publisher(&self) -> Listener {
        let latest = self.latest.clone();
        let events = self.events.clone();
        Arc::new(move |event: StreamEvent| {
            debug!(
                "event received ({}): {}",
                event.kind, event.payload
            );
            latest.send_replace(Some(event.clone()));
            if events.send(event).is_err() {
                trace!("no subscribers for event");
            }
        })
    }
}

impl Drop for EventStreamClient {
    fn drop(&mut self) {
        self.listeners.clear();
        if let Some(connection) = self.connection.get_mut().take() {
            connection.handle.abort();
        }
    }
}

// ============================================================================
// Connection task
// ============================================================================

enum StreamEnd {
    Shutdown,
    Dropped,
}

struct StreamTask {
    url: String,
    transport: Arc<dyn StreamTransport>,
    listeners: Arc<ListenerRegistry>,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<ConnectionState>>,
    seq: Arc<AtomicU64>,
}

impl StreamTask {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut attempt: u32 = 0;
        let mut last_event_id: Option<String> = None;
        let mut retry_hint: Option<Duration> = None;

        loop {
            self.state.send_replace(ConnectionState::Connecting);

            let opened = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.transport.open(&self.url, last_event_id.as_deref()) => result,
            };

            match opened {
                Ok(mut chunks) => {
                    attempt = 0;
                    self.state.send_replace(ConnectionState::Open);
                    debug!("stream open: {}", self.url);

                    let mut decoder = SseDecoder::with_last_event_id(last_event_id.take());
                    let end = loop {
                        tokio::select! {
                            _ = shutdown.changed() => break StreamEnd::Shutdown,
                            chunk = chunks.next() => match chunk {
                                Some(Ok(bytes)) => {
                                    for frame in decoder.feed(&bytes) {
                                        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
                                        self.listeners.dispatch(StreamEvent::from_frame(seq, frame));
                                    }
                                }
                                Some(Err(e)) => {
                                    error!("stream error: {}. Reconnecting...", e);
                                    break StreamEnd::Dropped;
                                }
                                None => {
                                    warn!("server ended the stream. Reconnecting...");
                                    break StreamEnd::Dropped;
                                }
                            }
                        }
                    };

                    last_event_id = decoder.last_event_id().map(str::to_string);
                    if let Some(retry) = decoder.retry() {
                        retry_hint = Some(retry);
                    }
                    if matches!(end, StreamEnd::Shutdown) {
                        break;
                    }
                }
                Err(e) if !e.is_retryable() => {
                    error!("cannot open stream: {}", e);
                    break;
                }
                Err(e) => {
                    error!("connection error: {}. Reconnecting...", e);
                }
            }

            if !self.policy.allows(attempt) {
                warn!(
                    "giving up after {} consecutive reconnect attempts",
                    attempt
                );
                break;
            }

            let delay = self.policy.delay(attempt, retry_hint);
            attempt += 1;
            debug!("reconnecting in {:?} (attempt {})", delay, attempt);

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sleep(delay) => {}
            }
        }

        self.state.send_replace(ConnectionState::Closed);
    }
}
