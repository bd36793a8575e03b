//! Call facade over a duplex channel.
//!
//! A [`Client`] owns one channel split in two: the sink is shared by callers
//! behind an async lock, the source is driven by the receive loop task. Each
//! call registers a one-shot slot under a fresh correlation id, sends its
//! frame and waits on the slot with a timeout.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use mailrpc_protocol::{Headers, InboundEnvelope, Payload, RequestEnvelope, encode_request};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::{DuplexChannel, FrameSink, Transport, WsChannel};
use crate::error::{ClientError, ClientResult};
use crate::receiver::{LoopState, ReceiveLoop, StopReason};
use crate::registry::{PendingRegistry, RegisterError, new_correlation_id};

/// Timeout used when none (or zero) is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:5000";

const EVENT_CAPACITY: usize = 64;

/// Construction options for a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// API base address (`http(s)://` or `ws(s)://`).
    pub address: String,
    /// Framing on top of the websocket.
    pub transport: Transport,
    /// Call timeout. `None` or zero means [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
    /// Headers sent with every call.
    pub headers: Headers,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            transport: Transport::default(),
            timeout: None,
            headers: Headers::new(),
        }
    }
}

impl ClientOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The timeout calls will actually use.
    pub fn effective_timeout(&self) -> Duration {
        non_zero(self.timeout).unwrap_or(DEFAULT_TIMEOUT)
    }
}

fn non_zero(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

/// One request: method, path, per-call headers, optional body and timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    method: String,
    path: String,
    headers: Headers,
    body: Option<Payload>,
    timeout: Option<Duration>,
}

impl Call {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Headers::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new("PUT", path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("DELETE", path)
    }

    /// Adds a per-call header. Per-call headers win over client defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Serializes `body` to JSON and attaches it.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ClientResult<Self> {
        self.body = Some(Payload::json(body).map_err(ClientError::Encode)?);
        Ok(self)
    }

    /// Attaches an already serialized body.
    pub fn body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the client timeout for this call. Zero means "use the
    /// client timeout".
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Request/response client multiplexed over one duplex channel.
///
/// Calls may be issued concurrently from any number of tasks; responses are
/// matched by correlation id and may arrive in any order.
pub struct Client {
    registry: Arc<PendingRegistry>,
    sink: Mutex<Box<dyn FrameSink>>,
    headers: RwLock<Headers>,
    timeout: Duration,
    events: broadcast::Sender<InboundEnvelope>,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<LoopState>,
    task: Mutex<Option<JoinHandle<StopReason>>>,
}

impl Client {
    /// Connects to the API over a websocket and starts the receive loop.
    pub async fn connect(options: &ClientOptions) -> ClientResult<Self> {
        let channel = WsChannel::connect(&options.address, options.transport).await?;
        Ok(Self::with_channel(channel, options))
    }

    /// Starts a client on an already connected channel.
    ///
    /// Must be called from within a tokio runtime; the receive loop is
    /// spawned before this returns.
    pub fn with_channel(channel: impl DuplexChannel, options: &ClientOptions) -> Self {
        let (sink, source) = channel.split();
        let registry = Arc::new(PendingRegistry::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (state_tx, state) = watch::channel(LoopState::Running);

        let task = ReceiveLoop::new(
            source,
            Arc::clone(&registry),
            events.clone(),
            shutdown_rx,
            state_tx,
        )
        .spawn();

        Self {
            registry,
            sink: Mutex::new(sink),
            headers: RwLock::new(options.headers.clone()),
            timeout: options.effective_timeout(),
            events,
            shutdown,
            state,
            task: Mutex::new(Some(task)),
        }
    }

    /// Issues a call and waits for its response body.
    pub async fn call(&self, call: Call) -> ClientResult<Payload> {
        if self.state.borrow().is_stopped() {
            return Err(ClientError::ConnectionClosed);
        }

        let id = new_correlation_id();
        let timeout = non_zero(call.timeout).unwrap_or(self.timeout);

        let mut headers = self.headers();
        headers.extend(call.headers);
        let mut envelope = RequestEnvelope::new(&id, call.method, call.path).with_headers(headers);
        envelope.body = call.body;
        let frame = encode_request(&envelope).map_err(ClientError::Encode)?;

        let rx = self.registry.register(&id).map_err(|e| match e {
            RegisterError::Duplicate => ClientError::DuplicateId(id.clone()),
            RegisterError::Closed => ClientError::ConnectionClosed,
        })?;
        // removes the slot however this future ends, including when it is dropped
        let _slot = SlotGuard {
            registry: &self.registry,
            id: &id,
        };

        debug!(id = %id, method = %envelope.method, path = %envelope.path, "sending request");
        let sent = self.sink.lock().await.send(frame).await;
        if let Err(e) = sent {
            warn!(id = %id, error = %e, "failed to send request");
            return Err(ClientError::Send(e));
        }

        let response = self.wait(&id, rx, timeout).await?;
        debug!(id = %id, "response received");
        Ok(response.body)
    }

    /// Issues a call and decodes the response body into `T`.
    pub async fn call_json<T: DeserializeOwned>(&self, call: Call) -> ClientResult<T> {
        self.call(call).await?.decode().map_err(ClientError::Decode)
    }

    async fn wait(
        &self,
        id: &str,
        mut rx: oneshot::Receiver<InboundEnvelope>,
        after: Duration,
    ) -> ClientResult<InboundEnvelope> {
        match tokio::time::timeout(after, &mut rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                if self.registry.take(id).is_some() {
                    debug!(id, ?after, "request timed out");
                    return Err(ClientError::Timeout {
                        id: id.to_string(),
                        after,
                    });
                }
                // the loop claimed the slot first, its value is in flight
                rx.await.map_err(|_| ClientError::ConnectionClosed)
            }
        }
    }

    /// Sets a default header sent with every later call.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Snapshot of the default headers.
    pub fn headers(&self) -> Headers {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls currently waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.registry.len()
    }

    pub fn loop_state(&self) -> LoopState {
        self.state.borrow().clone()
    }

    /// Receives every inbound envelope that is not a response.
    pub fn subscribe_events(&self) -> broadcast::Receiver<InboundEnvelope> {
        self.events.subscribe()
    }

    /// Resolves once the receive loop has stopped.
    pub async fn stopped(&self) -> StopReason {
        let mut state = self.state.clone();
        let stopped = state
            .wait_for(LoopState::is_stopped)
            .await
            .map(|state| state.clone());

        match stopped {
            Ok(LoopState::Stopped(reason)) => reason,
            // the loop task died without publishing
            _ => StopReason::Failed("receive loop exited unexpectedly".to_string()),
        }
    }

    /// Stops the receive loop and waits for it. Pending calls fail with
    /// [`ClientError::ConnectionClosed`]. Safe to call more than once.
    pub async fn shutdown(&self) -> StopReason {
        self.shutdown.send_replace(true);

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "receive loop task failed");
                self.registry.close();
            }
        }
        self.stopped().await
    }
}

struct SlotGuard<'a> {
    registry: &'a PendingRegistry,
    id: &'a str,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.registry.take(self.id).is_some() {
            debug!(id = self.id, "abandoned call removed");
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
