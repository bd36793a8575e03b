//! Receive loop.
//!
//! One task per client reads the inbound half of the channel, routes
//! responses to their pending calls and forwards everything else as events.
//! The loop is the only reader of the channel.

use std::fmt;
use std::sync::Arc;

use mailrpc_protocol::{InboundEnvelope, decode_frames};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::channel::FrameSource;
use crate::registry::PendingRegistry;

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The client asked it to stop.
    Shutdown,
    /// The peer closed the channel.
    PeerClosed,
    /// Reading from the channel failed.
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown requested"),
            Self::PeerClosed => f.write_str("closed by peer"),
            Self::Failed(error) => write!(f, "receive failed: {}", error),
        }
    }
}

/// Lifecycle of the receive loop. `Stopped` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_running()
    }
}

/// The demultiplexing task.
pub(crate) struct ReceiveLoop {
    source: Box<dyn FrameSource>,
    registry: Arc<PendingRegistry>,
    events: broadcast::Sender<InboundEnvelope>,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<LoopState>,
}

impl ReceiveLoop {
    pub(crate) fn new(
        source: Box<dyn FrameSource>,
        registry: Arc<PendingRegistry>,
        events: broadcast::Sender<InboundEnvelope>,
        shutdown: watch::Receiver<bool>,
        state: watch::Sender<LoopState>,
    ) -> Self {
        Self {
            source,
            registry,
            events,
            shutdown,
            state,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<StopReason> {
        tokio::spawn(self.run())
    }

    /// Runs until shutdown, peer close or a receive error.
    ///
    /// On the way out the registry is closed, which wakes every pending
    /// caller, and the state flips to [`LoopState::Stopped`].
    pub(crate) async fn run(mut self) -> StopReason {
        debug!("receive loop started");

        let reason = loop {
            tokio::select! {
                // a dropped sender means the client is gone
                _ = async { let _ = self.shutdown.wait_for(|stop| *stop).await; } => {
                    break StopReason::Shutdown;
                }
                received = self.source.receive() => match received {
                    Ok(Some(frame)) => self.handle_frame(&frame),
                    Ok(None) => break StopReason::PeerClosed,
                    Err(e) => break StopReason::Failed(e.to_string()),
                },
            }
        };

        let abandoned = self.registry.close();
        match &reason {
            StopReason::Failed(_) => warn!(%reason, abandoned, "receive loop stopped"),
            _ => info!(%reason, abandoned, "receive loop stopped"),
        }
        self.state.send_replace(LoopState::Stopped(reason.clone()));
        reason
    }

    fn handle_frame(&self, frame: &str) {
        let messages = match decode_frames(frame) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, len = frame.len(), "dropping malformed frame");
                return;
            }
        };

        for message in messages {
            match message {
                Ok(envelope) if envelope.is_response() => self.route_response(envelope),
                Ok(envelope) => self.forward_event(envelope),
                Err(e) => warn!(error = %e, "dropping malformed message"),
            }
        }
    }

    fn route_response(&self, envelope: InboundEnvelope) {
        match self.registry.deliver(envelope) {
            Ok(()) => trace!("response delivered"),
            Err(envelope) => debug!(id = %envelope.id, "no pending call for response, discarding"),
        }
    }

    fn forward_event(&self, envelope: InboundEnvelope) {
        trace!(kind = %envelope.kind, "forwarding event");
        // no subscribers is fine
        let _ = self.events.send(envelope);
    }
}
