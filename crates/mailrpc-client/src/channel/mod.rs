//! Duplex channel abstraction.
//!
//! The client needs an ordered, bidirectional, message-framed connection and
//! nothing else. A channel is split once at construction: the sink goes to
//! the callers (behind a lock), the source goes to the receive loop.
//!
//! Both halves return boxed futures so they can live behind `dyn` and the
//! client does not have to be generic over its transport.

use std::io;

use futures_util::future::BoxFuture;

pub mod memory;
pub mod websocket;

pub use memory::{MemoryChannel, MemoryPeer};
pub use websocket::{Transport, WsChannel};

/// Outbound half of a channel.
pub trait FrameSink: Send + 'static {
    /// Sends one frame; resolves once the frame has been handed to the
    /// transport.
    fn send(&mut self, frame: String) -> BoxFuture<'_, io::Result<()>>;
}

/// Inbound half of a channel.
pub trait FrameSource: Send + 'static {
    /// Waits for the next frame.
    ///
    /// `Ok(None)` means the peer closed the channel cleanly. An error means
    /// the transport failed; the caller must not read again after either.
    fn receive(&mut self) -> BoxFuture<'_, io::Result<Option<String>>>;
}

/// A connection that can be split into its two halves.
pub trait DuplexChannel: Send + 'static {
    fn split(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>);
}
