//! In-memory duplex channel.
//!
//! [`pair`] returns the client end ([`MemoryChannel`]) and a scripted peer
//! ([`MemoryPeer`]) that stands in for the API server: it sees every frame
//! the client sends and can answer, emit events, inject a transport failure
//! or hang up (by being dropped).

use std::io;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde::Serialize;
use tokio::sync::mpsc;

use mailrpc_protocol::{
    InboundEnvelope, Payload, ProtocolResult, RequestEnvelope, decode_request, encode_response,
};

use super::{DuplexChannel, FrameSink, FrameSource};

type Inbound = io::Result<String>;

/// Creates a connected client/peer pair.
pub fn pair() -> (MemoryChannel, MemoryPeer) {
    let (to_peer, from_client) = mpsc::unbounded_channel();
    let (to_client, from_peer) = mpsc::unbounded_channel();

    (
        MemoryChannel {
            outbound: to_peer,
            inbound: from_peer,
        },
        MemoryPeer {
            frames_in: from_client,
            frames_out: to_client,
        },
    )
}

/// Client end of an in-memory pair.
pub struct MemoryChannel {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

impl MemoryChannel {
    /// Same as [`pair`].
    pub fn pair() -> (Self, MemoryPeer) {
        pair()
    }
}

impl DuplexChannel for MemoryChannel {
    fn split(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        (
            Box::new(MemorySink(self.outbound)),
            Box::new(MemorySource(self.inbound)),
        )
    }
}

struct MemorySink(mpsc::UnboundedSender<String>);

impl FrameSink for MemorySink {
    fn send(&mut self, frame: String) -> BoxFuture<'_, io::Result<()>> {
        let result = self
            .0
            .send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "memory peer is gone"));
        future::ready(result).boxed()
    }
}

struct MemorySource(mpsc::UnboundedReceiver<Inbound>);

impl FrameSource for MemorySource {
    fn receive(&mut self) -> BoxFuture<'_, io::Result<Option<String>>> {
        async move { self.0.recv().await.transpose() }.boxed()
    }
}

/// Scripted peer end of an in-memory pair.
pub struct MemoryPeer {
    frames_in: mpsc::UnboundedReceiver<String>,
    frames_out: mpsc::UnboundedSender<Inbound>,
}

impl MemoryPeer {
    /// Next raw frame sent by the client, `None` once the client is gone.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames_in.recv().await
    }

    /// Next request sent by the client, decoded.
    pub async fn next_request(&mut self) -> Option<ProtocolResult<RequestEnvelope>> {
        let frame = self.next_frame().await?;
        Some(decode_request(&frame))
    }

    /// Pushes a raw frame to the client.
    pub fn send_frame(&self, frame: impl Into<String>) -> io::Result<()> {
        self.push(Ok(frame.into()))
    }

    /// Answers the call `id` with `body` serialized as JSON.
    pub fn respond<T: Serialize + ?Sized>(&self, id: &str, body: &T) -> io::Result<()> {
        let body = Payload::json(body).map_err(invalid_data)?;
        self.respond_raw(id, body)
    }

    /// Answers the call `id` with an already serialized body.
    pub fn respond_raw(&self, id: &str, body: Payload) -> io::Result<()> {
        self.send_envelope(&InboundEnvelope::response(id, body))
    }

    /// Pushes a non-response envelope of the given kind.
    pub fn send_event(&self, kind: &str, body: Payload) -> io::Result<()> {
        self.send_envelope(&InboundEnvelope::event(kind, body))
    }

    /// Makes the client's next read fail with `error`.
    pub fn fail(&self, error: io::Error) -> io::Result<()> {
        self.push(Err(error))
    }

    fn send_envelope(&self, envelope: &InboundEnvelope) -> io::Result<()> {
        let frame = encode_response(envelope).map_err(invalid_data)?;
        self.send_frame(frame)
    }

    fn push(&self, item: Inbound) -> io::Result<()> {
        self.frames_out
            .send(item)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "memory client is gone"))
    }
}

fn invalid_data(err: mailrpc_protocol::ProtocolError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailrpc_protocol::{decode_frame, encode_request};

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (channel, mut peer) = pair();
        let (mut sink, mut source) = channel.split();

        let request = RequestEnvelope::new("r1", "GET", "/keys/k1");
        sink.send(encode_request(&request).unwrap()).await.unwrap();
        assert_eq!(peer.next_request().await.unwrap().unwrap(), request);

        peer.respond("r1", &serde_json::json!({"success": true}))
            .unwrap();
        let frame = source.receive().await.unwrap().unwrap();
        let envelope = decode_frame(&frame).unwrap();
        assert_eq!(envelope.id, "r1");
        assert!(envelope.is_response());
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_receive_error() {
        let (channel, peer) = pair();
        let (_sink, mut source) = channel.split();

        peer.fail(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .unwrap();
        let err = source.receive().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn dropping_the_peer_closes_both_halves() {
        let (channel, peer) = pair();
        let (mut sink, mut source) = channel.split();
        drop(peer);

        assert!(source.receive().await.unwrap().is_none());
        let err = sink.send("[]".to_string()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn dropping_the_client_is_visible_to_the_peer() {
        let (channel, mut peer) = pair();
        drop(channel);

        assert!(peer.next_frame().await.is_none());
        assert!(peer.send_frame("[]").is_err());
    }
}
