//! Frame codec.
//!
//! A frame is a JSON array of strings. Each string is one JSON-encoded
//! envelope, so a frame carrying a single request looks like:
//!
//! ```text
//! ["{\"id\":\"…\",\"type\":\"request\",\"path\":\"/tokens\",…}"]
//! ```
//!
//! Clients always send exactly one message per frame. Peers may batch, which
//! is why [`decode_frames`] exists next to [`decode_frame`].

use serde::{Serialize, de::DeserializeOwned};

use crate::MAX_FRAME_SIZE;
use crate::envelope::{InboundEnvelope, RequestEnvelope};
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a request envelope into a single-message frame.
///
/// Frames larger than [`MAX_FRAME_SIZE`] are refused with
/// [`ProtocolError::FrameTooLarge`].
///
/// # Example
///
/// ```rust
/// use mailrpc_protocol::{encode_request, decode_request, RequestEnvelope};
///
/// let envelope = RequestEnvelope::new("req-1", "GET", "/keys/abc");
/// let frame = encode_request(&envelope).unwrap();
/// assert!(frame.starts_with("[\""));
/// assert_eq!(decode_request(&frame).unwrap(), envelope);
/// ```
pub fn encode_request(envelope: &RequestEnvelope) -> ProtocolResult<String> {
    let frame = encode_message(envelope)?;
    check_size(frame.len())?;
    Ok(frame)
}

/// Encodes an inbound envelope into a single-message frame.
///
/// This is the peer side of the codec; the client itself never sends one.
/// Responses are not size limited.
pub fn encode_response(envelope: &InboundEnvelope) -> ProtocolResult<String> {
    encode_message(envelope)
}

/// Decodes the first message of a frame.
///
/// Inbound frames are accepted at any size.
///
/// # Example
///
/// ```rust
/// use mailrpc_protocol::decode_frame;
///
/// let frame = r#"["{\"id\":\"req-1\",\"type\":\"response\",\"body\":\"{}\"}"]"#;
/// let envelope = decode_frame(frame).unwrap();
/// assert_eq!(envelope.id, "req-1");
/// assert!(envelope.is_response());
/// ```
pub fn decode_frame(frame: &str) -> ProtocolResult<InboundEnvelope> {
    decode_first(frame)
}

/// Decodes every message of a frame.
///
/// The outer array must be well formed. Each element is decoded on its own,
/// so a malformed element is reported in place without hiding the others.
pub fn decode_frames(frame: &str) -> ProtocolResult<Vec<ProtocolResult<InboundEnvelope>>> {
    let messages = split_frame(frame)?;
    if messages.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    Ok(messages
        .iter()
        .map(|message| serde_json::from_str(message).map_err(ProtocolError::from))
        .collect())
}

/// Decodes the request carried by a frame (peer side).
pub fn decode_request(frame: &str) -> ProtocolResult<RequestEnvelope> {
    decode_first(frame)
}

fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<String> {
    let inner = serde_json::to_string(message)?;
    Ok(serde_json::to_string(&[inner])?)
}

fn decode_first<T: DeserializeOwned>(frame: &str) -> ProtocolResult<T> {
    let first = split_frame(frame)?
        .into_iter()
        .next()
        .ok_or(ProtocolError::EmptyFrame)?;
    Ok(serde_json::from_str(&first)?)
}

fn split_frame(frame: &str) -> ProtocolResult<Vec<String>> {
    Ok(serde_json::from_str(frame)?)
}

fn check_size(size: usize) -> ProtocolResult<()> {
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}
