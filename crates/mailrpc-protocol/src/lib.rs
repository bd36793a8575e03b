//! Wire envelopes, frame codec and API payload types for mailrpc.
//!
//! # Protocol Overview
//!
//! Calls travel over a persistent, message-oriented duplex session. Every
//! frame on that session is a JSON array of strings and every string is one
//! JSON-encoded envelope:
//!
//! ```text
//! frame    = [ "<envelope json>" , ... ]
//! envelope = { "id", "type", ... }
//! ```
//!
//! # Envelope Structure
//!
//! - [`RequestEnvelope`]: `id`, `type = "request"`, `path`, `method`,
//!   `headers`, optional `body`.
//! - [`InboundEnvelope`]: `id`, `type`, `body`. `type = "response"` answers the
//!   request with the same `id`; any other type is an event.
//!
//! Bodies are [`Payload`]s: JSON documents carried as JSON strings, so they
//! are encoded twice on the wire.
//!
//! # Example
//!
//! ```rust
//! use mailrpc_protocol::{decode_request, encode_request, Payload, RequestEnvelope};
//!
//! let body = Payload::json(&serde_json::json!({"username": "a"})).unwrap();
//! let request = RequestEnvelope::new("req-123", "POST", "/tokens").with_body(body);
//! let frame = encode_request(&request).unwrap();
//! assert_eq!(decode_request(&frame).unwrap(), request);
//! ```

pub mod api;
mod codec;
mod envelope;
mod error;

pub use codec::{decode_frame, decode_frames, decode_request, encode_request, encode_response};
pub use envelope::{Headers, InboundEnvelope, Payload, RequestEnvelope};
pub use error::{ProtocolError, ProtocolResult};

/// Discriminant of outbound call envelopes.
pub const REQUEST_TYPE: &str = "request";

/// Discriminant of inbound envelopes that answer a call.
pub const RESPONSE_TYPE: &str = "response";

/// Maximum size of an encoded outbound frame (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
