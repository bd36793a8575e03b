//! Request and inbound envelope types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::ProtocolResult;
use crate::{REQUEST_TYPE, RESPONSE_TYPE};

/// Header map carried by a request envelope.
///
/// Keys are compared case-sensitively; the sorted map only makes encoded
/// frames deterministic, order carries no meaning on the wire.
pub type Headers = BTreeMap<String, String>;

/// Opaque, pre-serialized body of an envelope.
///
/// On the wire a body is a JSON string whose contents are themselves JSON,
/// so the envelope layer never needs to know the shape of what it carries.
/// Callers pick the shape when they [`decode`](Payload::decode).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    /// Wraps an already serialized body.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Serializes `value` to JSON and wraps the result.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> ProtocolResult<Self> {
        Ok(Self(serde_json::to_string(value)?))
    }

    /// Deserializes the body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        Ok(serde_json::from_str(&self.0)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Payload {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Payload {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound call envelope.
///
/// Field order matches the wire layout: `id`, `type`, `path`, `method`,
/// `headers`, `body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation id echoed back by the matching response.
    pub id: String,
    /// Discriminant, always `"request"` for envelopes built here.
    #[serde(rename = "type")]
    pub kind: String,
    /// Route path, e.g. `/tokens`.
    pub path: String,
    /// HTTP-like verb.
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// Pre-serialized body, omitted when the call has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Payload>,
}

impl RequestEnvelope {
    /// Creates a request envelope without headers or body.
    pub fn new(id: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: REQUEST_TYPE.to_string(),
            path: path.into(),
            method: method.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Builder: replace the headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Builder: attach a body.
    pub fn with_body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns true when the discriminant says `"request"`.
    pub fn is_request(&self) -> bool {
        self.kind == REQUEST_TYPE
    }
}

/// Any envelope arriving from the peer.
///
/// Only `type == "response"` takes part in correlation. Other kinds are
/// events; their extra fields are kept untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Correlation id (may be empty on event frames).
    #[serde(default)]
    pub id: String,
    /// Discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Pre-serialized application body.
    #[serde(default)]
    pub body: Payload,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InboundEnvelope {
    /// Creates a response envelope for the given correlation id.
    pub fn response(id: impl Into<String>, body: Payload) -> Self {
        Self {
            id: id.into(),
            kind: RESPONSE_TYPE.to_string(),
            body,
            extra: serde_json::Map::new(),
        }
    }

    /// Creates a non-response envelope of the given kind.
    pub fn event(kind: impl Into<String>, body: Payload) -> Self {
        Self {
            id: String::new(),
            kind: kind.into(),
            body,
            extra: serde_json::Map::new(),
        }
    }

    /// Returns true when this envelope answers a pending call.
    pub fn is_response(&self) -> bool {
        self.kind == RESPONSE_TYPE
    }
}
