//! Client error types.

use std::io;
use std::time::Duration;

use mailrpc_protocol::ProtocolError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
///
/// A call resolves to its result or to exactly one of these.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Establishing the session failed.
    #[error("connection error: {0}")]
    Connect(String),

    /// The request body or envelope could not be serialized. Nothing was sent.
    #[error("failed to encode request: {0}")]
    Encode(#[source] ProtocolError),

    /// The channel refused or failed to deliver the outbound frame.
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),

    /// The receive loop has stopped; no response can arrive any more.
    #[error("connection closed")]
    ConnectionClosed,

    /// A response arrived but its body does not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] ProtocolError),

    /// No matching response arrived in time.
    #[error("request {id} timed out after {after:?}")]
    Timeout { id: String, after: Duration },

    /// The API answered with `success: false`.
    #[error("{0}")]
    Application(String),

    /// A correlation id was generated twice while the first call was pending.
    #[error("correlation id already pending: {0}")]
    DuplicateId(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true for [`ClientError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
