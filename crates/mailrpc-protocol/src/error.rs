//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON (de)serialization of a frame, an envelope or a payload failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Frame exceeds the maximum allowed size.
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame array carried no message.
    #[error("empty frame")]
    EmptyFrame,
}
