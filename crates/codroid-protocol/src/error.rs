//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding requests or interpreting replies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize an envelope to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reply text is empty, malformed, or not a JSON object.
    #[error("invalid reply: {reason}")]
    InvalidReply { reason: String },
}

impl ProtocolError {
    /// Creates an invalid reply error.
    pub fn invalid_reply(reason: impl Into<String>) -> Self {
        Self::InvalidReply {
            reason: reason.into(),
        }
    }
}
