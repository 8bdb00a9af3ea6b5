//! Client error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use codroid_protocol::ProtocolError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
///
/// None of these are fatal to the process: the connection is left in a
/// well-defined state and the caller decides whether to reconnect or resend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connect attempt did not complete in time.
    #[error("connection to {addr} timed out after {}ms", .timeout.as_millis())]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The connect attempt was refused or the address could not be resolved.
    #[error("failed to connect to {addr}: {source}")]
    ConnectRefused {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// An exchange was attempted while the connection is not established.
    #[error("not connected to the controller")]
    NotConnected,

    /// Writing the request failed.
    #[error("failed to send request: {0}")]
    WriteFailure(#[source] io::Error),

    /// No reply arrived before the deadline.
    #[error("no reply within {}ms", .timeout.as_millis())]
    ReadTimeout { timeout: Duration },

    /// Reading the reply failed or the peer closed the connection.
    #[error("failed to read reply: {0}")]
    ReadFailure(#[source] io::Error),

    /// The reply is empty, malformed, or not a JSON object.
    #[error("invalid reply: {reason}")]
    InvalidReply { reason: String },

    /// Request encoding failed.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    /// The controller answered with an `err` field.
    #[error("controller rejected the request: {0}")]
    Rejected(String),

    /// A command argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error outside an exchange (config files, stdout).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true if this error left the connection faulted.
    pub fn faults_connection(&self) -> bool {
        matches!(
            self,
            Self::WriteFailure(_) | Self::ReadTimeout { .. } | Self::ReadFailure(_)
        )
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidReply { reason } => Self::InvalidReply { reason },
            other => Self::Protocol(other),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(ProtocolError::Serialization(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reply_maps_from_protocol() {
        let err: ClientError = ProtocolError::invalid_reply("reply is empty").into();
        assert!(matches!(err, ClientError::InvalidReply { ref reason } if reason == "reply is empty"));
        assert_eq!(err.to_string(), "invalid reply: reply is empty");
    }

    #[test]
    fn timeout_messages_use_milliseconds() {
        let err = ClientError::ReadTimeout {
            timeout: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "no reply within 200ms");

        let err = ClientError::ConnectTimeout {
            addr: "10.0.0.2:9001".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "connection to 10.0.0.2:9001 timed out after 5000ms"
        );
    }

    #[test]
    fn only_io_failures_fault_the_connection() {
        assert!(ClientError::ReadFailure(io::ErrorKind::UnexpectedEof.into()).faults_connection());
        assert!(!ClientError::NotConnected.faults_connection());
        assert!(
            !ClientError::InvalidReply {
                reason: String::new()
            }
            .faults_connection()
        );
    }
}
