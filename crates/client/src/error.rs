//! Error types for the client crate.

use protocol::ProtocolError;
use thiserror::Error;

/// Client error type covering all failure modes of a shell session.
///
/// Transport-level failures (`Connect`, `Timeout`, `ConnectionClosed`) are
/// retried only at the connect boundary. Everything else is fatal: framing
/// and handshake errors mean the protocol state is unknown, and retrying
/// inside a corrupted session could desynchronize framing.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Wire framing or signing failure from the protocol layer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// TCP connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// A blocking call exceeded its timeout.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The peer closed the connection mid-exchange.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The handshake did not reach the authenticated state.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The device did not acknowledge the stream open request.
    #[error("failed to open shell stream: {0}")]
    StreamOpen(String),

    /// A command write was not acknowledged.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The shell stream ended or misbehaved mid-session.
    #[error("stream error: {0}")]
    Stream(String),

    /// Key material could not be provisioned.
    #[error("key provisioning failed: {0}")]
    Key(String),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation attempted on a closed client.
    #[error("not connected")]
    NotConnected,

    /// Every connection attempt failed.
    #[error("connect failed after {attempts} attempts: {last_error}")]
    ConnectExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last underlying error, rendered.
        last_error: String,
    },

    /// Any other I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            // Read timeouts surface as WouldBlock on Unix and TimedOut on
            // Windows.
            ErrorKind::TimedOut | ErrorKind::WouldBlock => ClientError::Timeout(err.to_string()),
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ClientError::ConnectionClosed(err.to_string()),
            ErrorKind::ConnectionRefused => ClientError::Connect(err.to_string()),
            _ => ClientError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_timeout() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        assert!(matches!(ClientError::from(io_err), ClientError::Timeout(_)));
    }

    #[test]
    fn test_from_io_would_block_is_timeout() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "would block");
        assert!(matches!(ClientError::from(io_err), ClientError::Timeout(_)));
    }

    #[test]
    fn test_from_io_connection_reset() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(
            ClientError::from(io_err),
            ClientError::ConnectionClosed(_)
        ));
    }

    #[test]
    fn test_from_io_unexpected_eof() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            ClientError::from(io_err),
            ClientError::ConnectionClosed(_)
        ));
    }

    #[test]
    fn test_from_io_connection_refused() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(ClientError::from(io_err), ClientError::Connect(_)));
    }

    #[test]
    fn test_from_io_other() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        assert!(matches!(ClientError::from(io_err), ClientError::Io(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ClientError = ProtocolError::TruncatedHeader(3).into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_connect_exhausted_display() {
        let err = ClientError::ConnectExhausted {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "connect failed after 3 attempts: connection refused"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
