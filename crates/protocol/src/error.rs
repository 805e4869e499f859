//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering framing and authentication failures.
///
/// Framing errors (`InvalidMagic`, `ChecksumMismatch`, `PayloadLengthMismatch`)
/// mean the byte stream is corrupted or the peer is not a compatible device.
/// They are fatal to the connection; there is no partial recovery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    // Framing errors
    /// A message header was shorter than the fixed 24-byte layout.
    #[error("truncated header: need 24 bytes, have {0}")]
    TruncatedHeader(usize),

    /// The header's magic field is not the bitwise complement of the command.
    #[error("invalid magic: command {command:#010x} does not match magic {magic:#010x}")]
    InvalidMagic {
        /// Command field as received.
        command: u32,
        /// Magic field as received.
        magic: u32,
    },

    /// The command field is not one of the six known command tags.
    #[error("unknown command: {0:#010x}")]
    UnknownCommand(u32),

    /// Declared payload length exceeds the maximum this implementation accepts.
    #[error("payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge {
        /// Declared or actual payload size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Payload byte count does not match the header's declared length.
    #[error("payload length mismatch: header declares {declared} bytes, received {received}")]
    PayloadLengthMismatch {
        /// Length declared in the header.
        declared: usize,
        /// Bytes actually received.
        received: usize,
    },

    /// Recomputed payload checksum does not match the header's declared value.
    #[error("checksum mismatch: computed {computed:#010x}, header declares {declared:#010x}")]
    ChecksumMismatch {
        /// Checksum computed over the received payload.
        computed: u32,
        /// Checksum declared in the header.
        declared: u32,
    },

    // Authentication errors
    /// Challenge signing failed. Indicates corrupted key material; never retried.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Key material could not be generated, decoded, or encoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_header_display() {
        let err = ProtocolError::TruncatedHeader(7);
        assert_eq!(err.to_string(), "truncated header: need 24 bytes, have 7");
    }

    #[test]
    fn test_invalid_magic_display() {
        let err = ProtocolError::InvalidMagic {
            command: 0x4e58_4e43,
            magic: 0x0000_0000,
        };
        assert_eq!(
            err.to_string(),
            "invalid magic: command 0x4e584e43 does not match magic 0x00000000"
        );
    }

    #[test]
    fn test_unknown_command_display() {
        let err = ProtocolError::UnknownCommand(0x534c_5453);
        assert_eq!(err.to_string(), "unknown command: 0x534c5453");
    }

    #[test]
    fn test_payload_too_large_display() {
        let err = ProtocolError::PayloadTooLarge {
            size: 2_097_152,
            max: 1_048_576,
        };
        assert_eq!(
            err.to_string(),
            "payload too large: 2097152 bytes exceeds maximum of 1048576 bytes"
        );
    }

    #[test]
    fn test_payload_length_mismatch_display() {
        let err = ProtocolError::PayloadLengthMismatch {
            declared: 12,
            received: 8,
        };
        assert_eq!(
            err.to_string(),
            "payload length mismatch: header declares 12 bytes, received 8"
        );
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = ProtocolError::ChecksumMismatch {
            computed: 0x232,
            declared: 0x233,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: computed 0x00000232, header declares 0x00000233"
        );
    }

    #[test]
    fn test_signing_error_display() {
        let err = ProtocolError::Signing("exponentiation failed".to_string());
        assert_eq!(err.to_string(), "signing failed: exponentiation failed");
    }

    #[test]
    fn test_invalid_key_display() {
        let err = ProtocolError::InvalidKey("bad PEM".to_string());
        assert_eq!(err.to_string(), "invalid key material: bad PEM");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProtocolError>();
    }
}
