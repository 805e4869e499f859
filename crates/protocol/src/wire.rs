//! Message codec for the ADB transport wire format.
//!
//! # Message Format
//!
//! Every message starts with a fixed 24-byte header of six little-endian
//! 32-bit integers, followed by the payload:
//!
//! - 4 bytes: command (a 4-character ASCII tag packed little-endian)
//! - 4 bytes: arg0 (meaning depends on command)
//! - 4 bytes: arg1 (meaning depends on command)
//! - 4 bytes: payload length
//! - 4 bytes: payload checksum (additive sum of payload bytes)
//! - 4 bytes: magic (bitwise complement of command)
//! - N bytes: payload
//!
//! # Checksum
//!
//! The checksum is the unsigned sum of all payload bytes with natural 32-bit
//! wraparound. It is a legacy integrity check, not a cryptographic one.

use crate::error::{ProtocolError, Result};

/// Header size: six little-endian u32 fields = 24 bytes.
pub const MESSAGE_HEADER_SIZE: usize = 24;

/// Upper bound on any peer-declared payload length (1 MB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Protocol version announced in the connect message.
pub const PROTOCOL_VERSION: u32 = 0x0100_0000;

/// Maximum payload size announced in the connect message.
pub const CONNECT_MAXDATA: u32 = 4096;

/// Host banner carried by the connect message.
pub const CONNECT_BANNER: &[u8] = b"host::\0";

/// Destination string opening an interactive shell stream.
pub const SHELL_SERVICE: &[u8] = b"shell:\0";

/// AUTH sub-type: random token challenge (device to client).
pub const AUTH_TOKEN: u32 = 1;

/// AUTH sub-type: signed challenge (client to device).
pub const AUTH_SIGNATURE: u32 = 2;

/// AUTH sub-type: public key offer (client to device).
pub const AUTH_RSA_PUBLIC_KEY: u32 = 3;

/// The six wire command tags, each the little-endian packing of its
/// 4-character ASCII name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    /// Connection handshake / banner exchange.
    Connect = 0x4e58_4e43,
    /// Authentication: token challenge, signature, or public key.
    Auth = 0x4854_5541,
    /// Open a stream to a destination service.
    Open = 0x4e45_504f,
    /// Acknowledge a stream open or a data write.
    Okay = 0x5941_4b4f,
    /// Stream data.
    Write = 0x4554_5257,
    /// Close a stream.
    Close = 0x4553_4c43,
}

impl Command {
    /// Resolves a raw command field to a known command tag.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x4e58_4e43 => Some(Command::Connect),
            0x4854_5541 => Some(Command::Auth),
            0x4e45_504f => Some(Command::Open),
            0x5941_4b4f => Some(Command::Okay),
            0x4554_5257 => Some(Command::Write),
            0x4553_4c43 => Some(Command::Close),
            _ => None,
        }
    }

    /// The 4-character ASCII tag for this command.
    pub fn tag(self) -> &'static str {
        match self {
            Command::Connect => "CNXN",
            Command::Auth => "AUTH",
            Command::Open => "OPEN",
            Command::Okay => "OKAY",
            Command::Write => "WRTE",
            Command::Close => "CLSE",
        }
    }

    /// The magic value for this command (bitwise complement).
    pub fn magic(self) -> u32 {
        !(self as u32)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Computes the additive payload checksum: each byte as unsigned 0-255,
/// summed with 32-bit wraparound.
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

/// A decoded message header.
///
/// Headers are decoded separately from payloads because the payload must be
/// read from the transport in a second step of exactly `data_length` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// The command tag.
    pub command: Command,
    /// First command argument.
    pub arg0: u32,
    /// Second command argument.
    pub arg1: u32,
    /// Declared payload length in bytes.
    pub data_length: u32,
    /// Declared payload checksum.
    pub data_checksum: u32,
}

impl MessageHeader {
    /// Decodes and validates a 24-byte header.
    ///
    /// Checks, in order: header length, the command/magic complement
    /// relationship, that the command is a known tag, and that the declared
    /// payload length is within bounds. All failures are fatal framing
    /// errors.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MESSAGE_HEADER_SIZE {
            return Err(ProtocolError::TruncatedHeader(bytes.len()));
        }

        let field = |i: usize| {
            u32::from_le_bytes([bytes[4 * i], bytes[4 * i + 1], bytes[4 * i + 2], bytes[4 * i + 3]])
        };
        let raw_command = field(0);
        let arg0 = field(1);
        let arg1 = field(2);
        let data_length = field(3);
        let data_checksum = field(4);
        let magic = field(5);

        if raw_command != !magic {
            return Err(ProtocolError::InvalidMagic {
                command: raw_command,
                magic,
            });
        }

        let command =
            Command::from_raw(raw_command).ok_or(ProtocolError::UnknownCommand(raw_command))?;

        if data_length as usize > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: data_length as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            command,
            arg0,
            arg1,
            data_length,
            data_checksum,
        })
    }
}

/// A complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The command tag.
    pub command: Command,
    /// First command argument.
    pub arg0: u32,
    /// Second command argument.
    pub arg1: u32,
    /// The payload data.
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a new message.
    pub fn new(command: Command, arg0: u32, arg1: u32, payload: Vec<u8>) -> Self {
        Self {
            command,
            arg0,
            arg1,
            payload,
        }
    }

    /// The connect message announcing protocol version, maximum payload
    /// size, and the host banner.
    pub fn connect() -> Self {
        Self::new(
            Command::Connect,
            PROTOCOL_VERSION,
            CONNECT_MAXDATA,
            CONNECT_BANNER.to_vec(),
        )
    }

    /// An AUTH message carrying a challenge signature.
    pub fn auth_signature(signature: Vec<u8>) -> Self {
        Self::new(Command::Auth, AUTH_SIGNATURE, 0, signature)
    }

    /// An AUTH message offering the public key for on-device approval.
    pub fn auth_public_key(blob: Vec<u8>) -> Self {
        Self::new(Command::Auth, AUTH_RSA_PUBLIC_KEY, 0, blob)
    }

    /// An OPEN message for a destination service string (NUL-terminated).
    pub fn open(local_id: u32, destination: &[u8]) -> Self {
        Self::new(Command::Open, local_id, 0, destination.to_vec())
    }

    /// An empty-payload OKAY acknowledgement.
    pub fn okay(local_id: u32, remote_id: u32) -> Self {
        Self::new(Command::Okay, local_id, remote_id, Vec::new())
    }

    /// A WRTE message carrying stream data.
    pub fn write(local_id: u32, remote_id: u32, payload: Vec<u8>) -> Self {
        Self::new(Command::Write, local_id, remote_id, payload)
    }

    /// A CLSE message ending the stream.
    pub fn close(local_id: u32, remote_id: u32) -> Self {
        Self::new(Command::Close, local_id, remote_id, Vec::new())
    }

    /// Encodes the message into `24 + payload.len()` wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut out = Vec::with_capacity(MESSAGE_HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&(self.command as u32).to_le_bytes());
        out.extend_from_slice(&self.arg0.to_le_bytes());
        out.extend_from_slice(&self.arg1.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&checksum(&self.payload).to_le_bytes());
        out.extend_from_slice(&self.command.magic().to_le_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Assembles a message from a decoded header and the separately read
    /// payload, re-verifying the declared length and checksum.
    pub fn from_parts(header: MessageHeader, payload: Vec<u8>) -> Result<Self> {
        if payload.len() != header.data_length as usize {
            return Err(ProtocolError::PayloadLengthMismatch {
                declared: header.data_length as usize,
                received: payload.len(),
            });
        }

        let computed = checksum(&payload);
        if computed != header.data_checksum {
            return Err(ProtocolError::ChecksumMismatch {
                computed,
                declared: header.data_checksum,
            });
        }

        Ok(Self {
            command: header.command,
            arg0: header.arg0,
            arg1: header.arg1,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_round_trip(message: &Message) -> Message {
        let encoded = message.encode().unwrap();
        let header = MessageHeader::decode(&encoded[..MESSAGE_HEADER_SIZE]).unwrap();
        Message::from_parts(header, encoded[MESSAGE_HEADER_SIZE..].to_vec()).unwrap()
    }

    #[test]
    fn test_command_values_match_ascii_packing() {
        assert_eq!(Command::Connect as u32, u32::from_le_bytes(*b"CNXN"));
        assert_eq!(Command::Auth as u32, u32::from_le_bytes(*b"AUTH"));
        assert_eq!(Command::Open as u32, u32::from_le_bytes(*b"OPEN"));
        assert_eq!(Command::Okay as u32, u32::from_le_bytes(*b"OKAY"));
        assert_eq!(Command::Write as u32, u32::from_le_bytes(*b"WRTE"));
        assert_eq!(Command::Close as u32, u32::from_le_bytes(*b"CLSE"));
    }

    #[test]
    fn test_command_magic_is_complement() {
        for command in [
            Command::Connect,
            Command::Auth,
            Command::Open,
            Command::Okay,
            Command::Write,
            Command::Close,
        ] {
            assert_eq!(command.magic(), !(command as u32));
            assert_eq!(!(command.magic()), command as u32);
        }
    }

    #[test]
    fn test_command_from_raw_rejects_unknown() {
        assert_eq!(Command::from_raw(0), None);
        assert_eq!(Command::from_raw(0x534c_5453), None);
        assert_eq!(
            Command::from_raw(Command::Okay as u32),
            Some(Command::Okay)
        );
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Connect.to_string(), "CNXN");
        assert_eq!(Command::Write.to_string(), "WRTE");
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_checksum_bytes_are_unsigned() {
        // 0xFF counts as 255, not -1
        assert_eq!(checksum(&[0xFF]), 255);
        assert_eq!(checksum(&[0xFF, 0xFF, 0x01]), 511);
    }

    #[test]
    fn test_checksum_matches_known_banner() {
        // "host::\0" sums to 562
        assert_eq!(checksum(b"host::\0"), 562);
        assert_eq!(checksum(b"shell:\0"), 594);
    }

    #[test]
    fn test_checksum_wraps_at_32_bits() {
        let payload = vec![0xFFu8; 1000];
        let expected = (255u64 * 1000) as u32;
        assert_eq!(checksum(&payload), expected);
    }

    #[test]
    fn test_connect_message_wire_bytes() {
        // The exact connect frame a compatible device expects: version
        // 0x01000000, maxdata 4096, banner "host::" with trailing NUL.
        let expected: &[u8] = &[
            0x43, 0x4e, 0x58, 0x4e, // CNXN
            0x00, 0x00, 0x00, 0x01, // version
            0x00, 0x10, 0x00, 0x00, // maxdata 4096
            0x07, 0x00, 0x00, 0x00, // payload length
            0x32, 0x02, 0x00, 0x00, // checksum 562
            0xbc, 0xb1, 0xa7, 0xb1, // magic
            b'h', b'o', b's', b't', b':', b':', 0x00,
        ];
        assert_eq!(Message::connect().encode().unwrap(), expected);
    }

    #[test]
    fn test_open_message_wire_bytes() {
        let encoded = Message::open(1, SHELL_SERVICE).encode().unwrap();
        assert_eq!(&encoded[0..4], b"OPEN");
        assert_eq!(u32::from_le_bytes(encoded[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(encoded[8..12].try_into().unwrap()), 0);
        assert_eq!(u32::from_le_bytes(encoded[12..16].try_into().unwrap()), 7);
        assert_eq!(u32::from_le_bytes(encoded[16..20].try_into().unwrap()), 594);
        assert_eq!(&encoded[MESSAGE_HEADER_SIZE..], b"shell:\0");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let original = Message::new(Command::Write, 1, 77, b"echo hi\n".to_vec());
        assert_eq!(decode_round_trip(&original), original);
    }

    #[test]
    fn test_encode_decode_round_trip_empty_payload() {
        let original = Message::okay(1, 77);
        assert_eq!(decode_round_trip(&original), original);
    }

    #[test]
    fn test_encode_decode_round_trip_binary_payload() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let original = Message::new(Command::Write, 1, 2, payload);
        assert_eq!(decode_round_trip(&original), original);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let message = Message::new(Command::Write, 1, 1, vec![0u8; MAX_PAYLOAD_SIZE + 1]);
        assert!(matches!(
            message.encode(),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let err = MessageHeader::decode(&[0u8; 10]).unwrap_err();
        assert_eq!(err, ProtocolError::TruncatedHeader(10));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut encoded = Message::okay(1, 2).encode().unwrap();
        // Corrupt one magic byte
        encoded[20] ^= 0xFF;
        let err = MessageHeader::decode(&encoded).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMagic { .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_command_with_valid_magic() {
        let raw = 0x534c_5453u32; // "STLS", not a supported tag
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&raw.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(!raw).to_le_bytes());
        let err = MessageHeader::decode(&bytes).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownCommand(raw));
    }

    #[test]
    fn test_decode_rejects_oversized_declared_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(Command::Write as u32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&((MAX_PAYLOAD_SIZE as u32) + 1).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&Command::Write.magic().to_le_bytes());
        let err = MessageHeader::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_from_parts_rejects_length_mismatch() {
        let encoded = Message::write(1, 2, b"data".to_vec()).encode().unwrap();
        let header = MessageHeader::decode(&encoded).unwrap();
        let err = Message::from_parts(header, b"dat".to_vec()).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::PayloadLengthMismatch {
                declared: 4,
                received: 3,
            }
        );
    }

    #[test]
    fn test_from_parts_rejects_checksum_mismatch() {
        let encoded = Message::write(1, 2, b"data".to_vec()).encode().unwrap();
        let header = MessageHeader::decode(&encoded).unwrap();
        // Same length, different content
        let err = Message::from_parts(header, b"date".to_vec()).unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_auth_subtype_constants() {
        let sig = Message::auth_signature(vec![0u8; 256]);
        assert_eq!(sig.arg0, AUTH_SIGNATURE);
        assert_eq!(sig.arg1, 0);

        let key = Message::auth_public_key(b"blob".to_vec());
        assert_eq!(key.arg0, AUTH_RSA_PUBLIC_KEY);
        assert_eq!(key.arg1, 0);

        assert_eq!(AUTH_TOKEN, 1);
        assert_eq!(AUTH_SIGNATURE, 2);
        assert_eq!(AUTH_RSA_PUBLIC_KEY, 3);
    }

    #[test]
    fn test_header_fields_little_endian() {
        let encoded = Message::new(Command::Okay, 0x0102_0304, 0xAABB_CCDD, Vec::new())
            .encode()
            .unwrap();
        assert_eq!(&encoded[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&encoded[8..12], &[0xDD, 0xCC, 0xBB, 0xAA]);
    }
}
