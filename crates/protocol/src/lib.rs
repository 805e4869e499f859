//! # AdbShell Protocol Library
//!
//! This crate provides the wire format and authentication primitives for the
//! AdbShell client, a from-scratch implementation of the ADB transport
//! protocol over TCP.
//!
//! ## Overview
//!
//! The protocol crate is pure computation with no I/O, providing:
//!
//! - **Wire Codec**: the fixed 24-byte little-endian message header, payload
//!   checksums, and the command/magic complement relationship
//! - **Key Material**: RSA-2048 keypairs, the legacy raw-RSA challenge
//!   signature, and the device-format public key blob
//! - **Error Types**: the framing and signing failure taxonomy
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Shell Commands / Output          │  UTF-8 text lines
//! ├─────────────────────────────────────────┤
//! │     Stream Multiplexing (OPEN/OKAY/     │  local/remote stream ids,
//! │            WRTE/CLSE)                   │  write-then-ack flow control
//! ├─────────────────────────────────────────┤
//! │    Handshake (CNXN/AUTH + raw RSA)      │  challenge signing
//! ├─────────────────────────────────────────┤
//! │   Framing (24-byte header + payload)    │  this crate
//! ├─────────────────────────────────────────┤
//! │             Transport (TCP)             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{Command, Message, MessageHeader, MESSAGE_HEADER_SIZE};
//!
//! // Encode the connect greeting
//! let bytes = Message::connect().encode().unwrap();
//!
//! // Decode it back: header first, then the payload
//! let header = MessageHeader::decode(&bytes[..MESSAGE_HEADER_SIZE]).unwrap();
//! assert_eq!(header.command, Command::Connect);
//! let message = Message::from_parts(header, bytes[MESSAGE_HEADER_SIZE..].to_vec()).unwrap();
//! assert_eq!(message.payload, b"host::\0");
//! ```
//!
//! ## Modules
//!
//! - [`wire`]: message codec, command tags, checksums
//! - [`auth`]: key material and challenge signing
//! - [`error`]: error types

pub mod auth;
pub mod error;
pub mod wire;

pub use auth::{KeyMaterial, DEFAULT_KEY_NAME, KEY_BITS, SIGNATURE_LENGTH};
pub use error::{ProtocolError, Result};
pub use wire::{
    checksum, Command, Message, MessageHeader, AUTH_RSA_PUBLIC_KEY, AUTH_SIGNATURE, AUTH_TOKEN,
    CONNECT_BANNER, CONNECT_MAXDATA, MAX_PAYLOAD_SIZE, MESSAGE_HEADER_SIZE, PROTOCOL_VERSION,
    SHELL_SERVICE,
};
