//! Connection handshake: version exchange and key-based authentication.
//!
//! The client greets the device with a CNXN message, then proves key
//! ownership by signing whatever challenge comes back. Devices differ in
//! when they challenge: an unauthorized key usually gets an immediate AUTH
//! token, while an already-trusted device may reply CNXN directly. Both
//! paths are required for compatibility and both end the same way, with a
//! signature, an unconditional public-key offer, and a final CNXN from the
//! device.

use protocol::{Command, KeyMaterial, Message, AUTH_TOKEN};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// State of the handshake process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Ready to send the CNXN greeting.
    Greeting,
    /// Greeting sent, waiting for the device's first reply.
    AwaitingReply,
    /// Challenge received, sending signature and public key.
    Proving,
    /// Handshake complete, connection authenticated.
    Complete,
    /// Handshake failed; the connection must be abandoned.
    Failed,
}

/// Device identity learned from the concluding CNXN message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device banner string (service properties, NUL-trimmed).
    pub banner: String,
    /// Protocol version the device announced.
    pub version: u32,
    /// Maximum payload size the device accepts per message.
    pub max_payload: u32,
}

/// The handshake state machine. One per connection attempt.
pub struct Handshake<'a> {
    transport: &'a Transport,
    keys: &'a KeyMaterial,
    phase: HandshakePhase,
}

impl<'a> Handshake<'a> {
    /// Creates a handshake over a freshly connected transport.
    pub fn new(transport: &'a Transport, keys: &'a KeyMaterial) -> Self {
        Self {
            transport,
            keys,
            phase: HandshakePhase::Greeting,
        }
    }

    /// Returns the current handshake phase.
    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Runs the handshake to a terminal phase.
    ///
    /// On success the connection is authenticated and ready for a stream
    /// open. On any failure the connection is unusable; retrying requires an
    /// entirely new connection.
    pub fn run(&mut self) -> Result<DeviceInfo> {
        let result = self.exchange();
        self.phase = match result {
            Ok(_) => HandshakePhase::Complete,
            Err(_) => HandshakePhase::Failed,
        };
        result
    }

    fn exchange(&mut self) -> Result<DeviceInfo> {
        self.transport
            .write_message(&Message::connect())
            .map_err(wrap_transport)?;
        self.phase = HandshakePhase::AwaitingReply;

        let reply = self.transport.read_message().map_err(wrap_transport)?;
        let challenge = match reply.command {
            Command::Auth => {
                if reply.arg0 != AUTH_TOKEN {
                    return Err(ClientError::Handshake(format!(
                        "expected token challenge, got AUTH sub-type {}",
                        reply.arg0
                    )));
                }
                debug!("device demands authentication immediately");
                reply.payload
            }
            // An already-trusting device replies CNXN directly; its payload
            // is signed as the challenge all the same.
            Command::Connect => {
                debug!("device replied CNXN first, proceeding with auth");
                reply.payload
            }
            other => {
                return Err(ClientError::Handshake(format!(
                    "unexpected {other} in reply to greeting"
                )));
            }
        };

        self.phase = HandshakePhase::Proving;
        let signature = self.keys.sign(&challenge)?;
        self.transport
            .write_message(&Message::auth_signature(signature))
            .map_err(wrap_transport)?;

        // The public key is offered regardless of whether the signature is
        // accepted: a fresh key must reach the device for the user to
        // approve it on screen.
        self.transport
            .write_message(&Message::auth_public_key(self.keys.public_key_blob().to_vec()))
            .map_err(wrap_transport)?;

        let conclusion = self.transport.read_message().map_err(wrap_transport)?;
        if conclusion.command != Command::Connect {
            return Err(ClientError::Handshake(format!(
                "expected CNXN to conclude handshake, got {}",
                conclusion.command
            )));
        }

        let banner = String::from_utf8_lossy(&conclusion.payload)
            .trim_end_matches('\0')
            .to_string();
        info!("authenticated, device banner: {banner:?}");
        Ok(DeviceInfo {
            banner,
            version: conclusion.arg0,
            max_payload: conclusion.arg1,
        })
    }
}

/// Transport-level failures during the exchange are reported as handshake
/// failures; protocol framing errors keep their own category.
fn wrap_transport(err: ClientError) -> ClientError {
    match err {
        ClientError::Timeout(_)
        | ClientError::ConnectionClosed(_)
        | ClientError::Connect(_)
        | ClientError::Io(_) => ClientError::Handshake(err.to_string()),
        other => other,
    }
}
