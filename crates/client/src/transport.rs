//! Blocking TCP transport with serialized writes.
//!
//! The protocol is small-message and turn-based, so the transport disables
//! Nagle buffering and applies a per-read timeout to every frame read. All
//! writes go through one mutex so frames from concurrent callers never
//! interleave on the wire.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use protocol::{Message, MessageHeader, MESSAGE_HEADER_SIZE};
use tracing::trace;

use crate::error::{ClientError, Result};

/// A connected TCP transport carrying protocol messages.
#[derive(Debug)]
pub struct Transport {
    stream: TcpStream,
    write_lock: Mutex<()>,
}

impl Transport {
    /// Connects to `host:port` with an explicit timeout and configures the
    /// socket: no-delay on, read timeout applied to all subsequent reads.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let stream = connect_any(host, port, connect_timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(read_timeout))?;

        trace!("connected to {}:{}", host, port);
        Ok(Self {
            stream,
            write_lock: Mutex::new(()),
        })
    }

    /// Writes one full frame and flushes. Serialized against other writers.
    pub fn write_frame(&self, frame: &[u8]) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut stream = &self.stream;
        stream.write_all(frame)?;
        stream.flush()?;
        Ok(())
    }

    /// Encodes and writes one message.
    pub fn write_message(&self, message: &Message) -> Result<()> {
        trace!(
            "send {} arg0={} arg1={} len={}",
            message.command,
            message.arg0,
            message.arg1,
            message.payload.len()
        );
        self.write_frame(&message.encode()?)
    }

    /// Reads exactly `n` bytes, blocking until they arrive or the read
    /// timeout fires.
    pub fn read_exact(&self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        (&self.stream).read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads and validates one message: the 24-byte header, then exactly the
    /// declared payload length.
    pub fn read_message(&self) -> Result<Message> {
        let header_bytes = self.read_exact(MESSAGE_HEADER_SIZE)?;
        let header = MessageHeader::decode(&header_bytes)?;

        let payload = if header.data_length > 0 {
            self.read_exact(header.data_length as usize)?
        } else {
            Vec::new()
        };

        let message = Message::from_parts(header, payload)?;
        trace!(
            "recv {} arg0={} arg1={} len={}",
            message.command,
            message.arg0,
            message.arg1,
            message.payload.len()
        );
        Ok(message)
    }

    /// Reports whether bytes are immediately available to read, without
    /// blocking and without consuming anything.
    pub fn has_buffered_input(&self) -> Result<bool> {
        self.stream.set_nonblocking(true)?;
        let mut probe = [0u8; 1];
        let peeked = self.stream.peek(&mut probe);
        self.stream.set_nonblocking(false)?;

        match peeked {
            Ok(0) => Ok(false), // orderly shutdown, nothing more to read
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Shuts the socket down in both directions, best-effort. Any blocked
    /// read or write on this transport fails afterwards; this is the only
    /// cancellation primitive.
    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Resolves `host:port` and attempts each address until one connects within
/// the timeout.
fn connect_any(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ClientError::Connect(format!("cannot resolve {host}:{port}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(ClientError::Connect(format!(
            "no addresses for {host}:{port}"
        )));
    }

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(ClientError::Connect(format!(
        "cannot connect to {host}:{port}: {}",
        last_err.expect("at least one address was attempted")
    )))
}

/// A cheap connect-and-close probe, independent of the full handshake. Used
/// to decide whether to attempt the expensive authenticated handshake at
/// all.
pub fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    connect_any(host, port, timeout).is_ok()
}
