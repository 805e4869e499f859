//! The single shell stream: open sequence, write-then-ack flow control, and
//! output accumulation.
//!
//! One logical stream rides the connection, identified by a client-chosen
//! local id and a device-chosen remote id. The device may rotate its id, so
//! every data message it sends re-teaches the remote id and every frame the
//! client sends carries the most recently observed value.

use protocol::{Command, Message};
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// The client-chosen stream identifier for the shell channel.
pub const SHELL_LOCAL_ID: u32 = 1;

/// Decides when accumulated shell output is complete.
///
/// The stock implementation is a prompt-marker match, which is a heuristic
/// rather than a protocol guarantee: output that happens to end with the
/// marker stops the read early. Callers needing stronger semantics can
/// substitute a detector based on a sentinel echo.
pub trait CompletionHeuristic: Send {
    /// Returns true when `accumulated` should be treated as the complete
    /// response. `more_buffered` reports whether further bytes are already
    /// waiting on the socket.
    fn is_complete(&self, accumulated: &str, more_buffered: bool) -> bool;
}

/// Stops when output ends with the shell prompt marker and the socket has
/// nothing more buffered. The dual condition avoids stopping mid-line when
/// the marker appears inside command output by coincidence.
#[derive(Debug, Clone)]
pub struct PromptHeuristic {
    marker: String,
}

impl PromptHeuristic {
    /// Creates a detector for a custom prompt marker.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for PromptHeuristic {
    fn default() -> Self {
        Self::new(" $ ")
    }
}

impl CompletionHeuristic for PromptHeuristic {
    fn is_complete(&self, accumulated: &str, more_buffered: bool) -> bool {
        accumulated.ends_with(&self.marker) && !more_buffered
    }
}

/// The open shell stream.
pub struct StreamSession {
    local_id: u32,
    remote_id: u32,
    heuristic: Box<dyn CompletionHeuristic>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("local_id", &self.local_id)
            .field("remote_id", &self.remote_id)
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    /// Opens a stream to `destination` (a NUL-terminated service string such
    /// as `shell:`).
    ///
    /// The device must acknowledge with OKAY; its next message carries the
    /// remote stream id, which is immediately acknowledged back.
    pub fn open(transport: &Transport, local_id: u32, destination: &[u8]) -> Result<Self> {
        transport.write_message(&Message::open(local_id, destination))?;

        let reply = transport.read_message()?;
        if reply.command != Command::Okay {
            return Err(ClientError::StreamOpen(format!(
                "expected OKAY, got {}",
                reply.command
            )));
        }

        let follow_up = transport.read_message()?;
        let remote_id = follow_up.arg1;
        transport.write_message(&Message::okay(local_id, remote_id))?;

        debug!("shell stream open, local_id={local_id} remote_id={remote_id}");
        Ok(Self {
            local_id,
            remote_id,
            heuristic: Box::new(PromptHeuristic::default()),
        })
    }

    /// Replaces the completion heuristic.
    pub fn with_heuristic(mut self, heuristic: Box<dyn CompletionHeuristic>) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// The most recently observed remote stream id.
    pub fn remote_id(&self) -> u32 {
        self.remote_id
    }

    /// Sends one command line (a trailing newline is appended) and waits for
    /// the write acknowledgement.
    pub fn write_line(&mut self, transport: &Transport, text: &str) -> Result<()> {
        let payload = format!("{text}\n").into_bytes();
        transport.write_message(&Message::write(self.local_id, self.remote_id, payload))?;

        let ack = transport.read_message()?;
        if ack.command != Command::Okay {
            return Err(ClientError::CommandRejected(format!(
                "expected OKAY acknowledgement, got {}",
                ack.command
            )));
        }
        Ok(())
    }

    /// Reads device output until the completion heuristic fires, sending an
    /// acknowledgement for every data message received.
    ///
    /// The remote id is re-learned from every data message. A CLSE from the
    /// device ends the stream and returns whatever accumulated.
    pub fn read_until_complete(&mut self, transport: &Transport) -> Result<String> {
        let mut accumulated = String::new();

        loop {
            let message = transport.read_message()?;
            match message.command {
                Command::Write => {
                    self.remote_id = message.arg0;
                    accumulated.push_str(&String::from_utf8_lossy(&message.payload));
                    transport.write_message(&Message::okay(self.local_id, self.remote_id))?;
                    trace!(
                        "received {} bytes, total {}",
                        message.payload.len(),
                        accumulated.len()
                    );

                    let more_buffered = transport.has_buffered_input()?;
                    if self.heuristic.is_complete(&accumulated, more_buffered) {
                        return Ok(accumulated);
                    }
                }
                Command::Close => {
                    debug!("device closed the stream");
                    return Ok(accumulated);
                }
                other => {
                    return Err(ClientError::Stream(format!(
                        "unexpected {other} while reading output"
                    )));
                }
            }
        }
    }

    /// Sends CLSE, best-effort. Errors during close are swallowed; the
    /// connection is going away either way.
    pub fn close(&self, transport: &Transport) {
        if let Err(e) = transport.write_message(&Message::close(self.local_id, self.remote_id)) {
            warn!("ignoring error while closing stream: {e}");
        }
    }
}
