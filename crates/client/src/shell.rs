//! The client facade: connect with retry, run commands, probe, close.
//!
//! A `ShellClient` owns one connection and one shell stream for its entire
//! life. After any protocol-level failure the client closes itself rather
//! than reuse a session whose framing state is unknown; callers reconnect
//! to continue.

use std::thread;
use std::time::Duration;

use protocol::{KeyMaterial, SHELL_SERVICE};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::handshake::{DeviceInfo, Handshake};
use crate::keys::KeyStore;
use crate::stream::{StreamSession, SHELL_LOCAL_ID};
use crate::transport::{self, Transport};

/// An authenticated shell session on a remote device.
///
/// Not reentrant: one command is outstanding at a time. Writes to the
/// underlying socket are serialized by the transport, so a probe or close
/// from another thread cannot interleave a frame mid-command.
pub struct ShellClient {
    transport: Option<Transport>,
    session: Option<StreamSession>,
    device: Option<DeviceInfo>,
    config: ClientConfig,
}

impl ShellClient {
    /// Connects, authenticates, and opens the shell stream, retrying up to
    /// `max_retries` times with a fixed delay between attempts.
    ///
    /// Key material is provisioned once before the first attempt; key
    /// failures are not retryable.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let store = match &config.auth.key_dir {
            Some(dir) => KeyStore::with_name(dir, &config.auth.key_name),
            None => KeyStore::with_name(KeyStore::default_dir(), &config.auth.key_name),
        };
        let keys = store
            .load_or_generate()
            .map_err(|e| ClientError::Key(format!("{e:#}")))?;

        let attempts = config.connection.max_retries;
        let mut last_error: Option<ClientError> = None;

        for attempt in 1..=attempts {
            debug!(
                "connection attempt {attempt}/{attempts} to {}:{}",
                config.device.host, config.device.port
            );
            match Self::try_connect(config, &keys) {
                Ok(client) => {
                    info!(
                        "shell session established with {}:{} on attempt {attempt}",
                        config.device.host, config.device.port
                    );
                    return Ok(client);
                }
                Err(e) => {
                    warn!("attempt {attempt} failed: {e}");
                    last_error = Some(e);
                    if attempt < attempts {
                        thread::sleep(config.retry_delay());
                    }
                }
            }
        }

        Err(ClientError::ConnectExhausted {
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }

    /// Connects to `host:port` with default settings for everything else.
    pub fn connect_to(host: &str, port: u16) -> Result<Self> {
        let mut config = ClientConfig::default();
        config.device.host = host.to_string();
        config.device.port = port;
        Self::connect(&config)
    }

    /// One full connection attempt: TCP connect, handshake, stream open.
    fn try_connect(config: &ClientConfig, keys: &KeyMaterial) -> Result<Self> {
        let transport = Transport::connect(
            &config.device.host,
            config.device.port,
            config.connect_timeout(),
            config.read_timeout(),
        )?;

        let device = Handshake::new(&transport, keys).run()?;
        let session = StreamSession::open(&transport, SHELL_LOCAL_ID, SHELL_SERVICE)?;

        Ok(Self {
            transport: Some(transport),
            session: Some(session),
            device: Some(device),
            config: config.clone(),
        })
    }

    /// Runs one command line, returning the captured output.
    ///
    /// With `wait_for_response` the read loop drains output until the
    /// completion heuristic fires; without it, the call returns an empty
    /// string as soon as the write is acknowledged. Any failure closes the
    /// session.
    pub fn execute_command(&mut self, command: &str, wait_for_response: bool) -> Result<String> {
        let transport = self.transport.as_ref().ok_or(ClientError::NotConnected)?;
        let session = self.session.as_mut().ok_or(ClientError::NotConnected)?;

        let result = session.write_line(transport, command).and_then(|()| {
            if wait_for_response {
                session.read_until_complete(transport)
            } else {
                Ok(String::new())
            }
        });

        if let Err(e) = &result {
            warn!("command failed, closing session: {e}");
            self.close();
        }
        result
    }

    /// Runs several commands over this session, collecting each command's
    /// output in order. Stops at the first failure.
    pub fn execute_commands(&mut self, commands: &[&str]) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            outputs.push(self.execute_command(command, true)?);
        }
        Ok(outputs)
    }

    /// Connects, runs one command, and closes.
    pub fn run_once(config: &ClientConfig, command: &str) -> Result<String> {
        let mut client = Self::connect(config)?;
        let output = client.execute_command(command, true);
        client.close();
        output
    }

    /// A cheap TCP probe, independent of the full handshake.
    pub fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
        transport::is_reachable(host, port, timeout)
    }

    /// Whether the session is currently open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some() && self.session.is_some()
    }

    /// The device information learned during the handshake, if connected at
    /// least once.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Closes the stream and the connection. Idempotent; errors during
    /// teardown are swallowed.
    pub fn close(&mut self) {
        if let (Some(session), Some(transport)) = (&self.session, &self.transport) {
            session.close(transport);
        }
        if let Some(transport) = &self.transport {
            transport.shutdown();
        }
        self.session = None;
        self.transport = None;
    }
}

impl Drop for ShellClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ShellClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellClient")
            .field("host", &self.config.device.host)
            .field("port", &self.config.device.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}
