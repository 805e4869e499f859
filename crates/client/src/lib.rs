//! # AdbShell Client Library
//!
//! A blocking TCP client for the ADB transport protocol: connect to a
//! device's debug daemon, authenticate with an RSA key, open a shell
//! stream, and run command lines.
//!
//! ## Overview
//!
//! - **Transport**: blocking TCP with per-call timeouts and serialized
//!   frame writes
//! - **Handshake**: CNXN greeting plus the two-branch AUTH exchange
//!   (devices challenge either before or after their first CNXN reply)
//! - **Stream Session**: the single shell stream with write-then-OKAY flow
//!   control and prompt-based output completion
//! - **Facade**: [`ShellClient`] with connect-with-retry, command
//!   execution, a reachability probe, and idempotent close
//! - **Provisioning**: [`KeyStore`] loads or generates the persistent
//!   keypair; [`ClientConfig`] carries addresses, timeouts, and retry
//!   policy
//!
//! ## Example Usage
//!
//! ```no_run
//! use client::{ClientConfig, ShellClient};
//!
//! let mut config = ClientConfig::default();
//! config.device.host = "192.168.1.42".to_string();
//!
//! if ShellClient::is_reachable(&config.device.host, config.device.port, config.probe_timeout()) {
//!     let mut shell = ShellClient::connect(&config)?;
//!     let output = shell.execute_command("getprop ro.product.model", true)?;
//!     println!("model: {}", output.trim());
//!     shell.close();
//! }
//! # Ok::<(), client::ClientError>(())
//! ```
//!
//! ## Concurrency Model
//!
//! Fully synchronous: every call blocks with an explicit timeout, and there
//! is no background reader thread. One command is outstanding at a time;
//! the only cancellation primitive is closing the socket.
//!
//! ## Modules
//!
//! - [`shell`]: the client facade
//! - [`handshake`]: connection handshake state machine
//! - [`stream`]: shell stream session and completion heuristics
//! - [`transport`]: blocking TCP transport
//! - [`keys`]: keypair provisioning
//! - [`config`]: configuration
//! - [`commands`]: well-known Android shell commands
//! - [`error`]: error types

pub mod commands;
pub mod config;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod shell;
pub mod stream;
pub mod transport;

pub use config::{default_config_path, ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use handshake::{DeviceInfo, Handshake, HandshakePhase};
pub use keys::{KeyStore, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
pub use shell::ShellClient;
pub use stream::{CompletionHeuristic, PromptHeuristic, StreamSession, SHELL_LOCAL_ID};
pub use transport::Transport;
